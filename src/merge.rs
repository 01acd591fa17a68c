//! Combining chunk histograms into one statistically equivalent histogram.
//!
//! Merge is a synchronous, CPU-bound reduction: counts are summed per bin,
//! excluded tallies are summed, and the time bands are combined into a
//! union span whose covered duration is the sum of the constituents. The
//! count summation is associative and commutative, so the order in which
//! snapshots are loaded and passed in never changes the result.
//!
//! Overlapping input bands (covered duration exceeding the union span)
//! usually mean the same chunk was fed in twice. That is flagged with a
//! warning and left detectable on the result, but it is not an error —
//! the merged counts are still well defined.

use std::collections::BTreeSet;

use tracing::warn;

use crate::bins;
use crate::model::{HistError, Histogram, Provenance, Result, TimeBand};

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Merges histograms that share a binning scheme into a new histogram.
///
/// Preconditions: at least one input, and all inputs must agree on bin
/// edges (within [`bins::EDGE_TOLERANCE`]), variable name, and spatial
/// domain. Inputs are never mutated; merging a single histogram returns
/// an equivalent copy.
pub fn merge(histograms: &[Histogram]) -> Result<Histogram> {
    let first = histograms.first().ok_or(HistError::EmptyMerge)?;

    for h in histograms {
        h.validate()?;
    }
    for (i, h) in histograms.iter().enumerate().skip(1) {
        if !bins::edges_approx_eq(&first.edges, &h.edges) {
            return Err(HistError::IncompatibleBinning(format!(
                "input {} has {} edges over {:?}..{:?}, expected {} edges over {:?}..{:?}",
                i,
                h.edges.len(),
                h.edges.first(),
                h.edges.last(),
                first.edges.len(),
                first.edges.first(),
                first.edges.last()
            )));
        }
        if h.provenance.variable != first.provenance.variable {
            return Err(HistError::IncompatibleBinning(format!(
                "input {} bins variable '{}', expected '{}'",
                i, h.provenance.variable, first.provenance.variable
            )));
        }
        if h.provenance.domain != first.provenance.domain {
            return Err(HistError::IncompatibleBinning(format!(
                "input {} covers domain '{}', expected '{}'",
                i, h.provenance.domain.name, first.provenance.domain.name
            )));
        }
    }

    let mut counts = vec![0u64; first.counts.len()];
    let mut excluded = 0u64;
    for h in histograms {
        for (total, c) in counts.iter_mut().zip(&h.counts) {
            *total += c;
        }
        excluded += h.excluded;
    }

    let mut start = first.band.start;
    let mut end = first.band.end;
    let mut covered = 0i64;
    for h in histograms {
        start = start.min(h.band.start);
        end = end.max(h.band.end);
        covered += h.band.covered_secs;
    }
    let band = TimeBand::with_covered(start, end, covered)?;

    if band.has_overlap() {
        warn!(
            overlap_secs = band.overlap_secs(),
            inputs = histograms.len(),
            "merged time bands overlap - possible duplicate chunks"
        );
    }

    Ok(Histogram {
        edges: first.edges.clone(),
        counts,
        excluded,
        band,
        provenance: merged_provenance(histograms, first),
    })
}

/// Combines provenance across inputs. Variable and domain are already
/// known to match; source ids are deduplicated and joined with `+`, so
/// an observation ensemble like `era5+imerg` reads naturally and the
/// result is independent of input order and merge grouping.
fn merged_provenance(histograms: &[Histogram], first: &Histogram) -> Provenance {
    let sources: BTreeSet<&str> = histograms
        .iter()
        .flat_map(|h| h.provenance.source_id.split('+'))
        .collect();
    Provenance {
        variable: first.provenance.variable.clone(),
        source_id: sources.into_iter().collect::<Vec<_>>().join("+"),
        domain: first.provenance.domain.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
