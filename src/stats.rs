//! Derived histogram statistics: frequency and probability density.
//!
//! Counts are the single source of truth — these quantities are recomputed
//! on every call and never cached or persisted, so a merged histogram's
//! statistics are always consistent with its merged counts.

use tracing::warn;

use crate::model::Histogram;

// ---------------------------------------------------------------------------
// Statistic kinds
// ---------------------------------------------------------------------------

/// Which derived quantity to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Per-bin count normalized by total in-range sample count.
    Frequency,
    /// Frequency normalized by bin width; integrates to 1 over the domain.
    Density,
}

/// Non-fatal signal raised alongside a well-defined result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatWarning {
    /// Statistics were requested on a histogram with zero in-range
    /// samples; the result is all zeros rather than a division fault.
    ZeroSample,
}

// ---------------------------------------------------------------------------
// derive_statistics
// ---------------------------------------------------------------------------

/// Computes the requested per-bin statistic.
///
/// An all-empty histogram yields an all-zero vector together with
/// `Some(StatWarning::ZeroSample)` instead of raising; every other input
/// yields `None` for the warning slot.
pub fn derive_statistics(
    histogram: &Histogram,
    kind: StatKind,
) -> (Vec<f64>, Option<StatWarning>) {
    let total = histogram.total_count();
    if total == 0 {
        warn!(
            source = %histogram.provenance.source_id,
            "statistics requested on histogram with zero in-range samples"
        );
        return (vec![0.0; histogram.bin_count()], Some(StatWarning::ZeroSample));
    }

    let total = total as f64;
    let values = histogram
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let frequency = count as f64 / total;
            match kind {
                StatKind::Frequency => frequency,
                StatKind::Density => {
                    frequency / (histogram.edges[i + 1] - histogram.edges[i])
                }
            }
        })
        .collect();
    (values, None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
