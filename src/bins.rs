//! Bin-edge schemes for precipitation-rate histograms.
//!
//! Edges define half-open intervals `[edges[i], edges[i+1])`. A scheme is
//! either an explicit edge list or a linear (min, max, count) generator.
//! Because linearly generated edges are the product of repeated
//! floating-point arithmetic, equality between edge sequences is always
//! checked within a small tolerance rather than bit-for-bit.

use serde::{Deserialize, Serialize};

use crate::model::{HistError, Result};

// ---------------------------------------------------------------------------
// Edge equality tolerance
// ---------------------------------------------------------------------------

/// Relative tolerance for comparing bin edges between two histograms.
///
/// Two edges a, b are considered equal when
/// `|a - b| <= EDGE_TOLERANCE * max(1, |a|, |b|)`. Edge sequences generated
/// from the same (min, max, count) specification always pass; sequences
/// from a genuinely different scheme never come close.
pub const EDGE_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Bin scheme
// ---------------------------------------------------------------------------

/// How the bin edges of a histogram are defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinScheme {
    /// Caller-supplied edges, used verbatim.
    Explicit { edges: Vec<f64> },
    /// `bins` equal-width intervals spanning `[min, max)`.
    Linear { min: f64, max: f64, bins: usize },
}

impl BinScheme {
    /// Materializes the edge sequence for this scheme.
    pub fn edges(&self) -> Result<Vec<f64>> {
        let edges = match self {
            BinScheme::Explicit { edges } => edges.clone(),
            BinScheme::Linear { min, max, bins } => {
                if *bins == 0 {
                    return Err(HistError::Config(
                        "linear bin scheme needs at least one bin".to_string(),
                    ));
                }
                if !(min.is_finite() && max.is_finite()) || min >= max {
                    return Err(HistError::Config(format!(
                        "linear bin scheme needs finite min < max, got {} .. {}",
                        min, max
                    )));
                }
                let width = (max - min) / *bins as f64;
                (0..=*bins).map(|i| min + i as f64 * width).collect()
            }
        };
        if let Some(violation) = edge_violation(&edges) {
            return Err(HistError::Config(violation));
        }
        Ok(edges)
    }

    /// Number of bins this scheme produces.
    pub fn bin_count(&self) -> usize {
        match self {
            BinScheme::Explicit { edges } => edges.len().saturating_sub(1),
            BinScheme::Linear { bins, .. } => *bins,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge validation and lookup
// ---------------------------------------------------------------------------

/// Returns a description of the first structural problem in an edge
/// sequence, or `None` if the sequence is usable for binning.
pub fn edge_violation(edges: &[f64]) -> Option<String> {
    if edges.len() < 2 {
        return Some(format!(
            "need at least 2 bin edges to form a bin, found {}",
            edges.len()
        ));
    }
    for window in edges.windows(2) {
        if !window[0].is_finite() || !window[1].is_finite() {
            return Some("bin edges must be finite".to_string());
        }
        if window[0] >= window[1] {
            return Some(format!(
                "bin edges must be strictly increasing: {} then {}",
                window[0], window[1]
            ));
        }
    }
    None
}

/// Locates the half-open bin `[edges[i], edges[i+1])` containing `value`.
///
/// Returns `None` for values below the first edge, at or above the last
/// edge, and for non-finite values (NaN and infinities show up as fill
/// values in real model output). Such samples are dropped, never clipped.
pub fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    if value < edges[0] || value >= edges[edges.len() - 1] {
        return None;
    }
    // partition_point counts edges <= value; the bin index is one less.
    Some(edges.partition_point(|e| *e <= value) - 1)
}

/// Whether two edge sequences describe the same binning, within
/// [`EDGE_TOLERANCE`].
pub fn edges_approx_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= EDGE_TOLERANCE * x.abs().max(y.abs()).max(1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
