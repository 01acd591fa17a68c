//! Binning raw precipitation values into a histogram.
//!
//! `compute` is a pure function over its inputs: it never touches the
//! filesystem and holds no state between calls, so independent chunks can
//! be accumulated on independent worker threads with no locking. Values
//! outside the edge range (and non-finite fill values) are dropped, not
//! clipped, and tallied so callers can audit data quality.

use tracing::debug;

use crate::bins;
use crate::chunk::PrecipChunk;
use crate::model::{HistError, Histogram, Provenance, Result, TimeBand};

// ---------------------------------------------------------------------------
// compute
// ---------------------------------------------------------------------------

/// Bins a sequence of precipitation-rate samples into a histogram.
///
/// Each value is located in its half-open bin `[edges[i], edges[i+1])` via
/// binary search over the monotonic edge sequence. The returned histogram
/// satisfies `sum(counts) + excluded == number of input values`.
pub fn compute<I>(
    values: I,
    edges: &[f64],
    band: TimeBand,
    provenance: Provenance,
) -> Result<Histogram>
where
    I: IntoIterator<Item = f64>,
{
    if let Some(violation) = bins::edge_violation(edges) {
        return Err(HistError::Config(violation));
    }

    let mut counts = vec![0u64; edges.len() - 1];
    let mut excluded = 0u64;
    for value in values {
        match bins::bin_index(edges, value) {
            Some(i) => counts[i] += 1,
            None => excluded += 1,
        }
    }

    let histogram = Histogram {
        edges: edges.to_vec(),
        counts,
        excluded,
        band,
        provenance,
    };
    debug!(
        source = %histogram.provenance.source_id,
        total = histogram.total_count(),
        excluded = histogram.excluded,
        "accumulated chunk"
    );
    Ok(histogram)
}

/// Bins one gridded chunk, flattening its array and tagging the result
/// with the chunk's own time band and provenance.
pub fn compute_chunk(chunk: &PrecipChunk, edges: &[f64]) -> Result<Histogram> {
    compute(
        chunk.flat_values(),
        edges,
        chunk.band,
        chunk.provenance.clone(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridDomain, VAR_PRECIP_RATE};
    use chrono::{TimeZone, Utc};

    fn test_band() -> TimeBand {
        TimeBand::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn test_provenance() -> Provenance {
        Provenance {
            variable: VAR_PRECIP_RATE.to_string(),
            source_id: "era5".to_string(),
            domain: GridDomain::tropics(),
        }
    }

    #[test]
    fn test_compute_bins_in_range_and_drops_out_of_range() {
        // 100.0 is far above the last edge and must be dropped, not clipped
        // into the top bin.
        let values = vec![0.5, 1.5, 2.5, 100.0];
        let edges = [0.0, 1.0, 2.0, 3.0];
        let h = compute(values, &edges, test_band(), test_provenance()).unwrap();
        assert_eq!(h.counts, vec![1, 1, 1]);
        assert_eq!(h.excluded, 1);
    }

    #[test]
    fn test_counts_plus_excluded_equals_input_length() {
        let values = vec![-5.0, 0.0, 0.9, 1.0, 2.99, 3.0, 7.0, f64::NAN];
        let edges = [0.0, 1.0, 2.0, 3.0];
        let n = values.len() as u64;
        let h = compute(values, &edges, test_band(), test_provenance()).unwrap();
        assert_eq!(
            h.total_count() + h.excluded,
            n,
            "every input value must be either binned or counted as excluded"
        );
    }

    #[test]
    fn test_value_below_first_edge_is_excluded() {
        let h = compute(vec![-0.001], &[0.0, 1.0], test_band(), test_provenance()).unwrap();
        assert_eq!(h.counts, vec![0]);
        assert_eq!(h.excluded, 1);
    }

    #[test]
    fn test_value_at_last_edge_is_excluded() {
        // The top interval is [2.0, 3.0); 3.0 itself falls outside.
        let h = compute(
            vec![3.0],
            &[0.0, 1.0, 2.0, 3.0],
            test_band(),
            test_provenance(),
        )
        .unwrap();
        assert_eq!(h.counts, vec![0, 0, 0]);
        assert_eq!(h.excluded, 1);
    }

    #[test]
    fn test_non_finite_fill_values_are_excluded() {
        let values = vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.5];
        let h = compute(values, &[0.0, 1.0], test_band(), test_provenance()).unwrap();
        assert_eq!(h.counts, vec![1]);
        assert_eq!(h.excluded, 3);
    }

    #[test]
    fn test_empty_input_gives_zero_counts() {
        let h = compute(
            std::iter::empty(),
            &[0.0, 1.0, 2.0],
            test_band(),
            test_provenance(),
        )
        .unwrap();
        assert_eq!(h.counts, vec![0, 0]);
        assert_eq!(h.excluded, 0);
        assert_eq!(h.total_count(), 0);
    }

    #[test]
    fn test_compute_rejects_invalid_edges() {
        let result = compute(vec![1.0], &[3.0, 1.0], test_band(), test_provenance());
        assert!(result.is_err(), "decreasing edges must be rejected up front");
    }

    #[test]
    fn test_compute_chunk_uses_chunk_band_and_provenance() {
        use ndarray::ArrayD;
        let chunk = PrecipChunk {
            values: ArrayD::from_shape_vec(vec![2, 2], vec![0.5, 1.5, 2.5, 100.0]).unwrap(),
            band: test_band(),
            provenance: test_provenance(),
        };
        let h = compute_chunk(&chunk, &[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(h.counts, vec![1, 1, 1]);
        assert_eq!(h.excluded, 1);
        assert_eq!(h.band, chunk.band);
        assert_eq!(h.provenance, chunk.provenance);
    }
}
