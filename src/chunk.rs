//! Input boundary: gridded precipitation chunks.
//!
//! A chunk is one discrete unit of input data — typically one time window
//! of a model run or observational dataset — carrying its precipitation
//! values, the time band they cover, and provenance. Chunks arrive from an
//! external data-access collaborator; this module only defines the shape
//! they must have and a lazy source interface for feeding them into the
//! accumulator one at a time.

use ndarray::ArrayD;

use crate::model::{Provenance, Result, TimeBand};

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One time window of gridded precipitation-rate data.
///
/// The array may have any dimensionality (time x lat x lon is typical);
/// binning flattens it, so the grid layout never matters to the engine.
/// Fill values surface as NaN and are dropped during accumulation.
#[derive(Debug, Clone)]
pub struct PrecipChunk {
    /// Precipitation-rate samples over the chunk's grid and time steps.
    pub values: ArrayD<f64>,
    /// Time span this chunk covers.
    pub band: TimeBand,
    /// Variable, source, and spatial domain of the samples.
    pub provenance: Provenance,
}

impl PrecipChunk {
    /// Iterates the chunk's samples in flat order.
    pub fn flat_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Number of samples in the chunk, including fill values.
    pub fn sample_count(&self) -> usize {
        self.values.len()
    }
}

// ---------------------------------------------------------------------------
// Chunk source
// ---------------------------------------------------------------------------

/// A finite, pull-based sequence of chunks.
///
/// Upstream feeds (file iterators, streamed subsets of a large dataset)
/// implement this to hand the pipeline one chunk at a time; the engine
/// itself stays synchronous and chunk-oriented regardless of how the data
/// arrives. A source is not required to be restartable.
pub trait ChunkSource {
    /// Produces the next chunk, or `Ok(None)` once the source is drained.
    fn next_chunk(&mut self) -> Result<Option<PrecipChunk>>;
}

/// In-memory chunk source, used for replays and in tests.
pub struct VecSource {
    chunks: std::vec::IntoIter<PrecipChunk>,
}

impl VecSource {
    pub fn new(chunks: Vec<PrecipChunk>) -> Self {
        VecSource {
            chunks: chunks.into_iter(),
        }
    }
}

impl ChunkSource for VecSource {
    fn next_chunk(&mut self) -> Result<Option<PrecipChunk>> {
        Ok(self.chunks.next())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridDomain, VAR_PRECIP_RATE};
    use chrono::{TimeZone, Utc};
    use ndarray::ArrayD;

    fn chunk_with_values(values: Vec<f64>) -> PrecipChunk {
        let n = values.len();
        PrecipChunk {
            values: ArrayD::from_shape_vec(vec![n], values).expect("1-d shape always fits"),
            band: TimeBand::new(
                Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap(),
            )
            .unwrap(),
            provenance: Provenance {
                variable: VAR_PRECIP_RATE.to_string(),
                source_id: "era5".to_string(),
                domain: GridDomain::tropics(),
            },
        }
    }

    #[test]
    fn test_flat_values_preserves_order_and_length() {
        let chunk = chunk_with_values(vec![0.5, 1.5, 2.5]);
        let flat: Vec<f64> = chunk.flat_values().collect();
        assert_eq!(flat, vec![0.5, 1.5, 2.5]);
        assert_eq!(chunk.sample_count(), 3);
    }

    #[test]
    fn test_vec_source_drains_in_order_then_yields_none() {
        let mut source = VecSource::new(vec![
            chunk_with_values(vec![1.0]),
            chunk_with_values(vec![2.0, 3.0]),
        ]);
        let first = source.next_chunk().unwrap().expect("first chunk");
        assert_eq!(first.sample_count(), 1);
        let second = source.next_chunk().unwrap().expect("second chunk");
        assert_eq!(second.sample_count(), 2);
        assert!(source.next_chunk().unwrap().is_none(), "drained source yields None");
    }
}
