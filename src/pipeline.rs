//! End-to-end drivers: accumulate a chunk stream, then merge snapshots.
//!
//! Accumulation is embarrassingly parallel — each chunk yields one
//! immutable histogram and one uniquely named snapshot file, so chunks
//! fan out across worker threads with no shared mutable state and no
//! locking. Loading snapshots back is equally independent per file; the
//! merge itself is a synchronous in-memory reduction whose result does
//! not depend on load order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::accumulate;
use crate::chunk::ChunkSource;
use crate::config::HistConfig;
use crate::merge;
use crate::model::{Histogram, Result};
use crate::store;

// ---------------------------------------------------------------------------
// Accumulation
// ---------------------------------------------------------------------------

/// Drains a chunk source, binning and persisting every chunk under the
/// configured bin scheme. Returns the written snapshot paths.
///
/// Chunks are processed in parallel; each snapshot filename is derived
/// from its chunk's time band, so distinct chunks never contend for the
/// same file.
pub fn accumulate_chunks<S: ChunkSource>(
    source: &mut S,
    config: &HistConfig,
) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let edges = config.bins.edges()?;

    let mut chunks = Vec::new();
    while let Some(chunk) = source.next_chunk()? {
        chunks.push(chunk);
    }
    info!(chunks = chunks.len(), "accumulating chunk stream");

    let mut paths = chunks
        .par_iter()
        .map(|chunk| {
            let histogram = accumulate::compute_chunk(chunk, &edges)?;
            store::persist(&histogram, &config.netcdf_dir, false)
        })
        .collect::<Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Loads every snapshot in `dir` (in parallel, order-independent) and
/// merges them into one combined histogram.
pub fn merge_dir(dir: &Path) -> Result<Histogram> {
    let paths = store::list_snapshots(dir)?;
    let histograms = paths
        .par_iter()
        .map(|path| store::load(path))
        .collect::<Result<Vec<_>>>()?;
    merge::merge(&histograms)
}

/// Accumulates a chunk stream and immediately merges what was written,
/// returning the combined histogram and a run summary.
pub fn run<S: ChunkSource>(source: &mut S, config: &HistConfig) -> Result<(Histogram, MergeReport)> {
    let paths = accumulate_chunks(source, config)?;
    let combined = merge_dir(&config.netcdf_dir)?;
    let report = MergeReport::new(paths.len(), &combined);
    info!(
        files = report.files,
        total = report.total_count,
        excluded = report.excluded,
        "merged snapshot directory"
    );
    Ok((combined, report))
}

// ---------------------------------------------------------------------------
// Merge report
// ---------------------------------------------------------------------------

/// Diagnostic summary of a merge, for logs and run manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Number of snapshot files that went into the merge.
    pub files: usize,
    /// Combined source identifier, e.g. "era5" or "era5+imerg".
    pub source_id: String,
    /// In-range samples across all bins.
    pub total_count: u64,
    /// Dropped out-of-range / non-finite samples.
    pub excluded: u64,
    pub band_start: DateTime<Utc>,
    pub band_end: DateTime<Utc>,
    pub covered_secs: i64,
    /// Seconds of double-covered time; non-zero means duplicate or
    /// overlapping chunks were merged.
    pub overlap_secs: i64,
}

impl MergeReport {
    pub fn new(files: usize, combined: &Histogram) -> Self {
        MergeReport {
            files,
            source_id: combined.provenance.source_id.clone(),
            total_count: combined.total_count(),
            excluded: combined.excluded,
            band_start: combined.band.start,
            band_end: combined.band.end,
            covered_secs: combined.band.covered_secs,
            overlap_secs: combined.band.overlap_secs(),
        }
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::model::HistError::Config(format!("report serialization: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::BinScheme;
    use crate::chunk::{PrecipChunk, VecSource};
    use crate::model::TimeBand;
    use chrono::TimeZone;
    use ndarray::ArrayD;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> HistConfig {
        let mut config = HistConfig::default();
        config.netcdf_dir = dir.to_path_buf();
        config.bins = BinScheme::Explicit {
            edges: vec![0.0, 1.0, 2.0, 3.0],
        };
        config
    }

    fn chunk(config: &HistConfig, day: u32, values: Vec<f64>) -> PrecipChunk {
        let n = values.len();
        PrecipChunk {
            values: ArrayD::from_shape_vec(vec![n], values).unwrap(),
            band: TimeBand::new(
                Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, day + 1, 0, 0, 0).unwrap(),
            )
            .unwrap(),
            provenance: config.provenance(),
        }
    }

    #[test]
    fn test_accumulate_writes_one_snapshot_per_chunk() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let mut source = VecSource::new(vec![
            chunk(&config, 1, vec![0.5, 1.5]),
            chunk(&config, 2, vec![2.5]),
            chunk(&config, 3, vec![0.1, 0.2, 0.3]),
        ]);
        let paths = accumulate_chunks(&mut source, &config).unwrap();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.exists(), "snapshot {} should exist", path.display());
        }
    }

    #[test]
    fn test_run_merges_everything_that_was_accumulated() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let mut source = VecSource::new(vec![
            chunk(&config, 1, vec![0.5, 1.5, 2.5, 100.0]),
            chunk(&config, 2, vec![1.1, 1.2]),
        ]);
        let (combined, report) = run(&mut source, &config).unwrap();
        assert_eq!(combined.counts, vec![1, 3, 1]);
        assert_eq!(combined.excluded, 1);
        assert_eq!(report.files, 2);
        assert_eq!(report.total_count, 5);
        assert_eq!(report.excluded, 1);
        assert_eq!(report.overlap_secs, 0, "consecutive days do not overlap");
        assert_eq!(
            report.band_end - report.band_start,
            chrono::Duration::days(2),
            "merged band spans both chunk days"
        );
    }

    #[test]
    fn test_merge_dir_on_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(
            merge_dir(dir.path()).is_err(),
            "a directory with no snapshots has nothing to merge"
        );
    }

    #[test]
    fn test_report_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let mut source = VecSource::new(vec![chunk(&config, 1, vec![0.5])]);
        let (_, report) = run(&mut source, &config).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"total_count\": 1"));
        let parsed: MergeReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
