//! Core data types for the tropical precipitation histogram engine.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains the histogram entity, its time-band and provenance metadata,
//! and the error taxonomy — but no binning logic and no I/O.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bins;

// ---------------------------------------------------------------------------
// Variable names
// ---------------------------------------------------------------------------

/// Default NetCDF variable name for mean total precipitation rate.
pub const VAR_PRECIP_RATE: &str = "mtpr";

// ---------------------------------------------------------------------------
// Time band
// ---------------------------------------------------------------------------

/// The time span covered by one histogram.
///
/// `covered_secs` tracks the total duration of data that actually went into
/// the histogram. For a freshly computed chunk it equals `end - start`.
/// After a merge, `start`/`end` span the union of the inputs while
/// `covered_secs` is the sum of the constituents' covered durations, so
/// `covered_secs > span_secs()` reveals overlapping inputs — typically a
/// duplicate chunk fed into the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBand {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub covered_secs: i64,
}

impl TimeBand {
    /// Band for a single contiguous chunk: covered duration equals the span.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let band = TimeBand {
            start,
            end,
            covered_secs: (end - start).num_seconds(),
        };
        band.validate()?;
        Ok(band)
    }

    /// Band with an explicit covered duration, as produced by a merge.
    pub fn with_covered(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        covered_secs: i64,
    ) -> Result<Self> {
        let band = TimeBand {
            start,
            end,
            covered_secs,
        };
        band.validate()?;
        Ok(band)
    }

    /// Duration of the `start..end` span in seconds.
    pub fn span_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Seconds by which the covered duration exceeds the span.
    ///
    /// Zero for any single-chunk band and for merges of disjoint bands.
    pub fn overlap_secs(&self) -> i64 {
        (self.covered_secs - self.span_secs()).max(0)
    }

    /// True if the constituents of a merged band overlapped in time.
    pub fn has_overlap(&self) -> bool {
        self.overlap_secs() > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(HistError::CorruptData(format!(
                "time band ends before it starts: {} .. {}",
                self.start, self.end
            )));
        }
        if self.covered_secs < 0 {
            return Err(HistError::CorruptData(format!(
                "negative covered duration: {}s",
                self.covered_secs
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Spatial domain
// ---------------------------------------------------------------------------

/// Spatial domain descriptor: a named latitude/longitude box in WGS84.
///
/// The engine never touches individual grid cells — the domain rides along
/// as provenance so that a persisted histogram records which part of the
/// globe its samples were drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDomain {
    /// Short identifier used in snapshot filenames, e.g. "tropics".
    pub name: String,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GridDomain {
    /// The 30°S–30°N tropical belt, the default analysis domain.
    pub fn tropics() -> Self {
        GridDomain {
            name: "tropics".to_string(),
            lat_min: -30.0,
            lat_max: 30.0,
            lon_min: 0.0,
            lon_max: 360.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HistError::Config(
                "spatial domain must have a non-empty name".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat_min)
            || !(-90.0..=90.0).contains(&self.lat_max)
            || self.lat_min >= self.lat_max
        {
            return Err(HistError::Config(format!(
                "invalid latitude bounds for domain '{}': {} .. {}",
                self.name, self.lat_min, self.lat_max
            )));
        }
        if !(-180.0..=360.0).contains(&self.lon_min)
            || !(-180.0..=360.0).contains(&self.lon_max)
            || self.lon_min >= self.lon_max
        {
            return Err(HistError::Config(format!(
                "invalid longitude bounds for domain '{}': {} .. {}",
                self.name, self.lon_min, self.lon_max
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a histogram's samples came from.
///
/// `source_id` identifies the model run or observational dataset
/// (e.g. "era5", "imerg", "icon-sapphire"). Merging histograms from
/// different sources joins their ids with `+`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Name of the precipitation variable that was binned.
    pub variable: String,
    /// Model or observation identifier.
    pub source_id: String,
    /// Spatial domain the samples were drawn from.
    pub domain: GridDomain,
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// A binned histogram of precipitation-rate samples over one time band.
///
/// Bins are half-open intervals `[edges[i], edges[i+1])`. Counts are the
/// single source of truth — frequency and probability density are derived
/// on demand by `stats::derive_statistics` and never stored. A histogram
/// is immutable once built; `merge::merge` produces a new value rather
/// than mutating its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Strictly increasing bin edges. One more entry than `counts`.
    pub edges: Vec<f64>,
    /// Per-bin sample counts.
    pub counts: Vec<u64>,
    /// Samples that fell outside `[edges[0], edges[last])` or were
    /// non-finite, and were therefore dropped rather than clipped.
    pub excluded: u64,
    /// Time span of the input data.
    pub band: TimeBand,
    /// Variable, source, and spatial domain the samples came from.
    pub provenance: Provenance,
}

impl Histogram {
    /// Total number of in-range samples across all bins.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of bins.
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Checks every structural invariant. Used on every load so that a
    /// damaged or foreign snapshot surfaces as `CorruptData` instead of
    /// silently producing wrong statistics downstream.
    pub fn validate(&self) -> Result<()> {
        if let Some(violation) = bins::edge_violation(&self.edges) {
            return Err(HistError::CorruptData(violation));
        }
        if self.counts.len() + 1 != self.edges.len() {
            return Err(HistError::CorruptData(format!(
                "{} bin edges require {} counts, found {}",
                self.edges.len(),
                self.edges.len() - 1,
                self.counts.len()
            )));
        }
        self.band.validate()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when computing, persisting, loading, or merging
/// histograms.
#[derive(Debug, Error)]
pub enum HistError {
    /// Filesystem-level failure (unwritable destination, unreadable dir).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the NetCDF library while reading or writing.
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    /// The requested snapshot file does not exist.
    #[error("histogram snapshot not found: {0}")]
    NotFound(PathBuf),

    /// A file already exists at the destination with an incompatible
    /// bin-edge definition and overwrite was not requested.
    #[error("incompatible existing snapshot at {path}: {details}")]
    Schema { path: PathBuf, details: String },

    /// A loaded snapshot violates a structural invariant.
    #[error("corrupt histogram data: {0}")]
    CorruptData(String),

    /// Histograms with different binning schemes (or different variable /
    /// domain) cannot be combined.
    #[error("incompatible binning: {0}")]
    IncompatibleBinning(String),

    /// A merge was requested over zero histograms.
    #[error("cannot merge an empty set of histograms")]
    EmptyMerge,

    /// The configuration object is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HistError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
