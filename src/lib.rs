//! Tropical precipitation histogram engine.
//!
//! Computes binned histograms of precipitation rate from gridded
//! climate-model output and observational datasets, persists each chunk's
//! histogram as a self-describing NetCDF snapshot, and merges snapshots
//! across time chunks into one statistically equivalent combined
//! histogram. Frequency and probability-density curves are derived on
//! demand for the downstream plotting step; plot rendering itself lives
//! outside this crate.
//!
//! Typical flow: an external data-access layer yields [`chunk::PrecipChunk`]s
//! through a [`chunk::ChunkSource`]; [`pipeline::accumulate_chunks`] bins
//! and persists them in parallel; [`pipeline::merge_dir`] later recombines
//! everything written, however many runs it took to get there.

pub mod accumulate;
pub mod bins;
pub mod chunk;
pub mod config;
pub mod logging;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod stats;
pub mod store;

pub use bins::BinScheme;
pub use config::HistConfig;
pub use model::{GridDomain, HistError, Histogram, Provenance, Result, TimeBand};
pub use stats::{StatKind, StatWarning, derive_statistics};
