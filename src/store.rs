//! NetCDF persistence for histogram snapshots.
//!
//! Each histogram is written as one self-describing NetCDF file: the bin
//! edges and counts as variables, everything else (variable name, source,
//! domain bounds, time band, excluded tally) as global attributes. The
//! filename is derived from the histogram's provenance and time band by
//! this module — callers only choose the directory — so two chunks with
//! different time bands can never collide, and concurrent writers need no
//! locking as long as their chunks are distinct.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use netcdf::AttributeValue;
use tracing::info;

use crate::bins;
use crate::model::{GridDomain, HistError, Histogram, Provenance, Result, TimeBand};

/// Timestamp layout used in snapshot filenames, e.g. `20200101T000000Z`.
const FILENAME_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// The snapshot filename for a histogram:
/// `{variable}_{source}_{domain}_{start}_{end}.nc`.
pub fn snapshot_filename(histogram: &Histogram) -> String {
    format!(
        "{}_{}_{}_{}_{}.nc",
        sanitize(&histogram.provenance.variable),
        sanitize(&histogram.provenance.source_id),
        sanitize(&histogram.provenance.domain.name),
        histogram.band.start.format(FILENAME_TIME_FORMAT),
        histogram.band.end.format(FILENAME_TIME_FORMAT),
    )
}

/// Keeps filenames portable: anything outside `[A-Za-z0-9_.-]` becomes `-`.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Lists the `.nc` snapshot files in a directory, sorted by path.
pub fn list_snapshots(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "nc") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

// ---------------------------------------------------------------------------
// persist
// ---------------------------------------------------------------------------

/// Writes a histogram snapshot into `dir`, returning the written path.
///
/// If a file for the same variable/source/domain/band already exists it is
/// only rewritten when its bin edges match the new histogram's (a plain
/// re-run) or when `overwrite` is set; an existing file with a different
/// binning and `overwrite == false` fails with a `Schema` error so that a
/// changed bin scheme cannot silently mix with old snapshots.
pub fn persist(histogram: &Histogram, dir: &Path, overwrite: bool) -> Result<PathBuf> {
    histogram.validate()?;
    fs::create_dir_all(dir)?;
    let path = dir.join(snapshot_filename(histogram));

    if path.exists() {
        if !overwrite {
            match load(&path) {
                Ok(existing) => {
                    if !bins::edges_approx_eq(&existing.edges, &histogram.edges) {
                        return Err(HistError::Schema {
                            path,
                            details: format!(
                                "existing snapshot has {} bin edges, new histogram has {}; \
                                 pass overwrite to replace it",
                                existing.edges.len(),
                                histogram.edges.len()
                            ),
                        });
                    }
                }
                Err(e) => {
                    return Err(HistError::Schema {
                        path,
                        details: format!("existing snapshot is unreadable: {}", e),
                    });
                }
            }
        }
        fs::remove_file(&path)?;
    }

    write_snapshot(histogram, &path)?;
    info!(path = %path.display(), "wrote histogram snapshot");
    Ok(path)
}

fn write_snapshot(histogram: &Histogram, path: &Path) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("bin_edge", histogram.edges.len())?;
    file.add_dimension("bin", histogram.counts.len())?;

    let mut edges_var = file.add_variable::<f64>("bin_edges", &["bin_edge"])?;
    edges_var.put_values(&histogram.edges, ..)?;

    // Counts are stored signed so a loader can genuinely verify
    // non-negativity against hand-damaged or foreign files.
    let counts: Vec<i64> = histogram.counts.iter().map(|&c| c as i64).collect();
    let mut counts_var = file.add_variable::<i64>("counts", &["bin"])?;
    counts_var.put_values(&counts, ..)?;

    let p = &histogram.provenance;
    file.add_attribute("variable", p.variable.as_str())?;
    file.add_attribute("source_id", p.source_id.as_str())?;
    file.add_attribute("domain_name", p.domain.name.as_str())?;
    file.add_attribute("domain_lat_min", p.domain.lat_min)?;
    file.add_attribute("domain_lat_max", p.domain.lat_max)?;
    file.add_attribute("domain_lon_min", p.domain.lon_min)?;
    file.add_attribute("domain_lon_max", p.domain.lon_max)?;
    file.add_attribute("band_start", histogram.band.start.to_rfc3339())?;
    file.add_attribute("band_end", histogram.band.end.to_rfc3339())?;
    file.add_attribute("covered_secs", histogram.band.covered_secs)?;
    file.add_attribute("excluded", histogram.excluded as i64)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

/// Reads a previously persisted histogram snapshot.
///
/// Every structural invariant is re-checked: missing variables or
/// attributes, non-increasing edges, length mismatches, and negative
/// counts all surface as `CorruptData` rather than flowing downstream.
pub fn load(path: &Path) -> Result<Histogram> {
    if !path.exists() {
        return Err(HistError::NotFound(path.to_path_buf()));
    }
    let file = netcdf::open(path)?;

    let edges_var = file
        .variable("bin_edges")
        .ok_or_else(|| HistError::CorruptData("missing 'bin_edges' variable".to_string()))?;
    let edges = edges_var.get_values::<f64, _>(..)?;

    let counts_var = file
        .variable("counts")
        .ok_or_else(|| HistError::CorruptData("missing 'counts' variable".to_string()))?;
    let raw_counts = counts_var.get_values::<i64, _>(..)?;
    let mut counts = Vec::with_capacity(raw_counts.len());
    for c in raw_counts {
        if c < 0 {
            return Err(HistError::CorruptData(format!("negative bin count {}", c)));
        }
        counts.push(c as u64);
    }

    let excluded = i64_attr(&file, "excluded")?;
    if excluded < 0 {
        return Err(HistError::CorruptData(format!(
            "negative excluded count {}",
            excluded
        )));
    }

    let band = TimeBand::with_covered(
        time_attr(&file, "band_start")?,
        time_attr(&file, "band_end")?,
        i64_attr(&file, "covered_secs")?,
    )?;

    let provenance = Provenance {
        variable: str_attr(&file, "variable")?,
        source_id: str_attr(&file, "source_id")?,
        domain: GridDomain {
            name: str_attr(&file, "domain_name")?,
            lat_min: f64_attr(&file, "domain_lat_min")?,
            lat_max: f64_attr(&file, "domain_lat_max")?,
            lon_min: f64_attr(&file, "domain_lon_min")?,
            lon_max: f64_attr(&file, "domain_lon_max")?,
        },
    };

    let histogram = Histogram {
        edges,
        counts,
        excluded: excluded as u64,
        band,
        provenance,
    };
    histogram.validate()?;
    Ok(histogram)
}

// ---------------------------------------------------------------------------
// Attribute helpers
// ---------------------------------------------------------------------------

fn attr_value(file: &netcdf::File, name: &str) -> Result<AttributeValue> {
    let attr = file
        .attribute(name)
        .ok_or_else(|| HistError::CorruptData(format!("missing attribute '{}'", name)))?;
    Ok(attr.value()?)
}

fn str_attr(file: &netcdf::File, name: &str) -> Result<String> {
    match attr_value(file, name)? {
        AttributeValue::Str(s) => Ok(s),
        other => Err(HistError::CorruptData(format!(
            "attribute '{}' should be a string, found {:?}",
            name, other
        ))),
    }
}

fn f64_attr(file: &netcdf::File, name: &str) -> Result<f64> {
    match attr_value(file, name)? {
        AttributeValue::Double(d) => Ok(d),
        AttributeValue::Float(f) => Ok(f64::from(f)),
        other => Err(HistError::CorruptData(format!(
            "attribute '{}' should be a float, found {:?}",
            name, other
        ))),
    }
}

fn i64_attr(file: &netcdf::File, name: &str) -> Result<i64> {
    match attr_value(file, name)? {
        AttributeValue::Longlong(v) => Ok(v),
        AttributeValue::Int(v) => Ok(i64::from(v)),
        other => Err(HistError::CorruptData(format!(
            "attribute '{}' should be an integer, found {:?}",
            name, other
        ))),
    }
}

fn time_attr(file: &netcdf::File, name: &str) -> Result<DateTime<Utc>> {
    let text = str_attr(file, name)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            HistError::CorruptData(format!(
                "attribute '{}' is not an RFC 3339 timestamp ('{}'): {}",
                name, text, e
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
