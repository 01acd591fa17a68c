//! Pipeline configuration.
//!
//! All knobs live in one explicit object passed into the pipeline — output
//! directories, the bin scheme, the variable under analysis, and the
//! spatial domain. Nothing here is ambient global state, so the
//! accumulator and merger stay pure and independently testable. The PDF
//! directory is only carried for the external plotting collaborator; the
//! engine itself never writes there.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bins::BinScheme;
use crate::model::{GridDomain, HistError, Provenance, Result, VAR_PRECIP_RATE};

// ---------------------------------------------------------------------------
// HistConfig
// ---------------------------------------------------------------------------

/// Configuration for one histogram analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistConfig {
    /// Directory receiving histogram snapshot files.
    pub netcdf_dir: PathBuf,
    /// Directory the downstream plotting step writes PDFs into.
    pub pdf_dir: PathBuf,
    /// Precipitation variable to bin.
    pub variable: String,
    /// Model or observation identifier for chunks processed with this
    /// configuration.
    pub source_id: String,
    /// Spatial domain of the analysis.
    pub domain: GridDomain,
    /// Bin scheme shared by every chunk in the run.
    pub bins: BinScheme,
}

impl Default for HistConfig {
    fn default() -> Self {
        HistConfig {
            netcdf_dir: PathBuf::from("./output/netcdf"),
            pdf_dir: PathBuf::from("./output/pdf"),
            variable: VAR_PRECIP_RATE.to_string(),
            source_id: "era5".to_string(),
            domain: GridDomain::tropics(),
            // mm/day is the working unit for tropical rainfall statistics;
            // 100 unit-width bins cover drizzle through extreme events.
            bins: BinScheme::Linear {
                min: 0.0,
                max: 100.0,
                bins: 100,
            },
        }
    }
}

impl HistConfig {
    /// Loads and validates a configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: HistConfig = toml::from_str(&text)
            .map_err(|e| HistError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates that the configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.variable.is_empty() {
            return Err(HistError::Config("variable must not be empty".to_string()));
        }
        if self.source_id.is_empty() {
            return Err(HistError::Config("source_id must not be empty".to_string()));
        }
        self.domain.validate()?;
        // Materializing the edges catches every bin-scheme problem.
        self.bins.edges()?;
        Ok(())
    }

    /// The provenance stamped onto chunks processed under this
    /// configuration.
    pub fn provenance(&self) -> Provenance {
        Provenance {
            variable: self.variable.clone(),
            source_id: self.source_id.clone(),
            domain: self.domain.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        HistConfig::default()
            .validate()
            .expect("defaults must always validate");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HistConfig::default();
        let text = toml::to_string(&config).expect("config serializes");
        let parsed: HistConfig = toml::from_str(&text).expect("config parses back");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let parsed: HistConfig = toml::from_str(
            r#"
            source_id = "icon-sapphire"

            [bins]
            kind = "linear"
            min = 0.0
            max = 50.0
            bins = 25
            "#,
        )
        .expect("partial config parses");
        assert_eq!(parsed.source_id, "icon-sapphire");
        assert_eq!(parsed.variable, VAR_PRECIP_RATE, "unset fields take defaults");
        assert_eq!(
            parsed.bins,
            BinScheme::Linear {
                min: 0.0,
                max: 50.0,
                bins: 25
            }
        );
    }

    #[test]
    fn test_explicit_edges_parse_from_toml() {
        let parsed: HistConfig = toml::from_str(
            r#"
            [bins]
            kind = "explicit"
            edges = [0.0, 0.1, 1.0, 10.0, 100.0]
            "#,
        )
        .expect("explicit-edge config parses");
        assert_eq!(parsed.bins.bin_count(), 4);
        parsed.validate().expect("log-spaced edges are valid");
    }

    #[test]
    fn test_validate_rejects_empty_variable() {
        let mut config = HistConfig::default();
        config.variable = String::new();
        assert!(matches!(config.validate(), Err(HistError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_bin_scheme() {
        let mut config = HistConfig::default();
        config.bins = BinScheme::Linear {
            min: 10.0,
            max: 0.0,
            bins: 5,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file_reports_missing_file_as_io() {
        let result = HistConfig::from_toml_file(Path::new("/nonexistent/rainhist.toml"));
        assert!(matches!(result, Err(HistError::Io(_))));
    }
}
