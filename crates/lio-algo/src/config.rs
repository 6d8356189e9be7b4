//! Analysis configuration.
//!
//! An [`AnalysisConfig`] is passed explicitly into every run; nothing is read
//! from process-wide state. It is stored as TOML and partial files are
//! accepted, with unspecified values falling back to defaults.
//!
//! ```toml
//! [dataset]
//! root = "data/exiobase"
//! coefficients = "MR_HIOT_2011_v3_3_18_by_product_technology.csv"
//!
//! [analysis]
//! region = "ES"
//! zero_column_policy = "warn"
//!
//! [solver]
//! threads = 8
//! ```

use std::path::{Path, PathBuf};

use lio_core::{LabelOrder, LioError, LioResult, DEFAULT_HOUSEHOLD_MARKER};
use serde::{Deserialize, Serialize};

use crate::project::ZeroColumnPolicy;
use crate::solver::SolverConfig;
use crate::workflow::FilterOptions;

/// Top-level configuration for a decomposition run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Where the coefficient table lives and how it is laid out.
    pub dataset: DatasetConfig,

    /// Region selection and filtering.
    pub analysis: AnalysisSection,

    /// Demand solver tuning.
    pub solver: SolverConfig,
}

/// Dataset location and CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding the extracted dataset.
    pub root: PathBuf,

    /// Coefficient table file name, relative to `root`.
    pub coefficients: String,

    /// Meaning of the two label levels.
    pub label_order: LabelOrder,

    /// Rows between the column headers and the first data row.
    pub skip_rows_after_header: usize,

    /// Leading data columns that are not part of the matrix.
    pub leading_data_columns: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            coefficients: "MR_HIOT_2011_v3_3_18_by_product_technology.csv".to_string(),
            label_order: LabelOrder::RegionSector,
            skip_rows_after_header: 2,
            leading_data_columns: 3,
        }
    }
}

impl DatasetConfig {
    pub fn coefficients_path(&self) -> PathBuf {
        self.root.join(&self.coefficients)
    }
}

/// Region selection and filtering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Region whose sectors receive unit final demand.
    pub region: String,

    /// Substring marking household sectors.
    pub household_marker: String,

    /// Drop sectors with neither inputs nor outputs.
    pub remove_inactive: bool,

    /// Drop household sectors.
    pub remove_households: bool,

    pub zero_column_policy: ZeroColumnPolicy,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            region: "ES".to_string(),
            household_marker: DEFAULT_HOUSEHOLD_MARKER.to_string(),
            remove_inactive: true,
            remove_households: true,
            zero_column_policy: ZeroColumnPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> LioResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| LioError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    /// Save configuration as pretty TOML.
    pub fn save_to(&self, path: &Path) -> LioResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> LioResult<String> {
        toml::to_string_pretty(self).map_err(|e| LioError::Config(e.to_string()))
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            remove_inactive: self.analysis.remove_inactive,
            household_marker: self
                .analysis
                .remove_households
                .then(|| self.analysis.household_marker.clone()),
            zero_column_policy: self.analysis.zero_column_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.analysis.region, "ES");
        assert_eq!(config.analysis.household_marker, "Private households");
        assert_eq!(config.solver.condition_threshold, 1e12);
        assert_eq!(config.dataset.skip_rows_after_header, 2);
        assert_eq!(config.dataset.leading_data_columns, 3);
        assert_eq!(config.dataset.label_order, LabelOrder::RegionSector);
        assert!(config
            .dataset
            .coefficients_path()
            .ends_with("MR_HIOT_2011_v3_3_18_by_product_technology.csv"));
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
            [analysis]
            region = "FR"
            zero_column_policy = "fail"

            [solver]
            threads = 2
            deadline_secs = 30
        "#;

        let config: AnalysisConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.analysis.region, "FR");
        assert_eq!(config.analysis.zero_column_policy, ZeroColumnPolicy::Fail);
        assert!(config.analysis.remove_households);
        assert_eq!(config.solver.threads, 2);
        assert_eq!(config.solver.deadline_secs, Some(30));
        assert_eq!(config.solver.chunk_size, 0);
        assert_eq!(config.dataset.leading_data_columns, 3);
    }

    #[test]
    fn test_label_order_parsing() {
        let config: AnalysisConfig = toml::from_str("[dataset]\nlabel_order = \"sector-region\"").unwrap();
        assert_eq!(config.dataset.label_order, LabelOrder::SectorRegion);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let mut config = AnalysisConfig::default();
        config.analysis.region = "DE".to_string();
        config.solver.chunk_size = 16;

        let file = NamedTempFile::new().unwrap();
        config.save_to(file.path()).unwrap();
        let loaded = AnalysisConfig::load_from(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[solver]\nthreads = \"many\"").unwrap();
        let err = AnalysisConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, LioError::Config(_)));
    }

    #[test]
    fn test_filter_options_follow_switches() {
        let mut config = AnalysisConfig::default();
        config.analysis.remove_households = false;
        let options = config.filter_options();
        assert!(options.remove_inactive);
        assert!(options.household_marker.is_none());
    }
}
