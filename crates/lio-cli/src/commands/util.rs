use std::path::Path;

use anyhow::{bail, Context, Result};
use lio_algo::{AnalysisConfig, DatasetConfig};
use lio_cli::CoefficientsInput;
use lio_core::SparseLabeledMatrix;
use lio_io::{load_coefficients, load_sparse, LoaderOptions};
use tracing::{info, warn};

/// Configuration from `--config`, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

pub fn loader_options(dataset: &DatasetConfig) -> LoaderOptions {
    LoaderOptions {
        label_order: dataset.label_order,
        skip_rows_after_header: dataset.skip_rows_after_header,
        leading_data_columns: dataset.leading_data_columns,
        ..LoaderOptions::default()
    }
}

/// Coefficient matrix in stored form, from a stored file, an explicit CSV
/// table, or the configured dataset.
pub fn load_coefficient_matrix(
    input: &CoefficientsInput,
    config: &AnalysisConfig,
) -> Result<SparseLabeledMatrix> {
    if let Some(stored) = &input.stored {
        info!("Loading stored coefficients from {}", stored.display());
        return load_sparse(stored);
    }

    let table = input
        .table
        .clone()
        .unwrap_or_else(|| config.dataset.coefficients_path());
    info!("Loading coefficient table {}", table.display());
    let loaded = load_coefficients(&table, &loader_options(&config.dataset))?;
    if loaded.diagnostics.has_issues() {
        warn!("{}", loaded.diagnostics.summary());
        for issue in &loaded.diagnostics.issues {
            warn!("  {}", issue);
        }
    }
    if loaded.diagnostics.has_errors() {
        let errors: Vec<String> = loaded.diagnostics.errors().map(|e| e.to_string()).collect();
        bail!(
            "coefficient table {} has {}: {}",
            table.display(),
            loaded.diagnostics.summary(),
            errors.join("; ")
        );
    }
    Ok(loaded.matrix)
}
