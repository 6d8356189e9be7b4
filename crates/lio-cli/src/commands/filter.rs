//! `lio filter`: drop inactive and household sectors from solved results.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use lio_algo::{filter_results, AnalysisConfig, ZeroColumnPolicy};
use lio_cli::CoefficientsInput;
use lio_core::SectorLabel;
use lio_io::{load_sparse, save_sparse};
use serde::Serialize;
use tracing::info;

use super::util::load_coefficient_matrix;

/// Flag overrides for the `[analysis]` section.
#[derive(Debug, Default)]
pub struct FilterOverrides {
    pub zero_column_policy: Option<ZeroColumnPolicy>,
    pub household_marker: Option<String>,
    pub keep_households: bool,
    pub keep_inactive: bool,
}

impl FilterOverrides {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(policy) = self.zero_column_policy {
            config.analysis.zero_column_policy = policy;
        }
        if let Some(marker) = &self.household_marker {
            config.analysis.household_marker = marker.clone();
        }
        if self.keep_households {
            config.analysis.remove_households = false;
        }
        if self.keep_inactive {
            config.analysis.remove_inactive = false;
        }
    }
}

#[derive(Debug, Serialize)]
struct FilterReport<'a> {
    results: &'a str,
    removed_rows: usize,
    removed_cols: usize,
    zero_columns: &'a [SectorLabel],
    newly_zero: &'a [SectorLabel],
    diagnostics: &'a lio_core::Diagnostics,
}

pub fn handle(
    mut config: AnalysisConfig,
    input: &CoefficientsInput,
    results_path: &Path,
    overrides: &FilterOverrides,
    out: &Path,
    report: Option<&Path>,
) -> Result<()> {
    overrides.apply(&mut config);

    let coefficients = load_coefficient_matrix(input, &config)?.to_dense();
    let results = load_sparse(results_path)?.to_dense();
    let projection = filter_results(&coefficients, &results, &config.filter_options())
        .with_context(|| format!("filtering {}", results_path.display()))?;

    save_sparse(out, &projection.matrix.to_sparse())?;
    let (nrows, ncols) = projection.matrix.shape();
    println!(
        "Filtered {}: removed {} row(s) and {} column(s), {}x{} remain",
        results.name(),
        projection.removed_rows,
        projection.removed_cols,
        nrows,
        ncols
    );
    println!("  Zero columns  : {}", projection.zero_columns.len());
    println!("  Newly zero    : {}", projection.newly_zero.len());
    println!("  Output        : {}", out.display());

    if let Some(path) = report {
        let report = FilterReport {
            results: results.name(),
            removed_rows: projection.removed_rows,
            removed_cols: projection.removed_cols,
            zero_columns: &projection.zero_columns,
            newly_zero: &projection.newly_zero,
            diagnostics: &projection.diagnostics,
        };
        let file = File::create(path)
            .with_context(|| format!("creating report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .context("writing filter report")?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}
