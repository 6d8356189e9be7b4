//! `lio solve`: unit-demand decomposition for one region.

use std::path::Path;

use anyhow::{Context, Result};
use lio_algo::{decompose_region, AnalysisConfig};
use lio_cli::CoefficientsInput;
use lio_io::save_sparse;
use tracing::info;

use super::util::load_coefficient_matrix;

/// Flag overrides for the `[solver]` and `[analysis]` sections.
#[derive(Debug, Default)]
pub struct SolveOverrides {
    pub region: Option<String>,
    pub threads: Option<usize>,
    pub chunk_size: Option<usize>,
    pub condition_threshold: Option<f64>,
    pub deadline_secs: Option<u64>,
}

impl SolveOverrides {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(region) = &self.region {
            config.analysis.region = region.clone();
        }
        if let Some(threads) = self.threads {
            config.solver.threads = threads;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.solver.chunk_size = chunk_size;
        }
        if let Some(threshold) = self.condition_threshold {
            config.solver.condition_threshold = threshold;
        }
        if self.deadline_secs.is_some() {
            config.solver.deadline_secs = self.deadline_secs;
        }
    }
}

pub fn handle(
    mut config: AnalysisConfig,
    input: &CoefficientsInput,
    overrides: &SolveOverrides,
    out: &Path,
) -> Result<()> {
    overrides.apply(&mut config);
    let region = config.analysis.region.clone();

    let coefficients = load_coefficient_matrix(input, &config)?.to_dense();
    let cancel = config.solver.cancel_token();
    let results = decompose_region(&coefficients, &region, config.solver_config(), &cancel)
        .with_context(|| format!("decomposing region {region}"))?;

    save_sparse(out, &results)?;
    let (nrows, ncols) = results.shape();
    println!(
        "Solved {} demand column(s) for region {} over {} sectors",
        ncols, region, nrows
    );
    println!("  Stored entries: {}", results.nnz());
    println!("  Density       : {:.4}", results.density());
    println!("  Output        : {}", out.display());
    info!("Results written to {}", out.display());
    Ok(())
}
