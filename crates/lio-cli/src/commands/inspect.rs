//! `lio inspect`: structure of a coefficient matrix.

use anyhow::Result;
use lio_algo::{household_sectors, inactive_sectors, AnalysisConfig, LeontiefFactorization};
use lio_cli::{CoefficientsInput, OutputFormat};
use serde::Serialize;

use super::util::load_coefficient_matrix;

#[derive(Debug, Serialize)]
struct MatrixSummary {
    name: String,
    rows: usize,
    cols: usize,
    nnz: usize,
    density: f64,
    memory_bytes: usize,
    regions: usize,
    inactive: usize,
    households: usize,
    /// `None` when the matrix is not square or `(I - A)` cannot be factorized
    condition_estimate: Option<f64>,
}

pub fn handle(config: AnalysisConfig, input: &CoefficientsInput, format: OutputFormat) -> Result<()> {
    let stored = load_coefficient_matrix(input, &config)?;
    let dense = stored.to_dense();

    let mut regions: Vec<&str> = dense.rows().iter().map(|l| l.region.as_str()).collect();
    regions.sort_unstable();
    regions.dedup();

    let condition_estimate = LeontiefFactorization::factorize(&dense, config.solver_config())
        .ok()
        .map(|f| f.condition_estimate());

    let (rows, cols) = stored.shape();
    let summary = MatrixSummary {
        name: stored.name().to_string(),
        rows,
        cols,
        nnz: stored.nnz(),
        density: stored.density(),
        memory_bytes: stored.memory_bytes(),
        regions: regions.len(),
        inactive: inactive_sectors(&dense).len(),
        households: household_sectors(&dense, &config.analysis.household_marker).len(),
        condition_estimate,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            println!("Matrix {}:", summary.name);
            println!("  Shape         : {}x{}", summary.rows, summary.cols);
            println!("  Stored entries: {}", summary.nnz);
            println!("  Density       : {:.4}", summary.density);
            println!("  Memory        : {} bytes", summary.memory_bytes);
            println!("  Regions       : {}", summary.regions);
            println!("  Inactive      : {}", summary.inactive);
            println!("  Households    : {}", summary.households);
            match summary.condition_estimate {
                Some(c) => println!("  Condition est.: {:.3e}", c),
                None => println!("  Condition est.: n/a"),
            }
        }
    }
    Ok(())
}
