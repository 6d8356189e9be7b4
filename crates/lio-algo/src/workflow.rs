//! End-to-end decomposition workflows.
//!
//! ```text
//! coefficients (dense) ──decompose_region──▶ results (sparse)
//!          │                                     │ to_dense
//!          └──classify──▶ sets ──filter_results──┴──▶ Projection
//! ```

use crate::cancel::CancelToken;
use crate::classify::{household_sectors, inactive_sectors};
use crate::project::{remove_sectors, Projection, ZeroColumnPolicy};
use crate::solver::{compute_intermediate_demand, SolverConfig};
use lio_core::{
    DemandRequest, LabeledMatrix, LioError, LioResult, SectorIndexSet, SparseLabeledMatrix,
    DEFAULT_HOUSEHOLD_MARKER,
};
use tracing::info;

/// Which classified sectors [`filter_results`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub remove_inactive: bool,
    /// Remove sectors whose name contains this marker (`None` keeps them).
    pub household_marker: Option<String>,
    pub zero_column_policy: ZeroColumnPolicy,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            remove_inactive: true,
            household_marker: Some(DEFAULT_HOUSEHOLD_MARKER.to_string()),
            zero_column_policy: ZeroColumnPolicy::default(),
        }
    }
}

/// Intermediate demand triggered by a unit of final demand in every sector
/// of `region`.
///
/// Returns the n×k result in stored (sparse) form. A region with no sectors
/// on the coefficient axis is rejected rather than producing an empty result.
pub fn decompose_region(
    coefficients: &LabeledMatrix,
    region: &str,
    config: &SolverConfig,
    cancel: &CancelToken,
) -> LioResult<SparseLabeledMatrix> {
    let request = DemandRequest::for_region(coefficients.rows(), region);
    if request.is_empty() {
        return Err(LioError::LabelAlignment {
            matrix: coefficients.name().to_string(),
            detail: format!("no sectors for region '{region}'"),
        });
    }
    info!(
        matrix = coefficients.name(),
        region,
        sectors = request.len(),
        "decomposing region"
    );
    let dense = compute_intermediate_demand(coefficients, &request, config, cancel)?;
    let sparse = dense.to_sparse().with_name(format!("{}:{}", coefficients.name(), region));
    info!(
        matrix = coefficients.name(),
        region,
        nnz = sparse.nnz(),
        density = sparse.density(),
        "region decomposition complete"
    );
    Ok(sparse)
}

/// Sets that [`filter_results`] removes, classified on `coefficients`.
pub fn sectors_to_remove(coefficients: &LabeledMatrix, options: &FilterOptions) -> SectorIndexSet {
    let mut remove = SectorIndexSet::new();
    if options.remove_inactive {
        remove = remove.union(&inactive_sectors(coefficients));
    }
    if let Some(marker) = &options.household_marker {
        remove = remove.union(&household_sectors(coefficients, marker));
    }
    remove
}

/// Classify `coefficients` and strip the selected sectors from `results`.
///
/// Classification always runs on the coefficient matrix: a result column
/// set is a subset of its axis and cannot reveal inactivity by itself.
pub fn filter_results(
    coefficients: &LabeledMatrix,
    results: &LabeledMatrix,
    options: &FilterOptions,
) -> LioResult<Projection> {
    let remove = sectors_to_remove(coefficients, options);
    let projection = remove_sectors(results, &[&remove], options.zero_column_policy)?;
    info!(
        matrix = results.name(),
        classified = remove.len(),
        removed_rows = projection.removed_rows,
        removed_cols = projection.removed_cols,
        zero_columns = projection.zero_columns.len(),
        "filtered results"
    );
    Ok(projection)
}
