//! Sector classification.
//!
//! Classifiers read a dense [`LabeledMatrix`] and return immutable
//! [`SectorIndexSet`]s that the projection step removes from results.

use lio_core::{LabeledMatrix, SectorIndexSet, DEFAULT_HOUSEHOLD_MARKER};
use tracing::debug;

/// Labels whose row is entirely zero.
pub fn zero_row_sectors(matrix: &LabeledMatrix) -> SectorIndexSet {
    SectorIndexSet::from_positions(matrix.rows(), &matrix.zero_rows())
}

/// Labels whose column is entirely zero.
pub fn zero_column_sectors(matrix: &LabeledMatrix) -> SectorIndexSet {
    SectorIndexSet::from_positions(matrix.cols(), &matrix.zero_columns())
}

/// Structurally inactive sectors: no inputs (zero column) *and* no outputs
/// (zero row).
///
/// The intersection is taken by label, so non-square matrices work with
/// whatever labels both axes share. A sector that only lacks inputs, or only
/// lacks outputs, is not inactive.
pub fn inactive_sectors(matrix: &LabeledMatrix) -> SectorIndexSet {
    let zero_cols = zero_column_sectors(matrix);
    let inactive: SectorIndexSet = zero_row_sectors(matrix)
        .iter()
        .filter(|label| zero_cols.contains(label))
        .cloned()
        .collect();
    debug!(
        matrix = matrix.name(),
        inactive = inactive.len(),
        "classified inactive sectors"
    );
    inactive
}

/// Row labels whose sector name contains `marker`.
pub fn household_sectors(matrix: &LabeledMatrix, marker: &str) -> SectorIndexSet {
    SectorIndexSet::from_labels(matrix.sectors_containing(marker))
}

/// [`household_sectors`] with the EXIOBASE marker.
pub fn default_household_sectors(matrix: &LabeledMatrix) -> SectorIndexSet {
    household_sectors(matrix, DEFAULT_HOUSEHOLD_MARKER)
}

/// Row labels belonging to `region`, in row order.
pub fn region_sectors(matrix: &LabeledMatrix, region: &str) -> SectorIndexSet {
    SectorIndexSet::from_positions(matrix.rows(), &matrix.region_positions(region))
}
