//! Filter/projection of labeled matrices.
//!
//! Removes classified sectors from whichever axes they appear on and
//! re-checks the result for columns that lost every contributor.

use lio_core::{Diagnostics, LabeledMatrix, LioError, LioResult, SectorIndexSet, SectorLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// What to do when filtering leaves a column entirely zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroColumnPolicy {
    /// Record the columns in the projection report only.
    Report,
    /// Record and log a warning.
    #[default]
    Warn,
    /// Fail with [`LioError::DegenerateColumns`].
    Fail,
}

impl ZeroColumnPolicy {
    pub fn available() -> &'static [&'static str] {
        &["report", "warn", "fail"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZeroColumnPolicy::Report => "report",
            ZeroColumnPolicy::Warn => "warn",
            ZeroColumnPolicy::Fail => "fail",
        }
    }
}

impl FromStr for ZeroColumnPolicy {
    type Err = LioError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "report" => Ok(ZeroColumnPolicy::Report),
            "warn" | "default" => Ok(ZeroColumnPolicy::Warn),
            "fail" => Ok(ZeroColumnPolicy::Fail),
            other => Err(LioError::Config(format!(
                "unknown zero-column policy '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            ))),
        }
    }
}

impl fmt::Display for ZeroColumnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`remove_sectors`]: the filtered matrix plus the zero-column
/// report.
#[derive(Debug, Clone)]
pub struct Projection {
    pub matrix: LabeledMatrix,
    /// Every column of the filtered matrix that is entirely zero.
    pub zero_columns: Vec<SectorLabel>,
    /// Subset of `zero_columns` that had a non-zero entry before filtering.
    pub newly_zero: Vec<SectorLabel>,
    pub removed_rows: usize,
    pub removed_cols: usize,
    pub diagnostics: Diagnostics,
}

impl Projection {
    pub fn has_zero_columns(&self) -> bool {
        !self.zero_columns.is_empty()
    }
}

/// Drop every label in `remove` from both axes of `matrix`.
///
/// Labels absent from an axis are ignored, so applying the same set twice
/// changes nothing the second time. Rows and columns are removed
/// independently. `policy` decides whether columns emptied by the removal
/// are only reported, logged, or rejected.
pub fn remove_sectors(
    matrix: &LabeledMatrix,
    remove: &[&SectorIndexSet],
    policy: ZeroColumnPolicy,
) -> LioResult<Projection> {
    let combined = remove
        .iter()
        .fold(SectorIndexSet::new(), |acc, set| acc.union(set));

    let keep = |axis: &lio_core::LabelAxis| -> Vec<usize> {
        (0..axis.len())
            .filter(|&p| axis.get(p).is_some_and(|label| !combined.contains(label)))
            .collect()
    };
    let row_keep = keep(matrix.rows());
    let col_keep = keep(matrix.cols());
    let removed_rows = matrix.nrows() - row_keep.len();
    let removed_cols = matrix.ncols() - col_keep.len();

    let projected = matrix.select(&row_keep, &col_keep)?;

    let zero_columns: Vec<SectorLabel> = projected
        .zero_columns()
        .into_iter()
        .filter_map(|j| projected.cols().get(j).cloned())
        .collect();
    let newly_zero: Vec<SectorLabel> = projected
        .zero_columns()
        .into_iter()
        .filter(|&j| !matrix.column_is_zero(col_keep[j]))
        .filter_map(|j| projected.cols().get(j).cloned())
        .collect();

    let mut diagnostics = Diagnostics::new();
    for label in &zero_columns {
        let message = if newly_zero.contains(label) {
            "column has no remaining contributors after filtering"
        } else {
            "column was already zero before filtering"
        };
        diagnostics.add_warning_with_entity("zero-column", message, &label.to_string());
    }

    debug!(
        matrix = matrix.name(),
        removed_rows,
        removed_cols,
        zero_columns = zero_columns.len(),
        newly_zero = newly_zero.len(),
        "projected matrix"
    );

    match policy {
        ZeroColumnPolicy::Report => {}
        ZeroColumnPolicy::Warn => {
            if !newly_zero.is_empty() {
                warn!(
                    matrix = matrix.name(),
                    columns = newly_zero.len(),
                    "filtering left columns entirely zero"
                );
            }
        }
        ZeroColumnPolicy::Fail => {
            if !newly_zero.is_empty() {
                return Err(LioError::DegenerateColumns {
                    matrix: matrix.name().to_string(),
                    columns: newly_zero,
                });
            }
        }
    }

    Ok(Projection {
        matrix: projected,
        zero_columns,
        newly_zero,
        removed_rows,
        removed_cols,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lio_core::LabelAxis;

    fn label(sector: &str) -> SectorLabel {
        SectorLabel::new(sector, "ES")
    }

    fn matrix() -> LabeledMatrix {
        let labels = LabelAxis::new(vec![label("A"), label("B"), label("C")]).unwrap();
        // Column C is fed only by A
        LabeledMatrix::square(
            "m",
            &[
                vec![0.1, 0.2, 0.5],
                vec![0.3, 0.0, 0.0],
                vec![0.0, 0.4, 0.0],
            ],
            labels,
        )
        .unwrap()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("FAIL".parse::<ZeroColumnPolicy>().unwrap(), ZeroColumnPolicy::Fail);
        assert_eq!("default".parse::<ZeroColumnPolicy>().unwrap(), ZeroColumnPolicy::Warn);
        assert_eq!(ZeroColumnPolicy::Report.as_str(), "report");
        assert!("ignore".parse::<ZeroColumnPolicy>().is_err());
    }

    #[test]
    fn test_remove_from_both_axes() {
        let set = SectorIndexSet::from_labels([label("B")]);
        let p = remove_sectors(&matrix(), &[&set], ZeroColumnPolicy::Report).unwrap();
        assert_eq!(p.matrix.shape(), (2, 2));
        assert_eq!(p.removed_rows, 1);
        assert_eq!(p.removed_cols, 1);
        assert_eq!(p.matrix.rows().labels(), &[label("A"), label("C")]);
        assert_eq!(p.matrix.get(0, 1), 0.5);
        assert!(!p.has_zero_columns());
    }

    #[test]
    fn test_filter_is_idempotent_and_ignores_missing() {
        let set = SectorIndexSet::from_labels([label("C"), SectorLabel::new("X", "FR")]);
        let once = remove_sectors(&matrix(), &[&set], ZeroColumnPolicy::Report).unwrap();
        let twice = remove_sectors(&once.matrix, &[&set], ZeroColumnPolicy::Report).unwrap();
        assert_eq!(twice.removed_rows, 0);
        assert_eq!(twice.removed_cols, 0);
        assert_eq!(once.matrix.shape(), twice.matrix.shape());
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(once.matrix.get(i, j), twice.matrix.get(i, j));
            }
        }
    }

    #[test]
    fn test_newly_zero_columns_reported() {
        let set = SectorIndexSet::from_labels([label("A")]);
        let p = remove_sectors(&matrix(), &[&set], ZeroColumnPolicy::Warn).unwrap();
        assert_eq!(p.zero_columns, vec![label("C")]);
        assert_eq!(p.newly_zero, vec![label("C")]);
        assert_eq!(p.diagnostics.issues_by_category("zero-column").count(), 1);
    }

    #[test]
    fn test_fail_policy_rejects_degenerate_columns() {
        let set = SectorIndexSet::from_labels([label("A")]);
        let err = remove_sectors(&matrix(), &[&set], ZeroColumnPolicy::Fail).unwrap_err();
        match err {
            LioError::DegenerateColumns { matrix, columns } => {
                assert_eq!(matrix, "m");
                assert_eq!(columns, vec![label("C")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_preexisting_zero_column_is_not_newly_zero() {
        let labels = LabelAxis::new(vec![label("A"), label("B")]).unwrap();
        let m = LabeledMatrix::square("z", &[vec![0.2, 0.0], vec![0.1, 0.0]], labels).unwrap();
        let p = remove_sectors(&m, &[], ZeroColumnPolicy::Fail).unwrap();
        assert_eq!(p.zero_columns, vec![label("B")]);
        assert!(p.newly_zero.is_empty());
    }

    #[test]
    fn test_union_of_sets() {
        let a = SectorIndexSet::from_labels([label("A")]);
        let b = SectorIndexSet::from_labels([label("B"), label("A")]);
        let p = remove_sectors(&matrix(), &[&a, &b], ZeroColumnPolicy::Report).unwrap();
        assert_eq!(p.matrix.rows().labels(), &[label("C")]);
    }
}
