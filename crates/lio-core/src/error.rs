//! Unified error type for the lio workspace
//!
//! Every failure the decomposition engine can raise is a variant of
//! [`LioError`]. Errors are raised at the point of detection and are never
//! retried: a singular `(I - A)` stays singular until the input changes.
//!
//! The only recoverable condition in the engine, a label that is missing
//! from an axis during filtering, is not an error at all and never reaches
//! this type.

use crate::labels::SectorLabel;
use thiserror::Error;

/// Unified error type for all lio operations.
#[derive(Error, Debug)]
pub enum LioError {
    /// Non-square coefficient matrix, or a label axis whose length does not
    /// match the matrix dimension it describes.
    #[error("shape mismatch in '{matrix}': {detail}")]
    ShapeMismatch { matrix: String, detail: String },

    /// A demand request references a position that does not exist.
    #[error(
        "position {position} is out of range for '{matrix}' ({len} sectors); requested positions: {requested:?}"
    )]
    IndexOutOfRange {
        matrix: String,
        position: usize,
        len: usize,
        requested: Vec<usize>,
    },

    /// `(I - A)` could not be factorized, or its condition estimate exceeds
    /// the configured threshold.
    #[error(
        "(I - A) is singular or ill-conditioned for '{matrix}' (condition estimate {condition:e}); requested positions: {positions:?}"
    )]
    SingularSystem {
        matrix: String,
        positions: Vec<usize>,
        condition: f64,
    },

    /// Row/column labels diverge where they must agree, contain duplicates,
    /// or non-finite values reached arithmetic.
    #[error("label alignment error in '{matrix}': {detail}")]
    LabelAlignment { matrix: String, detail: String },

    /// Filtering left columns without any contributor and the caller asked
    /// for that to be fatal.
    #[error("filtering '{matrix}' left {} column(s) entirely zero: {}", .columns.len(), format_labels(.columns))]
    DegenerateColumns {
        matrix: String,
        columns: Vec<SectorLabel>,
    },

    /// The caller's cancellation token fired before all column slices ran.
    #[error("solve for '{matrix}' cancelled after {completed} of {requested} column(s)")]
    Cancelled {
        matrix: String,
        completed: usize,
        requested: usize,
    },

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using LioError.
pub type LioResult<T> = Result<T, LioError>;

impl LioError {
    /// Attach the requested positions to an error raised before the request
    /// was known (e.g. during factorization).
    ///
    /// Singular systems carry them as `positions`; shape and alignment
    /// errors get them appended to `detail`. Other variants pass through.
    pub fn with_requested(self, requested: &[usize]) -> Self {
        match self {
            LioError::SingularSystem {
                matrix, condition, ..
            } => LioError::SingularSystem {
                matrix,
                positions: requested.to_vec(),
                condition,
            },
            LioError::ShapeMismatch { matrix, detail } if !requested.is_empty() => {
                LioError::ShapeMismatch {
                    matrix,
                    detail: format!("{detail}; requested positions {requested:?}"),
                }
            }
            LioError::LabelAlignment { matrix, detail } if !requested.is_empty() => {
                LioError::LabelAlignment {
                    matrix,
                    detail: format!("{detail}; requested positions {requested:?}"),
                }
            }
            other => other,
        }
    }

    /// Fill in the matrix name on errors raised by label-level helpers that
    /// do not know which matrix they belong to.
    pub fn in_matrix(self, name: &str) -> Self {
        match self {
            LioError::LabelAlignment { matrix, detail } if matrix.is_empty() => {
                LioError::LabelAlignment {
                    matrix: name.to_string(),
                    detail,
                }
            }
            LioError::IndexOutOfRange {
                matrix,
                position,
                len,
                requested,
            } if matrix.is_empty() => LioError::IndexOutOfRange {
                matrix: name.to_string(),
                position,
                len,
                requested,
            },
            other => other,
        }
    }

    /// True when the failure is attributable to the dataset rather than to
    /// the request.
    pub fn is_data_problem(&self) -> bool {
        matches!(
            self,
            LioError::SingularSystem { .. }
                | LioError::LabelAlignment { .. }
                | LioError::ShapeMismatch { .. }
                | LioError::DegenerateColumns { .. }
        )
    }
}

fn format_labels(labels: &[SectorLabel]) -> String {
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
