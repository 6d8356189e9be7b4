//! # lio-core: Labeled Matrices for Input-Output Analysis
//!
//! Shared data structures for Leontief input-output demand decomposition.
//!
//! Multi-regional input-output tables index every row and column by a
//! product sector in a region. This crate keeps those labels aligned with
//! the numbers through every transformation:
//!
//! - [`SectorLabel`] / [`LabelAxis`] - `(sector, region)` keys and ordered,
//!   duplicate-free axes with O(1) lookup
//! - [`LabeledMatrix`] - logical dense matrix (`faer`), safe for arithmetic
//! - [`SparseLabeledMatrix`] - stored CSR form (`sprs`) omitting zeros
//! - [`SectorIndexSet`] - label sets produced by classification
//! - [`DemandRequest`] - positions that receive a unit final-demand impulse
//! - [`LioError`] - unified error taxonomy
//! - [`diagnostics`] - non-fatal issues collected while loading or filtering
//!
//! ## Quick Start
//!
//! ```rust
//! use lio_core::*;
//!
//! let labels = LabelAxis::new(vec![
//!     SectorLabel::new("Wheat", "ES"),
//!     SectorLabel::new("Steel", "FR"),
//! ])?;
//! let a = LabeledMatrix::square("toy", &[vec![0.0, 0.5], vec![0.2, 0.0]], labels)?;
//!
//! let sparse = a.to_sparse();
//! assert_eq!(sparse.nnz(), 2);
//!
//! let request = DemandRequest::for_region(a.rows(), "ES");
//! assert_eq!(request.positions(), &[0]);
//! # Ok::<(), LioError>(())
//! ```

pub mod diagnostics;
pub mod error;
pub mod labels;
pub mod matrix;
pub mod sets;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{LioError, LioResult};
pub use labels::{LabelAxis, LabelOrder, SectorLabel};
pub use matrix::{LabeledMatrix, SparseLabeledMatrix};
pub use sets::{DemandRequest, SectorIndexSet};

/// Marker identifying household final-consumption sectors in EXIOBASE.
pub const DEFAULT_HOUSEHOLD_MARKER: &str = "Private households";
