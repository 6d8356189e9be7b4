//! # lio-algo: Leontief Demand Decomposition
//!
//! Algorithms that turn a technical coefficient matrix `A` into sector-level
//! intermediate demand and clean the result for downstream use.
//!
//! ## Demand Solver
//!
//! [`compute_intermediate_demand`] solves `(I - A) x_j = e_j` for every
//! requested sector `j`, sharing one LU factorization across all columns
//! (see [`solver`] for the conditioning check and column slicing).
//!
//! ## Classification and Filtering
//!
//! | Function | Selects |
//! |----------|---------|
//! | [`inactive_sectors`] | sectors with an all-zero row *and* column |
//! | [`household_sectors`] | sectors whose name contains a marker |
//! | [`region_sectors`] | sectors of one region |
//!
//! [`remove_sectors`] drops such sets from both axes and reports columns
//! left without contributors according to a [`ZeroColumnPolicy`].
//!
//! ## Workflows
//!
//! - [`decompose_region`]: unit demand for every sector of a region
//! - [`filter_results`]: classify on `A`, project the results
//!
//! ## Example
//!
//! ```rust
//! use lio_algo::{decompose_region, CancelToken, SolverConfig};
//! use lio_core::{LabelAxis, LabeledMatrix, SectorLabel};
//!
//! let labels = LabelAxis::new(vec![
//!     SectorLabel::new("Wheat", "ES"),
//!     SectorLabel::new("Steel", "FR"),
//! ])?;
//! let a = LabeledMatrix::square("toy", &[vec![0.0, 0.5], vec![0.2, 0.0]], labels)?;
//!
//! let x = decompose_region(&a, "ES", &SolverConfig::default(), &CancelToken::new())?;
//! assert_eq!(x.shape(), (2, 1));
//! assert!((x.get(0, 0) - 1.0 / 0.9).abs() < 1e-12);
//! # Ok::<(), lio_core::LioError>(())
//! ```

pub mod cancel;
pub mod classify;
pub mod config;
pub mod project;
pub mod solver;
pub mod workflow;

pub use cancel::CancelToken;
pub use classify::{
    default_household_sectors, household_sectors, inactive_sectors, region_sectors,
    zero_column_sectors, zero_row_sectors,
};
pub use config::{AnalysisConfig, AnalysisSection, DatasetConfig};
pub use project::{remove_sectors, Projection, ZeroColumnPolicy};
pub use solver::{compute_intermediate_demand, LeontiefFactorization, SolverConfig};
pub use workflow::{decompose_region, filter_results, sectors_to_remove, FilterOptions};
