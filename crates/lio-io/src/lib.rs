//! # lio-io: Input-Output Table Loading & Persistence
//!
//! - [`loader`]: EXIOBASE-style coefficient CSV into a stored sparse matrix,
//!   with counters and [`lio_core::Diagnostics`] for anything unusual
//! - [`persist`]: triplet CSV + JSON sidecar storage that round-trips
//!   bit-for-bit
//!
//! Functions return [`anyhow::Result`]. Data-integrity failures are
//! [`lio_core::LioError`] values underneath and can be recovered with
//! `downcast_ref`.
//!
//! ```rust,no_run
//! use lio_io::{load_coefficients, save_sparse, LoaderOptions};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let loaded = load_coefficients(Path::new("hiot.csv"), &LoaderOptions::default())?;
//!     println!("{}", loaded.diagnostics.summary());
//!     save_sparse(Path::new("A.csv"), &loaded.matrix)?;
//!     Ok(())
//! }
//! ```

pub mod loader;
pub mod persist;

pub use loader::{load_coefficients, read_coefficients, LoadResult, LoadStats, LoaderOptions};
pub use persist::{load_metadata, load_sparse, save_sparse, sidecar_path, SparseMetadata};
