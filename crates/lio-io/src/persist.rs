//! Sparse matrix persistence.
//!
//! A [`SparseLabeledMatrix`] is stored as two files:
//!
//! - `<path>`: triplet CSV with header `row,col,value`, one line per stored
//!   entry (NaN sentinels included)
//! - `<path>.meta.json`: name, shape and both label axes
//!
//! Values are written in shortest round-trip form, so loading gives back the
//! same bits.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lio_core::{LabelAxis, LioError, SparseLabeledMatrix};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct TripletRecord {
    row: usize,
    col: usize,
    value: f64,
}

/// Sidecar metadata describing a stored matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseMetadata {
    pub name: String,
    pub nrows: usize,
    pub ncols: usize,
    pub nnz: usize,
    pub rows: LabelAxis,
    pub cols: LabelAxis,
}

/// Location of the metadata sidecar for a triplet file.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".meta.json");
    PathBuf::from(name)
}

/// Write `matrix` to `path` and its sidecar.
pub fn save_sparse(path: &Path, matrix: &SparseLabeledMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    for (row, col, value) in matrix.triplets() {
        wtr.serialize(TripletRecord { row, col, value })
            .context("writing triplet record")?;
    }
    wtr.flush().context("flushing CSV writer")?;

    let (nrows, ncols) = matrix.shape();
    let meta = SparseMetadata {
        name: matrix.name().to_string(),
        nrows,
        ncols,
        nnz: matrix.nnz(),
        rows: matrix.rows().clone(),
        cols: matrix.cols().clone(),
    };
    let meta_path = sidecar_path(path);
    let file = File::create(&meta_path)
        .with_context(|| format!("creating {}", meta_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &meta)
        .with_context(|| format!("writing {}", meta_path.display()))?;

    debug!(matrix = matrix.name(), nnz = meta.nnz, path = %path.display(), "saved sparse matrix");
    Ok(())
}

/// Read the sidecar of a stored matrix without loading its entries.
pub fn load_metadata(path: &Path) -> Result<SparseMetadata> {
    let meta_path = sidecar_path(path);
    let file = File::open(&meta_path)
        .with_context(|| format!("opening {}", meta_path.display()))?;
    let meta: SparseMetadata = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", meta_path.display()))?;
    if meta.rows.len() != meta.nrows || meta.cols.len() != meta.ncols {
        return Err(LioError::ShapeMismatch {
            matrix: meta.name.clone(),
            detail: format!(
                "sidecar declares {}x{} but carries {} row and {} column labels",
                meta.nrows,
                meta.ncols,
                meta.rows.len(),
                meta.cols.len()
            ),
        }
        .into());
    }
    Ok(meta)
}

/// Load a matrix written by [`save_sparse`].
pub fn load_sparse(path: &Path) -> Result<SparseLabeledMatrix> {
    let meta = load_metadata(path)?;
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut triplets = Vec::with_capacity(meta.nnz);
    for result in rdr.deserialize() {
        let record: TripletRecord = result.context("parsing triplet record")?;
        triplets.push((record.row, record.col, record.value));
    }
    let matrix = SparseLabeledMatrix::from_triplets(meta.name.clone(), meta.rows, meta.cols, triplets)
        .with_context(|| format!("rebuilding matrix from {}", path.display()))?;
    if matrix.nnz() != meta.nnz {
        return Err(LioError::ShapeMismatch {
            matrix: meta.name,
            detail: format!(
                "sidecar declares {} stored entries, file holds {}",
                meta.nnz,
                matrix.nnz()
            ),
        }
        .into());
    }
    Ok(matrix)
}
