//! Coefficient table loader for EXIOBASE-style CSV exports.
//!
//! Expected layout (hybrid tables, one coefficient matrix per file):
//!
//! ```text
//! region,sector,unit,…,ES,ES,FR              <- header level 0
//! ,,,…,Wheat,Steel,Cars                      <- header level 1
//! …                                          <- skip_rows_after_header rows
//! ES,Wheat,t,…,0.1,0,0.05                    <- 2 label cells, then values
//! ```
//!
//! The first `leading_data_columns` value columns carry metadata and are
//! dropped. The remaining columns must line up one-to-one with the data
//! rows: the matrix is self-indexed, so column labels are replaced by the
//! row labels once their counts agree. Empty, zero and NaN cells are not
//! stored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use lio_core::{
    DiagnosticIssue, Diagnostics, LabelAxis, LabelOrder, LioError, SectorLabel, Severity,
    SparseLabeledMatrix,
};
use serde::Serialize;
use tracing::{info, warn};
use web_time::Instant;

/// Label cells at the start of every data row.
const LABEL_COLUMNS: usize = 2;

/// Layout of a coefficient CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub label_order: LabelOrder,
    pub skip_rows_after_header: usize,
    pub leading_data_columns: usize,
    pub delimiter: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            label_order: LabelOrder::RegionSector,
            skip_rows_after_header: 2,
            leading_data_columns: 3,
            delimiter: b',',
        }
    }
}

/// Counters collected while loading.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStats {
    pub rows: usize,
    pub stored: usize,
    pub zero_cells: usize,
    pub empty_cells: usize,
    pub nan_cells: usize,
    pub skipped_rows: usize,
}

/// A loaded coefficient matrix with everything noticed along the way.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub matrix: SparseLabeledMatrix,
    pub stats: LoadStats,
    pub diagnostics: Diagnostics,
}

/// Load a coefficient table from `path`; the matrix is named after the file
/// stem.
pub fn load_coefficients(path: &Path, options: &LoaderOptions) -> Result<LoadResult> {
    let file = File::open(path)
        .with_context(|| format!("opening coefficient table {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "coefficients".to_string());
    read_coefficients(file, &name, options)
        .with_context(|| format!("loading coefficient table {}", path.display()))
}

/// Parse a coefficient table from any reader.
pub fn read_coefficients<R: Read>(
    reader: R,
    name: &str,
    options: &LoaderOptions,
) -> Result<LoadResult> {
    let started = Instant::now();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);
    let mut records = rdr.records();

    let level0 = records
        .next()
        .context("missing first header row")?
        .context("reading first header row")?;
    let level1 = records
        .next()
        .context("missing second header row")?
        .context("reading second header row")?;
    if level0.len() != level1.len() {
        return Err(LioError::LabelAlignment {
            matrix: name.to_string(),
            detail: format!(
                "header rows have {} and {} cells",
                level0.len(),
                level1.len()
            ),
        }
        .into());
    }

    let first_value = LABEL_COLUMNS + options.leading_data_columns;
    let header_labels: Vec<SectorLabel> = (first_value..level0.len())
        .map(|c| options.label_order.label(&level0[c], &level1[c]))
        .collect();

    for _ in 0..options.skip_rows_after_header {
        records.next().transpose().context("reading rows after header")?;
    }

    let mut diagnostics = Diagnostics::new();
    let mut stats = LoadStats::default();
    let mut row_labels = Vec::new();
    let mut triplets = Vec::new();

    for result in records {
        let record = result.context("reading data row")?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.iter().all(|cell| cell.trim().is_empty()) {
            stats.skipped_rows += 1;
            continue;
        }
        if record.len() != level0.len() {
            return Err(LioError::ShapeMismatch {
                matrix: name.to_string(),
                detail: format!(
                    "line {}: {} cells, header has {}",
                    line,
                    record.len(),
                    level0.len()
                ),
            }
            .into());
        }

        let label = options.label_order.label(&record[0], &record[1]);
        let i = row_labels.len();
        for (j, cell) in record.iter().skip(first_value).enumerate() {
            let cell = cell.trim();
            if cell.is_empty() {
                stats.empty_cells += 1;
                continue;
            }
            let value: f64 = cell.parse().map_err(|_| {
                LioError::Parse(format!(
                    "line {}: '{}' in column {} of {} is not a number",
                    line,
                    cell,
                    first_value + j,
                    label
                ))
            })?;
            if value.is_nan() {
                stats.nan_cells += 1;
                continue;
            }
            if value == 0.0 {
                stats.zero_cells += 1;
                continue;
            }
            if value.is_infinite() {
                diagnostics.add(
                    DiagnosticIssue::new(
                        Severity::Error,
                        "parse",
                        format!("infinite coefficient in column {}", first_value + j),
                    )
                    .with_entity(label.to_string())
                    .with_line(line),
                );
            }
            triplets.push((i, j, value));
        }
        row_labels.push(label);
    }

    let rows = LabelAxis::new(row_labels).map_err(|e| e.in_matrix(name))?;
    if header_labels.len() != rows.len() {
        return Err(LioError::LabelAlignment {
            matrix: name.to_string(),
            detail: format!(
                "{} column labels for {} row labels; the table must be square",
                header_labels.len(),
                rows.len()
            ),
        }
        .into());
    }

    let mismatched = header_labels
        .iter()
        .zip(rows.iter())
        .filter(|(header, row)| header != row)
        .count();
    if mismatched > 0 {
        diagnostics.add_warning(
            "alignment",
            &format!("{mismatched} column header label(s) differ from row labels; row labels used for columns"),
        );
    }
    if stats.nan_cells > 0 {
        warn!(matrix = name, cells = stats.nan_cells, "NaN cells treated as absent");
    }

    stats.rows = rows.len();
    stats.stored = triplets.len();
    let matrix = SparseLabeledMatrix::from_triplets(name, rows.clone(), rows, triplets)?;

    info!(
        matrix = name,
        sectors = stats.rows,
        nnz = matrix.nnz(),
        density = matrix.density(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded coefficient table"
    );
    Ok(LoadResult {
        matrix,
        stats,
        diagnostics,
    })
}
