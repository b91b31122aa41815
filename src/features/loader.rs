use std::{path::PathBuf, time::Instant};

use super::table::EntityTable;
use crate::app::errors::{AppError, AppResult};

/// Something that can produce the entity table on demand.
pub trait FeatureStore: Send + Sync {
    fn load(&self) -> AppResult<EntityTable>;
}

/// Reads the feature table from a CSV file on every call.
///
/// Columns whose non-empty cells all parse as numbers become numeric
/// columns; everything else, and every column listed in `required`, is
/// kept as text.
#[derive(Debug, Clone)]
pub struct CsvFeatureStore {
    path: PathBuf,
    required: Vec<String>,
}

/// Cells are UTF-8 when they decode cleanly; anything else is treated as
/// Latin-1 (Windows-1252), which is what the TED exports are written in.
fn decode_cell(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => std::borrow::Cow::Borrowed(text),
        Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0,
    };
    text.trim().to_string()
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("nan")
}

impl CsvFeatureStore {
    pub fn new(path: impl Into<PathBuf>, required: Vec<String>) -> Self {
        Self {
            path: path.into(),
            required,
        }
    }

    fn read_cells(&self) -> AppResult<(Vec<String>, Vec<Vec<String>>)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|err| {
                AppError::Load(format!("couldnt open {}: {err}", self.path.display()))
            })?;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(decode_cell)
            .collect();

        let mut rows = vec![];
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.map_err(|err| {
                AppError::Load(format!("malformed row {}: {err}", idx + 1))
            })?;
            rows.push(
                record.iter().map(decode_cell).collect(),
            );
        }

        Ok((headers, rows))
    }
}

impl FeatureStore for CsvFeatureStore {
    fn load(&self) -> AppResult<EntityTable> {
        if !self.path.is_file() {
            return Err(AppError::Load(format!(
                "feature table {} does not exist",
                self.path.display()
            )));
        }

        let now = Instant::now();
        let (headers, cells) = self.read_cells()?;

        for column in &self.required {
            if !headers.contains(column) {
                return Err(AppError::Load(format!(
                    "required column {column:?} is missing from {}",
                    self.path.display()
                )));
            }
        }

        let is_numeric: Vec<bool> = (0..headers.len())
            .map(|col| {
                if self.required.contains(&headers[col]) {
                    return false;
                }
                let mut any = false;
                for row in &cells {
                    let cell = row[col].as_str();
                    if is_missing(cell) {
                        continue;
                    }
                    if cell.parse::<f64>().is_err() {
                        return false;
                    }
                    any = true;
                }
                any
            })
            .collect();

        let mut numeric_columns = vec![];
        let mut text_columns = vec![];
        for (header, numeric) in headers.iter().zip(&is_numeric) {
            if *numeric {
                numeric_columns.push(header.clone());
            } else {
                text_columns.push(header.clone());
            }
        }

        let rows = cells
            .into_iter()
            .map(|row| {
                let mut numeric = Vec::with_capacity(numeric_columns.len());
                let mut text = Vec::with_capacity(text_columns.len());
                for (cell, is_num) in row.into_iter().zip(&is_numeric) {
                    if *is_num {
                        numeric.push(if is_missing(&cell) {
                            f64::NAN
                        } else {
                            cell.parse::<f64>().unwrap_or(f64::NAN)
                        });
                    } else {
                        text.push(cell);
                    }
                }
                (numeric, text)
            })
            .collect();

        let table = EntityTable::new(numeric_columns, text_columns, rows)?;

        log::debug!(
            "took {}ms to read {} rows from {}",
            now.elapsed().as_micros() as f64 / 1000.0,
            table.len(),
            self.path.display()
        );

        Ok(table)
    }
}
