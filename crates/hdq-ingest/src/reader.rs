//! CSV file reading.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use polars::prelude::{CsvReadOptions, DataFrame, NullValues, SerReader};
use tracing::info;

use crate::error::{IngestError, Result};

/// Rows inspected for type inference. Zero reads every column as String;
/// numeric parsing happens per value during coercion.
pub const INFER_SCHEMA_ROWS: usize = 0;

/// Cell tokens read as null, matching the pandas `read_csv` defaults.
pub const NA_VALUES: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Rejects UTF-16 input. A UTF-8 BOM is fine.
fn validate_encoding(path: &Path) -> Result<()> {
    let mut file = open(path)?;
    let mut buffer = [0u8; 2];
    let bytes_read = file.read(&mut buffer).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    if bytes_read == 2 {
        if buffer == [0xFF, 0xFE] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 LE",
            });
        }
        if buffer == [0xFE, 0xFF] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 BE",
            });
        }
    }
    Ok(())
}

/// Fails with [`IngestError::EmptyCsv`] when the file has no non-blank line.
fn ensure_not_empty(path: &Path) -> Result<()> {
    let reader = BufReader::new(open(path)?);
    for line in reader.lines() {
        let line = line.map_err(|e| IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let content = line.strip_prefix('\u{feff}').unwrap_or(&line);
        if !content.trim().is_empty() {
            return Ok(());
        }
    }
    Err(IngestError::EmptyCsv {
        path: path.to_path_buf(),
    })
}

/// Reads a CSV file with a single header row into a Polars DataFrame.
///
/// Every column is read as String, so a malformed value never fails the read.
/// Empty cells and the [`NA_VALUES`] tokens become null. A file holding only a
/// header yields a zero-row table.
///
/// # Errors
///
/// - [`IngestError::FileNotFound`] when the path does not exist
/// - [`IngestError::EmptyCsv`] when the file has no content
/// - [`IngestError::UnsupportedEncoding`] for UTF-16 input
/// - [`IngestError::CsvParse`] when Polars cannot parse the file
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    validate_encoding(path)?;
    ensure_not_empty(path)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .map_parse_options(|options| {
            options.with_null_values(Some(NullValues::AllColumns(
                NA_VALUES.iter().map(|token| (*token).into()).collect(),
            )))
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read source table"
    );
    Ok(df)
}
