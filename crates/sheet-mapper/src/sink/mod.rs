//! Sink capability and adapters.
//!
//! A [`Sink`] receives what the mapper produces: column widths, the header
//! row and one value row per record. Rows and columns are 0-based; adapters
//! translate them into their own addressing. [`coordinates_to_cell_name`]
//! and friends cover the usual `A1` style.
//!
//! Adapters:
//!
//! - [`MemorySink`]: in-memory sheets
//! - [`CsvSink`]: CSV text through the `csv` crate
//! - `XlsxSink` (feature `xlsx`): an `.xlsx` workbook through `rust_xlsxwriter`

mod csv;
mod memory;
#[cfg(feature = "xlsx")]
mod xlsx;

pub use self::csv::{CsvSink, CsvSinkError};
pub use self::memory::{MemorySheet, MemorySink};
#[cfg(feature = "xlsx")]
pub use self::xlsx::{XlsxSink, XlsxSinkError};

use thiserror::Error;

use crate::value::CellValue;

/// Maximum number of rows in a worksheet.
pub const MAX_ROWS: usize = 1_048_576;

/// Maximum number of columns in a worksheet.
pub const MAX_COLUMNS: usize = 16_384;

/// Destination for materialized rows.
pub trait Sink {
    /// Error reported by the destination.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write the header row (row 0).
    fn set_header_row(&mut self, sheet: &str, values: &[String]) -> Result<(), Self::Error>;

    /// Write a value row at 0-based `row`.
    fn set_row(&mut self, sheet: &str, row: usize, values: &[CellValue]) -> Result<(), Self::Error>;

    /// Set the width of 0-based `column`.
    fn set_column_width(&mut self, sheet: &str, column: usize, width: f64)
        -> Result<(), Self::Error>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    type Error = S::Error;

    fn set_header_row(&mut self, sheet: &str, values: &[String]) -> Result<(), Self::Error> {
        (**self).set_header_row(sheet, values)
    }

    fn set_row(&mut self, sheet: &str, row: usize, values: &[CellValue]) -> Result<(), Self::Error> {
        (**self).set_row(sheet, row, values)
    }

    fn set_column_width(
        &mut self,
        sheet: &str,
        column: usize,
        width: f64,
    ) -> Result<(), Self::Error> {
        (**self).set_column_width(sheet, column, width)
    }
}

/// Errors translating between numeric and `A1` style coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("column number {0} is outside 1..={max}", max = MAX_COLUMNS)]
    ColumnOutOfRange(usize),

    #[error("row number {0} is outside 1..={max}", max = MAX_ROWS)]
    RowOutOfRange(usize),

    #[error("invalid cell name {0:?}")]
    InvalidCellName(String),
}

/// Column letters for a 1-based column number: `1 -> A`, `27 -> AA`.
pub fn column_number_to_name(column: usize) -> Result<String, CoordinateError> {
    if column == 0 || column > MAX_COLUMNS {
        return Err(CoordinateError::ColumnOutOfRange(column));
    }
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    Ok(letters.into_iter().map(char::from).collect())
}

/// Cell name for 1-based coordinates: `(1, 1) -> A1`.
pub fn coordinates_to_cell_name(column: usize, row: usize) -> Result<String, CoordinateError> {
    if row == 0 || row > MAX_ROWS {
        return Err(CoordinateError::RowOutOfRange(row));
    }
    Ok(format!("{}{}", column_number_to_name(column)?, row))
}

/// 1-based `(column, row)` for a cell name such as `B12`. Case-insensitive.
pub fn cell_name_to_coordinates(name: &str) -> Result<(usize, usize), CoordinateError> {
    let invalid = || CoordinateError::InvalidCellName(name.to_string());

    let split = name
        .find(|c: char| !c.is_ascii_alphabetic())
        .ok_or_else(invalid)?;
    let (letters, digits) = name.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut column = 0usize;
    for b in letters.bytes() {
        let d = (b.to_ascii_uppercase() - b'A') as usize + 1;
        column = column
            .checked_mul(26)
            .and_then(|c| c.checked_add(d))
            .ok_or_else(invalid)?;
        if column > MAX_COLUMNS {
            return Err(CoordinateError::ColumnOutOfRange(column));
        }
    }

    let row: usize = digits.parse().map_err(|_| invalid())?;
    if row == 0 || row > MAX_ROWS {
        return Err(CoordinateError::RowOutOfRange(row));
    }
    Ok((column, row))
}
