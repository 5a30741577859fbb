use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use super::{Sink, MAX_COLUMNS, MAX_ROWS};
use crate::value::CellValue;

const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Errors raised by [`XlsxSink`].
#[derive(Debug, Error)]
pub enum XlsxSinkError {
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("row index overflow: {0}")]
    RowOverflow(usize),

    #[error("column index overflow: {0}")]
    ColumnOverflow(usize),
}

/// Writes sheets into an in-memory `.xlsx` workbook.
///
/// Sheets are created on first use. Numbers, text and booleans are written
/// natively, timestamps as Excel serial dates with a date-time format, and
/// `Empty` cells are left untouched. Excel has no NaN or infinity, so such
/// floats are written as their text (`NaN`, `inf`).
pub struct XlsxSink {
    workbook: Workbook,
    sheets: HashSet<String>,
    datetime_format: Format,
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxSink {
    pub fn new() -> Self {
        XlsxSink {
            workbook: Workbook::new(),
            sheets: HashSet::new(),
            datetime_format: Format::new().set_num_format(DATETIME_NUM_FORMAT),
        }
    }

    /// Number format used for timestamp cells.
    pub fn with_datetime_format(mut self, num_format: &str) -> Self {
        self.datetime_format = Format::new().set_num_format(num_format);
        self
    }

    /// Names of the sheets created so far.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(String::as_str)
    }

    /// Write the workbook to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), XlsxSinkError> {
        self.workbook.save(path.as_ref())?;
        Ok(())
    }

    /// Serialize the workbook into memory.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, XlsxSinkError> {
        Ok(self.workbook.save_to_buffer()?)
    }

    /// Borrow the underlying workbook, e.g. to add sheets the mapper does not fill.
    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    fn worksheet(&mut self, name: &str) -> Result<&mut Worksheet, XlsxSinkError> {
        if !self.sheets.contains(name) {
            // the workbook only sees the sheet once its name is accepted
            let mut worksheet = Worksheet::new();
            worksheet.set_name(name)?;
            self.workbook.push_worksheet(worksheet);
            self.sheets.insert(name.to_string());
        }
        Ok(self.workbook.worksheet_from_name(name)?)
    }

    fn write_cells(
        &mut self,
        sheet: &str,
        row: usize,
        values: &[CellValue],
    ) -> Result<(), XlsxSinkError> {
        let row_num = cast_row_num(row)?;
        let datetime_format = self.datetime_format.clone();
        let worksheet = self.worksheet(sheet)?;
        for (col, value) in values.iter().enumerate() {
            let col_num = cast_col_num(col)?;
            match value {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row_num, col_num, s)?;
                }
                CellValue::Int(n) => {
                    worksheet.write_number(row_num, col_num, *n as f64)?;
                }
                CellValue::Float(n) if n.is_finite() => {
                    worksheet.write_number(row_num, col_num, *n)?;
                }
                CellValue::Float(n) => {
                    worksheet.write_string(row_num, col_num, n.to_string())?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row_num, col_num, *b)?;
                }
                CellValue::Timestamp(ts) => {
                    worksheet.write_number_with_format(
                        row_num,
                        col_num,
                        excel_serial(ts),
                        &datetime_format,
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Sink for XlsxSink {
    type Error = XlsxSinkError;

    fn set_header_row(&mut self, sheet: &str, values: &[String]) -> Result<(), Self::Error> {
        let row: Vec<CellValue> = values.iter().map(|v| CellValue::Text(v.clone())).collect();
        self.write_cells(sheet, 0, &row)
    }

    fn set_row(&mut self, sheet: &str, row: usize, values: &[CellValue]) -> Result<(), Self::Error> {
        self.write_cells(sheet, row, values)
    }

    fn set_column_width(
        &mut self,
        sheet: &str,
        column: usize,
        width: f64,
    ) -> Result<(), Self::Error> {
        let col_num = cast_col_num(column)?;
        self.worksheet(sheet)?.set_column_width(col_num, width)?;
        Ok(())
    }
}

/// Days since 1899-12-30, the Excel 1900 date system epoch.
fn excel_serial(ts: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .unwrap_or_default();
    (*ts - epoch).num_milliseconds() as f64 / MILLIS_PER_DAY
}

fn cast_row_num(value: usize) -> Result<u32, XlsxSinkError> {
    if value >= MAX_ROWS {
        return Err(XlsxSinkError::RowOverflow(value));
    }
    u32::try_from(value).map_err(|_| XlsxSinkError::RowOverflow(value))
}

fn cast_col_num(value: usize) -> Result<u16, XlsxSinkError> {
    if value >= MAX_COLUMNS {
        return Err(XlsxSinkError::ColumnOverflow(value));
    }
    u16::try_from(value).map_err(|_| XlsxSinkError::ColumnOverflow(value))
}
