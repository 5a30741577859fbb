use std::io::{self, Write};

use ::csv::{Writer, WriterBuilder};
use thiserror::Error;

use super::Sink;
use crate::value::CellValue;

/// Errors raised by [`CsvSink`].
#[derive(Debug, Error)]
pub enum CsvSinkError {
    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// CSV is written front to back; a row cannot go before one already written.
    #[error("row {row} arrived after row {next} was already reached")]
    OutOfOrder { row: usize, next: usize },

    /// One sink writes one sheet.
    #[error("sheet {got:?} does not match sheet {expected:?} already being written")]
    SheetMismatch { expected: String, got: String },
}

/// Writes a single sheet as CSV.
///
/// Rows must arrive in ascending order; skipped rows become empty records.
/// Column widths have no CSV counterpart and are dropped.
///
/// ```rust
/// use sheet_mapper::{CellValue, CsvSink, Sink};
///
/// let mut sink = CsvSink::new(Vec::new());
/// sink.set_header_row("Sheet1", &["Id".to_string(), "Name".to_string()]).unwrap();
/// sink.set_row("Sheet1", 1, &[CellValue::Int(1), CellValue::from("Tom")]).unwrap();
/// let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
/// assert_eq!(out, "Id,Name\n1,Tom\n");
/// ```
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
    sheet: Option<String>,
    next_row: usize,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self::with_builder(WriterBuilder::new(), inner)
    }

    /// Use a configured builder, e.g. for another delimiter.
    ///
    /// Records may vary in length regardless of the builder settings.
    pub fn with_builder(mut builder: WriterBuilder, inner: W) -> Self {
        CsvSink {
            writer: builder.flexible(true).from_writer(inner),
            sheet: None,
            next_row: 0,
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, CsvSinkError> {
        self.writer
            .into_inner()
            .map_err(|e| CsvSinkError::Io(e.into_error()))
    }

    fn check_sheet(&mut self, sheet: &str) -> Result<(), CsvSinkError> {
        match &self.sheet {
            Some(expected) if expected != sheet => Err(CsvSinkError::SheetMismatch {
                expected: expected.clone(),
                got: sheet.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.sheet = Some(sheet.to_string());
                Ok(())
            }
        }
    }

    fn write_at<I, T>(&mut self, sheet: &str, row: usize, fields: I) -> Result<(), CsvSinkError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.check_sheet(sheet)?;
        if row < self.next_row {
            return Err(CsvSinkError::OutOfOrder {
                row,
                next: self.next_row,
            });
        }
        while self.next_row < row {
            self.writer.write_record(std::iter::empty::<&[u8]>())?;
            self.next_row += 1;
        }
        self.writer.write_record(fields)?;
        self.next_row = row + 1;
        Ok(())
    }
}

impl<W: Write> Sink for CsvSink<W> {
    type Error = CsvSinkError;

    fn set_header_row(&mut self, sheet: &str, values: &[String]) -> Result<(), Self::Error> {
        self.write_at(sheet, 0, values)
    }

    fn set_row(&mut self, sheet: &str, row: usize, values: &[CellValue]) -> Result<(), Self::Error> {
        self.write_at(sheet, row, values.iter().map(|v| v.to_string()))
    }

    fn set_column_width(
        &mut self,
        sheet: &str,
        _column: usize,
        _width: f64,
    ) -> Result<(), Self::Error> {
        self.check_sheet(sheet)
    }
}
