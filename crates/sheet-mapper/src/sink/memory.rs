use std::collections::BTreeMap;
use std::convert::Infallible;

use super::{cell_name_to_coordinates, Sink};
use crate::value::CellValue;

/// One sheet held in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySheet {
    /// Rows by 0-based index. Row 0 is the header row once written.
    pub rows: BTreeMap<usize, Vec<CellValue>>,
    /// Widths by 0-based column.
    pub widths: BTreeMap<usize, f64>,
}

impl MemorySheet {
    /// Header row as text.
    pub fn header(&self) -> Vec<String> {
        self.rows
            .get(&0)
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .unwrap_or_default()
    }

    /// Value at an `A1` style cell name.
    pub fn cell(&self, name: &str) -> Option<&CellValue> {
        let (column, row) = cell_name_to_coordinates(name).ok()?;
        self.rows.get(&(row - 1))?.get(column - 1)
    }

    /// Number of rows written, header included.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Keeps everything written to it, keyed by sheet name.
///
/// ```rust
/// use sheet_mapper::{CellValue, MemorySink, Sink};
///
/// let mut sink = MemorySink::new();
/// sink.set_header_row("Sheet1", &["Name".to_string()]).unwrap();
/// sink.set_row("Sheet1", 1, &[CellValue::from("Tom")]).unwrap();
/// let sheet = sink.sheet("Sheet1").unwrap();
/// assert_eq!(sheet.cell("A2"), Some(&CellValue::from("Tom")));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySink {
    sheets: BTreeMap<String, MemorySheet>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.get(name)
    }

    /// Sheet names, sorted.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    fn sheet_mut(&mut self, name: &str) -> &mut MemorySheet {
        self.sheets.entry(name.to_string()).or_default()
    }
}

impl Sink for MemorySink {
    type Error = Infallible;

    fn set_header_row(&mut self, sheet: &str, values: &[String]) -> Result<(), Self::Error> {
        let row = values.iter().map(|v| CellValue::Text(v.clone())).collect();
        self.sheet_mut(sheet).rows.insert(0, row);
        Ok(())
    }

    fn set_row(&mut self, sheet: &str, row: usize, values: &[CellValue]) -> Result<(), Self::Error> {
        self.sheet_mut(sheet).rows.insert(row, values.to_vec());
        Ok(())
    }

    fn set_column_width(
        &mut self,
        sheet: &str,
        column: usize,
        width: f64,
    ) -> Result<(), Self::Error> {
        self.sheet_mut(sheet).widths.insert(column, width);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_rows_and_widths_per_sheet() {
        let mut sink = MemorySink::new();
        sink.set_header_row("A", &["x".to_string(), "y".to_string()])
            .unwrap();
        sink.set_row("A", 2, &[CellValue::Int(1)]).unwrap();
        sink.set_column_width("A", 1, 12.0).unwrap();
        sink.set_row("B", 1, &[CellValue::Bool(true)]).unwrap();

        let a = sink.sheet("A").unwrap();
        assert_eq!(a.header(), vec!["x", "y"]);
        assert_eq!(a.cell("A3"), Some(&CellValue::Int(1)));
        assert_eq!(a.cell("A2"), None);
        assert_eq!(a.widths.get(&1), Some(&12.0));
        assert_eq!(a.row_count(), 2);

        assert_eq!(sink.sheet_names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(sink.sheet("B").unwrap().header().is_empty());
    }

    #[test]
    fn rewriting_a_row_replaces_it() {
        let mut sink = MemorySink::new();
        sink.set_row("S", 1, &[CellValue::Int(1)]).unwrap();
        sink.set_row("S", 1, &[CellValue::Int(2)]).unwrap();
        assert_eq!(sink.sheet("S").unwrap().cell("A2"), Some(&CellValue::Int(2)));
    }
}
