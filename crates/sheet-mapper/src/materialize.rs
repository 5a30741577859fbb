//! Row materialization.
//!
//! Turns a [`ResolvedPlan`] and a slice of records into a [`Table`]: a dense
//! header row, the width instructions, and one dense value row per record.
//!
//! For every static column the value is produced in this order:
//!
//! 1. read the field; an absent optional reads as the zero value of its type
//! 2. if that value is zero and the column has default text, use the text
//! 3. if the column names a registered formatter, replace the value with
//!    the formatter's output
//!
//! Pivot columns follow the static ones, in first-seen header order.

use log::{debug, warn};
use serde::Serialize;

use crate::column::{Column, ResolvedPlan};
use crate::config::{Formatter, FormatterRegistry};
use crate::error::{MapperError, Result};
use crate::pivot::{DynamicHeaders, PivotReader};
use crate::schema::{FieldKind, Getter, Schema};
use crate::value::CellValue;

/// Width instruction for one output column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColumnWidth {
    /// Zero-based column index.
    pub column: usize,
    /// Width in Excel character units.
    pub width: f64,
}

/// A fully materialized sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Header row, static headers then dynamic headers.
    pub headers: Vec<String>,
    /// Widths for static columns whose effective width is positive.
    pub widths: Vec<ColumnWidth>,
    /// One row per record, aligned with `headers`.
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// The dynamic headers, i.e. everything after the static slots.
    pub fn dynamic_headers(&self, plan: &ResolvedPlan) -> &[String] {
        let start = plan.static_width().min(self.headers.len());
        &self.headers[start..]
    }
}

/// Materializes records against a plan.
pub struct Materializer<'a> {
    formatters: &'a FormatterRegistry,
    default_width: f64,
}

struct BoundColumn<'a, R> {
    column: &'a Column,
    get: &'a Getter<R>,
    zero: &'a CellValue,
    formatter: Option<&'a Formatter>,
}

impl<R> BoundColumn<'_, R> {
    fn cell(&self, record: &R) -> CellValue {
        let mut value = (self.get)(record).unwrap_or_else(|| self.zero.clone());
        if value.is_zero() && !self.column.default_text.is_empty() {
            value = CellValue::Text(self.column.default_text.clone());
        }
        if let Some(format) = self.formatter {
            value = CellValue::Text(format(&value));
        }
        value
    }
}

impl<'a> Materializer<'a> {
    /// A materializer using `formatters` and falling back to `default_width`.
    pub fn new(formatters: &'a FormatterRegistry, default_width: f64) -> Self {
        Materializer {
            formatters,
            default_width,
        }
    }

    /// Build the table for `records`.
    ///
    /// # Errors
    ///
    /// [`MapperError::Shape`] if a column path does not name a scalar field
    /// of `schema`, or the pivot source is not a collection.
    pub fn run<R: 'static>(
        &self,
        plan: &ResolvedPlan,
        schema: &Schema<R>,
        records: &[R],
    ) -> Result<Table> {
        let columns = self.bind_columns(plan, schema)?;
        let pivot = match plan.pivot() {
            Some(rule) => {
                let field = schema.lookup(&rule.source_field).ok_or_else(|| {
                    MapperError::Shape(format!("no pivot source field {}", rule.source_field))
                })?;
                match field.kind() {
                    FieldKind::Collection(def) => Some(PivotReader::bind(rule, def)?),
                    _ => {
                        return Err(MapperError::Shape(format!(
                            "pivot source {} is not a collection",
                            rule.source_field
                        )))
                    }
                }
            }
            None => None,
        };

        let mut dynamic = DynamicHeaders::new();
        if let Some(reader) = &pivot {
            for record in records {
                reader.collect(record, &mut dynamic);
            }
            debug!("collected {} dynamic header(s)", dynamic.len());
        }

        let static_width = plan.static_width();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = vec![CellValue::Text(String::new()); static_width];
            for bound in &columns {
                row[bound.column.position] = bound.cell(record);
            }
            if let Some(reader) = &pivot {
                row.extend(reader.row(record, &dynamic));
            }
            rows.push(row);
        }

        let widths = plan
            .columns()
            .iter()
            .filter_map(|col| {
                let width = col.effective_width(self.default_width);
                (width > 0.0).then_some(ColumnWidth {
                    column: col.position,
                    width,
                })
            })
            .collect();

        Ok(Table {
            headers: plan.header_row(dynamic.as_slice()),
            widths,
            rows,
        })
    }

    fn bind_columns<'p, R: 'static>(
        &self,
        plan: &'p ResolvedPlan,
        schema: &'p Schema<R>,
    ) -> Result<Vec<BoundColumn<'p, R>>>
    where
        'a: 'p,
    {
        let formatters: &'p FormatterRegistry = self.formatters;
        plan.columns()
            .iter()
            .map(|column| {
                let field = schema.lookup(&column.field_path).ok_or_else(|| {
                    MapperError::Shape(format!("no field at path {}", column.field_path))
                })?;
                let FieldKind::Value { get, zero } = field.kind() else {
                    return Err(MapperError::Shape(format!(
                        "{} is not a scalar field",
                        column.field_path
                    )));
                };
                let formatter = match &column.formatter_key {
                    Some(key) => {
                        let found = formatters.get(key);
                        if found.is_none() {
                            warn!(
                                "column {:?} names unregistered formatter {:?}",
                                column.header, key
                            );
                        }
                        found
                    }
                    None => None,
                };
                Ok(BoundColumn {
                    column,
                    get,
                    zero,
                    formatter,
                })
            })
            .collect()
    }
}
