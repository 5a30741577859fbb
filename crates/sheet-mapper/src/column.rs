//! Resolved column plan types.
//!
//! A [`ResolvedPlan`] is produced once per record type by the
//! [`Resolver`](crate::Resolver) and consumed read-only by the materializer.

use serde::{Deserialize, Serialize};

use crate::pivot::PivotRule;

/// One static output column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Zero-based output column index.
    pub position: usize,
    /// Header text written to the first row.
    pub header: String,
    /// Width override; `None` or a non-positive value falls back to the default.
    pub width: Option<f64>,
    /// Text used when the field holds its zero value. Empty disables it.
    pub default_text: String,
    /// Formatter registry key.
    pub formatter_key: Option<String>,
    /// Dotted path of the field supplying the value.
    pub field_path: String,
}

impl Column {
    /// Create a column with just a position, header and field path.
    pub fn new(position: usize, header: impl Into<String>, field_path: impl Into<String>) -> Self {
        Column {
            position,
            header: header.into(),
            width: None,
            default_text: String::new(),
            formatter_key: None,
            field_path: field_path.into(),
        }
    }

    /// Set the width override.
    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the default text.
    pub fn default_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = text.into();
        self
    }

    /// Set the formatter key.
    pub fn formatter(mut self, key: impl Into<String>) -> Self {
        self.formatter_key = Some(key.into());
        self
    }

    /// Own width if positive, else `default`.
    ///
    /// The caller only emits a width instruction when the result is positive.
    pub fn effective_width(&self, default: f64) -> f64 {
        match self.width {
            Some(w) if w > 0.0 => w,
            _ => default,
        }
    }
}

/// Ordered static columns plus at most one pivot rule.
///
/// Deserialized plans go through [`ResolvedPlan::new`], so they are sorted too.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PlanParts")]
pub struct ResolvedPlan {
    columns: Vec<Column>,
    pivot: Option<PivotRule>,
}

#[derive(Deserialize)]
struct PlanParts {
    columns: Vec<Column>,
    #[serde(default)]
    pivot: Option<PivotRule>,
}

impl From<PlanParts> for ResolvedPlan {
    fn from(parts: PlanParts) -> Self {
        ResolvedPlan::new(parts.columns, parts.pivot)
    }
}

impl ResolvedPlan {
    /// Build a plan. Columns are sorted by position, ties keep input order.
    pub fn new(mut columns: Vec<Column>, pivot: Option<PivotRule>) -> Self {
        columns.sort_by_key(|c| c.position);
        ResolvedPlan { columns, pivot }
    }

    /// Static columns sorted by position.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The pivot rule, if any.
    pub fn pivot(&self) -> Option<&PivotRule> {
        self.pivot.as_ref()
    }

    /// Number of dense static slots: highest position plus one.
    pub fn static_width(&self) -> usize {
        self.columns.last().map(|c| c.position + 1).unwrap_or(0)
    }

    /// Dense header row: static headers at their positions, blanks in the
    /// gaps, followed by `dynamic` headers.
    pub fn header_row(&self, dynamic: &[String]) -> Vec<String> {
        let mut row = vec![String::new(); self.static_width()];
        for col in &self.columns {
            row[col.position] = col.header.clone();
        }
        row.extend(dynamic.iter().cloned());
        row
    }
}
