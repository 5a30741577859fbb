//! Ready-made formatters for [`FormatterRegistry`](crate::FormatterRegistry).
//!
//! ```rust
//! use sheet_mapper::{format, MapperConfig};
//!
//! let config = MapperConfig::new()
//!     .formatter("sex", format::labels(&[(0, "Male"), (1, "Female")], "Unknown"))
//!     .formatter("date", format::datetime("%Y-%m-%d"))
//!     .formatter("money", format::fixed_decimals(2));
//! assert_eq!(config.formatters.len(), 3);
//! ```

use std::collections::HashMap;
use std::fmt::Write;

use crate::value::CellValue;

/// Timestamps rendered with a chrono pattern, other values as plain text.
pub fn datetime(pattern: &str) -> impl Fn(&CellValue) -> String + Send + Sync + 'static {
    let pattern = pattern.to_string();
    move |value: &CellValue| match value {
        CellValue::Timestamp(ts) => {
            // chrono reports unknown specifiers as a fmt error
            let mut out = String::new();
            match write!(out, "{}", ts.format(&pattern)) {
                Ok(()) => out,
                Err(_) => ts.to_string(),
            }
        }
        other => other.to_string(),
    }
}

/// Booleans rendered as `yes`/`no`; zero values of other kinds count as `no`.
pub fn bool_text(yes: &str, no: &str) -> impl Fn(&CellValue) -> String + Send + Sync + 'static {
    let yes = yes.to_string();
    let no = no.to_string();
    move |value: &CellValue| match value {
        CellValue::Bool(true) => yes.clone(),
        CellValue::Bool(false) => no.clone(),
        other if other.is_zero() => no.clone(),
        _ => yes.clone(),
    }
}

/// Numbers rendered with a fixed count of decimals; text passes through.
pub fn fixed_decimals(decimals: usize) -> impl Fn(&CellValue) -> String + Send + Sync + 'static {
    move |value: &CellValue| match value.as_f64() {
        Some(n) => format!("{:.*}", decimals, n),
        None => value.to_string(),
    }
}

/// Integer codes mapped to labels, for enum-like fields.
///
/// Codes missing from `pairs` and non-integer values yield `fallback`.
pub fn labels(
    pairs: &[(i64, &str)],
    fallback: &str,
) -> impl Fn(&CellValue) -> String + Send + Sync + 'static {
    let map: HashMap<i64, String> = pairs
        .iter()
        .map(|(code, label)| (*code, label.to_string()))
        .collect();
    let fallback = fallback.to_string();
    move |value: &CellValue| {
        value
            .as_int()
            .and_then(|code| map.get(&code).cloned())
            .unwrap_or_else(|| fallback.clone())
    }
}

/// Plain display text. List fields already arrive as `a, b, c`.
pub fn join() -> impl Fn(&CellValue) -> String + Send + Sync + 'static {
    |value: &CellValue| value.to_string()
}
