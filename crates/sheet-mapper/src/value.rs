//! Cell value types exchanged between the materializer and sinks.
//!
//! [`CellValue`] is the closed set of values a row can carry. Record fields
//! reach it through the [`ToCell`] trait, which also knows the zero value of
//! each field type so that absent optionals and default substitution behave
//! the same way for every type.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// A single spreadsheet cell.
///
/// # Example
///
/// ```
/// use sheet_mapper::CellValue;
///
/// assert_eq!(CellValue::Float(2.124).to_string(), "2.124");
/// assert_eq!(CellValue::Float(0.0).to_string(), "0");
/// assert!(CellValue::Int(0).is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Nothing written to the cell.
    #[default]
    Empty,
    /// Text value.
    Text(String),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Date and time without a zone.
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// Returns `true` if this is the zero value of its kind.
    ///
    /// Zero values are `Empty`, the empty string, `0`, `0.0`, `false`, and
    /// the default timestamp (1970-01-01 00:00:00).
    pub fn is_zero(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Int(n) => *n == 0,
            CellValue::Float(n) => *n == 0.0,
            CellValue::Bool(b) => !b,
            CellValue::Timestamp(ts) => *ts == NaiveDateTime::default(),
        }
    }

    /// Returns `true` if this is `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Extracts the text value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the integer value, if present.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts a numeric value as `f64`, for both integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(n) => Some(*n as f64),
            CellValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the timestamp value, if present.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Text(_) => "text",
            CellValue::Int(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Bool(_) => "boolean",
            CellValue::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{}", n),
            CellValue::Float(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Timestamp(ts) => write!(f, "{}", ts),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(ts: NaiveDateTime) -> Self {
        CellValue::Timestamp(ts)
    }
}

/// Conversion from a record field into a [`CellValue`].
///
/// `to_cell` returns `None` only for an absent optional; the materializer
/// then falls back to [`ToCell::zero_cell`] of the declared type.
///
/// # Example
///
/// ```
/// use sheet_mapper::{CellValue, ToCell};
///
/// #[derive(Clone, Copy)]
/// enum Sex {
///     Male,
///     Female,
/// }
///
/// impl ToCell for Sex {
///     fn to_cell(&self) -> Option<CellValue> {
///         Some(CellValue::Int(*self as i64))
///     }
///
///     fn zero_cell() -> CellValue {
///         CellValue::Int(0)
///     }
/// }
///
/// assert_eq!(Sex::Female.to_cell(), Some(CellValue::Int(1)));
/// assert_eq!(None::<Sex>.to_cell(), None);
/// ```
pub trait ToCell {
    /// Current value of the field, `None` when an optional is unset.
    fn to_cell(&self) -> Option<CellValue>;

    /// The zero value of this type.
    fn zero_cell() -> CellValue
    where
        Self: Sized;
}

macro_rules! int_to_cell {
    ($($t:ty),*) => {
        $(
            impl ToCell for $t {
                fn to_cell(&self) -> Option<CellValue> {
                    Some(CellValue::Int(*self as i64))
                }

                fn zero_cell() -> CellValue {
                    CellValue::Int(0)
                }
            }
        )*
    };
}

int_to_cell!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_to_cell {
    ($($t:ty),*) => {
        $(
            impl ToCell for $t {
                fn to_cell(&self) -> Option<CellValue> {
                    Some(match i64::try_from(*self) {
                        Ok(n) => CellValue::Int(n),
                        Err(_) => CellValue::Float(*self as f64),
                    })
                }

                fn zero_cell() -> CellValue {
                    CellValue::Int(0)
                }
            }
        )*
    };
}

wide_int_to_cell!(isize, u64, usize);

impl ToCell for f32 {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Float(*self as f64))
    }

    fn zero_cell() -> CellValue {
        CellValue::Float(0.0)
    }
}

impl ToCell for f64 {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Float(*self))
    }

    fn zero_cell() -> CellValue {
        CellValue::Float(0.0)
    }
}

impl ToCell for bool {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Bool(*self))
    }

    fn zero_cell() -> CellValue {
        CellValue::Bool(false)
    }
}

impl ToCell for char {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Text(self.to_string()))
    }

    fn zero_cell() -> CellValue {
        CellValue::Text(String::new())
    }
}

impl ToCell for String {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Text(self.clone()))
    }

    fn zero_cell() -> CellValue {
        CellValue::Text(String::new())
    }
}

impl ToCell for CellValue {
    fn to_cell(&self) -> Option<CellValue> {
        Some(self.clone())
    }

    fn zero_cell() -> CellValue {
        CellValue::Empty
    }
}

impl ToCell for NaiveDateTime {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Timestamp(*self))
    }

    fn zero_cell() -> CellValue {
        CellValue::Timestamp(NaiveDateTime::default())
    }
}

impl ToCell for NaiveDate {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Timestamp(self.and_time(NaiveTime::MIN)))
    }

    fn zero_cell() -> CellValue {
        CellValue::Timestamp(NaiveDateTime::default())
    }
}

impl<Tz: TimeZone> ToCell for DateTime<Tz> {
    fn to_cell(&self) -> Option<CellValue> {
        Some(CellValue::Timestamp(self.naive_local()))
    }

    fn zero_cell() -> CellValue {
        CellValue::Timestamp(NaiveDateTime::default())
    }
}

impl<T: ToCell> ToCell for Box<T> {
    fn to_cell(&self) -> Option<CellValue> {
        (**self).to_cell()
    }

    fn zero_cell() -> CellValue {
        T::zero_cell()
    }
}

impl<T: ToCell> ToCell for Option<T> {
    fn to_cell(&self) -> Option<CellValue> {
        self.as_ref().and_then(ToCell::to_cell)
    }

    fn zero_cell() -> CellValue {
        T::zero_cell()
    }
}

impl<T: ToCell> ToCell for Vec<T> {
    fn to_cell(&self) -> Option<CellValue> {
        let parts: Vec<String> = self
            .iter()
            .map(|item| item.to_cell().map(|c| c.to_string()).unwrap_or_default())
            .collect();
        Some(CellValue::Text(parts.join(", ")))
    }

    fn zero_cell() -> CellValue {
        CellValue::Text(String::new())
    }
}
