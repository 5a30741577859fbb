//! Error types for the sheet-mapper crate.

use thiserror::Error;

/// Errors that can occur while resolving a column plan or writing a table.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The record shape does not match what the plan expects.
    #[error("record shape mismatch: {0}")]
    Shape(String),

    /// Manual-mode `index` annotation is not a non-negative integer.
    #[error("invalid index value {value:?} for field {field}")]
    InvalidIndex { field: String, value: String },

    /// Two fields claim the same manual-mode column index.
    #[error("column index {index} is claimed by both {first} and {second}")]
    DuplicateIndex {
        index: usize,
        first: String,
        second: String,
    },

    /// A dynamic pivot declaration cannot be turned into a single rule.
    #[error("invalid dynamic pivot on {field}: {reason}")]
    InvalidPivot { field: String, reason: String },

    /// Failure reported by the sink while writing.
    #[error("sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Mapper options could not be loaded or are inconsistent.
    #[error("invalid mapper configuration: {0}")]
    Config(String),
}

impl MapperError {
    /// Wrap an error raised by a [`Sink`](crate::sink::Sink) implementation.
    pub fn sink<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MapperError::Sink(Box::new(err))
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        MapperError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for MapperError {
    fn from(err: serde_yaml::Error) -> Self {
        MapperError::Config(err.to_string())
    }
}

/// Result type for mapper operations.
pub type Result<T> = std::result::Result<T, MapperError>;
