//! Sheet Mapper - declarative mapping of record slices onto spreadsheet rows.
//!
//! Each field of a record type carries a metadata string such as
//! `header:Name;width:20;default:-`. From those strings the mapper resolves
//! a column plan once per type, then turns every record into a row:
//!
//! - Columns in declaration order (auto mode) or at explicit `index`
//!   positions (manual mode, gaps become blank columns)
//! - Embedded sub-records flattened in place
//! - Zero values replaced by `default` text, then passed through a named
//!   `format`ter
//! - One nested collection pivoted into extra columns named by a
//!   `dynamic` header template
//!
//! # Quick Start
//!
//! ```rust
//! use sheet_mapper::{format, CellValue, Mapper, MapperConfig, MemorySink, SheetRecord};
//!
//! #[derive(SheetRecord)]
//! struct Person {
//!     #[sheet("header:Number;width:10")]
//!     id: i64,
//!     #[sheet("header:Name")]
//!     name: String,
//!     #[sheet("header:Sex;format:sex")]
//!     sex: u8,
//! }
//!
//! let mapper = Mapper::new(
//!     MapperConfig::new()
//!         .default_width(50.0)
//!         .formatter("sex", format::labels(&[(0, "Male"), (1, "Female")], "Unknown")),
//! );
//!
//! let people = vec![Person { id: 1, name: "Tom".into(), sex: 0 }];
//! let mut sink = MemorySink::new();
//! mapper.set_data(&mut sink, "Sheet1", &people).unwrap();
//!
//! let sheet = sink.sheet("Sheet1").unwrap();
//! assert_eq!(sheet.header(), vec!["Number", "Name", "Sex"]);
//! assert_eq!(sheet.cell("A2"), Some(&CellValue::Int(1)));
//! assert_eq!(sheet.cell("C2"), Some(&CellValue::from("Male")));
//! assert_eq!(sheet.widths.get(&0), Some(&10.0));
//! assert_eq!(sheet.widths.get(&1), Some(&50.0));
//! ```
//!
//! # Annotation Keys
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `header` | Header text; required for a static column |
//! | `index` | Column position in manual mode |
//! | `width` | Column width override |
//! | `default` | Text used when the value is its type's zero value |
//! | `format` | Name of a registered formatter |
//! | `dynamic` | On a collection: header template of pivot columns, e.g. `$1/$2` |
//! | `dynamicpos` | On a collection element field: placeholder token it fills |
//! | `dynamicval` | On a collection element field: supplies the pivot cell value |
//!
//! Segments are separated by `;` and split on their first `:`, so values may
//! contain colons.
//!
//! # Writing
//!
//! [`Mapper::set_data`] writes into any [`Sink`]. Bundled sinks are
//! [`MemorySink`], [`CsvSink`] and, with the default `xlsx` feature,
//! `XlsxSink` for `.xlsx` workbooks.

mod column;
mod config;
mod error;
pub mod format;
mod mapper;
mod materialize;
mod pivot;
mod resolve;
mod schema;
pub mod sink;
mod tags;
mod value;

// Re-export public API
pub use column::{Column, ResolvedPlan};
pub use config::{Formatter, FormatterRegistry, MapperConfig, MapperOptions};
pub use error::{MapperError, Result};
pub use mapper::Mapper;
pub use materialize::{ColumnWidth, Materializer, Table};
pub use pivot::{DynamicHeaders, PivotRule};
pub use resolve::Resolver;
pub use schema::{
    CollectionDef, ElementField, ElementGetter, FieldDef, FieldKind, Getter, Schema,
    SchemaBuilder, SheetRecord,
};
pub use sink::{
    cell_name_to_coordinates, column_number_to_name, coordinates_to_cell_name, CoordinateError,
    CsvSink, CsvSinkError, MemorySheet, MemorySink, Sink,
};
#[cfg(feature = "xlsx")]
pub use sink::{XlsxSink, XlsxSinkError};
pub use tags::{
    parse_tags, TagParser, DEFAULT_TAG_DELIMITER, DEFAULT_TAG_KEY, KEY_DEFAULT, KEY_DYNAMIC,
    KEY_DYNAMIC_POS, KEY_DYNAMIC_VAL, KEY_FORMAT, KEY_HEADER, KEY_INDEX, KEY_WIDTH,
};
pub use value::{CellValue, ToCell};

#[cfg(feature = "derive")]
pub use sheet_mapper_macros::SheetRecord;
