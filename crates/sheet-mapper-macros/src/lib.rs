//! Proc macros for Sheet Mapper.
//!
//! - [`SheetRecord`] - Generate a `Schema` from `#[sheet(...)]` field annotations
//!
//! Use the macro through the `sheet-mapper` crate, which re-exports it behind
//! its default `derive` feature. Generated code refers to `::sheet_mapper`.

mod record;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `SheetRecord` for a struct with named fields.
///
/// Only fields carrying at least one `#[sheet(...)]` attribute are described,
/// in declaration order.
///
/// # Field Attributes
///
/// | Attribute | Effect |
/// |-----------|--------|
/// | `#[sheet("header:Name;width:20")]` | Metadata under the default key `excelize-mapper` |
/// | `#[sheet(tag = "xlsx", meta = "header:Name")]` | Metadata under another key |
/// | `#[sheet(embed)]` | Splice the columns of a `SheetRecord` field in place; `Option<T>` is allowed |
/// | `#[sheet(collection, "dynamic:$1/$2")]` | A `Vec`/slice of `SheetRecord` elements, usable as a pivot source |
/// | `#[sheet(rename = "Other")]` | Name used in field paths and pivot rules |
/// | `#[sheet(skip)]` | Leave the field out |
///
/// Several `#[sheet]` attributes may be stacked on one field, e.g. to carry
/// metadata for two different keys.
///
/// # Example
///
/// ```ignore
/// use sheet_mapper::SheetRecord;
///
/// #[derive(SheetRecord)]
/// struct Quarter {
///     #[sheet("dynamicpos:$1")]
///     year: i32,
///     #[sheet("dynamicpos:$2")]
///     quarter: u8,
///     #[sheet("dynamicval:")]
///     value: f64,
/// }
///
/// #[derive(SheetRecord)]
/// struct Report {
///     #[sheet("header:Company;width:30")]
///     company: String,
///     #[sheet(collection, "dynamic:$1/Q$2")]
///     quarters: Vec<Quarter>,
/// }
/// ```
#[proc_macro_derive(SheetRecord, attributes(sheet))]
pub fn sheet_record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::sheet_record_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
