//! Implementation of the `#[derive(SheetRecord)]` macro.

mod attrs;
mod derive;

pub use derive::sheet_record_derive_impl;
