//! The mapper facade.

use log::debug;

use crate::column::ResolvedPlan;
use crate::config::{FormatterRegistry, MapperConfig, MapperOptions};
use crate::error::{MapperError, Result};
use crate::materialize::{Materializer, Table};
use crate::resolve::Resolver;
use crate::schema::{Schema, SheetRecord};
use crate::sink::Sink;
use crate::value::CellValue;

/// Maps record slices onto sheets.
///
/// A mapper owns its configuration. The formatter registry can only be
/// changed through [`Mapper::register_formatter`], which takes `&mut self`,
/// so it can never change while a mapping call is running.
///
/// ```rust
/// use sheet_mapper::{CellValue, Mapper, MapperConfig, MemorySink, Schema, SheetRecord};
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl SheetRecord for User {
///     fn sheet_schema() -> Schema<Self> {
///         Schema::builder()
///             .value("id", "header:Number", |u: &User| &u.id)
///             .value("name", "header:Name;width:20", |u: &User| &u.name)
///             .build()
///     }
/// }
///
/// let mapper = Mapper::new(MapperConfig::new());
/// let mut sink = MemorySink::new();
/// let users = vec![User { id: 1, name: "Tom".into() }];
/// mapper.set_data(&mut sink, "Sheet1", &users).unwrap();
///
/// let sheet = sink.sheet("Sheet1").unwrap();
/// assert_eq!(sheet.header(), vec!["Number", "Name"]);
/// assert_eq!(sheet.cell("B2"), Some(&CellValue::from("Tom")));
/// assert_eq!(sheet.widths.get(&1), Some(&20.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Mapper {
    config: MapperConfig,
    resolver: Resolver,
}

impl Mapper {
    /// Build a mapper from a configuration.
    pub fn new(config: MapperConfig) -> Self {
        let resolver = config.options.resolver();
        Mapper { config, resolver }
    }

    /// Build a mapper from options, rejecting invalid ones.
    pub fn try_from_options(options: MapperOptions) -> Result<Self> {
        options.validate()?;
        Ok(Mapper::new(MapperConfig::from_options(options)))
    }

    /// The configuration this mapper was built with, formatters included.
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Registered formatters.
    pub fn formatters(&self) -> &FormatterRegistry {
        &self.config.formatters
    }

    /// Register or replace a named formatter.
    pub fn register_formatter<F>(&mut self, name: impl Into<String>, formatter: F)
    where
        F: Fn(&CellValue) -> String + Send + Sync + 'static,
    {
        self.config.formatters.register(name, formatter);
    }

    /// Resolve the column plan of a record type.
    pub fn resolve<R: SheetRecord>(&self) -> Result<ResolvedPlan> {
        self.resolver.resolve_record::<R>()
    }

    /// Resolve the column plan of an explicit schema.
    pub fn resolve_schema<R: 'static>(&self, schema: &Schema<R>) -> Result<ResolvedPlan> {
        self.resolver.resolve(schema)
    }

    /// Materialize records of a [`SheetRecord`] type.
    pub fn materialize<R: SheetRecord>(&self, records: &[R]) -> Result<Table> {
        self.materialize_with(&R::sheet_schema(), records)
    }

    /// Materialize records described by an explicit schema.
    pub fn materialize_with<R: 'static>(&self, schema: &Schema<R>, records: &[R]) -> Result<Table> {
        let plan = self.resolver.resolve(schema)?;
        Materializer::new(&self.config.formatters, self.config.options.default_width)
            .run(&plan, schema, records)
    }

    /// Write records of a [`SheetRecord`] type to `sheet`.
    ///
    /// Widths go first, then the header row at row 0, then record `i` at
    /// row `i + 1`. The first sink error aborts the write.
    pub fn set_data<S, R>(&self, sink: S, sheet: &str, records: &[R]) -> Result<()>
    where
        S: Sink,
        R: SheetRecord,
    {
        self.set_data_with(sink, sheet, &R::sheet_schema(), records)
    }

    /// [`Mapper::set_data`] with an explicit schema.
    pub fn set_data_with<S, R>(
        &self,
        mut sink: S,
        sheet: &str,
        schema: &Schema<R>,
        records: &[R],
    ) -> Result<()>
    where
        S: Sink,
        R: 'static,
    {
        let table = self.materialize_with(schema, records)?;

        for w in &table.widths {
            sink.set_column_width(sheet, w.column, w.width)
                .map_err(MapperError::sink)?;
        }
        sink.set_header_row(sheet, &table.headers)
            .map_err(MapperError::sink)?;
        for (i, row) in table.rows.iter().enumerate() {
            sink.set_row(sheet, i + 1, row).map_err(MapperError::sink)?;
        }

        debug!(
            "wrote {} row(s) x {} column(s) to sheet {:?}",
            table.rows.len(),
            table.headers.len(),
            sheet
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::fmt;

    struct Pair {
        a: i64,
        b: String,
    }

    impl SheetRecord for Pair {
        fn sheet_schema() -> Schema<Self> {
            Schema::builder()
                .value("a", "header:A;index:1", |p: &Pair| &p.a)
                .value("b", "header:B;index:0;format:shout", |p: &Pair| &p.b)
                .build()
        }
    }

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    /// Fails on the n-th row write.
    struct FailingSink {
        fail_at: usize,
        rows: Vec<usize>,
    }

    impl Sink for FailingSink {
        type Error = Boom;

        fn set_header_row(&mut self, _: &str, _: &[String]) -> std::result::Result<(), Boom> {
            Ok(())
        }

        fn set_row(&mut self, _: &str, row: usize, _: &[CellValue]) -> std::result::Result<(), Boom> {
            if row == self.fail_at {
                return Err(Boom);
            }
            self.rows.push(row);
            Ok(())
        }

        fn set_column_width(&mut self, _: &str, _: usize, _: f64) -> std::result::Result<(), Boom> {
            Ok(())
        }
    }

    fn pairs() -> Vec<Pair> {
        (0..3)
            .map(|i| Pair {
                a: i,
                b: format!("r{}", i),
            })
            .collect()
    }

    #[test]
    fn register_formatter_applies_to_later_calls() {
        let mut mapper = Mapper::new(MapperConfig::new().auto_sort(false));
        let before = mapper.materialize(&pairs()).unwrap();
        assert_eq!(before.rows[0][0], CellValue::Text("r0".into()));

        mapper.register_formatter("shout", |v: &CellValue| format!("{}!", v));
        let after = mapper.materialize(&pairs()).unwrap();
        assert_eq!(after.rows[0][0], CellValue::Text("r0!".into()));
        assert_eq!(after.headers, vec!["B", "A"]);
    }

    #[test]
    fn sink_error_aborts_at_failing_row() {
        let mapper = Mapper::default();
        let mut sink = FailingSink {
            fail_at: 2,
            rows: Vec::new(),
        };
        let err = mapper.set_data(&mut sink, "S", &pairs()).unwrap_err();
        assert!(matches!(err, MapperError::Sink(_)));
        assert_eq!(err.to_string(), "sink error: boom");
        assert_eq!(sink.rows, vec![1]);
    }

    #[test]
    fn rows_start_below_header() {
        let mapper = Mapper::default();
        let mut sink = MemorySink::new();
        mapper.set_data(&mut sink, "S", &pairs()).unwrap();
        let sheet = sink.sheet("S").unwrap();
        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.cell("A4"), Some(&CellValue::Int(2)));
    }

    #[test]
    fn invalid_options_rejected() {
        let opts = MapperOptions {
            tag_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            Mapper::try_from_options(opts),
            Err(MapperError::Config(_))
        ));
    }

    #[test]
    fn resolve_exposes_plan() {
        let mapper = Mapper::new(MapperConfig::new().auto_sort(false));
        let plan = mapper.resolve::<Pair>().unwrap();
        assert_eq!(plan.columns()[0].field_path, "b");
        assert_eq!(plan.columns()[0].formatter_key.as_deref(), Some("shout"));
    }
}
