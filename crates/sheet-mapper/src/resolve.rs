//! Column resolution.
//!
//! Walks a [`Schema`] in declaration order and produces a [`ResolvedPlan`]:
//!
//! - non-exported fields are skipped
//! - embedded fields are flattened in place, their paths prefixed with
//!   `<name>.`; pivot declarations inside them are ignored
//! - a collection with a `dynamic` key becomes the plan's pivot rule
//! - any other field with a `header` key becomes a static column
//!
//! Positions come from one of two modes. In auto mode the flattened columns
//! are numbered `0..n` in declaration order. In manual mode each column
//! takes its `index` value verbatim and fields without `index` are left out,
//! so the plan may be sparse.

use std::collections::HashMap;

use log::{debug, trace};

use crate::column::{Column, ResolvedPlan};
use crate::error::{MapperError, Result};
use crate::pivot::{extract_rule, PivotRule};
use crate::schema::{FieldKind, Schema, SheetRecord};
use crate::sink::MAX_COLUMNS;
use crate::tags::{
    TagParser, DEFAULT_TAG_KEY, KEY_DEFAULT, KEY_DYNAMIC, KEY_FORMAT, KEY_HEADER, KEY_INDEX,
    KEY_WIDTH,
};

/// Turns schemas into column plans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolver {
    tag_key: String,
    auto_sort: bool,
    parser: TagParser,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(DEFAULT_TAG_KEY, true)
    }
}

impl Resolver {
    /// Create a resolver reading metadata under `tag_key`.
    pub fn new(tag_key: impl Into<String>, auto_sort: bool) -> Self {
        Resolver {
            tag_key: tag_key.into(),
            auto_sort,
            parser: TagParser::default(),
        }
    }

    /// Use a parser with a different segment delimiter.
    pub fn with_parser(mut self, parser: TagParser) -> Self {
        self.parser = parser;
        self
    }

    /// Attribute key metadata is read from.
    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    /// `true` in auto mode, `false` when positions come from `index`.
    pub fn auto_sort(&self) -> bool {
        self.auto_sort
    }

    /// Resolve the plan of a [`SheetRecord`] type.
    pub fn resolve_record<R: SheetRecord>(&self) -> Result<ResolvedPlan> {
        self.resolve(&R::sheet_schema())
    }

    /// Resolve the plan of a schema.
    ///
    /// # Errors
    ///
    /// - [`MapperError::InvalidIndex`] if a manual-mode `index` is not a
    ///   non-negative integer below [`MAX_COLUMNS`]
    /// - [`MapperError::DuplicateIndex`] if two manual-mode columns share an index
    /// - [`MapperError::InvalidPivot`] if more than one pivot source is
    ///   declared or a pivot element type is malformed
    pub fn resolve<R: 'static>(&self, schema: &Schema<R>) -> Result<ResolvedPlan> {
        let mut columns = Vec::new();
        let mut pivot = None;
        self.walk(schema, "", true, &mut columns, &mut pivot)?;

        if self.auto_sort {
            for (i, col) in columns.iter_mut().enumerate() {
                col.position = i;
            }
        } else {
            let mut seen: HashMap<usize, &str> = HashMap::new();
            for col in &columns {
                if let Some(first) = seen.insert(col.position, &col.field_path) {
                    return Err(MapperError::DuplicateIndex {
                        index: col.position,
                        first: first.to_string(),
                        second: col.field_path.clone(),
                    });
                }
            }
        }

        let plan = ResolvedPlan::new(columns, pivot);
        debug!(
            "resolved {} column(s) over {} slot(s), pivot: {}",
            plan.columns().len(),
            plan.static_width(),
            plan.pivot()
                .map(|p| p.source_field.as_str())
                .unwrap_or("none")
        );
        Ok(plan)
    }

    fn walk<R: 'static>(
        &self,
        schema: &Schema<R>,
        prefix: &str,
        top_level: bool,
        columns: &mut Vec<Column>,
        pivot: &mut Option<PivotRule>,
    ) -> Result<()> {
        for field in schema.fields() {
            let path = format!("{}{}", prefix, field.name());

            if !field.is_exported() {
                trace!("skip {}: not exported", path);
                continue;
            }

            if let FieldKind::Embedded(sub) = field.kind() {
                self.walk(sub, &format!("{}.", path), false, columns, pivot)?;
                continue;
            }

            let Some(meta) = field.meta(&self.tag_key) else {
                trace!("skip {}: no {} metadata", path, self.tag_key);
                continue;
            };
            let tags = self.parser.parse(meta);

            if let FieldKind::Collection(def) = field.kind() {
                let Some(template) = tags.get(KEY_DYNAMIC) else {
                    trace!("skip {}: collection without {}", path, KEY_DYNAMIC);
                    continue;
                };
                if !top_level {
                    trace!("ignore pivot {} inside an embedded record", path);
                    continue;
                }
                let rule = extract_rule(&path, template, def, &self.tag_key, &self.parser)?;
                if let Some(prev) = pivot {
                    return Err(MapperError::InvalidPivot {
                        field: path,
                        reason: format!("{} is already the pivot source", prev.source_field),
                    });
                }
                *pivot = Some(rule);
                continue;
            }

            let Some(header) = tags.get(KEY_HEADER) else {
                trace!("skip {}: no {}", path, KEY_HEADER);
                continue;
            };

            let position = if self.auto_sort {
                columns.len()
            } else {
                let Some(raw) = tags.get(KEY_INDEX) else {
                    trace!("skip {}: no {} in manual mode", path, KEY_INDEX);
                    continue;
                };
                parse_index(&path, raw)?
            };

            let width = tags
                .get(KEY_WIDTH)
                .and_then(|w| w.parse::<f64>().ok())
                .filter(|w| w.is_finite());

            columns.push(Column {
                position,
                header: header.clone(),
                width,
                default_text: tags.get(KEY_DEFAULT).cloned().unwrap_or_default(),
                formatter_key: tags.get(KEY_FORMAT).filter(|k| !k.is_empty()).cloned(),
                field_path: path,
            });
        }
        Ok(())
    }
}

/// A manual `index` must be a non-negative integer that fits on a sheet.
fn parse_index(field: &str, raw: &str) -> Result<usize> {
    raw.parse::<i64>()
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n < MAX_COLUMNS)
        .ok_or_else(|| MapperError::InvalidIndex {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use crate::value::CellValue;

    struct Meta {
        created: String,
        owner: String,
    }

    impl SheetRecord for Meta {
        fn sheet_schema() -> Schema<Self> {
            Schema::builder()
                .value("created", "header:Created", |m: &Meta| &m.created)
                .value("owner", "header:Owner;index:5", |m: &Meta| &m.owner)
                .build()
        }
    }

    struct Sample {
        year: i32,
        value: f64,
    }

    impl SheetRecord for Sample {
        fn sheet_schema() -> Schema<Self> {
            Schema::builder()
                .value("year", "dynamicpos:$1", |s: &Sample| &s.year)
                .value("value", "dynamicval:", |s: &Sample| &s.value)
                .build()
        }
    }

    struct Row {
        id: i64,
        name: String,
        secret: String,
        notes: String,
        meta: Meta,
        samples: Vec<Sample>,
        extra: Vec<Sample>,
    }

    fn schema() -> Schema<Row> {
        Schema::builder()
            .value("id", "header:Id;index:0;width:8", |r: &Row| &r.id)
            .field(
                FieldDef::value("secret", |r: &Row| &r.secret)
                    .tag(DEFAULT_TAG_KEY, "header:Secret;index:9")
                    .private(),
            )
            .value("name", "header:Name;index:2;default:-;format:upper", |r: &Row| {
                &r.name
            })
            .field(FieldDef::value("notes", |r: &Row| &r.notes))
            .embed("meta", |r: &Row| &r.meta)
            .collection("samples", "dynamic:Y$1", |r: &Row| &r.samples[..])
            .build()
    }

    fn headers(plan: &ResolvedPlan) -> Vec<&str> {
        plan.columns().iter().map(|c| c.header.as_str()).collect()
    }

    #[test]
    fn auto_mode_numbers_flattened_columns() {
        let plan = Resolver::default().resolve(&schema()).unwrap();
        assert_eq!(headers(&plan), vec!["Id", "Name", "Created", "Owner"]);
        let positions: Vec<_> = plan.columns().iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(plan.columns()[2].field_path, "meta.created");
    }

    #[test]
    fn manual_mode_uses_index_and_skips_missing() {
        let plan = Resolver::new(DEFAULT_TAG_KEY, false)
            .resolve(&schema())
            .unwrap();
        let got: Vec<_> = plan
            .columns()
            .iter()
            .map(|c| (c.position, c.header.as_str()))
            .collect();
        assert_eq!(got, vec![(0, "Id"), (2, "Name"), (5, "Owner")]);
        assert_eq!(plan.static_width(), 6);
    }

    #[test]
    fn column_attributes() {
        let plan = Resolver::default().resolve(&schema()).unwrap();
        let id = &plan.columns()[0];
        assert_eq!(id.width, Some(8.0));
        assert_eq!(id.formatter_key, None);
        let name = &plan.columns()[1];
        assert_eq!(name.default_text, "-");
        assert_eq!(name.formatter_key.as_deref(), Some("upper"));
        assert_eq!(name.width, None);
    }

    #[test]
    fn pivot_is_extracted() {
        let plan = Resolver::default().resolve(&schema()).unwrap();
        let pivot = plan.pivot().unwrap();
        assert_eq!(pivot.source_field, "samples");
        assert_eq!(pivot.header_template, "Y$1");
        assert_eq!(pivot.value_field, "value");
    }

    #[test]
    fn second_pivot_is_rejected() {
        let schema = Schema::builder()
            .collection("samples", "dynamic:$1", |r: &Row| &r.samples[..])
            .collection("extra", "dynamic:$1", |r: &Row| &r.extra[..])
            .build();
        let err = Resolver::default().resolve(&schema).unwrap_err();
        match err {
            MapperError::InvalidPivot { field, reason } => {
                assert_eq!(field, "extra");
                assert!(reason.contains("samples"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn collection_without_dynamic_is_skipped() {
        let schema = Schema::builder()
            .collection("samples", "header:Samples", |r: &Row| &r.samples[..])
            .build();
        let plan = Resolver::default().resolve(&schema).unwrap();
        assert!(plan.columns().is_empty());
        assert!(plan.pivot().is_none());
    }

    #[test]
    fn invalid_index_is_fatal() {
        for raw in ["abc", "1.5", "-1", "", "16384", "9223372036854775807"] {
            let schema = Schema::builder()
                .value("id", &format!("header:Id;index:{}", raw), |r: &Row| &r.id)
                .build();
            let err = Resolver::new(DEFAULT_TAG_KEY, false)
                .resolve(&schema)
                .unwrap_err();
            assert!(
                matches!(err, MapperError::InvalidIndex { ref value, .. } if value == raw),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn invalid_index_ignored_in_auto_mode() {
        let schema = Schema::builder()
            .value("id", "header:Id;index:abc", |r: &Row| &r.id)
            .build();
        assert!(Resolver::default().resolve(&schema).is_ok());
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let schema = Schema::builder()
            .value("id", "header:Id;index:1", |r: &Row| &r.id)
            .value("name", "header:Name;index:1", |r: &Row| &r.name)
            .build();
        let err = Resolver::new(DEFAULT_TAG_KEY, false)
            .resolve(&schema)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "column index 1 is claimed by both id and name"
        );
    }

    #[test]
    fn invalid_width_is_unset() {
        let schema = Schema::builder()
            .value("id", "header:Id;width:wide", |r: &Row| &r.id)
            .value("name", "header:Name;width:NaN", |r: &Row| &r.name)
            .build();
        let plan = Resolver::default().resolve(&schema).unwrap();
        assert!(plan.columns().iter().all(|c| c.width.is_none()));
    }

    #[test]
    fn custom_tag_key_and_delimiter() {
        let schema = Schema::builder()
            .field(FieldDef::value("id", |r: &Row| &r.id).tag("xlsx", "header:Id|width:4"))
            .value("name", "header:Name", |r: &Row| &r.name)
            .build();
        let plan = Resolver::new("xlsx", true)
            .with_parser(TagParser::new("|"))
            .resolve(&schema)
            .unwrap();
        assert_eq!(headers(&plan), vec!["Id"]);
        assert_eq!(plan.columns()[0].width, Some(4.0));
    }

    #[test]
    fn header_key_required() {
        let schema = Schema::builder()
            .value("id", "width:4;index:0", |r: &Row| &r.id)
            .build();
        let plan = Resolver::default().resolve(&schema).unwrap();
        assert!(plan.columns().is_empty());
    }

    #[test]
    fn nested_pivot_is_ignored() {
        struct Inner {
            samples: Vec<Sample>,
            label: String,
        }
        impl SheetRecord for Inner {
            fn sheet_schema() -> Schema<Self> {
                Schema::builder()
                    .value("label", "header:Label", |i: &Inner| &i.label)
                    .collection("samples", "dynamic:$1", |i: &Inner| &i.samples[..])
                    .build()
            }
        }
        struct Outer {
            inner: Inner,
        }
        let schema = Schema::builder()
            .embed("inner", |o: &Outer| &o.inner)
            .build();
        let plan = Resolver::default().resolve(&schema).unwrap();
        assert_eq!(headers(&plan), vec!["Label"]);
        assert!(plan.pivot().is_none());
    }

    #[test]
    fn last_sheet_column_is_a_valid_index() {
        let schema = Schema::builder()
            .value("id", "header:Id;index:16383", |r: &Row| &r.id)
            .build();
        let plan = Resolver::new(DEFAULT_TAG_KEY, false)
            .resolve(&schema)
            .unwrap();
        assert_eq!(plan.static_width(), MAX_COLUMNS);
    }

    #[test]
    fn malformed_nested_pivot_is_ignored() {
        struct Loose {
            year: i32,
        }
        impl SheetRecord for Loose {
            fn sheet_schema() -> Schema<Self> {
                Schema::builder()
                    .value("year", "dynamicpos:$1", |l: &Loose| &l.year)
                    .build()
            }
        }
        struct Inner {
            label: String,
            loose: Vec<Loose>,
        }
        impl SheetRecord for Inner {
            fn sheet_schema() -> Schema<Self> {
                Schema::builder()
                    .value("label", "header:Label", |i: &Inner| &i.label)
                    .collection("loose", "dynamic:$1", |i: &Inner| &i.loose[..])
                    .build()
            }
        }
        struct Outer {
            inner: Inner,
            samples: Vec<Sample>,
        }
        let schema = Schema::builder()
            .embed("inner", |o: &Outer| &o.inner)
            .collection("samples", "dynamic:$1", |o: &Outer| &o.samples[..])
            .build();

        let plan = Resolver::default().resolve(&schema).unwrap();
        assert_eq!(headers(&plan), vec!["Label"]);
        assert_eq!(plan.pivot().map(|p| p.source_field.as_str()), Some("samples"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn generated(metas: &[String]) -> Schema<Vec<i64>> {
            let mut builder = Schema::<Vec<i64>>::builder();
            for (i, meta) in metas.iter().enumerate() {
                builder = builder.field(
                    FieldDef::computed(&format!("f{}", i), CellValue::Int(0), move |r: &Vec<i64>| {
                        r.get(i).map(|v| CellValue::Int(*v))
                    })
                    .tag(DEFAULT_TAG_KEY, meta),
                );
            }
            builder.build()
        }

        fn meta_strategy() -> impl Strategy<Value = String> {
            prop_oneof![
                "header:[A-Za-z]{1,6}",
                "header:[A-Za-z]{1,6};width:[0-9]{1,2}",
                "width:[0-9]{1,2}",
                "default:x",
            ]
        }

        proptest! {
            #[test]
            fn resolution_is_deterministic(metas in proptest::collection::vec(meta_strategy(), 0..12)) {
                let schema = generated(&metas);
                let resolver = Resolver::default();
                let a = resolver.resolve(&schema).unwrap();
                let b = resolver.resolve(&schema).unwrap();
                prop_assert_eq!(a, b);
            }

            #[test]
            fn auto_positions_are_dense(metas in proptest::collection::vec(meta_strategy(), 0..12)) {
                let schema = generated(&metas);
                let plan = Resolver::default().resolve(&schema).unwrap();
                let with_header = metas.iter().filter(|m| m.starts_with("header:")).count();
                prop_assert_eq!(plan.columns().len(), with_header);
                for (i, col) in plan.columns().iter().enumerate() {
                    prop_assert_eq!(col.position, i);
                }
            }

            #[test]
            fn manual_positions_match_indices(
                indices in proptest::collection::btree_set(0usize..64, 0..10)
            ) {
                let metas: Vec<String> = indices
                    .iter()
                    .rev()
                    .map(|i| format!("header:H{};index:{}", i, i))
                    .collect();
                let plan = Resolver::new(DEFAULT_TAG_KEY, false)
                    .resolve(&generated(&metas))
                    .unwrap();
                let got: Vec<usize> = plan.columns().iter().map(|c| c.position).collect();
                let want: Vec<usize> = indices.into_iter().collect();
                prop_assert_eq!(got, want);
            }
        }
    }
}
