//! Explicit schema description for record types.
//!
//! A [`Schema`] lists the fields of a record type in declaration order. Each
//! field has a name, an exported flag, its metadata strings keyed by
//! attribute name, and a [`FieldKind`] saying how values are read:
//!
//! - [`FieldKind::Value`]: a typed getter producing a [`CellValue`]
//! - [`FieldKind::Embedded`]: a sub-schema whose columns are spliced in place
//! - [`FieldKind::Collection`]: a nested sequence, usable as a pivot source
//!
//! Sub-schemas are rebased onto the parent record when they are attached, so
//! every getter in a `Schema<R>` reads directly from an `&R`.
//!
//! Most schemas come from `#[derive(SheetRecord)]`. They can also be written
//! by hand:
//!
//! ```
//! use sheet_mapper::{Schema, SheetRecord};
//!
//! struct Person {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl SheetRecord for Person {
//!     fn sheet_schema() -> Schema<Self> {
//!         Schema::builder()
//!             .value("id", "header:Number", |p: &Person| &p.id)
//!             .value("name", "header:Name;width:20", |p: &Person| &p.name)
//!             .build()
//!     }
//! }
//!
//! let schema = Person::sheet_schema();
//! assert_eq!(schema.len(), 2);
//! assert!(schema.lookup("name").is_some());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::tags::DEFAULT_TAG_KEY;
use crate::value::{CellValue, ToCell};

/// Reads one cell value from a record. `None` means an absent optional.
pub type Getter<R> = Arc<dyn Fn(&R) -> Option<CellValue> + Send + Sync>;

/// Reads one cell value from the `i`-th element of a nested collection.
pub type ElementGetter<R> = Arc<dyn Fn(&R, usize) -> Option<CellValue> + Send + Sync>;

type Projection<R, S> = Arc<dyn for<'a> Fn(&'a R) -> Option<&'a S> + Send + Sync>;

fn projection<R, S, F>(f: F) -> F
where
    F: for<'a> Fn(&'a R) -> Option<&'a S>,
{
    f
}

/// Record types that describe their own schema.
pub trait SheetRecord: Sized + 'static {
    /// The field list of this record type.
    fn sheet_schema() -> Schema<Self>;
}

/// Ordered field list of a record type.
pub struct Schema<R> {
    fields: Vec<FieldDef<R>>,
}

impl<R: 'static> Schema<R> {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder<R> {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef<R>] {
        &self.fields
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find a field by dotted path, descending through embedded fields.
    pub fn lookup(&self, path: &str) -> Option<&FieldDef<R>> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let field = self.fields.iter().find(|f| f.name == head)?;
        match (rest, &field.kind) {
            (None, _) => Some(field),
            (Some(rest), FieldKind::Embedded(sub)) => sub.lookup(rest),
            (Some(_), _) => None,
        }
    }

    fn rebase<P: 'static>(self, proj: Projection<P, R>) -> Schema<P> {
        Schema {
            fields: self
                .fields
                .into_iter()
                .map(|f| f.rebase(proj.clone()))
                .collect(),
        }
    }
}

impl<R> Clone for Schema<R> {
    fn clone(&self) -> Self {
        Schema {
            fields: self.fields.clone(),
        }
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder<R> {
    fields: Vec<FieldDef<R>>,
}

impl<R: 'static> SchemaBuilder<R> {
    /// Append a field.
    pub fn field(mut self, field: FieldDef<R>) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a scalar field with metadata under the default attribute key.
    pub fn value<T: ToCell + 'static>(self, name: &str, meta: &str, get: fn(&R) -> &T) -> Self {
        self.field(FieldDef::value(name, get).tag(DEFAULT_TAG_KEY, meta))
    }

    /// Append an embedded record whose columns are spliced in place.
    pub fn embed<S: SheetRecord>(self, name: &str, get: fn(&R) -> &S) -> Self {
        self.field(FieldDef::embedded_record(name, get))
    }

    /// Append a nested collection with metadata under the default attribute key.
    pub fn collection<E: SheetRecord>(self, name: &str, meta: &str, get: fn(&R) -> &[E]) -> Self {
        self.field(FieldDef::collection_record(name, get).tag(DEFAULT_TAG_KEY, meta))
    }

    /// Finish the schema.
    pub fn build(self) -> Schema<R> {
        Schema {
            fields: self.fields,
        }
    }
}

/// One described field.
pub struct FieldDef<R> {
    name: String,
    exported: bool,
    tags: BTreeMap<String, String>,
    kind: FieldKind<R>,
}

/// How a field's values are read.
pub enum FieldKind<R> {
    /// A scalar value and the zero value of its type.
    Value { get: Getter<R>, zero: CellValue },
    /// A sub-record whose fields are spliced into the parent.
    Embedded(Schema<R>),
    /// A nested sequence of sub-records.
    Collection(CollectionDef<R>),
}

impl<R: 'static> FieldDef<R> {
    fn new(name: &str, kind: FieldKind<R>) -> Self {
        FieldDef {
            name: name.to_string(),
            exported: true,
            tags: BTreeMap::new(),
            kind,
        }
    }

    /// A scalar field read through `get`.
    pub fn value<T: ToCell + 'static>(name: &str, get: fn(&R) -> &T) -> Self {
        Self::new(
            name,
            FieldKind::Value {
                get: Arc::new(move |r: &R| get(r).to_cell()),
                zero: T::zero_cell(),
            },
        )
    }

    /// A scalar field computed from the whole record.
    pub fn computed<F>(name: &str, zero: CellValue, get: F) -> Self
    where
        F: Fn(&R) -> Option<CellValue> + Send + Sync + 'static,
    {
        Self::new(
            name,
            FieldKind::Value {
                get: Arc::new(get),
                zero,
            },
        )
    }

    /// An embedded sub-record with an explicit schema.
    pub fn embedded<S: 'static>(name: &str, get: fn(&R) -> &S, schema: Schema<S>) -> Self {
        let proj: Projection<R, S> = Arc::new(projection(move |r: &R| Some(get(r))));
        Self::new(name, FieldKind::Embedded(schema.rebase(proj)))
    }

    /// An optional embedded sub-record; when absent its fields read as zero.
    pub fn embedded_optional<S: 'static>(
        name: &str,
        get: fn(&R) -> Option<&S>,
        schema: Schema<S>,
    ) -> Self {
        let proj: Projection<R, S> = Arc::new(projection(get));
        Self::new(name, FieldKind::Embedded(schema.rebase(proj)))
    }

    /// [`FieldDef::embedded`] using the sub-record's own schema.
    pub fn embedded_record<S: SheetRecord>(name: &str, get: fn(&R) -> &S) -> Self {
        Self::embedded(name, get, S::sheet_schema())
    }

    /// [`FieldDef::embedded_optional`] using the sub-record's own schema.
    pub fn embedded_optional_record<S: SheetRecord>(name: &str, get: fn(&R) -> Option<&S>) -> Self {
        Self::embedded_optional(name, get, S::sheet_schema())
    }

    /// A nested collection whose elements are described by `schema`.
    ///
    /// Only the scalar fields of the element schema are carried over.
    pub fn collection<E: 'static>(name: &str, get: fn(&R) -> &[E], schema: Schema<E>) -> Self {
        let fields = schema
            .fields
            .into_iter()
            .filter_map(|f| match f.kind {
                FieldKind::Value { get: read, .. } => Some(ElementField {
                    name: f.name,
                    exported: f.exported,
                    tags: f.tags,
                    get: Arc::new(move |r: &R, i: usize| get(r).get(i).and_then(|e| read(e))),
                }),
                _ => None,
            })
            .collect();
        Self::new(
            name,
            FieldKind::Collection(CollectionDef {
                len: Arc::new(move |r: &R| get(r).len()),
                fields,
            }),
        )
    }

    /// [`FieldDef::collection`] using the element's own schema.
    pub fn collection_record<E: SheetRecord>(name: &str, get: fn(&R) -> &[E]) -> Self {
        Self::collection(name, get, E::sheet_schema())
    }

    /// Attach a metadata string under an attribute key.
    pub fn tag(mut self, key: &str, meta: &str) -> Self {
        self.tags.insert(key.to_string(), meta.to_string());
        self
    }

    /// Mark the field as non-exported; resolvers skip it.
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    fn rebase<P: 'static>(self, proj: Projection<P, R>) -> FieldDef<P> {
        let kind = match self.kind {
            FieldKind::Value { get, zero } => {
                let proj = proj.clone();
                FieldKind::Value {
                    get: Arc::new(move |p: &P| proj(p).and_then(|r| get(r))),
                    zero,
                }
            }
            FieldKind::Embedded(sub) => FieldKind::Embedded(sub.rebase(proj)),
            FieldKind::Collection(def) => FieldKind::Collection(def.rebase(proj)),
        };
        FieldDef {
            name: self.name,
            exported: self.exported,
            tags: self.tags,
            kind,
        }
    }
}

impl<R> FieldDef<R> {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field is visible to resolvers.
    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// Raw metadata string under an attribute key.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// How the field's values are read.
    pub fn kind(&self) -> &FieldKind<R> {
        &self.kind
    }
}

impl<R> Clone for FieldDef<R> {
    fn clone(&self) -> Self {
        FieldDef {
            name: self.name.clone(),
            exported: self.exported,
            tags: self.tags.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl<R> Clone for FieldKind<R> {
    fn clone(&self) -> Self {
        match self {
            FieldKind::Value { get, zero } => FieldKind::Value {
                get: get.clone(),
                zero: zero.clone(),
            },
            FieldKind::Embedded(sub) => FieldKind::Embedded(sub.clone()),
            FieldKind::Collection(def) => FieldKind::Collection(def.clone()),
        }
    }
}

impl<R> fmt::Debug for FieldDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FieldDef");
        s.field("name", &self.name)
            .field("exported", &self.exported)
            .field("tags", &self.tags);
        match &self.kind {
            FieldKind::Value { zero, .. } => s.field("zero", zero),
            FieldKind::Embedded(sub) => s.field("embedded", sub),
            FieldKind::Collection(def) => s.field("collection", def),
        };
        s.finish()
    }
}

/// A nested collection rebased onto the owning record.
pub struct CollectionDef<R> {
    len: Arc<dyn Fn(&R) -> usize + Send + Sync>,
    fields: Vec<ElementField<R>>,
}

impl<R> CollectionDef<R> {
    /// Number of elements in `record`'s collection.
    pub fn len(&self, record: &R) -> usize {
        (self.len)(record)
    }

    /// Scalar fields of the element type, in declaration order.
    pub fn fields(&self) -> &[ElementField<R>] {
        &self.fields
    }

    /// Find an element field by name.
    pub fn field(&self, name: &str) -> Option<&ElementField<R>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl<R: 'static> CollectionDef<R> {
    fn rebase<P: 'static>(self, proj: Projection<P, R>) -> CollectionDef<P> {
        let len = self.len;
        let len_proj = proj.clone();
        CollectionDef {
            len: Arc::new(move |p: &P| len_proj(p).map(|r| len(r)).unwrap_or(0)),
            fields: self
                .fields
                .into_iter()
                .map(|f| {
                    let proj = proj.clone();
                    let get = f.get;
                    ElementField {
                        name: f.name,
                        exported: f.exported,
                        tags: f.tags,
                        get: Arc::new(move |p: &P, i: usize| proj(p).and_then(|r| get(r, i))),
                    }
                })
                .collect(),
        }
    }
}

impl<R> Clone for CollectionDef<R> {
    fn clone(&self) -> Self {
        CollectionDef {
            len: self.len.clone(),
            fields: self.fields.clone(),
        }
    }
}

impl<R> fmt::Debug for CollectionDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

/// A scalar field of a collection element.
pub struct ElementField<R> {
    name: String,
    exported: bool,
    tags: BTreeMap<String, String>,
    get: ElementGetter<R>,
}

impl<R> ElementField<R> {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field is visible to resolvers.
    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// Raw metadata string under an attribute key.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Read the field from element `index` of `record`'s collection.
    pub fn read(&self, record: &R, index: usize) -> Option<CellValue> {
        (self.get)(record, index)
    }
}

impl<R> Clone for ElementField<R> {
    fn clone(&self) -> Self {
        ElementField {
            name: self.name.clone(),
            exported: self.exported,
            tags: self.tags.clone(),
            get: self.get.clone(),
        }
    }
}

impl<R> fmt::Debug for ElementField<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementField")
            .field("name", &self.name)
            .field("exported", &self.exported)
            .field("tags", &self.tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Audit {
        created_by: String,
        revision: Option<u32>,
    }

    impl SheetRecord for Audit {
        fn sheet_schema() -> Schema<Self> {
            Schema::builder()
                .value("created_by", "header:Created By", |a: &Audit| &a.created_by)
                .value("revision", "header:Revision", |a: &Audit| &a.revision)
                .build()
        }
    }

    struct Point {
        label: String,
        amount: f64,
    }

    impl SheetRecord for Point {
        fn sheet_schema() -> Schema<Self> {
            Schema::builder()
                .value("label", "dynamicpos:$1", |p: &Point| &p.label)
                .value("amount", "dynamicval:", |p: &Point| &p.amount)
                .build()
        }
    }

    struct Order {
        id: i64,
        audit: Audit,
        prior: Option<Audit>,
        points: Vec<Point>,
    }

    impl SheetRecord for Order {
        fn sheet_schema() -> Schema<Self> {
            Schema::builder()
                .value("id", "header:Id", |o: &Order| &o.id)
                .embed("audit", |o: &Order| &o.audit)
                .field(FieldDef::embedded_optional_record("prior", |o: &Order| {
                    o.prior.as_ref()
                }))
                .collection("points", "dynamic:$1", |o: &Order| &o.points[..])
                .build()
        }
    }

    fn order() -> Order {
        Order {
            id: 7,
            audit: Audit {
                created_by: "ann".into(),
                revision: Some(3),
            },
            prior: None,
            points: vec![
                Point {
                    label: "a".into(),
                    amount: 1.5,
                },
                Point {
                    label: "b".into(),
                    amount: 0.0,
                },
            ],
        }
    }

    fn read(schema: &Schema<Order>, path: &str, record: &Order) -> Option<CellValue> {
        match schema.lookup(path).map(FieldDef::kind) {
            Some(FieldKind::Value { get, .. }) => get(record),
            other => panic!("{} is not a value field: {:?}", path, other.is_some()),
        }
    }

    #[test]
    fn lookup_descends_into_embedded() {
        let schema = Order::sheet_schema();
        let record = order();
        assert_eq!(read(&schema, "id", &record), Some(CellValue::Int(7)));
        assert_eq!(
            read(&schema, "audit.created_by", &record),
            Some(CellValue::Text("ann".into()))
        );
        assert_eq!(
            read(&schema, "audit.revision", &record),
            Some(CellValue::Int(3))
        );
    }

    #[test]
    fn lookup_misses() {
        let schema = Order::sheet_schema();
        assert!(schema.lookup("nope").is_none());
        assert!(schema.lookup("id.inner").is_none());
        assert!(schema.lookup("audit.nope").is_none());
    }

    #[test]
    fn absent_optional_embed_reads_none_with_typed_zero() {
        let schema = Order::sheet_schema();
        let record = order();
        assert_eq!(read(&schema, "prior.created_by", &record), None);
        match schema.lookup("prior.revision").map(FieldDef::kind) {
            Some(FieldKind::Value { zero, .. }) => assert_eq!(zero, &CellValue::Int(0)),
            _ => panic!("expected value field"),
        }
    }

    #[test]
    fn collection_elements_are_readable() {
        let schema = Order::sheet_schema();
        let record = order();
        let def = match schema.lookup("points").map(FieldDef::kind) {
            Some(FieldKind::Collection(def)) => def,
            _ => panic!("expected collection"),
        };
        assert_eq!(def.len(&record), 2);
        let amount = def.field("amount").unwrap();
        assert_eq!(amount.read(&record, 0), Some(CellValue::Float(1.5)));
        assert_eq!(amount.read(&record, 5), None);
        assert_eq!(amount.meta(DEFAULT_TAG_KEY), Some("dynamicval:"));
    }

    #[test]
    fn private_and_tags() {
        let field: FieldDef<Order> = FieldDef::value("id", |o: &Order| &o.id)
            .tag("alt", "header:Other")
            .private();
        assert!(!field.is_exported());
        assert_eq!(field.meta("alt"), Some("header:Other"));
        assert_eq!(field.meta(DEFAULT_TAG_KEY), None);
    }

    #[test]
    fn computed_field() {
        let field: FieldDef<Order> = FieldDef::computed("points_len", CellValue::Int(0), |o: &Order| {
            Some(CellValue::Int(o.points.len() as i64))
        });
        match field.kind() {
            FieldKind::Value { get, .. } => assert_eq!(get(&order()), Some(CellValue::Int(2))),
            _ => panic!("expected value field"),
        }
    }
}
