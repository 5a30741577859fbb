//! Dynamic pivot columns.
//!
//! A collection field annotated with `dynamic:<template>` expands into extra
//! columns. Each element of the collection names one column by substituting
//! its `dynamicpos:<token>` fields into the template, and supplies the cell
//! text through its single `dynamicval` field.
//!
//! Materialization is two-pass: [`DynamicHeaders`] first collects every
//! distinct header across all records in first-seen order, then each record
//! fills the slots for the headers its elements produce.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, Result};
use crate::schema::{CollectionDef, ElementField};
use crate::tags::{TagParser, KEY_DYNAMIC_POS, KEY_DYNAMIC_VAL};
use crate::value::CellValue;

/// How one collection field expands into extra columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotRule {
    /// Record field holding the collection.
    pub source_field: String,
    /// Header template with placeholder tokens such as `$1/$2`.
    pub header_template: String,
    /// Placeholder token to element field name.
    pub position_fields: BTreeMap<String, String>,
    /// Element field supplying the cell value.
    pub value_field: String,
}

impl PivotRule {
    /// Substitute every token in the template with `lookup(field_name)`.
    ///
    /// The template is scanned once; at each offset the longest matching
    /// token is replaced, so `$1` never eats the prefix of `$10` and
    /// substituted text is never rescanned.
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use sheet_mapper::PivotRule;
    ///
    /// let rule = PivotRule {
    ///     source_field: "values".into(),
    ///     header_template: "$1/$2".into(),
    ///     position_fields: BTreeMap::from([
    ///         ("$1".to_string(), "year".to_string()),
    ///         ("$2".to_string(), "quarter".to_string()),
    ///     ]),
    ///     value_field: "value".into(),
    /// };
    /// let header = rule.render_header(|field| match field {
    ///     "year" => "2021".to_string(),
    ///     _ => "3".to_string(),
    /// });
    /// assert_eq!(header, "2021/3");
    /// ```
    pub fn render_header<F>(&self, mut lookup: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut tokens: Vec<(&str, &str)> = self
            .position_fields
            .iter()
            .map(|(t, f)| (t.as_str(), f.as_str()))
            .collect();
        tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

        let template = self.header_template.as_str();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        'scan: while !rest.is_empty() {
            for (token, field) in &tokens {
                if let Some(after) = rest.strip_prefix(token) {
                    out.push_str(&lookup(*field));
                    rest = after;
                    continue 'scan;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
        out
    }
}

/// Build a pivot rule from a collection field and its element fields.
///
/// Only exported element fields carrying metadata under `tag_key` are
/// considered. A field with `dynamicpos` contributes a token; a field with
/// `dynamicval` becomes the value field.
pub(crate) fn extract_rule<R>(
    source_field: &str,
    template: &str,
    def: &CollectionDef<R>,
    tag_key: &str,
    parser: &TagParser,
) -> Result<PivotRule> {
    let invalid = |reason: String| MapperError::InvalidPivot {
        field: source_field.to_string(),
        reason,
    };

    let mut position_fields = BTreeMap::new();
    let mut value_field: Option<String> = None;

    for field in def.fields() {
        if !field.is_exported() {
            continue;
        }
        let Some(meta) = field.meta(tag_key) else {
            continue;
        };
        let tags = parser.parse(meta);

        if let Some(token) = tags.get(KEY_DYNAMIC_POS) {
            if token.is_empty() {
                return Err(invalid(format!("field {} has an empty placeholder", field.name())));
            }
            if let Some(prev) = position_fields.insert(token.clone(), field.name().to_string()) {
                return Err(invalid(format!(
                    "placeholder {} is claimed by both {} and {}",
                    token,
                    prev,
                    field.name()
                )));
            }
            continue;
        }

        if tags.contains_key(KEY_DYNAMIC_VAL) {
            if let Some(prev) = &value_field {
                return Err(invalid(format!(
                    "more than one value field ({} and {})",
                    prev,
                    field.name()
                )));
            }
            value_field = Some(field.name().to_string());
        }
    }

    let value_field = value_field.ok_or_else(|| invalid("no value field".to_string()))?;

    debug!(
        "pivot on {}: template {:?}, {} placeholder(s), value from {}",
        source_field,
        template,
        position_fields.len(),
        value_field
    );

    Ok(PivotRule {
        source_field: source_field.to_string(),
        header_template: template.to_string(),
        position_fields,
        value_field,
    })
}

/// Distinct dynamic headers in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicHeaders {
    order: Vec<String>,
    index: HashMap<String, usize>,
}

impl DynamicHeaders {
    /// Empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header if unseen. Returns its slot.
    pub fn insert(&mut self, header: String) -> usize {
        if let Some(&slot) = self.index.get(&header) {
            return slot;
        }
        let slot = self.order.len();
        self.index.insert(header.clone(), slot);
        self.order.push(header);
        slot
    }

    /// Slot of a header.
    pub fn slot(&self, header: &str) -> Option<usize> {
        self.index.get(header).copied()
    }

    /// Headers in first-seen order.
    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// A pivot rule bound to the element getters of a concrete schema.
pub(crate) struct PivotReader<'a, R> {
    def: &'a CollectionDef<R>,
    rule: &'a PivotRule,
    positions: HashMap<&'a str, &'a ElementField<R>>,
    value: &'a ElementField<R>,
}

impl<'a, R> PivotReader<'a, R> {
    pub(crate) fn bind(rule: &'a PivotRule, def: &'a CollectionDef<R>) -> Result<Self> {
        let find = |name: &str| {
            def.field(name).ok_or_else(|| {
                MapperError::Shape(format!(
                    "pivot element of {} has no field {}",
                    rule.source_field, name
                ))
            })
        };
        let mut positions = HashMap::new();
        for field_name in rule.position_fields.values() {
            positions.insert(field_name.as_str(), find(field_name)?);
        }
        let value = find(&rule.value_field)?;
        Ok(PivotReader {
            def,
            rule,
            positions,
            value,
        })
    }

    pub(crate) fn len(&self, record: &R) -> usize {
        self.def.len(record)
    }

    /// Header produced by element `index` of `record`.
    pub(crate) fn header(&self, record: &R, index: usize) -> String {
        self.rule.render_header(|name| {
            self.positions
                .get(name)
                .and_then(|f| f.read(record, index))
                .map(|v| v.to_string())
                .unwrap_or_default()
        })
    }

    /// Stringified value of element `index`; absent values become `""`.
    pub(crate) fn value(&self, record: &R, index: usize) -> CellValue {
        CellValue::Text(
            self.value
                .read(record, index)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        )
    }

    /// Pass 1: add every header produced by `record`.
    pub(crate) fn collect(&self, record: &R, headers: &mut DynamicHeaders) {
        for i in 0..self.len(record) {
            headers.insert(self.header(record, i));
        }
    }

    /// Pass 2: one slot per known header, `Empty` where `record` has no element.
    pub(crate) fn row(&self, record: &R, headers: &DynamicHeaders) -> Vec<CellValue> {
        let mut slots = vec![CellValue::Empty; headers.len()];
        for i in 0..self.len(record) {
            if let Some(slot) = headers.slot(&self.header(record, i)) {
                slots[slot] = self.value(record, i);
            }
        }
        slots
    }
}
