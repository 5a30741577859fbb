//! Mapper configuration.
//!
//! [`MapperOptions`] holds the plain settings and can be loaded from JSON or
//! YAML. [`FormatterRegistry`] holds the named value formatters. Both are
//! bundled in [`MapperConfig`], which is handed to
//! [`Mapper::new`](crate::Mapper::new).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MapperError, Result};
use crate::resolve::Resolver;
use crate::tags::{TagParser, DEFAULT_TAG_DELIMITER, DEFAULT_TAG_KEY};
use crate::value::CellValue;

/// Turns a cell value into display text.
pub type Formatter = Arc<dyn Fn(&CellValue) -> String + Send + Sync>;

/// Plain mapper settings.
///
/// Missing keys take their defaults when deserializing.
///
/// ```rust
/// use sheet_mapper::MapperOptions;
///
/// let opts = MapperOptions::from_yaml_str("auto_sort: false\ndefault_width: 50\n").unwrap();
/// assert!(!opts.auto_sort);
/// assert_eq!(opts.default_width, 50.0);
/// assert_eq!(opts.tag_key, "excelize-mapper");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Attribute key whose metadata string is read.
    pub tag_key: String,
    /// Number columns in declaration order instead of by `index`.
    pub auto_sort: bool,
    /// Width applied to columns without a positive override. `0` disables it.
    pub default_width: f64,
    /// Segment delimiter inside metadata strings.
    pub tag_delimiter: String,
}

impl Default for MapperOptions {
    fn default() -> Self {
        MapperOptions {
            tag_key: DEFAULT_TAG_KEY.to_string(),
            auto_sort: true,
            default_width: 0.0,
            tag_delimiter: DEFAULT_TAG_DELIMITER.to_string(),
        }
    }
}

impl MapperOptions {
    /// Load options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let opts: MapperOptions = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Load options from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let opts: MapperOptions = serde_yaml::from_str(yaml)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check the options for values the mapper cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tag_key.is_empty() {
            return Err(MapperError::Config("tag_key must not be empty".to_string()));
        }
        if self.tag_delimiter.is_empty() {
            return Err(MapperError::Config(
                "tag_delimiter must not be empty".to_string(),
            ));
        }
        if !self.default_width.is_finite() {
            return Err(MapperError::Config(format!(
                "default_width must be finite, got {}",
                self.default_width
            )));
        }
        Ok(())
    }

    /// The resolver these options describe.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.tag_key.clone(), self.auto_sort)
            .with_parser(TagParser::new(self.tag_delimiter.clone()))
    }
}

/// Named formatters, looked up by a column's `format` key.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    entries: BTreeMap<String, Formatter>,
}

impl FormatterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a formatter, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, formatter: F)
    where
        F: Fn(&CellValue) -> String + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(formatter));
    }

    /// Register an already shared formatter.
    pub fn register_shared(&mut self, name: impl Into<String>, formatter: Formatter) {
        self.entries.insert(name.into(), formatter);
    }

    /// The formatter registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Formatter> {
        self.entries.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered formatters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Options plus formatters.
///
/// ```rust
/// use sheet_mapper::{CellValue, MapperConfig};
///
/// let config = MapperConfig::new()
///     .auto_sort(false)
///     .default_width(50.0)
///     .formatter("upper", |v: &CellValue| v.to_string().to_uppercase());
/// assert!(config.formatters.contains("upper"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MapperConfig {
    pub options: MapperOptions,
    pub formatters: FormatterRegistry,
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from loaded options with no formatters.
    pub fn from_options(options: MapperOptions) -> Self {
        MapperConfig {
            options,
            formatters: FormatterRegistry::new(),
        }
    }

    pub fn tag_key(mut self, key: impl Into<String>) -> Self {
        self.options.tag_key = key.into();
        self
    }

    pub fn auto_sort(mut self, auto_sort: bool) -> Self {
        self.options.auto_sort = auto_sort;
        self
    }

    pub fn default_width(mut self, width: f64) -> Self {
        self.options.default_width = width;
        self
    }

    pub fn tag_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.options.tag_delimiter = delimiter.into();
        self
    }

    /// Add a named formatter.
    pub fn formatter<F>(mut self, name: impl Into<String>, formatter: F) -> Self
    where
        F: Fn(&CellValue) -> String + Send + Sync + 'static,
    {
        self.formatters.register(name, formatter);
        self
    }
}
