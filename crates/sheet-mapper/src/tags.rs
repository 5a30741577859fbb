//! Annotation parsing.
//!
//! Every described field carries one metadata string per attribute key, for
//! example `header:Name;width:20;default:-`. The parser turns it into a
//! key/value map: segments are split on a delimiter, trimmed, and each
//! segment is split on its first `:`. Malformed segments are dropped, later
//! keys overwrite earlier ones.

use std::collections::BTreeMap;

/// Attribute key read when no other key is configured.
pub const DEFAULT_TAG_KEY: &str = "excelize-mapper";

/// Segment delimiter used when no other delimiter is configured.
pub const DEFAULT_TAG_DELIMITER: &str = ";";

/// Header text of a static column, or presence marker for a column.
pub const KEY_HEADER: &str = "header";
/// Manual-mode column index.
pub const KEY_INDEX: &str = "index";
/// Column width override.
pub const KEY_WIDTH: &str = "width";
/// Text substituted for zero values.
pub const KEY_DEFAULT: &str = "default";
/// Formatter registry key.
pub const KEY_FORMAT: &str = "format";
/// Header template on a pivot source collection.
pub const KEY_DYNAMIC: &str = "dynamic";
/// Placeholder token supplied by a pivot element field.
pub const KEY_DYNAMIC_POS: &str = "dynamicpos";
/// Marks the pivot element field supplying the cell value.
pub const KEY_DYNAMIC_VAL: &str = "dynamicval";

/// Splits metadata strings into key/value maps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagParser {
    delimiter: String,
}

impl TagParser {
    /// Create a parser for the given segment delimiter.
    ///
    /// An empty delimiter falls back to [`DEFAULT_TAG_DELIMITER`].
    pub fn new(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        let delimiter = if delimiter.is_empty() {
            DEFAULT_TAG_DELIMITER.to_string()
        } else {
            delimiter
        };
        TagParser { delimiter }
    }

    /// The delimiter in use.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Parse a metadata string.
    ///
    /// # Example
    ///
    /// ```
    /// use sheet_mapper::TagParser;
    ///
    /// let tags = TagParser::default().parse("header:Time; format:hh:mm ;junk;");
    /// assert_eq!(tags.get("header").map(String::as_str), Some("Time"));
    /// assert_eq!(tags.get("format").map(String::as_str), Some("hh:mm"));
    /// assert_eq!(tags.len(), 2);
    /// ```
    pub fn parse(&self, raw: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for segment in raw.split(self.delimiter.as_str()) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if let Some((key, value)) = segment.split_once(':') {
                out.insert(key.to_string(), value.to_string());
            }
        }
        out
    }
}

impl Default for TagParser {
    fn default() -> Self {
        TagParser::new(DEFAULT_TAG_DELIMITER)
    }
}

/// Parse a metadata string with the default `;` delimiter.
pub fn parse_tags(raw: &str) -> BTreeMap<String, String> {
    TagParser::default().parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
        map.get(key).map(String::as_str)
    }

    #[test]
    fn parses_pairs() {
        let tags = parse_tags("header:Name;width:20;default:-");
        assert_eq!(get(&tags, "header"), Some("Name"));
        assert_eq!(get(&tags, "width"), Some("20"));
        assert_eq!(get(&tags, "default"), Some("-"));
    }

    #[test]
    fn first_colon_wins() {
        let tags = parse_tags("format:yyyy-mm-dd hh:mm:ss");
        assert_eq!(get(&tags, "format"), Some("yyyy-mm-dd hh:mm:ss"));
    }

    #[test]
    fn drops_segments_without_colon() {
        let tags = parse_tags("header:A;bogus;;  ;index:1");
        assert_eq!(tags.len(), 2);
        assert_eq!(get(&tags, "index"), Some("1"));
    }

    #[test]
    fn trims_segments_only() {
        let tags = parse_tags("  header:Full Name  ; width: 12");
        assert_eq!(get(&tags, "header"), Some("Full Name"));
        assert_eq!(get(&tags, "width"), Some(" 12"));
    }

    #[test]
    fn last_duplicate_wins() {
        let tags = parse_tags("header:First;header:Second");
        assert_eq!(get(&tags, "header"), Some("Second"));
    }

    #[test]
    fn empty_value_is_kept() {
        let tags = parse_tags("header:");
        assert_eq!(get(&tags, "header"), Some(""));
    }

    #[test]
    fn empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(";;;").is_empty());
    }

    #[test]
    fn custom_delimiter() {
        let parser = TagParser::new("|");
        let tags = parser.parse("header:A;B|index:3");
        assert_eq!(get(&tags, "header"), Some("A;B"));
        assert_eq!(get(&tags, "index"), Some("3"));
    }

    #[test]
    fn empty_delimiter_falls_back() {
        assert_eq!(TagParser::new("").delimiter(), ";");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics(raw in ".*") {
                let _ = parse_tags(&raw);
            }

            #[test]
            fn keys_and_values_round_trip(
                pairs in proptest::collection::vec(("[a-z]{1,8}", "[A-Za-z0-9 :/$]{0,12}"), 0..6)
            ) {
                let raw = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect::<Vec<_>>()
                    .join(";");
                let tags = parse_tags(&raw);

                let mut expected = BTreeMap::new();
                for (k, v) in &pairs {
                    expected.insert(k.clone(), v.clone());
                }
                // trimming only touches segment edges, so compare trimmed values
                for (k, v) in &expected {
                    let seg = format!("{}:{}", k, v);
                    let want = seg.trim().split_once(':').map(|(_, v)| v.to_string());
                    prop_assert_eq!(tags.get(k).cloned(), want);
                }
                prop_assert_eq!(tags.len(), expected.len());
            }

            #[test]
            fn keys_never_contain_delimiter_or_colon(raw in "[a-z:; ]{0,40}") {
                for (k, _) in parse_tags(&raw) {
                    prop_assert!(!k.contains(';'));
                    prop_assert!(!k.contains(':'));
                }
            }
        }
    }
}
