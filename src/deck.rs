//! Typed deck keyword records.
//!
//! The text parser lives outside this crate; what arrives here is the
//! stream of typed keyword records it produced. A [`Deck`] is that
//! stream, already split into report-step windows by the caller or
//! consumed in file order by the schedule.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a keyword came from. Travels with every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordLocation {
    /// Keyword name.
    pub keyword: String,
    /// Source file name.
    pub filename: String,
    /// 1-based line number of the keyword header.
    pub lineno: usize,
}

impl KeywordLocation {
    /// Creates a location.
    #[must_use]
    pub fn new(keyword: impl Into<String>, filename: impl Into<String>, lineno: usize) -> Self {
        Self {
            keyword: keyword.into(),
            filename: filename.into(),
            lineno,
        }
    }
}

impl Default for KeywordLocation {
    fn default() -> Self {
        Self::new("", "<unknown>", 0)
    }
}

impl fmt::Display for KeywordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} line {}", self.keyword, self.filename, self.lineno)
    }
}

/// A single typed item value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DeckValue {
    /// Integer item.
    Int(i64),
    /// Floating point item, in deck units.
    Double(f64),
    /// String item, trimmed.
    String(String),
}

impl DeckValue {
    /// Integer view.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view. Integers widen.
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String view.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

/// A named item inside a record: one or more values plus per-value
/// defaulted flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckItem {
    /// Item name from the keyword schema, e.g. "WELL" or "STATUS".
    pub name: String,
    /// Item values. Most items hold exactly one.
    pub values: Vec<DeckValue>,
    /// True where the parser applied the schema default.
    pub defaulted: Vec<bool>,
}

impl DeckItem {
    /// Single-value item with an explicit value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: DeckValue) -> Self {
        Self {
            name: name.into(),
            values: vec![value],
            defaulted: vec![false],
        }
    }

    /// Multi-value item, for star-repeated and free-length data such
    /// as TSTEP lengths or VFP axes.
    #[must_use]
    pub fn list(name: impl Into<String>, values: Vec<DeckValue>) -> Self {
        let defaulted = vec![false; values.len()];
        Self {
            name: name.into(),
            values,
            defaulted,
        }
    }

    /// Single-value item carrying a schema default.
    #[must_use]
    pub fn defaulted(name: impl Into<String>, value: DeckValue) -> Self {
        Self {
            name: name.into(),
            values: vec![value],
            defaulted: vec![true],
        }
    }

    /// True if value `idx` was defaulted by the parser.
    #[must_use]
    pub fn default_applied(&self, idx: usize) -> bool {
        self.defaulted.get(idx).copied().unwrap_or(true)
    }

    /// Typed accessors. Missing or mistyped values yield `None`; the
    /// `_or` variants substitute the handler's fallback.
    #[must_use]
    pub fn get_int(&self, idx: usize) -> Option<i64> {
        self.values.get(idx).and_then(DeckValue::as_int)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn get_double(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).and_then(DeckValue::as_double)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn get_string(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(DeckValue::as_string)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn get_int_or(&self, idx: usize, fallback: i64) -> i64 {
        self.get_int(idx).unwrap_or(fallback)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn get_double_or(&self, idx: usize, fallback: f64) -> f64 {
        self.get_double(idx).unwrap_or(fallback)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn get_string_or<'a>(&'a self, idx: usize, fallback: &'a str) -> &'a str {
        self.get_string(idx).unwrap_or(fallback)
    }
}

/// One record (one data line) of a keyword.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeckRecord {
    /// Ordered items.
    pub items: Vec<DeckItem>,
}

impl DeckRecord {
    /// Builds a record from items.
    #[must_use]
    pub fn new(items: Vec<DeckItem>) -> Self {
        Self { items }
    }

    /// Looks an item up by schema name.
    #[must_use]
    pub fn get_item(&self, name: &str) -> Option<&DeckItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// True if every item beyond `skip` leading ones was defaulted.
    /// WELOPEN uses this to distinguish well-level from connection-level
    /// records.
    #[must_use]
    pub fn all_defaulted_after(&self, skip: usize) -> bool {
        self.items
            .iter()
            .skip(skip)
            .all(|item| (0..item.values.len()).all(|idx| item.default_applied(idx)))
    }
}

/// A keyword: name, provenance, and its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckKeyword {
    /// Keyword name, upper case.
    pub name: String,
    /// Source location.
    pub location: KeywordLocation,
    /// Data records in file order.
    pub records: Vec<DeckRecord>,
}

impl DeckKeyword {
    /// Builds a keyword.
    #[must_use]
    pub fn new(name: impl Into<String>, records: Vec<DeckRecord>) -> Self {
        let name = name.into();
        let location = KeywordLocation::new(name.clone(), "<unknown>", 0);
        Self {
            name,
            location,
            records,
        }
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_location(mut self, location: KeywordLocation) -> Self {
        self.location = location;
        self
    }

    /// Iterates the records.
    pub fn iter(&self) -> std::slice::Iter<'_, DeckRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a DeckKeyword {
    type Item = &'a DeckRecord;
    type IntoIter = std::slice::Iter<'a, DeckRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The keyword stream of one simulation case's SCHEDULE section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Keywords in file order.
    pub keywords: Vec<DeckKeyword>,
}

impl Deck {
    /// Builds a deck from keywords.
    #[must_use]
    pub fn new(keywords: Vec<DeckKeyword>) -> Self {
        Self { keywords }
    }

    /// Appends a keyword.
    pub fn push(&mut self, keyword: DeckKeyword) {
        self.keywords.push(keyword);
    }

    /// Number of keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// True if the deck holds no keywords.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DeckRecord {
        DeckRecord::new(vec![
            DeckItem::new("WELL", DeckValue::String("OP-1".to_string())),
            DeckItem::new("STATUS", DeckValue::String("OPEN".to_string())),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
        ])
    }

    #[test]
    fn item_accessors() {
        let rec = record();
        let well = rec.get_item("WELL").unwrap();
        assert_eq!(well.get_string(0), Some("OP-1"));
        assert!(well.get_int(0).is_none());
        assert!(!well.default_applied(0));

        let i = rec.get_item("I").unwrap();
        assert_eq!(i.get_int(0), Some(0));
        assert_eq!(i.get_double(0), Some(0.0));
        assert!(i.default_applied(0));
    }

    #[test]
    fn fallback_accessors() {
        let item = DeckItem::new("VFP_TABLE", DeckValue::Int(3));
        assert_eq!(item.get_int_or(0, 0), 3);
        assert_eq!(item.get_int_or(1, 7), 7);
        assert_eq!(item.get_string_or(0, "x"), "x");
    }

    #[test]
    fn all_defaulted_after_skips_leading_items() {
        let rec = record();
        assert!(rec.all_defaulted_after(2));
        assert!(!rec.all_defaulted_after(1));
    }

    #[test]
    fn missing_item_is_none() {
        let rec = record();
        assert!(rec.get_item("NOSUCH").is_none());
    }

    #[test]
    fn keyword_iteration_and_location() {
        let kw = DeckKeyword::new("WELOPEN", vec![record(), record()])
            .with_location(KeywordLocation::new("WELOPEN", "CASE.DATA", 42));
        assert_eq!(kw.iter().count(), 2);
        assert_eq!(format!("{}", kw.location), "WELOPEN in CASE.DATA line 42");
    }

    #[test]
    fn deck_value_serde_round_trip() {
        let kw = DeckKeyword::new("WELSPECS", vec![record()]);
        let json = serde_json::to_string(&kw).unwrap();
        let back: DeckKeyword = serde_json::from_str(&json).unwrap();
        assert_eq!(kw, back);
    }
}
