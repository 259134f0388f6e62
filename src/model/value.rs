//! The Value Tree Model — the in-memory representation of a structured
//! document (§3).
//!
//! A [`Value`] is a tagged variant over the shapes a configuration document
//! can take. Comment annotations are *not* part of `Value` itself — they are
//! carried as first-class fields on [`Mapping`] entries and [`Sequence`]
//! items, per the design note in spec §9 (explicit annotation fields rather
//! than reflection over a loader's hidden comment state). This keeps
//! [`Value`] equality pure content comparison, which is exactly what the
//! three-way merge rules in §4.1 are written against.

use std::fmt;

use indexmap::IndexMap;

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Comment annotations attached to a single mapping entry or sequence item.
///
/// `leading` holds full-line comments that appeared directly above the node
/// (in source order); `trailing` holds a single end-of-line comment on the
/// node's own line, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comments {
    /// Comment lines (without the leading `#` and following space) that
    /// appeared immediately above this node.
    pub leading: Vec<String>,
    /// A same-line trailing comment, if any.
    pub trailing: Option<String>,
}

impl Comments {
    /// An empty set of comments.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// `true` if there is no comment text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_none()
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A node in a structured document.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Explicit null / absent scalar (`~`, `null`, or an empty value).
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Signed integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar (quoted or plain).
    String(String),
    /// Ordered sequence.
    Sequence(Sequence),
    /// Ordered mapping with unique keys.
    Mapping(Mapping),
}

impl Value {
    /// Convenience constructor for an empty mapping.
    #[must_use]
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Convenience constructor for an empty sequence.
    #[must_use]
    pub fn empty_sequence() -> Self {
        Self::Sequence(Sequence::new())
    }

    /// Borrow this value as a [`Mapping`], if it is one.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrow this value as a [`Mapping`], if it is one.
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow this value as a [`Sequence`], if it is one.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Mutably borrow this value as a [`Sequence`], if it is one.
    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow this value as a plain string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render this value as a [`serde_json::Value`], discarding comments.
    ///
    /// Used for diagnostic rendering in [`super::conflict::ConflictEntry`] —
    /// not a general substitute for the `yaml` codec, which is the
    /// round-trip-preserving path.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Sequence(seq) => serde_json::Value::Array(seq.iter().map(Self::to_json).collect()),
            Self::Mapping(m) => {
                serde_json::Value::Object(m.iter().map(|(k, e)| (k.to_owned(), e.value.to_json())).collect())
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Sequence(s) => write!(f, "[{} item(s)]", s.len()),
            Self::Mapping(m) => write!(f, "{{{} key(s)}}", m.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// One key's value plus its comment annotations, as stored in a [`Mapping`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entry {
    /// The entry's value.
    pub value: Value,
    /// Comment annotations attached to this entry.
    pub comments: Comments,
}

impl Entry {
    /// Create an entry with no comments.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            comments: Comments::none(),
        }
    }

    /// Create an entry with the given comments.
    #[must_use]
    pub fn with_comments(value: Value, comments: Comments) -> Self {
        Self { value, comments }
    }
}

/// An ordered mapping from string keys to [`Entry`] values.
///
/// Insertion order is significant and preserved across merge (§3 invariant:
/// merged key order equals local order, with remote-only keys appended in
/// remote order). Keys are unique, matching §3's "Mapping" definition.
#[derive(Clone, Debug, Default)]
pub struct Mapping(IndexMap<String, Entry>);

impl Mapping {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Borrow the entry for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.get(key)
    }

    /// Borrow the value for `key`, if present.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).map(|e| &e.value)
    }

    /// Mutably borrow the entry for `key`, if present.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.0.get_mut(key)
    }

    /// Insert or replace the entry for `key`, preserving its existing
    /// position if it was already present, otherwise appending it.
    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) {
        self.0.insert(key.into(), entry);
    }

    /// Remove `key`, returning its entry if present.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.0.shift_remove(key)
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate `(key, entry)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Mapping {
    /// Content equality, order-independent — matches the host language's
    /// dict equality that the three-way compare rules in §4.1 are written
    /// against. Comments are intentionally excluded from comparison.
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(k, v)| other.0.get(k).is_some_and(|ov| ov.value == v.value))
    }
}

impl FromIterator<(String, Entry)> for Mapping {
    fn from_iter<T: IntoIterator<Item = (String, Entry)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// One sequence element plus its comment annotations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeqItem {
    /// The item's value.
    pub value: Value,
    /// Comment annotations attached to this item.
    pub comments: Comments,
}

impl SeqItem {
    /// Create an item with no comments.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            comments: Comments::none(),
        }
    }
}

/// An ordered list of [`SeqItem`]s.
///
/// Equality is order-dependent, matching the host language's list equality.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sequence(Vec<SeqItem>);

impl Sequence {
    /// An empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append an item.
    pub fn push(&mut self, item: SeqItem) {
        self.0.push(item);
    }

    /// Borrow the items in order.
    #[must_use]
    pub fn items(&self) -> &[SeqItem] {
        &self.0
    }

    /// Mutably borrow the items in order.
    pub fn items_mut(&mut self) -> &mut [SeqItem] {
        &mut self.0
    }

    /// Remove and return the first item whose `name_key` field equals
    /// `name`, if any (used when applying a `TakeRemote`/deletion
    /// resolution to a named-list entry that no longer exists remotely).
    pub fn remove_named(&mut self, name_key: &str, name: &str) -> Option<SeqItem> {
        let idx = self.0.iter().position(|item| Self::name_of(&item.value, name_key) == Some(name))?;
        Some(self.0.remove(idx))
    }

    /// Iterate item values in order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|i| &i.value)
    }

    /// `true` if every item is a [`Value::Mapping`] carrying a non-empty
    /// string `name_key` field — the named-list test from §4.1.
    #[must_use]
    pub fn is_named_list(&self, name_key: &str) -> bool {
        !self.0.is_empty()
            && self.0.iter().all(|item| {
                item.value
                    .as_mapping()
                    .and_then(|m| m.get_value(name_key))
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.is_empty())
            })
    }

    /// Look up the `name` field of an item assumed to be a named-list
    /// element, if it parses as one.
    #[must_use]
    pub fn name_of(item: &Value, name_key: &str) -> Option<&str> {
        item.as_mapping()
            .and_then(|m| m.get_value(name_key))
            .and_then(Value::as_str)
    }
}

impl FromIterator<SeqItem> for Sequence {
    fn from_iter<T: IntoIterator<Item = SeqItem>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
