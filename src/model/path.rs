//! Path addressing into a [`super::value::Value`] tree (§3).
//!
//! A [`Path`] is a dotted address built from three kinds of segments: a
//! plain mapping key, a named-list selector (`items[name=X]`), or an opaque
//! literal used for conflicts that do not resolve into the tree at all (the
//! templated-text merger's `entire_file` and `block_N` conflicts, §4.2).

use std::fmt;

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One hop in a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Key(String),
    /// A named-list selector: the sequence's own key plus the selected
    /// item's `name` field, e.g. `policies[name=a]`.
    Named {
        /// The mapping key holding the sequence.
        list_key: String,
        /// The selected item's `name` value.
        name: String,
    },
    /// An opaque literal segment, not a tree address (`entire_file`,
    /// `block_3`, ...).
    Literal(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, "{k}"),
            Self::Named { list_key, name } => write!(f, "{list_key}[name={name}]"),
            Self::Literal(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Path
// ---------------------------------------------------------------------------

/// A dotted address into a `Value`, or an opaque literal marker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The empty (root) path.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A path consisting of a single opaque literal segment.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self(vec![Segment::Literal(text.into())])
    }

    /// A path consisting of a single mapping key.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![Segment::Key(key.into())])
    }

    /// Return a new path with a mapping-key segment appended.
    #[must_use]
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segs = self.0.clone();
        segs.push(Segment::Key(key.into()));
        Self(segs)
    }

    /// Return a new path with a named-list selector segment appended.
    #[must_use]
    pub fn child_named(&self, list_key: impl Into<String>, name: impl Into<String>) -> Self {
        let mut segs = self.0.clone();
        segs.push(Segment::Named {
            list_key: list_key.into(),
            name: name.into(),
        });
        Self(segs)
    }

    /// Borrow the path's segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// `true` for the root (empty) path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}
