//! Change Detector / Baseline Snapshotter (§4.3).
//!
//! A [`Snapshot`] is the source of truth for "what was installed" at a
//! given version. `capture_baseline` walks an element directory and records
//! a [`FileDigest`] per file; `detect_changes` classifies the current tree
//! against a previously captured snapshot; `detect_values_changes`
//! correlates leaf-path changes in the primary values document against the
//! same path-addressing scheme the merge core uses for conflicts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::layout;
use crate::model::path::Path as ValuePath;
use crate::model::value::{Mapping, Value};
use crate::yaml;

/// A stable SHA-256 hex digest of a file's normalised content (§3, §4.3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest(String);

impl FileDigest {
    /// Digest raw bytes (used for opaque files: templates, examples,
    /// converters).
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex_digest(bytes))
    }

    /// Digest a structured document on its deterministically-serialised
    /// form, so reformatting alone does not register as a content change.
    #[must_use]
    pub fn of_value(value: &Value) -> Self {
        Self(hex_digest(yaml::to_string(value).as_bytes()))
    }

    /// The digest as a lowercase hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in result {
        use std::fmt::Write as _;
        let _ = write!(hex, "{b:02x}");
    }
    hex
}

/// A baseline snapshot of an element directory at a given version (§3, §6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The version this snapshot was captured at.
    pub version: String,
    /// An ISO-8601 timestamp recorded at capture time.
    pub created_at: String,
    /// Per-file digests, keyed by path relative to the element root.
    pub files: BTreeMap<PathBuf, FileDigest>,
}

impl Snapshot {
    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (infallible in practice for
    /// this type, but kept fallible to match the serde contract).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid JSON or does not match the
    /// snapshot schema.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Per-file classification relative to a snapshot (§3, §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileChange {
    /// Present in both; digest unchanged.
    Unchanged,
    /// Present in both; digest differs.
    Modified,
    /// Present now, absent from the snapshot.
    Added,
    /// Present in the snapshot, absent now.
    Deleted,
}

/// A full change classification (§3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Per-file classification, keyed by relative path.
    pub files: BTreeMap<PathBuf, FileChange>,
}

impl ChangeSet {
    /// `true` if every file is [`FileChange::Unchanged`].
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.files.values().all(|c| *c == FileChange::Unchanged)
    }

    /// Paths that are [`FileChange::Modified`], [`FileChange::Added`], or
    /// [`FileChange::Deleted`].
    #[must_use]
    pub fn changed_paths(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|(_, c)| **c != FileChange::Unchanged)
            .map(|(p, _)| p.as_path())
            .collect()
    }
}

/// Walk `element` depth-first in lexicographic path order, skipping the
/// control directory, computing a [`FileDigest`] for every regular file.
///
/// # Errors
///
/// Returns an `io::Error` if the directory cannot be walked or a file
/// cannot be read.
pub fn capture_baseline(element: &Path, version: impl Into<String>, created_at: impl Into<String>) -> std::io::Result<Snapshot> {
    let mut files = BTreeMap::new();
    walk_digests(element, element, &mut files)?;
    Ok(Snapshot {
        version: version.into(),
        created_at: created_at.into(),
        files,
    })
}

fn walk_digests(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, FileDigest>) -> std::io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if path.file_name().is_some_and(|n| n == layout::CONTROL_DIR) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_digests(root, &path, out)?;
        } else if file_type.is_file() {
            let bytes = std::fs::read(&path)?;
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            out.insert(rel, FileDigest::of_bytes(&bytes));
        }
    }
    Ok(())
}

/// Classify `element`'s current files against `snapshot`.
///
/// # Errors
///
/// Returns an `io::Error` if the directory cannot be walked.
pub fn detect_changes(element: &Path, snapshot: &Snapshot) -> std::io::Result<ChangeSet> {
    let mut current = BTreeMap::new();
    walk_digests(element, element, &mut current)?;

    let mut files = BTreeMap::new();
    for (path, digest) in &current {
        match snapshot.files.get(path) {
            Some(baseline_digest) if baseline_digest == digest => {
                files.insert(path.clone(), FileChange::Unchanged);
            }
            Some(_) => {
                files.insert(path.clone(), FileChange::Modified);
            }
            None => {
                files.insert(path.clone(), FileChange::Added);
            }
        }
    }
    for path in snapshot.files.keys() {
        if !current.contains_key(path) {
            files.insert(path.clone(), FileChange::Deleted);
        }
    }

    tracing::debug!(element = %element.display(), files = files.len(), "files classified against baseline");
    Ok(ChangeSet { files })
}

/// A single changed leaf in the primary values document.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueChange {
    /// The leaf's address.
    pub path: ValuePath,
    /// The value recorded at baseline, if the leaf existed there.
    pub old: Option<Value>,
    /// The value in the current document, if the leaf still exists.
    pub new: Option<Value>,
}

/// Diff leaf paths between a baseline-tracked values document and the
/// current one (§4.3).
#[must_use]
pub fn detect_values_changes(baseline: &Value, current: &Value) -> Vec<ValueChange> {
    let mut changes = Vec::new();
    diff_leaves(&ValuePath::root(), baseline, current, &mut changes);
    changes
}

fn diff_leaves(path: &ValuePath, old: &Value, new: &Value, out: &mut Vec<ValueChange>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Mapping(a), Value::Mapping(b)) => {
            diff_mappings(path, a, b, out);
        }
        _ => out.push(ValueChange {
            path: path.clone(),
            old: Some(old.clone()),
            new: Some(new.clone()),
        }),
    }
}

fn diff_mappings(path: &ValuePath, old: &Mapping, new: &Mapping, out: &mut Vec<ValueChange>) {
    for key in old.keys() {
        let child = path.child_key(key);
        let old_value = old.get_value(key);
        match new.get_value(key) {
            Some(new_value) => diff_leaves(&child, old_value.unwrap_or(&Value::Null), new_value, out),
            None => out.push(ValueChange {
                path: child,
                old: old_value.cloned(),
                new: None,
            }),
        }
    }
    for key in new.keys() {
        if old.contains_key(key) {
            continue;
        }
        out.push(ValueChange {
            path: path.child_key(key),
            old: None,
            new: new.get_value(key).cloned(),
        });
    }
}
