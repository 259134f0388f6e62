//! The conflict model and resolver protocol (§4.4, §6).
//!
//! Conflicts are data, not errors (§7): the merge engine always returns a
//! tentative merged tree plus a list of [`Conflict`]s; whether those
//! conflicts block a commit is a decision made by whatever consumes the
//! [`ConflictReport`], not by the merge core itself.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::path::Path;
use super::value::Value;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The chosen or auto-derived disposition of a single conflict (§3, §4.4).
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Keep the local value (or deletion).
    KeepLocal,
    /// Take the remote value (or deletion).
    TakeRemote,
    /// Overwrite with an explicit value supplied by the resolver.
    Custom(Value),
    /// No resolution has been chosen yet.
    Unresolved,
}

impl Resolution {
    /// `true` unless the resolution is still [`Resolution::Unresolved`].
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// A single path-addressed merge conflict (§3).
///
/// `base`/`local`/`remote` are `None` when that side does not have the path
/// at all (e.g. deletion conflicts, or a whole-file conflict in a templated
/// merge where `base` may be unavailable).
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict {
    /// Where this conflict lives in the merged tree (or an opaque literal
    /// marker for whole-file/whole-block conflicts).
    pub path: Path,
    /// The common-ancestor value, if present.
    pub base: Option<Value>,
    /// The local (working-tree) value, if present.
    pub local: Option<Value>,
    /// The remote (upstream) value, if present.
    pub remote: Option<Value>,
    /// How this conflict has been (or has not been) resolved.
    pub resolution: Resolution,
    /// `true` if the auto-resolution rule fired at construction.
    pub auto_resolvable: bool,
}

impl Conflict {
    /// Construct a conflict, running the auto-resolution rule (§4.4):
    ///
    /// - if `base == remote` and `local != remote`: local-only change,
    ///   auto-resolve to [`Resolution::KeepLocal`].
    /// - else if `base == local` and `remote != local`: remote-only
    ///   change, auto-resolve to [`Resolution::TakeRemote`].
    /// - else: genuinely divergent; [`Resolution::Unresolved`].
    #[must_use]
    pub fn new(path: Path, base: Option<Value>, local: Option<Value>, remote: Option<Value>) -> Self {
        let (resolution, auto_resolvable) = if base == remote && local != remote {
            (Resolution::KeepLocal, true)
        } else if base == local && remote != local {
            (Resolution::TakeRemote, true)
        } else {
            (Resolution::Unresolved, false)
        };

        Self {
            path,
            base,
            local,
            remote,
            resolution,
            auto_resolvable,
        }
    }
}

// ---------------------------------------------------------------------------
// ConflictReport
// ---------------------------------------------------------------------------

/// A serializable summary entry for one [`Conflict`], as it appears in a
/// persisted [`ConflictReport`] (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConflictEntry {
    /// The conflict's path, rendered as a dotted string.
    pub path: String,
    /// JSON rendering of the base value, if present.
    pub base: Option<serde_json::Value>,
    /// JSON rendering of the local value, if present.
    pub local: Option<serde_json::Value>,
    /// JSON rendering of the remote value, if present.
    pub remote: Option<serde_json::Value>,
    /// The resolution, rendered as a short tag (`keep_local`, `take_remote`,
    /// `custom`, `unresolved`).
    pub resolution: String,
}

/// The full upgrade conflict report (§3, §6), persisted to
/// `.policystack/upgrade/conflicts.yaml` when anything is left unresolved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConflictReport {
    /// The version the element was upgraded from.
    pub from_version: String,
    /// The version the element was upgraded to.
    pub to_version: String,
    /// The element's name. Serialized as `element` per §6.
    #[serde(rename = "element")]
    pub element_name: String,
    /// Per-file conflict lists, keyed by path relative to the element root.
    /// Serialized as `files` per §6.
    #[serde(rename = "files")]
    pub per_file: BTreeMap<PathBuf, Vec<ConflictEntry>>,
}

impl ConflictReport {
    /// An empty report for the given upgrade transition.
    #[must_use]
    pub fn new(from_version: impl Into<String>, to_version: impl Into<String>, element_name: impl Into<String>) -> Self {
        Self {
            from_version: from_version.into(),
            to_version: to_version.into(),
            element_name: element_name.into(),
            per_file: BTreeMap::new(),
        }
    }

    /// `true` if every conflict in every file has a non-`Unresolved`
    /// resolution.
    #[must_use]
    pub fn all_resolved(&self) -> bool {
        self.per_file
            .values()
            .flatten()
            .all(|e| e.resolution != "unresolved")
    }

    /// `true` if the report has no conflicts at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.per_file.values().all(Vec::is_empty)
    }

    /// Total number of conflicts across all files.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.per_file.values().map(Vec::len).sum()
    }
}

/// Render a [`Conflict`] as a serializable [`ConflictEntry`].
#[must_use]
pub fn to_entry(path: &Path, conflict: &Conflict) -> ConflictEntry {
    ConflictEntry {
        path: path.to_string(),
        base: conflict.base.as_ref().map(Value::to_json),
        local: conflict.local.as_ref().map(Value::to_json),
        remote: conflict.remote.as_ref().map(Value::to_json),
        resolution: resolution_tag(&conflict.resolution).to_owned(),
    }
}

/// The short tag used for a [`Resolution`] in serialized reports.
#[must_use]
pub fn resolution_tag(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::KeepLocal => "keep_local",
        Resolution::TakeRemote => "take_remote",
        Resolution::Custom(_) => "custom",
        Resolution::Unresolved => "unresolved",
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_local_only_change() {
        let c = Conflict::new(
            Path::key("timeout"),
            Some(Value::Int(30)),
            Some(Value::Int(60)),
            Some(Value::Int(30)),
        );
        assert_eq!(c.resolution, Resolution::KeepLocal);
        assert!(c.auto_resolvable);
    }

    #[test]
    fn auto_resolves_remote_only_change() {
        let c = Conflict::new(
            Path::key("timeout"),
            Some(Value::Int(30)),
            Some(Value::Int(30)),
            Some(Value::Int(60)),
        );
        assert_eq!(c.resolution, Resolution::TakeRemote);
        assert!(c.auto_resolvable);
    }

    #[test]
    fn both_changed_is_unresolved() {
        let c = Conflict::new(
            Path::key("retries"),
            Some(Value::Int(3)),
            Some(Value::Int(5)),
            Some(Value::Int(10)),
        );
        assert_eq!(c.resolution, Resolution::Unresolved);
        assert!(!c.auto_resolvable);
    }

    #[test]
    fn deletion_conflict_local_kept_remote_deleted() {
        // base == local (user never touched it), remote deleted it.
        let c = Conflict::new(Path::key("flag"), Some(Value::Bool(true)), Some(Value::Bool(true)), None);
        assert_eq!(c.resolution, Resolution::TakeRemote);
        assert!(c.auto_resolvable);
    }
}
