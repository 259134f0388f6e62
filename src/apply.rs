//! Apply Stage: orchestrates backup, merge, transcription, conflict
//! persistence, snapshot refresh, and commit/rollback for a single upgrade
//! (§4.5, §5, §6).
//!
//! This is the only part of the crate that mutates the filesystem, and the
//! only one that owns the backup invariant. Every other module is a pure
//! function over in-memory values or a read-only filesystem walk.

use std::path::{Path, PathBuf};

use crate::config::UpgradeConfig;
use crate::error::UpgradeError;
use crate::layout;
use crate::merge::{resolve, structured, templated};
use crate::model::conflict::{Conflict, ConflictEntry, ConflictReport, Resolution, to_entry};
use crate::model::value::Value;
use crate::snapshot::{self, Snapshot};
use crate::yaml;

// ---------------------------------------------------------------------------
// Collaborator traits (§6)
// ---------------------------------------------------------------------------

/// Materialises a template version's directory tree locally. Ownership
/// (cleanup responsibility) of the returned path passes to the caller —
/// here, [`run`], which removes it before returning.
pub trait FetchVersion {
    /// Fetch `template` at `version` from `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::ExternalFailure`] or [`UpgradeError::NotFound`]
    /// if the version cannot be materialised.
    fn fetch(&self, template: &str, version: &str, repository: &str) -> Result<PathBuf, UpgradeError>;
}

/// Resolves a [`ConflictReport`]'s conflicts, possibly by prompting a human.
/// Must return with every conflict's resolution set unless cancellation is
/// signalled.
pub trait ConflictResolver {
    /// Resolve `report`, returning it with resolutions filled in.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::Cancelled`] if resolution was interrupted.
    fn resolve(&self, report: ConflictReport) -> Result<ConflictReport, UpgradeError>;
}

/// Upgrade policy oracle: decides whether a version transition is allowed.
pub trait UpgradePolicy {
    /// `(allowed, reason)` for upgrading from `from` to `to`.
    fn upgrade_allowed(&self, from: &str, to: &str) -> (bool, String);
}

/// A [`ConflictResolver`] that leaves every conflict unresolved, for
/// dry-run/report-only flows.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl ConflictResolver for NoopResolver {
    fn resolve(&self, report: ConflictReport) -> Result<ConflictReport, UpgradeError> {
        Ok(report)
    }
}

/// An [`UpgradePolicy`] that allows every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAllow;

impl UpgradePolicy for AlwaysAllow {
    fn upgrade_allowed(&self, _from: &str, _to: &str) -> (bool, String) {
        (true, "no upgrade constraints defined".to_owned())
    }
}

// ---------------------------------------------------------------------------
// UpgradeRequest
// ---------------------------------------------------------------------------

/// Parameters for a single upgrade run.
#[derive(Debug, Clone)]
pub struct UpgradeRequest<'a> {
    /// The installed element directory to upgrade in place.
    pub element: &'a Path,
    /// The template name, passed through to [`FetchVersion`].
    pub template: &'a str,
    /// The repository identifier, passed through to [`FetchVersion`].
    pub repository: &'a str,
    /// The version to upgrade to.
    pub to_version: &'a str,
    /// Proceed even if [`UpgradePolicy`] rejects the transition.
    pub force: bool,
}

/// Run a single upgrade to completion, applying the protocol in §4.5 in
/// order: backup, merge, transcribe, persist conflicts, refresh snapshot,
/// commit or rollback.
///
/// `now` is an ISO-8601 timestamp supplied by the caller; the core performs
/// no wall-clock I/O of its own so the whole pipeline stays deterministic
/// under test.
///
/// # Errors
///
/// Returns [`UpgradeError::InvalidState`] if a stale backup directory is
/// found at startup, [`UpgradeError::UpgradeRefused`] if the policy rejects
/// the transition and `force` is `false`, or [`UpgradeError::IoFailure`] /
/// [`UpgradeError::ExternalFailure`] on failures during the run — in which
/// case the element directory is rolled back to its pre-upgrade state
/// before the error is returned.
pub fn run(
    request: &UpgradeRequest<'_>,
    config: &UpgradeConfig,
    fetcher: &dyn FetchVersion,
    resolver: &dyn ConflictResolver,
    policy: &dyn UpgradePolicy,
    now: &str,
) -> Result<ConflictReport, UpgradeError> {
    let backup = layout::backup_path(request.element);
    if backup.exists() {
        return Err(UpgradeError::InvalidState {
            detail: format!(
                "leftover backup directory at '{}' from a prior interrupted upgrade; remove it or restore it before retrying",
                backup.display()
            ),
        });
    }

    if !request.element.is_dir() {
        return Err(UpgradeError::NotFound {
            what: "element directory".to_owned(),
            identifier: request.element.display().to_string(),
        });
    }

    let baseline = load_or_reconstruct_baseline(request.element)?;
    let current_version = baseline.version.clone();

    let (allowed, reason) = policy.upgrade_allowed(&current_version, request.to_version);
    if !allowed && !request.force {
        return Err(UpgradeError::UpgradeRefused {
            from: current_version,
            to: request.to_version.to_owned(),
            reason,
        });
    }

    let remote_dir = fetcher.fetch(request.template, request.to_version, request.repository)?;
    let base_dir = match fetcher.fetch(request.template, &current_version, request.repository) {
        Ok(dir) => dir,
        Err(err) => {
            tracing::warn!(%err, "could not fetch base version for three-way merge, using current state as base");
            request.element.to_path_buf()
        }
    };

    let result = apply_inner(request, config, resolver, &current_version, &remote_dir, &base_dir, &backup, now);

    if remote_dir != *request.element {
        let _ = std::fs::remove_dir_all(&remote_dir);
    }
    if base_dir != *request.element && base_dir != remote_dir {
        let _ = std::fs::remove_dir_all(&base_dir);
    }

    result
}

#[allow(clippy::too_many_arguments)]
fn apply_inner(
    request: &UpgradeRequest<'_>,
    config: &UpgradeConfig,
    resolver: &dyn ConflictResolver,
    current_version: &str,
    remote_dir: &Path,
    base_dir: &Path,
    backup: &Path,
    now: &str,
) -> Result<ConflictReport, UpgradeError> {
    let element = request.element;

    copy_dir_recursive(element, backup).map_err(|source| UpgradeError::IoFailure {
        operation: "create backup".to_owned(),
        path: Some(backup.to_path_buf()),
        source,
    })?;
    tracing::debug!(backup = %backup.display(), "backup acquired");

    let outcome = (|| -> Result<ConflictReport, UpgradeError> {
        let name_key = config.merge.name_key.as_str();
        tracing::debug!(element = %element.display(), name_key, "entering merge phase");

        // --- merge primary values document ---
        let base_values = read_values(base_dir)?;
        let local_values = read_values(element)?;
        let remote_values = read_values(remote_dir)?;
        let values_outcome = structured::merge_with_name_key(&base_values, &local_values, &remote_values, name_key);

        let mut report = ConflictReport::new(current_version, request.to_version, element_name(element));
        report.per_file.insert(
            PathBuf::from(layout::VALUES_FILE),
            values_outcome.conflicts.iter().map(|c| to_entry(&c.path, c)).collect(),
        );
        let mut values_conflicts = values_outcome.conflicts;

        // --- merge converters ---
        let mut converter_texts: Vec<(String, String)> = Vec::new();
        let mut converter_conflicts: Vec<(String, Vec<Conflict>)> = Vec::new();
        let local_converters = layout::converters_path(element);
        if local_converters.is_dir() {
            for entry in read_dir_sorted(&local_converters)? {
                let Some(name) = entry.file_name().and_then(|n| n.to_str().map(str::to_owned)) else {
                    continue;
                };
                if !name.ends_with(".yaml") {
                    continue;
                }
                let local_text = read_to_string_or_default(&entry)?;
                let remote_path = layout::converters_path(remote_dir).join(&name);
                if remote_path.is_file() {
                    let base_text = read_to_string_or_default(&layout::converters_path(base_dir).join(&name))?;
                    let remote_text = read_to_string_or_default(&remote_path)?;
                    let outcome = templated::merge(&base_text, &local_text, &remote_text);
                    report
                        .per_file
                        .insert(PathBuf::from("converters").join(&name), outcome.conflicts.iter().map(|c| to_entry(&c.path, c)).collect());
                    converter_conflicts.push((name.clone(), outcome.conflicts));
                    converter_texts.push((name, outcome.text));
                } else {
                    // Removed in remote: keep local version untouched.
                    converter_texts.push((name, local_text));
                }
            }
        }

        // --- resolve conflicts through the collaborator protocol ---
        let resolved_report = resolver.resolve(report)?;
        apply_resolution_tags(&mut values_conflicts, resolved_report.per_file.get(Path::new(layout::VALUES_FILE)));
        for (name, conflicts) in &mut converter_conflicts {
            apply_resolution_tags(conflicts, resolved_report.per_file.get(&PathBuf::from("converters").join(name.as_str())));
        }

        let unresolved_count = resolved_report.per_file.values().flatten().filter(|e| e.resolution == "unresolved").count();
        if unresolved_count > 0 && config.apply.block_on_unresolved {
            return Err(UpgradeError::InvalidState {
                detail: format!("{unresolved_count} unresolved conflict(s) remain; resolve them or disable block_on_unresolved"),
            });
        }

        // --- write merged values.yaml, with header if needed ---
        let merged_values = resolve::apply_resolutions(&values_outcome.value, &values_conflicts, name_key);
        let mut values_text = yaml::to_string(&merged_values);
        if let Some(header) = resolve::conflict_header(&values_conflicts, current_version, request.to_version, config.apply.always_write_header) {
            values_text = format!("{header}{values_text}");
        }
        write_file(&layout::values_path(element), &values_text)?;

        // --- write merged converters ---
        let converters_dir = layout::converters_path(element);
        std::fs::create_dir_all(&converters_dir).map_err(|source| io_err("create converters directory", &converters_dir, source))?;
        for (name, _conflicts) in &converter_conflicts {
            if let Some((_, merged_text)) = converter_texts.iter().find(|(n, _)| n == name) {
                let conflicts_for_file = &converter_conflicts.iter().find(|(n, _)| n == name).expect("just inserted").1;
                let resolved_text = resolve::resolve_templated_markers(merged_text, conflicts_for_file);
                write_file(&converters_dir.join(name), &resolved_text)?;
            }
        }
        for (name, text) in &converter_texts {
            if converter_conflicts.iter().any(|(n, _)| n == name) {
                continue;
            }
            write_file(&converters_dir.join(name), text)?;
        }
        // Remote-only converters: copy in.
        let remote_converters = layout::converters_path(remote_dir);
        if remote_converters.is_dir() {
            for entry in read_dir_sorted(&remote_converters)? {
                let Some(name) = entry.file_name() else { continue };
                let dest = converters_dir.join(name);
                if !dest.exists() {
                    std::fs::copy(&entry, &dest).map_err(|source| io_err("copy remote-only converter", &entry, source))?;
                }
            }
        }

        // --- transcribe Chart.yaml, templates/, examples/ ---
        transcribe(element, remote_dir)?;

        // --- persist conflicts ---
        let final_conflicts = values_conflicts.len() + converter_conflicts.iter().map(|(_, c)| c.len()).sum::<usize>();
        if final_conflicts > 0 {
            let json = serde_json::to_string_pretty(&resolved_report).map_err(|source| UpgradeError::IoFailure {
                operation: "serialize conflict report".to_owned(),
                path: None,
                source: std::io::Error::other(source),
            })?;
            layout::ensure_control_dirs(element).map_err(|source| io_err("create control directories", element, source))?;
            write_file(&layout::conflicts_report_path(element), &json)?;
            tracing::info!(count = final_conflicts, "conflicts persisted");
        }

        // --- refresh snapshot ---
        let new_snapshot = snapshot::capture_baseline(element, request.to_version, now).map_err(|source| io_err("capture snapshot", element, source))?;
        persist_snapshot(element, &new_snapshot)?;

        Ok(resolved_report)
    })();

    match outcome {
        Ok(report) => {
            std::fs::remove_dir_all(backup).map_err(|source| io_err("remove backup", backup, source))?;
            tracing::info!(element = %element.display(), version = %request.to_version, "upgrade applied");
            Ok(report)
        }
        Err(err) => {
            tracing::warn!(element = %element.display(), %err, "rolling back to pre-upgrade backup");
            rollback(element, backup)?;
            Err(err)
        }
    }
}

fn rollback(element: &Path, backup: &Path) -> Result<(), UpgradeError> {
    if element.exists() {
        std::fs::remove_dir_all(element).map_err(|source| io_err("remove partial element directory during rollback", element, source))?;
    }
    std::fs::rename(backup, element).map_err(|source| io_err("restore backup during rollback", backup, source))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Conflict resolution-tag bridge
// ---------------------------------------------------------------------------

/// Apply the `resolution` tag from each [`ConflictEntry`] (as returned by a
/// [`ConflictResolver`]) onto the corresponding in-memory [`Conflict`], by
/// position. `Custom` cannot be reconstructed from a tag alone — the
/// serializable [`ConflictReport`] carries no payload for it — so a `custom`
/// tag is logged and otherwise ignored, leaving the conflict's
/// auto-resolution outcome (or `Unresolved`) in place.
fn apply_resolution_tags(conflicts: &mut [Conflict], entries: Option<&Vec<ConflictEntry>>) {
    let Some(entries) = entries else { return };
    for (conflict, entry) in conflicts.iter_mut().zip(entries.iter()) {
        match entry.resolution.as_str() {
            "keep_local" => conflict.resolution = Resolution::KeepLocal,
            "take_remote" => conflict.resolution = Resolution::TakeRemote,
            "unresolved" => conflict.resolution = Resolution::Unresolved,
            "custom" => tracing::warn!(path = %conflict.path, "resolver requested a custom resolution, but the conflict report protocol carries no payload for it; leaving as-is"),
            other => tracing::warn!(path = %conflict.path, tag = other, "unknown resolution tag from resolver"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transcription (§4.5 step 3)
// ---------------------------------------------------------------------------

fn transcribe(element: &Path, remote_dir: &Path) -> Result<(), UpgradeError> {
    let remote_chart = layout::chart_path(remote_dir);
    let local_chart = layout::chart_path(element);
    if remote_chart.is_file() {
        let remote_value = read_yaml_or_default(&remote_chart)?;
        let local_value = read_yaml_or_default(&local_chart)?;
        let mut chart = remote_value;
        let local_name = local_value
            .as_mapping()
            .and_then(|m| m.get_value("name"))
            .cloned()
            .unwrap_or_else(|| Value::String(element_name(element)));
        if let Some(mapping) = chart.as_mapping_mut() {
            if let Some(entry) = mapping.get_mut("name") {
                entry.value = local_name;
            } else {
                mapping.insert("name", crate::model::value::Entry::new(local_name));
            }
        }
        write_file(&local_chart, &yaml::to_string(&chart))?;
    }

    replace_subtree(element, remote_dir, layout::TEMPLATES_DIR)?;
    replace_subtree(element, remote_dir, layout::EXAMPLES_DIR)?;
    Ok(())
}

fn replace_subtree(element: &Path, remote_dir: &Path, subdir: &str) -> Result<(), UpgradeError> {
    let remote = remote_dir.join(subdir);
    if !remote.is_dir() {
        return Ok(());
    }
    let local = element.join(subdir);
    if local.exists() {
        std::fs::remove_dir_all(&local).map_err(|source| io_err("replace subtree", &local, source))?;
    }
    copy_dir_recursive(&remote, &local).map_err(|source| io_err("replace subtree", &remote, source))
}

// ---------------------------------------------------------------------------
// Baseline loading (§4.5, §7)
// ---------------------------------------------------------------------------

fn load_or_reconstruct_baseline(element: &Path) -> Result<Snapshot, UpgradeError> {
    let path = layout::baseline_snapshot_path(element);
    if path.is_file() {
        let text = std::fs::read_to_string(&path).map_err(|source| io_err("read baseline snapshot", &path, source))?;
        return Snapshot::from_json(&text).map_err(|source| UpgradeError::InvalidState {
            detail: format!("baseline snapshot at '{}' is corrupt: {source}", path.display()),
        });
    }

    // Fall back to Chart.yaml's `appVersion`, matching the host's recovery
    // behaviour for elements installed before baseline snapshots existed.
    let chart = read_yaml_or_default(&layout::chart_path(element))?;
    let version = chart
        .as_mapping()
        .and_then(|m| m.get_value("appVersion"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_owned();

    snapshot::capture_baseline(element, version, "unknown").map_err(|source| io_err("reconstruct baseline snapshot", element, source))
}

fn persist_snapshot(element: &Path, snapshot: &Snapshot) -> Result<(), UpgradeError> {
    layout::ensure_control_dirs(element).map_err(|source| io_err("create control directories", element, source))?;
    let json = snapshot.to_json().map_err(|source| UpgradeError::IoFailure {
        operation: "serialize snapshot".to_owned(),
        path: None,
        source: std::io::Error::other(source),
    })?;
    write_file(&layout::baseline_snapshot_path(element), &json)
}

// ---------------------------------------------------------------------------
// Small filesystem helpers
// ---------------------------------------------------------------------------

fn element_name(element: &Path) -> String {
    element.file_name().map_or_else(|| "element".to_owned(), |n| n.to_string_lossy().into_owned())
}

fn read_values(dir: &Path) -> Result<Value, UpgradeError> {
    read_yaml_or_default(&layout::values_path(dir))
}

fn read_yaml_or_default(path: &Path) -> Result<Value, UpgradeError> {
    if !path.is_file() {
        return Ok(Value::empty_mapping());
    }
    let text = std::fs::read_to_string(path).map_err(|source| io_err("read yaml document", path, source))?;
    yaml::parse(&text).map_err(|err| UpgradeError::InvalidState {
        detail: format!("'{}' is not valid: {err}", path.display()),
    })
}

fn read_to_string_or_default(path: &Path) -> Result<String, UpgradeError> {
    if !path.is_file() {
        return Ok(String::new());
    }
    std::fs::read_to_string(path).map_err(|source| io_err("read converter file", path, source))
}

fn write_file(path: &Path, contents: &str) -> Result<(), UpgradeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| io_err("create parent directory", parent, source))?;
    }
    std::fs::write(path, contents).map_err(|source| io_err("write file", path, source))
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, UpgradeError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| io_err("read directory", dir, source))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| io_err("read directory entry", dir, source))?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn copy_dir_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src, &dest)?;
        } else {
            std::fs::copy(&src, &dest)?;
        }
    }
    Ok(())
}

fn io_err(operation: &str, path: &Path, source: std::io::Error) -> UpgradeError {
    UpgradeError::IoFailure {
        operation: operation.to_owned(),
        path: Some(path.to_path_buf()),
        source,
    }
}
