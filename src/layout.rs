//! Well-known relative paths inside an element directory (§6).
//!
//! An element directory holds an installed template instance. These
//! constants and helpers describe where the pieces the rest of this crate
//! cares about live relative to that root, mirroring the filesystem layout
//! fixed by §6 of the upgrade core's interface contract.

use std::path::{Path, PathBuf};

/// Chart metadata file; its top-level `name` field is local-sticky (§4.5.3).
pub const CHART_FILE: &str = "Chart.yaml";

/// The primary structured values document.
pub const VALUES_FILE: &str = "values.yaml";

/// Templated-text converter files live directly under this subdirectory.
pub const CONVERTERS_DIR: &str = "converters";

/// Opaque subtree, replaced wholesale from remote on upgrade.
pub const TEMPLATES_DIR: &str = "templates";

/// Opaque subtree, replaced wholesale from remote on upgrade.
pub const EXAMPLES_DIR: &str = "examples";

/// Control directory holding snapshots and upgrade artifacts.
pub const CONTROL_DIR: &str = ".policystack";

/// Subdirectory of [`CONTROL_DIR`] holding the baseline snapshot.
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Name of the baseline snapshot file under [`SNAPSHOTS_DIR`].
pub const BASELINE_SNAPSHOT_FILE: &str = "baseline.json";

/// Subdirectory of [`CONTROL_DIR`] holding upgrade-time artifacts.
pub const UPGRADE_DIR: &str = "upgrade";

/// Name of the conflict report file under [`UPGRADE_DIR`].
pub const CONFLICTS_FILE: &str = "conflicts.yaml";

/// `<element>/Chart.yaml`.
#[must_use]
pub fn chart_path(element: &Path) -> PathBuf {
    element.join(CHART_FILE)
}

/// `<element>/values.yaml`.
#[must_use]
pub fn values_path(element: &Path) -> PathBuf {
    element.join(VALUES_FILE)
}

/// `<element>/converters`.
#[must_use]
pub fn converters_path(element: &Path) -> PathBuf {
    element.join(CONVERTERS_DIR)
}

/// `<element>/templates`.
#[must_use]
pub fn templates_path(element: &Path) -> PathBuf {
    element.join(TEMPLATES_DIR)
}

/// `<element>/examples`.
#[must_use]
pub fn examples_path(element: &Path) -> PathBuf {
    element.join(EXAMPLES_DIR)
}

/// `<element>/.policystack/snapshots/baseline.json`.
#[must_use]
pub fn baseline_snapshot_path(element: &Path) -> PathBuf {
    element.join(CONTROL_DIR).join(SNAPSHOTS_DIR).join(BASELINE_SNAPSHOT_FILE)
}

/// `<element>/.policystack/upgrade/conflicts.yaml`.
#[must_use]
pub fn conflicts_report_path(element: &Path) -> PathBuf {
    element.join(CONTROL_DIR).join(UPGRADE_DIR).join(CONFLICTS_FILE)
}

/// The sibling backup path used by the Apply Stage (§4.5 step 1, §5): for
/// an element at `<parent>/<name>`, the backup lives at
/// `<parent>/.<name>.backup`. Its presence at startup is the coarse lock
/// indicator described in §5.
#[must_use]
pub fn backup_path(element: &Path) -> PathBuf {
    let name = element.file_name().map_or_else(|| ".backup".into(), |n| format!(".{}.backup", n.to_string_lossy()));
    element.with_file_name(name)
}

/// Idempotently create the directories an element's control area needs
/// (`.policystack/snapshots`, `.policystack/upgrade`). Existing directories
/// are left untouched.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_control_dirs(element: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(element.join(CONTROL_DIR).join(SNAPSHOTS_DIR))?;
    std::fs::create_dir_all(element.join(CONTROL_DIR).join(UPGRADE_DIR))?;
    Ok(())
}
