//! Ambient configuration surface for the upgrade core (§10).
//!
//! `UpgradeConfig` controls knobs the merge core and apply stage consult but
//! that spec.md leaves as implementation detail: the named-list key field,
//! whether unresolved conflicts block the commit step, and the digest
//! algorithm tag recorded in a [`crate::snapshot::Snapshot`]. Missing file
//! or missing fields fall back to documented defaults.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Digest algorithms a [`crate::snapshot::Snapshot`] can record. SHA-256 is
/// the only one implemented; the tag exists for future algorithm agility
/// (§10).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlgorithm {
    /// SHA-256 (the only implemented algorithm).
    #[default]
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Top-level upgrade engine configuration.
///
/// Parsed from an optional TOML file supplied by the caller, or constructed
/// programmatically. Missing file → all defaults (not an error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpgradeConfig {
    /// Merge behaviour settings.
    #[serde(default)]
    pub merge: MergeSettings,

    /// Apply-stage behaviour settings.
    #[serde(default)]
    pub apply: ApplySettings,
}

/// Structured-merge settings (§4.1, §4.4).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeSettings {
    /// The mapping key that marks a sequence as a named list (default
    /// `"name"`, per the `GLOSSARY`'s "Named list" definition).
    #[serde(default = "default_name_key")]
    pub name_key: String,

    /// Digest algorithm tag recorded in snapshots.
    #[serde(default)]
    pub digest_algorithm: DigestAlgorithm,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            name_key: default_name_key(),
            digest_algorithm: DigestAlgorithm::default(),
        }
    }
}

fn default_name_key() -> String {
    "name".to_owned()
}

/// Apply-stage settings (§4.5).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplySettings {
    /// Whether unresolved conflicts should block the commit step (`true`)
    /// or always be persisted and accepted (`false`).
    #[serde(default = "default_block_on_unresolved")]
    pub block_on_unresolved: bool,

    /// Whether to write a conflict header even when every conflict was
    /// resolved, for audit trails.
    #[serde(default)]
    pub always_write_header: bool,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            block_on_unresolved: default_block_on_unresolved(),
            always_write_header: false,
        }
    }
}

const fn default_block_on_unresolved() -> bool {
    true
}

/// Error loading an [`UpgradeConfig`] from TOML.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded, if any.
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message, including a line number when one is known.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl UpgradeConfig {
    /// Load configuration from a TOML file.
    ///
    /// If the file does not exist, returns all defaults (not an error).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O errors (other than not-found) or
    /// parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start].chars().filter(|&c| c == '\n').count() + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError { path: None, message }
        })
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = UpgradeConfig::default();
        assert_eq!(cfg.merge.name_key, "name");
        assert_eq!(cfg.merge.digest_algorithm, DigestAlgorithm::Sha256);
        assert!(cfg.apply.block_on_unresolved);
        assert!(!cfg.apply.always_write_header);
    }

    #[test]
    fn parse_empty_string_is_defaults() {
        let cfg = UpgradeConfig::parse("").unwrap();
        assert_eq!(cfg, UpgradeConfig::default());
    }

    #[test]
    fn parse_overrides() {
        let toml = r#"
[merge]
name_key = "id"

[apply]
block_on_unresolved = false
always_write_header = true
"#;
        let cfg = UpgradeConfig::parse(toml).unwrap();
        assert_eq!(cfg.merge.name_key, "id");
        assert!(!cfg.apply.block_on_unresolved);
        assert!(cfg.apply.always_write_header);
    }

    #[test]
    fn rejects_unknown_field() {
        let err = UpgradeConfig::parse("unknown = true").unwrap_err();
        assert!(err.message.contains("unknown field"));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = UpgradeConfig::load(Path::new("/nonexistent/upgrade.toml")).unwrap();
        assert_eq!(cfg, UpgradeConfig::default());
    }

    #[test]
    fn load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrade.toml");
        std::fs::write(&path, "[merge]\nname_key = \"id\"\n").unwrap();
        let cfg = UpgradeConfig::load(&path).unwrap();
        assert_eq!(cfg.merge.name_key, "id");
    }

    #[test]
    fn load_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = UpgradeConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn digest_algorithm_display() {
        assert_eq!(format!("{}", DigestAlgorithm::Sha256), "sha256");
    }
}
