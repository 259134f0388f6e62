//! Error taxonomy for the upgrade core (§7).
//!
//! [`UpgradeError`] is the single error type raised by the apply stage and
//! its collaborator traits. Conflicts are data, not errors — they always
//! come back in a [`crate::model::conflict::ConflictReport`]; only
//! filesystem, policy, and collaborator failures are raised here. Each
//! variant carries enough context to build an actionable message without
//! the caller needing to consult anything else.

use std::fmt;
use std::path::PathBuf;

/// Errors raised by the upgrade core.
#[derive(Debug)]
pub enum UpgradeError {
    /// The element directory, the requested template, or the requested
    /// version does not exist.
    NotFound {
        /// What was missing (e.g. `"element directory"`, `"template"`).
        what: String,
        /// The path or identifier that was looked up.
        identifier: String,
    },

    /// The on-disk state is invalid for the requested operation: a
    /// baseline snapshot is missing and cannot be reconstructed, or a
    /// leftover backup directory from a prior run indicates an interrupted
    /// upgrade.
    InvalidState {
        /// Human-readable description of the invalid state.
        detail: String,
    },

    /// The configured [`crate::apply::UpgradePolicy`] rejected this
    /// version transition.
    UpgradeRefused {
        /// The version being upgraded from.
        from: String,
        /// The version being upgraded to.
        to: String,
        /// The policy's stated reason.
        reason: String,
    },

    /// Whole-file structural divergence in a templated file.
    ///
    /// Never actually constructed: this divergence is surfaced as a
    /// [`crate::model::conflict::Conflict`], not raised as an error. The
    /// variant stays in the taxonomy to document that decision explicitly.
    MergeAborted {
        /// The templated file whose block structure diverged.
        path: PathBuf,
    },

    /// A filesystem operation failed. Triggers rollback if past backup
    /// acquisition.
    IoFailure {
        /// What was being attempted (e.g. `"write merged values"`).
        operation: String,
        /// The path involved, if any.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A `fetch_version` or `resolve` collaborator failed. Triggers
    /// rollback.
    ExternalFailure {
        /// Name of the failing collaborator (e.g. `"fetch_version"`).
        collaborator: String,
        /// Human-readable description of the failure.
        detail: String,
    },

    /// Cooperative cancellation was signalled. Triggers rollback if past
    /// step 1 of the apply sequence.
    Cancelled {
        /// Which step of the apply sequence was in progress.
        step: String,
    },
}

impl fmt::Display for UpgradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what, identifier } => {
                write!(
                    f,
                    "{what} not found: '{identifier}'.\n  To fix: verify the path or identifier and retry."
                )
            }
            Self::InvalidState { detail } => {
                write!(
                    f,
                    "invalid upgrade state: {detail}\n  To fix: inspect the element's control directory and resolve the inconsistency before retrying."
                )
            }
            Self::UpgradeRefused { from, to, reason } => {
                write!(
                    f,
                    "upgrade from {from} to {to} refused: {reason}\n  To fix: address the policy concern, or retry with force enabled."
                )
            }
            Self::MergeAborted { path } => {
                write!(
                    f,
                    "merge aborted for '{}': structural divergence in templated file",
                    path.display()
                )
            }
            Self::IoFailure { operation, path, source } => {
                write!(f, "I/O error during {operation}")?;
                if let Some(p) = path {
                    write!(f, " ({})", p.display())?;
                }
                write!(f, ": {source}\n  To fix: check file permissions and disk space.")
            }
            Self::ExternalFailure { collaborator, detail } => {
                write!(
                    f,
                    "{collaborator} failed: {detail}\n  To fix: check the collaborator's own diagnostics and retry."
                )
            }
            Self::Cancelled { step } => {
                write!(f, "upgrade cancelled during {step}")
            }
        }
    }
}

impl std::error::Error for UpgradeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<crate::config::ConfigError> for UpgradeError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::InvalidState {
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = UpgradeError::NotFound {
            what: "element directory".to_owned(),
            identifier: "/stack/missing".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("element directory"));
        assert!(msg.contains("/stack/missing"));
    }

    #[test]
    fn display_invalid_state() {
        let err = UpgradeError::InvalidState {
            detail: "leftover backup directory".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("leftover backup directory"));
    }

    #[test]
    fn display_upgrade_refused() {
        let err = UpgradeError::UpgradeRefused {
            from: "1.0.0".to_owned(),
            to: "2.0.0".to_owned(),
            reason: "major version jump".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("1.0.0"));
        assert!(msg.contains("2.0.0"));
        assert!(msg.contains("major version jump"));
        assert!(msg.contains("force"));
    }

    #[test]
    fn display_io_failure_includes_path_and_source() {
        let err = UpgradeError::IoFailure {
            operation: "write merged values".to_owned(),
            path: Some(PathBuf::from("/stack/element/values.yaml")),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("write merged values"));
        assert!(msg.contains("values.yaml"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn error_source_io_failure() {
        let err = UpgradeError::IoFailure {
            operation: "read".to_owned(),
            path: None,
            source: std::io::Error::other("x"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_source_non_io_is_none() {
        let err = UpgradeError::Cancelled { step: "backup".to_owned() };
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn from_config_error() {
        let cfg_err = crate::config::ConfigError {
            path: Some(PathBuf::from("upgrade.toml")),
            message: "bad syntax".to_owned(),
        };
        let err: UpgradeError = cfg_err.into();
        assert!(matches!(err, UpgradeError::InvalidState { .. }));
    }
}
