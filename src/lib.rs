//! `stackmerge` — a three-way merge engine for upgrading an installed
//! template (a directory tree of configuration and chart files derived from
//! an upstream template) to a newer upstream version while preserving local
//! modifications.
//!
//! The crate is organised bottom-up, mirroring the pipeline in spec §2:
//!
//! - [`model`] — the Value Tree Model, path addressing, and the conflict
//!   model (§3, §4.4).
//! - [`yaml`] — a comment-preserving parser/serializer for the structured
//!   document subset this crate merges.
//! - [`merge`] — the structured-document merger (§4.1) and templated-text
//!   merger (§4.2), plus resolution application (§4.4).
//! - [`snapshot`] — the change detector / baseline snapshotter (§4.3).
//! - [`config`] — ambient configuration for the merge and apply stages.
//! - [`layout`] — well-known relative paths inside an element directory (§6).
//! - [`error`] — the error taxonomy raised by the apply stage (§7).
//! - [`apply`] — the apply stage: the only part of the crate that mutates
//!   the filesystem (§4.5, §5).
//!
//! Everything below [`apply`] is a pure function over in-memory values or a
//! read-only filesystem walk; the apply stage is where side effects,
//! rollback, and the collaborator protocol (fetch / resolve / policy) live.

pub mod apply;
pub mod config;
pub mod error;
pub mod layout;
pub mod merge;
pub mod model;
pub mod snapshot;
pub mod yaml;

pub use apply::{run, UpgradeRequest};
pub use config::UpgradeConfig;
pub use error::UpgradeError;
pub use model::conflict::{Conflict, ConflictReport, Resolution};
pub use model::value::Value;
