//! Three-way merge over templated text: static content interleaved with
//! opaque `{{ ... }}` directives (§4.2).
//!
//! Directives are never interpreted — the merger only aligns block
//! boundaries and applies the scalar three-way rule to each block's raw
//! text. This mirrors the original's non-nested `{{[^}]*}}` split: a
//! directive is the maximal run from `{{` to the next `}}`, found with a
//! plain substring scan rather than a regex engine, since the boundary
//! grammar has no nesting to speak of.

use crate::model::conflict::Conflict;
use crate::model::path::Path;
use crate::model::value::Value;

/// One token of a tokenised templated-text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Plain text between directives.
    Static(String),
    /// A `{{ ... }}` directive, stored with its delimiters.
    Directive(String),
}

impl Block {
    fn text(&self) -> &str {
        match self {
            Self::Static(s) | Self::Directive(s) => s,
        }
    }
}

/// Split `input` into a sequence of [`Block`]s. Whitespace-only static runs
/// are dropped, matching §4.2 step 1.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let (before, after_start) = rest.split_at(start);
        if !before.trim().is_empty() {
            blocks.push(Block::Static(before.to_owned()));
        }

        if let Some(end) = after_start.find("}}") {
            let directive_end = end + "}}".len();
            blocks.push(Block::Directive(after_start[..directive_end].to_owned()));
            rest = &after_start[directive_end..];
        } else {
            // Unterminated directive: treat the remainder as static text
            // rather than silently dropping it.
            blocks.push(Block::Static(after_start.to_owned()));
            rest = "";
            break;
        }
    }

    if !rest.trim().is_empty() {
        blocks.push(Block::Static(rest.to_owned()));
    }

    blocks
}

/// The outcome of a templated-text three-way merge.
#[derive(Debug, Clone)]
pub struct TemplateMergeOutcome {
    /// The merged text.
    pub text: String,
    /// Conflicts found during the merge.
    pub conflicts: Vec<Conflict>,
}

const MARKER_START: &str = "{{- /* MERGE CONFLICT START */ -}}";
const MARKER_LOCAL: &str = "{{- /* LOCAL VERSION */ -}}";
const MARKER_REMOTE: &str = "{{- /* REMOTE VERSION */ -}}";
const MARKER_END: &str = "{{- /* MERGE CONFLICT END */ -}}";

/// Three-way merge templated text (§4.2).
#[must_use]
pub fn merge(base: &str, local: &str, remote: &str) -> TemplateMergeOutcome {
    let base_blocks = tokenize(base);
    let local_blocks = tokenize(local);
    let remote_blocks = tokenize(remote);

    if local_blocks.len() != remote_blocks.len() {
        let conflict = Conflict::new(
            Path::literal("entire_file"),
            Some(Value::String(base.to_owned())),
            Some(Value::String(local.to_owned())),
            Some(Value::String(remote.to_owned())),
        );
        return TemplateMergeOutcome {
            text: local.to_owned(),
            conflicts: vec![conflict],
        };
    }

    let mut merged = String::new();
    let mut conflicts = Vec::new();

    for (i, (local_block, remote_block)) in local_blocks.iter().zip(remote_blocks.iter()).enumerate() {
        let base_text = base_blocks.get(i).map_or("", |b| b.text());
        let local_text = local_block.text();
        let remote_text = remote_block.text();

        if local_text == remote_text {
            merged.push_str(local_text);
            continue;
        }
        if base_text == local_text {
            merged.push_str(remote_text);
            continue;
        }
        if base_text == remote_text {
            merged.push_str(local_text);
            continue;
        }

        conflicts.push(Conflict::new(
            Path::literal(format!("block_{i}")),
            Some(Value::String(base_text.to_owned())),
            Some(Value::String(local_text.to_owned())),
            Some(Value::String(remote_text.to_owned())),
        ));
        merged.push_str(&conflict_marker(local_text, remote_text));
    }

    TemplateMergeOutcome { text: merged, conflicts }
}

fn conflict_marker(local_text: &str, remote_text: &str) -> String {
    format!("\n{MARKER_START}\n{MARKER_LOCAL}\n{local_text}\n{MARKER_REMOTE}\n{remote_text}\n{MARKER_END}\n")
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_static_and_directive_blocks() {
        let blocks = tokenize("hello {{ .Name }} world");
        assert_eq!(
            blocks,
            vec![
                Block::Static("hello ".to_owned()),
                Block::Directive("{{ .Name }}".to_owned()),
                Block::Static(" world".to_owned()),
            ]
        );
    }

    #[test]
    fn drops_whitespace_only_static_blocks() {
        let blocks = tokenize("{{ a }}\n{{ b }}");
        assert_eq!(blocks, vec![Block::Directive("{{ a }}".to_owned()), Block::Directive("{{ b }}".to_owned())]);
    }

    #[test]
    fn identical_blocks_merge_without_conflict() {
        let text = "prefix {{ .A }} suffix";
        let outcome = merge(text, text, text);
        assert_eq!(outcome.text, text);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn local_only_edit_is_kept() {
        let base = "{{ a }} value";
        let local = "{{ a }} changed";
        let remote = "{{ a }} value";
        let outcome = merge(base, local, remote);
        assert_eq!(outcome.text, local);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn remote_only_edit_is_taken() {
        let base = "{{ a }} value";
        let local = "{{ a }} value";
        let remote = "{{ a }} new value";
        let outcome = merge(base, local, remote);
        assert_eq!(outcome.text, remote);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn s6_structural_divergence_is_whole_file_conflict() {
        let base = "{{ a }}{{ b }}{{ c }}{{ d }}";
        let local = "{{ a }}{{ b }}{{ c }}{{ d }}";
        let remote = "{{ a }}{{ b }}{{ c }}{{ d }}{{ e }}";
        let outcome = merge(base, local, remote);
        assert_eq!(outcome.text, local);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].path.to_string(), "entire_file");
    }

    #[test]
    fn both_changed_block_emits_greppable_marker() {
        let base = "{{ a }} one";
        let local = "{{ a }} two";
        let remote = "{{ a }} three";
        let outcome = merge(base, local, remote);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].path.to_string(), "block_1");
        assert!(outcome.text.contains("MERGE CONFLICT"));
        assert!(outcome.text.contains("two"));
        assert!(outcome.text.contains("three"));
    }
}
