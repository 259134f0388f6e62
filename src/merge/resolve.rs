//! Applying a completed [`ConflictReport`]'s resolutions to a merged tree,
//! and emitting the human-readable markers for anything left unresolved
//! (§4.4, §6).

use crate::model::conflict::{Conflict, Resolution};
use crate::model::path::Segment;
use crate::model::value::{Entry, SeqItem, Value};

// ---------------------------------------------------------------------------
// Structured-tree resolution
// ---------------------------------------------------------------------------

/// Apply every conflict's resolution onto `value`, in order.
///
/// `KeepLocal` is a no-op (the merge's tentative value is already the local
/// one); `TakeRemote` overwrites the path with the remote value, or removes
/// the node entirely if the remote side was a deletion (`remote: None`);
/// `Custom(v)` overwrites the path with `v`. Conflicts whose path is an
/// opaque [`Segment::Literal`] (templated-text conflicts) are skipped — they
/// do not address into a `Value` tree.
///
/// `name_key` must match the field the merge core keyed named lists by
/// (`structured::merge_with_name_key`'s own `name_key`), or a
/// [`Segment::Named`] lookup silently fails to find its item.
#[must_use]
pub fn apply_resolutions(value: &Value, conflicts: &[Conflict], name_key: &str) -> Value {
    let mut result = value.clone();
    for conflict in conflicts {
        if conflict.path.segments().iter().any(|s| matches!(s, Segment::Literal(_))) {
            continue;
        }
        let replacement = match &conflict.resolution {
            Resolution::KeepLocal | Resolution::Unresolved => continue,
            Resolution::TakeRemote => conflict.remote.clone(),
            Resolution::Custom(v) => Some(v.clone()),
        };
        set_at_path(&mut result, conflict.path.segments(), replacement, name_key);
    }
    result
}

fn set_at_path(value: &mut Value, segments: &[Segment], new_value: Option<Value>, name_key: &str) {
    let Some((head, rest)) = segments.split_first() else {
        if let Some(v) = new_value {
            *value = v;
        }
        return;
    };

    match head {
        Segment::Key(key) => {
            let Some(mapping) = value.as_mapping_mut() else { return };
            if rest.is_empty() {
                match new_value {
                    Some(v) => {
                        if let Some(entry) = mapping.get_mut(key) {
                            entry.value = v;
                        } else {
                            mapping.insert(key.clone(), Entry::new(v));
                        }
                    }
                    None => {
                        mapping.remove(key);
                    }
                }
            } else if let Some(entry) = mapping.get_mut(key) {
                set_at_path(&mut entry.value, rest, new_value, name_key);
            }
        }
        Segment::Named { list_key, name } => {
            let Some(mapping) = value.as_mapping_mut() else { return };
            let Some(entry) = mapping.get_mut(list_key) else { return };
            let Some(seq) = entry.value.as_sequence_mut() else { return };

            if rest.is_empty() {
                match new_value {
                    Some(v) => {
                        if let Some(item) = seq.items_mut().iter_mut().find(|i| crate::model::value::Sequence::name_of(&i.value, name_key) == Some(name.as_str())) {
                            item.value = v;
                        } else {
                            seq.push(SeqItem::new(v));
                        }
                    }
                    None => {
                        seq.remove_named(name_key, name);
                    }
                }
            } else if let Some(item) = seq.items_mut().iter_mut().find(|i| crate::model::value::Sequence::name_of(&i.value, name_key) == Some(name.as_str())) {
                set_at_path(&mut item.value, rest, new_value, name_key);
            }
        }
        Segment::Literal(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Structured-file conflict header (§4.4, §6)
// ---------------------------------------------------------------------------

/// Build the `#`-prefixed conflict header prepended to a structured file
/// when any conflict remains unresolved, in the original's "MERGE CONFLICTS
/// FOUND" shape.
///
/// Returns `None` when there is nothing unresolved and `force` is `false`.
#[must_use]
pub fn conflict_header(conflicts: &[Conflict], from_version: &str, to_version: &str, force: bool) -> Option<String> {
    let unresolved: Vec<&Conflict> = conflicts.iter().filter(|c| !c.resolution.is_resolved()).collect();
    if unresolved.is_empty() && !force {
        return None;
    }

    let mut lines = vec![
        "# MERGE CONFLICTS FOUND".to_owned(),
        format!("# Upgrade from {from_version} to {to_version}"),
        "# The following paths had conflicts:".to_owned(),
    ];
    for conflict in &unresolved {
        lines.push(format!("#   - {}", conflict.path));
        lines.push(format!("#     Local: {}", display_or_absent(conflict.local.as_ref())));
        lines.push(format!("#     Remote: {}", display_or_absent(conflict.remote.as_ref())));
    }
    lines.push("# Please review and resolve manually".to_owned());
    lines.push(String::new());

    Some(lines.join("\n"))
}

fn display_or_absent(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_owned(), std::string::ToString::to_string)
}

// ---------------------------------------------------------------------------
// Templated-file marker resolution
// ---------------------------------------------------------------------------

const MARKER_START: &str = "{{- /* MERGE CONFLICT START */ -}}";
const MARKER_END: &str = "{{- /* MERGE CONFLICT END */ -}}";

/// Replace resolved `MERGE CONFLICT` marker blocks in `text` with their
/// final text, left to right, matched positionally against `conflicts` (the
/// same order the templated merger emitted them in). Unresolved conflicts'
/// markers are left untouched.
#[must_use]
pub fn resolve_templated_markers(text: &str, conflicts: &[Conflict]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut conflicts = conflicts.iter();

    while let Some(start) = rest.find(MARKER_START) {
        let Some(end_rel) = rest[start..].find(MARKER_END) else {
            break;
        };
        let end = start + end_rel + MARKER_END.len();

        out.push_str(&rest[..start]);

        let Some(conflict) = conflicts.next() else {
            out.push_str(&rest[start..end]);
            rest = &rest[end..];
            continue;
        };

        match &conflict.resolution {
            Resolution::KeepLocal => {
                if let Some(Value::String(s)) = &conflict.local {
                    out.push_str(s);
                } else {
                    out.push_str(&rest[start..end]);
                }
            }
            Resolution::TakeRemote => {
                if let Some(Value::String(s)) = &conflict.remote {
                    out.push_str(s);
                } else {
                    out.push_str(&rest[start..end]);
                }
            }
            Resolution::Custom(Value::String(s)) => out.push_str(s),
            Resolution::Custom(_) | Resolution::Unresolved => out.push_str(&rest[start..end]),
        }

        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}
