//! Three-way merge over the Value Tree Model (§4.1).
//!
//! The merge is pure: it never mutates its inputs and never decides whether
//! a conflict blocks anything downstream. It always returns a tentative
//! merged tree plus the conflicts found along the way, even for conflicts
//! whose [`Resolution`](crate::model::conflict::Resolution) auto-resolves —
//! auto-resolution only describes how a later `apply_resolutions` step
//! *could* rewrite the tree, it does not change what `merge` itself returns.

use crate::model::conflict::Conflict;
use crate::model::path::Path;
use crate::model::value::{Entry, Mapping, SeqItem, Sequence, Value};

/// The field name used to detect and key named lists (§4.1, §GLOSSARY).
const DEFAULT_NAME_KEY: &str = "name";

/// The result of a structured three-way merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The tentative merged tree.
    pub value: Value,
    /// Conflicts found during the merge, in the order they were encountered.
    pub conflicts: Vec<Conflict>,
}

/// Merge `base`/`local`/`remote` using the default named-list key (`"name"`).
#[must_use]
pub fn merge(base: &Value, local: &Value, remote: &Value) -> MergeOutcome {
    merge_with_name_key(base, local, remote, DEFAULT_NAME_KEY)
}

/// Merge `base`/`local`/`remote`, using `name_key` as the field that marks a
/// sequence as a named list (configurable per §10's `UpgradeConfig`).
#[must_use]
pub fn merge_with_name_key(base: &Value, local: &Value, remote: &Value, name_key: &str) -> MergeOutcome {
    let mut conflicts = Vec::new();
    let value = merge_values(&Path::root(), base, local, remote, name_key, &mut conflicts);
    MergeOutcome { value, conflicts }
}

fn merge_values(path: &Path, base: &Value, local: &Value, remote: &Value, name_key: &str, conflicts: &mut Vec<Conflict>) -> Value {
    match (local, remote) {
        (Value::Mapping(l), Value::Mapping(r)) => {
            let b = base.as_mapping();
            Value::Mapping(merge_mappings(path, b, l, r, name_key, conflicts))
        }
        (Value::Sequence(l), Value::Sequence(r)) => {
            let b = base.as_sequence();
            merge_sequences(path, b, l, r, name_key, conflicts)
        }
        _ => merge_scalar(path, base, local, remote, conflicts),
    }
}

/// The scalar / type-mismatched-node rule (§4.1).
fn merge_scalar(path: &Path, base: &Value, local: &Value, remote: &Value, conflicts: &mut Vec<Conflict>) -> Value {
    if local == remote {
        return local.clone();
    }
    if base == local {
        return remote.clone();
    }
    if base == remote {
        return local.clone();
    }
    conflicts.push(Conflict::new(
        path.clone(),
        Some(base.clone()),
        Some(local.clone()),
        Some(remote.clone()),
    ));
    local.clone()
}

/// The mapping merge rule (§4.1): local keys first in local order, then
/// remote-only keys in remote order.
fn merge_mappings(path: &Path, base: Option<&Mapping>, local: &Mapping, remote: &Mapping, name_key: &str, conflicts: &mut Vec<Conflict>) -> Mapping {
    let mut merged = Mapping::new();

    for key in local.keys().collect::<Vec<_>>() {
        let local_entry = local.get(key).expect("key came from local.keys()");
        let child_path = path.child_key(key);

        if let Some(remote_entry) = remote.get(key) {
            let base_value = base.and_then(|m| m.get_value(key)).cloned().unwrap_or_default();
            let value = merge_values(&child_path, &base_value, &local_entry.value, &remote_entry.value, name_key, conflicts);
            merged.insert(key, Entry::with_comments(value, local_entry.comments.clone()));
        } else {
            // Only in local: keep it, and flag a deletion conflict if the
            // key existed in base (remote deleted something local still has).
            if let Some(base_value) = base.and_then(|m| m.get_value(key)) {
                conflicts.push(Conflict::new(
                    child_path,
                    Some(base_value.clone()),
                    Some(local_entry.value.clone()),
                    None,
                ));
            }
            merged.insert(key, local_entry.clone());
        }
    }

    for key in remote.keys().collect::<Vec<_>>() {
        if local.contains_key(key) {
            continue;
        }
        let remote_entry = remote.get(key).expect("key came from remote.keys()");
        let child_path = path.child_key(key);

        if let Some(base_value) = base.and_then(|m| m.get_value(key)) {
            // Only in remote, but base had it too: local deleted a key
            // remote still carries.
            conflicts.push(Conflict::new(child_path, Some(base_value.clone()), None, Some(remote_entry.value.clone())));
        }
        // Otherwise: pure remote addition, accepted silently.
        merged.insert(key, remote_entry.clone());
    }

    merged
}

/// The sequence merge rule (§4.1): named-list merge when elements qualify,
/// otherwise a positional-list merge that refuses to reconcile element-by-
/// element.
fn merge_sequences(path: &Path, base: Option<&Sequence>, local: &Sequence, remote: &Sequence, name_key: &str, conflicts: &mut Vec<Conflict>) -> Value {
    if local.is_named_list(name_key) || remote.is_named_list(name_key) {
        return merge_named_list(path, base, local, remote, name_key, conflicts);
    }
    merge_positional_list(path, base, local, remote, conflicts)
}

/// Merge a sequence of `{name: ..., ...}` mappings keyed by `name_key`,
/// preserving local order and appending remote-only names in remote order.
///
/// An item present on both sides recurses against its base counterpart
/// (absent if base never had it). An item present on only one side is kept
/// verbatim from that side rather than recursed against an absent (`Null`)
/// counterpart: recursing would let the scalar rule's `base == other_side`
/// short-circuit fire on two `Null`s and silently replace the surviving
/// item with `Null` (a spurious `- null` entry) whenever the item was also
/// absent from base on the missing side. This mirrors the original's
/// `elif local_item: merged.append(item)` fallback in `_merge_named_lists`.
fn merge_named_list(path: &Path, base: Option<&Sequence>, local: &Sequence, remote: &Sequence, name_key: &str, conflicts: &mut Vec<Conflict>) -> Value {
    let find = |seq: &Sequence, name: &str| -> Option<&Value> {
        seq.items().iter().find(|item| Sequence::name_of(&item.value, name_key) == Some(name)).map(|item| &item.value)
    };
    let find_item = |seq: &Sequence, name: &str| -> Option<&SeqItem> {
        seq.items().iter().find(|item| Sequence::name_of(&item.value, name_key) == Some(name))
    };

    let mut order: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for item in local.items() {
        if let Some(name) = Sequence::name_of(&item.value, name_key) {
            if seen.insert(name.to_owned()) {
                order.push(name.to_owned());
            }
        }
    }
    for item in remote.items() {
        if let Some(name) = Sequence::name_of(&item.value, name_key) {
            if seen.insert(name.to_owned()) {
                order.push(name.to_owned());
            }
        }
    }

    let mut items = Vec::with_capacity(order.len());
    for name in &order {
        let child_path = path.child_named(name_key, name);
        let local_value = find(local, name);
        let remote_value = find(remote, name);

        let merged_value = match (local_value, remote_value) {
            (Some(l), Some(r)) => {
                let base_value = base.and_then(|s| find(s, name)).cloned().unwrap_or_default();
                merge_values(&child_path, &base_value, l, r, name_key, conflicts)
            }
            (Some(l), None) => l.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) => unreachable!("name came from the union of local and remote items"),
        };

        let comments = find_item(local, name)
            .map(|item| item.comments.clone())
            .or_else(|| find_item(remote, name).map(|item| item.comments.clone()))
            .unwrap_or_default();

        items.push(SeqItem {
            value: merged_value,
            comments,
        });
    }

    Value::Sequence(Sequence::from_iter(items))
}

/// The positional-list rule (§4.1): no per-index reconciliation, only a
/// whole-sequence three-way comparison.
fn merge_positional_list(path: &Path, base: Option<&Sequence>, local: &Sequence, remote: &Sequence, conflicts: &mut Vec<Conflict>) -> Value {
    if local == remote {
        return Value::Sequence(local.clone());
    }
    let base_seq = base.cloned().unwrap_or_default();
    if &base_seq == local {
        return Value::Sequence(remote.clone());
    }
    if &base_seq == remote {
        return Value::Sequence(local.clone());
    }

    conflicts.push(Conflict::new(
        path.clone(),
        Some(Value::Sequence(base_seq)),
        Some(Value::Sequence(local.clone())),
        Some(Value::Sequence(remote.clone())),
    ));
    Value::Sequence(local.clone())
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;
    use crate::model::conflict::Resolution;

    fn mapping(pairs: &[(&str, Value)]) -> Value {
        let mut m = Mapping::new();
        for (k, v) in pairs {
            m.insert(*k, Entry::new(v.clone()));
        }
        Value::Mapping(m)
    }

    fn named_item(name: &str, level: &str) -> Value {
        mapping(&[("name", Value::String(name.to_owned())), ("level", Value::String(level.to_owned()))])
    }

    fn seq(items: Vec<Value>) -> Value {
        Value::Sequence(Sequence::from_iter(items.into_iter().map(SeqItem::new)))
    }

    #[test]
    fn identity_merge_is_stable_with_no_conflicts() {
        let doc = mapping(&[("a", Value::Int(1))]);
        let outcome = merge(&doc, &doc, &doc);
        assert_eq!(outcome.value, doc);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn s1_remote_only_addition() {
        let base = mapping(&[("a", Value::Int(1))]);
        let local = mapping(&[("a", Value::Int(1))]);
        let remote = mapping(&[("a", Value::Int(1)), ("b", Value::Int(2))]);
        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, mapping(&[("a", Value::Int(1)), ("b", Value::Int(2))]));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn s2_local_only_edit() {
        let base = mapping(&[("timeout", Value::Int(30))]);
        let local = mapping(&[("timeout", Value::Int(60))]);
        let remote = mapping(&[("timeout", Value::Int(30))]);
        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, mapping(&[("timeout", Value::Int(60))]));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn s3_both_changed_conflict() {
        let base = mapping(&[("retries", Value::Int(3))]);
        let local = mapping(&[("retries", Value::Int(5))]);
        let remote = mapping(&[("retries", Value::Int(10))]);
        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, mapping(&[("retries", Value::Int(5))]));
        assert_eq!(outcome.conflicts.len(), 1);
        let c = &outcome.conflicts[0];
        assert_eq!(c.path.to_string(), "retries");
        assert_eq!(c.resolution, Resolution::Unresolved);
        assert!(!c.auto_resolvable);
    }

    #[test]
    fn s4_named_list_merge() {
        let base = mapping(&[("policies", seq(vec![named_item("a", "low")]))]);
        let local = mapping(&[("policies", seq(vec![named_item("a", "high"), named_item("b", "mid")]))]);
        let remote = mapping(&[("policies", seq(vec![named_item("a", "low"), named_item("c", "mid")]))]);

        let outcome = merge(&base, &local, &remote);
        assert!(outcome.conflicts.is_empty());

        let policies = outcome.value.as_mapping().unwrap().get_value("policies").unwrap().as_sequence().unwrap();
        let names: Vec<&str> = policies.iter().map(|v| Sequence::name_of(v, "name").unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let a = policies.iter().find(|v| Sequence::name_of(v, "name") == Some("a")).unwrap();
        assert_eq!(a.as_mapping().unwrap().get_value("level"), Some(&Value::String("high".to_owned())));
    }

    #[test]
    fn s5_remote_deletes_key_user_kept() {
        let base = mapping(&[("flag", Value::Bool(true))]);
        let local = mapping(&[("flag", Value::Bool(true))]);
        let remote = mapping(&[]);

        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, mapping(&[("flag", Value::Bool(true))]));
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].path.to_string(), "flag");
        assert_eq!(outcome.conflicts[0].remote, None);
    }

    #[test]
    fn named_list_item_deleted_in_remote_keeps_local_verbatim() {
        let base = mapping(&[("policies", seq(vec![named_item("a", "low")]))]);
        let local = mapping(&[("policies", seq(vec![named_item("a", "low")]))]);
        let remote = mapping(&[("policies", seq(vec![]))]);

        let outcome = merge(&base, &local, &remote);
        let policies = outcome.value.as_mapping().unwrap().get_value("policies").unwrap().as_sequence().unwrap();
        assert_eq!(policies.len(), 1, "item present only in local must survive, not collapse to null");
        assert_eq!(Sequence::name_of(&policies.items()[0].value, "name"), Some("a"));
    }

    #[test]
    fn named_list_item_deleted_in_local_keeps_remote_verbatim() {
        let base = mapping(&[("policies", seq(vec![named_item("a", "low")]))]);
        let local = mapping(&[("policies", seq(vec![]))]);
        let remote = mapping(&[("policies", seq(vec![named_item("a", "low")]))]);

        let outcome = merge(&base, &local, &remote);
        let policies = outcome.value.as_mapping().unwrap().get_value("policies").unwrap().as_sequence().unwrap();
        assert_eq!(policies.len(), 1, "item present only in remote must survive, not collapse to null");
        assert_eq!(Sequence::name_of(&policies.items()[0].value, "name"), Some("a"));
    }

    #[test]
    fn local_deletes_key_remote_kept_is_conflict_unless_new_in_base() {
        let base = mapping(&[("old", Value::Int(1))]);
        let local = mapping(&[]);
        let remote = mapping(&[("old", Value::Int(1))]);

        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, mapping(&[("old", Value::Int(1))]));
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].local, None);
    }

    #[test]
    fn pure_remote_addition_has_no_base_is_silent() {
        let base = mapping(&[]);
        let local = mapping(&[]);
        let remote = mapping(&[("new", Value::Int(9))]);

        let outcome = merge(&base, &local, &remote);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.value, mapping(&[("new", Value::Int(9))]));
    }

    #[test]
    fn positional_list_conflict_on_divergence() {
        let base = seq(vec![Value::Int(1), Value::Int(2)]);
        let local = seq(vec![Value::Int(1), Value::Int(99)]);
        let remote = seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, local);
        assert_eq!(outcome.conflicts.len(), 1);
    }

    #[test]
    fn positional_list_remote_only_change_takes_remote() {
        let base = seq(vec![Value::Int(1)]);
        let local = seq(vec![Value::Int(1)]);
        let remote = seq(vec![Value::Int(1), Value::Int(2)]);

        let outcome = merge(&base, &local, &remote);
        assert_eq!(outcome.value, remote);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn comment_preservation_survives_merge() {
        use crate::model::value::Comments;

        let mut local = Mapping::new();
        local.insert(
            "key",
            Entry::with_comments(
                Value::Int(2),
                Comments {
                    leading: vec!["keep me".to_owned()],
                    trailing: None,
                },
            ),
        );
        let base = mapping(&[("key", Value::Int(1))]);
        let remote = mapping(&[("key", Value::Int(1))]);

        let outcome = merge(&base, &Value::Mapping(local), &remote);
        let entry = outcome.value.as_mapping().unwrap().get("key").unwrap();
        assert_eq!(entry.comments.leading, vec!["keep me".to_owned()]);
    }

    #[test]
    fn order_preservation_matches_local_ordering() {
        let base = mapping(&[("a", Value::Int(1)), ("b", Value::Int(2))]);
        let local = mapping(&[("b", Value::Int(2)), ("a", Value::Int(9))]);
        let remote = mapping(&[("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))]);

        let outcome = merge(&base, &local, &remote);
        let keys: Vec<&str> = outcome.value.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
