//! Property-based invariant tests for keyed list reconciliation.
//!
//! 1. The rendered order always equals the new key order
//! 2. The i-th occurrence of a key keeps the node of the i-th old occurrence
//! 3. Moves are minimal: reused items minus the longest stable run
//! 4. Reconciling a list to itself writes nothing
//! 5. Duplicate keys consume old entries left to right
//! 6. The plan accounts for every old and new entry exactly once

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use weft_core::NodeId;
use weft_core::testing::SurfaceOp;
use weft_harness::{Harness, StaticTemplate, TemplateBuilder};
use weft_runtime::list::plan_keyed;
use weft_runtime::{KeyedList, Template, TemplateResult, Value};

// ── Helpers ──────────────────────────────────────────────────────────

fn item_template() -> Rc<StaticTemplate> {
    TemplateBuilder::new()
        .open("li")
        .attribute_hole("data-key")
        .text_hole()
        .close()
        .build()
}

fn list(template: &Rc<StaticTemplate>, keys: &[u8]) -> KeyedList {
    let template: Rc<dyn Template> = template.clone();
    KeyedList::from_items(
        keys.iter().copied(),
        |k| i64::from(*k),
        |k| TemplateResult::new(Rc::clone(&template), vec![Value::from(u32::from(*k)), Value::from(format!("item {k}"))]),
    )
}

fn rendered_items(h: &Harness) -> Vec<(NodeId, String)> {
    h.surface
        .children(h.container)
        .into_iter()
        .filter(|node| h.surface.tag(*node).as_deref() == Some("li"))
        .map(|node| (node, h.surface.attribute(node, "data-key").unwrap_or_default()))
        .collect()
}

/// Nodes grouped by key, in order of occurrence.
fn nodes_by_key(items: &[(NodeId, String)]) -> HashMap<String, Vec<NodeId>> {
    let mut map: HashMap<String, Vec<NodeId>> = HashMap::new();
    for (node, key) in items {
        map.entry(key.clone()).or_default().push(*node);
    }
    map
}

/// Reference O(n²) longest strictly increasing subsequence length.
fn lis_len(seq: &[usize]) -> usize {
    let mut best = vec![1usize; seq.len()];
    for i in 0..seq.len() {
        for j in 0..i {
            if seq[j] < seq[i] {
                best[i] = best[i].max(best[j] + 1);
            }
        }
    }
    best.into_iter().max().unwrap_or(0)
}

fn arb_keys() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..8, 0..14)
}

fn arb_permutation() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (1usize..16).prop_flat_map(|n| {
        let keys: Vec<u8> = (0..n as u8).collect();
        (Just(keys.clone()), Just(keys).prop_shuffle())
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Order follows new keys; nodes follow keys
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn order_and_identity_follow_keys(old in arb_keys(), new in arb_keys()) {
        let h = Harness::sync();
        let template = item_template();
        let root = h.mount(list(&template, &old)).expect("mount");
        let before = nodes_by_key(&rendered_items(&h));

        root.update(list(&template, &new)).expect("update");
        h.settle().expect("settle");
        let after = rendered_items(&h);

        let keys: Vec<String> = after.iter().map(|(_, k)| k.clone()).collect();
        let expected: Vec<String> = new.iter().map(u8::to_string).collect();
        prop_assert_eq!(keys, expected);

        for (key, nodes) in nodes_by_key(&after) {
            let old_nodes = before.get(&key).cloned().unwrap_or_default();
            for (i, node) in nodes.iter().enumerate() {
                if let Some(old_node) = old_nodes.get(i) {
                    prop_assert_eq!(node, old_node, "occurrence {} of key {}", i, key);
                } else {
                    prop_assert!(!old_nodes.contains(node));
                }
            }
        }
        prop_assert_eq!(h.text(), new.iter().map(|k| format!("item {k}")).collect::<String>());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Minimal moves on permutations
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn permutation_moves_are_minimal((old, new) in arb_permutation()) {
        let plan = plan_keyed(&old, &new);
        let sources: Vec<usize> = plan.sources.iter().flatten().copied().collect();
        prop_assert_eq!(sources.len(), new.len());
        prop_assert_eq!(plan.moves(), new.len() - lis_len(&sources));

        let h = Harness::sync();
        let template = item_template();
        let root = h.mount(list(&template, &old)).expect("mount");
        let items = rendered_items(&h);
        h.surface.clear_ops();

        root.update(list(&template, &new)).expect("update");
        h.settle().expect("settle");
        let moved_items = h
            .surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::InsertBefore { node, moved: true, .. }
                if items.iter().any(|(n, _)| n == node)))
            .count();
        prop_assert_eq!(moved_items, plan.moves());
        prop_assert_eq!(rendered_items(&h).len(), new.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Self-reconciliation is a no-op
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn same_list_writes_nothing(keys in arb_keys()) {
        let h = Harness::sync();
        let template = item_template();
        let root = h.mount(list(&template, &keys)).expect("mount");
        h.surface.clear_ops();

        root.update(list(&template, &keys)).expect("update");
        h.settle().expect("settle");
        prop_assert_eq!(h.surface.write_count(), 0);
        prop_assert!(plan_keyed(&keys, &keys).is_identity());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5 + 6. Plan bookkeeping and duplicate tie-break
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn duplicates_pair_left_to_right(old in arb_keys(), new in arb_keys()) {
        let plan = plan_keyed(&old, &new);
        for key in 0u8..8 {
            let old_positions: Vec<usize> = old.iter().enumerate().filter(|(_, k)| **k == key).map(|(i, _)| i).collect();
            let paired: Vec<usize> = new
                .iter()
                .zip(&plan.sources)
                .filter(|(k, _)| **k == key)
                .filter_map(|(_, source)| *source)
                .collect();
            let expected_len = old_positions.len().min(new.iter().filter(|k| **k == key).count());
            prop_assert_eq!(&paired[..], &old_positions[..expected_len]);
        }
    }

    #[test]
    fn plan_accounts_for_every_entry(old in arb_keys(), new in arb_keys()) {
        let plan = plan_keyed(&old, &new);
        prop_assert_eq!(plan.sources.len(), new.len());
        prop_assert_eq!(plan.stable.len(), new.len());
        prop_assert_eq!(plan.reused() + plan.created(), new.len());
        prop_assert_eq!(plan.reused() + plan.removed.len(), old.len());

        let mut seen: Vec<usize> = plan.sources.iter().flatten().copied().chain(plan.removed.iter().copied()).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..old.len()).collect::<Vec<_>>());

        for (source, stable) in plan.sources.iter().zip(&plan.stable) {
            if source.is_none() {
                prop_assert!(!stable, "created entries are never stable");
            }
        }
    }
}
