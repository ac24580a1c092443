// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests for boolean rewriting and region partitioning.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use treewalk_core::{count_regions, normalize, tally_regions, BinaryOp, Tree, UnaryOp};

fn arb_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        3 => Just(BinaryOp::Union),
        2 => Just(BinaryOp::Subtract),
        2 => Just(BinaryOp::Intersect),
        1 => Just(BinaryOp::Xor),
    ]
}

fn arb_name() -> impl Strategy<Value = Tree> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f", "g"]).prop_map(Tree::leaf)
}

/// Trees whose leaves all name members.
fn arb_tree() -> impl Strategy<Value = Tree> {
    grow(arb_name().boxed())
}

/// Trees that also hold the `Nop` a failed or rejected member leaves behind.
fn arb_tree_with_gaps() -> impl Strategy<Value = Tree> {
    grow(prop_oneof![5 => arb_name(), 1 => Just(Tree::Nop)].boxed())
}

fn grow(leaf: BoxedStrategy<Tree>) -> impl Strategy<Value = Tree> {
    leaf.prop_recursive(6, 64, 2, |inner| {
        prop_oneof![
            6 => (arb_op(), inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| Tree::binary(op, l, r)),
            1 => inner.prop_map(|t| Tree::unary(UnaryOp::Not, t)),
        ]
    })
}

fn identity_set(tree: &Tree) -> BTreeSet<String> {
    tree.identities().into_iter().collect()
}

/// No subtraction or intersection has a union as a direct operand.
fn unions_bind_loosest(tree: &Tree) -> bool {
    match tree {
        Tree::Binary { op, left, right } => {
            let distributes = matches!(op, BinaryOp::Subtract | BinaryOp::Intersect);
            !(distributes && (left.is_union() || right.is_union()))
                && unions_bind_loosest(left)
                && unions_bind_loosest(right)
        }
        Tree::Unary { child, .. } => unions_bind_loosest(child),
        _ => true,
    }
}

/// `true` when some member of `tree` contributes material instead of only
/// cutting it away.
fn has_base(tree: &Tree) -> bool {
    match tree {
        Tree::Nop => false,
        Tree::Leaf { .. } | Tree::Region(_) | Tree::Solid(_) | Tree::Unary { .. } => true,
        Tree::Binary { op, left, right } => match op {
            BinaryOp::Union | BinaryOp::Xor => has_base(left) || has_base(right),
            BinaryOp::Subtract => has_base(left),
            BinaryOp::Intersect => has_base(left) && has_base(right),
        },
    }
}

fn nop_only_under_unary(tree: &Tree) -> bool {
    match tree {
        Tree::Binary { left, right, .. } => {
            !left.is_nop()
                && !right.is_nop()
                && nop_only_under_unary(left)
                && nop_only_under_unary(right)
        }
        _ => true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn normalize_preserves_identities(tree in arb_tree()) {
        let before = identity_set(&tree);
        let mut out = tree;
        normalize(&mut out);
        prop_assert_eq!(identity_set(&out), before);
    }

    #[test]
    fn normalize_never_invents_identities(tree in arb_tree_with_gaps()) {
        let before = identity_set(&tree);
        let mut out = tree;
        normalize(&mut out);
        prop_assert!(identity_set(&out).is_subset(&before));
        prop_assert!(nop_only_under_unary(&out), "stray nop: {}", out);
    }

    #[test]
    fn every_slot_keeps_a_base_operand(tree in arb_tree_with_gaps()) {
        let mut whole = tree;
        normalize(&mut whole);
        for slot in tally_regions(&mut whole).iter().flatten() {
            if !slot.identities().is_empty() {
                prop_assert!(has_base(slot), "slot has only subtracted members: {}", slot);
            }
        }
    }

    #[test]
    fn normalized_trees_lean_left(tree in arb_tree_with_gaps()) {
        let mut out = tree;
        normalize(&mut out);
        prop_assert!(out.is_left_leaning(), "not left leaning: {}", out);
        prop_assert!(unions_bind_loosest(&out), "union below operator: {}", out);
    }

    #[test]
    fn normalize_is_idempotent(tree in arb_tree_with_gaps()) {
        let mut once = tree;
        normalize(&mut once);
        let mut twice = once.clone();
        normalize(&mut twice);
        prop_assert_eq!(twice.to_string(), once.to_string());
    }

    #[test]
    fn partition_covers_every_identity_once(tree in arb_tree_with_gaps()) {
        let mut whole = tree;
        normalize(&mut whole);
        let mut expected = whole.identities();
        expected.sort();

        let count = count_regions(&whole);
        let slots = tally_regions(&mut whole);
        prop_assert_eq!(slots.len(), count);
        prop_assert!(whole.identities().is_empty());
        prop_assert!(whole.is_all_unions());

        let mut got = Vec::new();
        for slot in slots.iter().flatten() {
            prop_assert!(!slot.is_union(), "region top is a union: {}", slot);
            got.extend(slot.identities());
        }
        got.sort();
        prop_assert_eq!(got, expected);
    }
}
