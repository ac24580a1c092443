// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Boolean rewriting that pushes non-union operators below every union.
//!
//! Empty operands are folded away first, so a `Nop` left behind by a failed
//! or rejected member can never stand in for the base of a subtraction:
//!
//! ```text
//! NOP ∪ A  ⇒  A        A ∪ NOP  ⇒  A
//! NOP ^ A  ⇒  A        A ^ NOP  ⇒  A
//! NOP − A  ⇒  NOP      A − NOP  ⇒  A
//! NOP ∩ A  ⇒  NOP      A ∩ NOP  ⇒  NOP
//! ```
//!
//! `!NOP` is left as is. After folding, a normalized tree is either `Nop` or
//! holds `Nop` only beneath a unary node.
//!
//! Distribution identities (primes mark deep copies):
//!
//! ```text
//! (A ∪ B) − C  ⇒  (A − C') ∪ (B − C)
//! (A ∪ B) ∩ C  ⇒  (A ∩ C') ∪ (B ∩ C)
//! C ∩ (A ∪ B)  ⇒  (C ∩ A) ∪ (C' ∩ B)
//! C − (A ∪ B)  ⇒  (C − A) − B
//! ```
//!
//! Afterwards every union chain is rotated so that no union has a union as
//! its right operand.

use core::mem;

use crate::tree::{BinaryOp, Tree};

/// Rewrites `tree` in place until unions bind loosest and every union chain
/// leans left.
pub fn normalize(tree: &mut Tree) {
    match tree {
        Tree::Nop | Tree::Leaf { .. } | Tree::Region(_) | Tree::Solid(_) => return,
        Tree::Unary { child, .. } => {
            normalize(child);
            return;
        }
        Tree::Binary { left, right, .. } => {
            normalize(left);
            normalize(right);
        }
    }

    let (pruned, folded) = fold_empty(mem::take(tree));
    if folded {
        // Whatever survived is an operand that is already normalized.
        *tree = pruned;
        return;
    }

    let (mut rewritten, fired) = distribute(pruned);
    if fired {
        // The pattern may now match again one level down.
        if let Tree::Binary { left, right, .. } = &mut rewritten {
            normalize(left);
            normalize(right);
        }
    }
    rebalance_left_heavy(&mut rewritten);
    *tree = rewritten;
}

/// Folds an empty operand at the root of `tree` into its neighbor.
fn fold_empty(tree: Tree) -> (Tree, bool) {
    let (op, left, right) = match tree {
        Tree::Binary { op, left, right } if left.is_nop() || right.is_nop() => (op, *left, *right),
        other => return (other, false),
    };
    let folded = match (op, left, right) {
        (BinaryOp::Union | BinaryOp::Xor, Tree::Nop, kept)
        | (BinaryOp::Union | BinaryOp::Xor | BinaryOp::Subtract, kept, Tree::Nop) => kept,
        (BinaryOp::Subtract | BinaryOp::Intersect, _, _) => Tree::Nop,
        (op, left, right) => Tree::binary(op, left, right),
    };
    (folded, true)
}

/// Applies the first matching distribution identity at the root of `tree`.
fn distribute(tree: Tree) -> (Tree, bool) {
    let (op, left, right) = match tree {
        Tree::Binary { op, left, right } => (op, *left, *right),
        other => return (other, false),
    };
    match (op, left, right) {
        (
            BinaryOp::Subtract | BinaryOp::Intersect,
            Tree::Binary {
                op: BinaryOp::Union,
                left: a,
                right: b,
            },
            c,
        ) => {
            let c_copy = c.clone();
            let rewritten = Tree::union(Tree::binary(op, *a, c_copy), Tree::binary(op, *b, c));
            (rewritten, true)
        }
        (
            BinaryOp::Intersect,
            c,
            Tree::Binary {
                op: BinaryOp::Union,
                left: a,
                right: b,
            },
        ) => {
            let c_copy = c.clone();
            let rewritten = Tree::union(Tree::intersect(c, *a), Tree::intersect(c_copy, *b));
            (rewritten, true)
        }
        (
            BinaryOp::Subtract,
            c,
            Tree::Binary {
                op: BinaryOp::Union,
                left: a,
                right: b,
            },
        ) => (Tree::subtract(Tree::subtract(c, *a), *b), true),
        (op, left, right) => (Tree::binary(op, left, right), false),
    }
}

/// Rotates `L ∪ (RL ∪ RR)` into `(L ∪ RL) ∪ RR` until the right operand of
/// the root is not a union, rebalancing each new left operand as it forms.
pub fn rebalance_left_heavy(tree: &mut Tree) {
    while right_is_union(tree) {
        *tree = rotate_left(mem::take(tree));
    }
}

fn right_is_union(tree: &Tree) -> bool {
    matches!(
        tree,
        Tree::Binary {
            op: BinaryOp::Union,
            right,
            ..
        } if right.is_union()
    )
}

fn rotate_left(tree: Tree) -> Tree {
    let (left, right) = match tree {
        Tree::Binary {
            op: BinaryOp::Union,
            left,
            right,
        } => (left, right),
        other => return other,
    };
    match *right {
        Tree::Binary {
            op: BinaryOp::Union,
            left: rl,
            right: rr,
        } => {
            let mut new_left = Tree::union(*left, *rl);
            rebalance_left_heavy(&mut new_left);
            Tree::Binary {
                op: BinaryOp::Union,
                left: Box::new(new_left),
                right: rr,
            }
        }
        other => Tree::Binary {
            op: BinaryOp::Union,
            left,
            right: Box::new(other),
        },
    }
}
