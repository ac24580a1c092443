// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Slicing a normalized tree into independent region subtrees.
//!
//! Everything reachable through unions from the root is one region top:
//! in a left-heavy chain that is each right operand plus the final non-union
//! node at the bottom of the chain. Traversal uses an explicit worklist, so
//! arbitrarily long chains do not grow the call stack.

use core::mem;

use crate::tree::{BinaryOp, Tree};

/// Number of region tops below `tree`, empty ones included.
pub fn count_regions(tree: &Tree) -> usize {
    let mut count = 0;
    let mut work = vec![tree];
    while let Some(node) = work.pop() {
        match node {
            Tree::Binary {
                op: BinaryOp::Union,
                left,
                right,
            } => {
                work.push(right);
                work.push(left);
            }
            _ => count += 1,
        }
    }
    count
}

/// Moves every region top out of `tree`, left to right, leaving
/// [`Tree::Nop`] in its place. Empty region tops yield `None`.
///
/// The returned vector has exactly [`count_regions`] entries; what remains
/// of `tree` is a skeleton of unions over `Nop` and can be dropped.
pub fn tally_regions(tree: &mut Tree) -> Vec<Option<Tree>> {
    let mut out = Vec::with_capacity(count_regions(tree));
    let mut work = vec![tree];
    while let Some(node) = work.pop() {
        match node {
            Tree::Binary {
                op: BinaryOp::Union,
                left,
                right,
            } => {
                work.push(right.as_mut());
                work.push(left.as_mut());
            }
            top => {
                let region = mem::take(top);
                out.push((!region.is_nop()).then_some(region));
            }
        }
    }
    out
}
