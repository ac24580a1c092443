// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Path resolution: replaying a root-to-object path onto a [`State`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::DirectoryEntry;
use crate::error::WalkError;
use crate::path::FullPath;
use crate::state::{Sofar, State};
use crate::tree::{BinaryOp, Tree};

/// Follows a slash separated path (`"top/sub/leaf"`), updating `state` and
/// appending to `total` along the way.
///
/// An empty string (or one made only of slashes) succeeds without touching
/// either argument.
pub fn follow_path_for_state(
    state: &mut State,
    total: &mut FullPath,
    text: &str,
    noisy: bool,
) -> Result<(), WalkError> {
    if text.split('/').all(str::is_empty) {
        return Ok(());
    }
    let db = state.database()?;
    let new_path = FullPath::parse(db.as_ref(), text, noisy)?;
    follow_path(state, total, &new_path, noisy, 0)
}

/// Replays `new_path` onto `state`, continuing from the tail of `total` when
/// it is non-empty.
///
/// `depth` limits how many arcs of `new_path` are used: `0` uses all of
/// them, a positive value uses that many, and a negative value uses all but
/// that many.
pub fn follow_path(
    state: &mut State,
    total: &mut FullPath,
    new_path: &FullPath,
    noisy: bool,
    depth: isize,
) -> Result<(), WalkError> {
    let Some(last) = new_path.len().checked_sub(1) else {
        return Err(WalkError::EmptyPath);
    };
    let stop = arc_limit(depth, last)?;
    let db = state.database()?;
    debug!(total = %total, new_path = %new_path, depth, "follow path");

    let mut j = 0;
    let mut comb = if let Some(tail) = total.last() {
        Arc::clone(tail)
    } else {
        let first = element(new_path, 0)?;
        state.apply_root_animations(db.as_ref(), &first);
        total.push(Arc::clone(&first));
        if is_leaf(&first) {
            return leaf_reached(0, last, total, noisy);
        }
        j = 1;
        first
    };

    while j <= stop {
        let member = element(new_path, j)?;
        if !comb.is_combination() {
            warn!(object = %comb.name, "not a combination");
            return Err(WalkError::NotACombination(comb.name.clone()));
        }
        debug!(comb = %comb.name, member = %member.name, "follow arc");

        let raw = db.get_external(&comb)?;
        let decoded = db.decode_combination(&comb, &raw)?;
        state.apply_combination(total, &decoded)?;
        let tree = decoded.tree.unwrap_or_default();
        if !apply_one_member(state, total, &member.name, Sofar::empty(), &tree)? {
            warn!(comb = %comb.name, member = %member.name, "unable to apply member state");
            return Err(WalkError::MemberNotFound {
                parent: comb.name.clone(),
                member: member.name.clone(),
            });
        }

        if is_leaf(&member) {
            return leaf_reached(j, last, total, noisy);
        }
        j += 1;
        comb = member;
    }
    Ok(())
}

/// Searches `tree` depth-first, left to right, for the leaf naming `name`
/// and applies it with [`State::apply_member`].
///
/// Returns `Ok(false)` when no such leaf exists. The right operand of a
/// subtraction or intersection contributes the matching [`Sofar`] bit.
pub fn apply_one_member(
    state: &mut State,
    path: &mut FullPath,
    name: &str,
    sofar: Sofar,
    tree: &Tree,
) -> Result<bool, WalkError> {
    match tree {
        Tree::Leaf { name: leaf, matrix } => {
            if leaf != name {
                return Ok(false);
            }
            state.sofar |= sofar;
            state.apply_member(path, name, matrix.as_ref())?;
            Ok(true)
        }
        Tree::Binary { op, left, right } => {
            if apply_one_member(state, path, name, sofar, left)? {
                return Ok(true);
            }
            let sofar = match op {
                BinaryOp::Subtract => sofar | Sofar::UNDER_SUBTRACT,
                BinaryOp::Intersect => sofar | Sofar::UNDER_INTERSECT,
                BinaryOp::Union | BinaryOp::Xor => sofar,
            };
            apply_one_member(state, path, name, sofar, right)
        }
        Tree::Unary { child, .. } => apply_one_member(state, path, name, sofar, child),
        Tree::Nop | Tree::Region(_) | Tree::Solid(_) => Ok(false),
    }
}

/// Index of the last element of `new_path` to process.
fn arc_limit(depth: isize, last: usize) -> Result<usize, WalkError> {
    match depth {
        0 => Ok(last),
        d if d > 0 => Ok(d.unsigned_abs().min(last)),
        d => last
            .checked_sub(d.unsigned_abs())
            .ok_or(WalkError::EmptyPath),
    }
}

fn element(path: &FullPath, idx: usize) -> Result<Arc<DirectoryEntry>, WalkError> {
    path.get(idx).cloned().ok_or(WalkError::EmptyPath)
}

fn is_leaf(entry: &DirectoryEntry) -> bool {
    !entry.is_combination() || entry.member_count == 0
}

fn leaf_reached(j: usize, last: usize, total: &FullPath, noisy: bool) -> Result<(), WalkError> {
    if j == last {
        return Ok(());
    }
    if noisy {
        warn!(path = %total, "path ended in leaf; additional path specified");
    }
    Err(WalkError::LeafReachedEarly(total.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_limit_follows_sign_convention() {
        assert_eq!(arc_limit(0, 3), Ok(3));
        assert_eq!(arc_limit(2, 3), Ok(2));
        assert_eq!(arc_limit(9, 3), Ok(3));
        assert_eq!(arc_limit(-1, 3), Ok(2));
        assert_eq!(arc_limit(-3, 3), Ok(0));
        assert_eq!(arc_limit(-4, 3), Err(WalkError::EmptyPath));
    }
}
