// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Depth-first, state-threading walk of one object.

use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::db::{Database, DirectoryEntry, ObjectKind};
use crate::error::WalkError;
use crate::hooks::RegionVerdict;
use crate::math::{near_zero, Mat4, ORTHO_TOLERANCE};
use crate::path::FullPath;
use crate::state::{CombOutcome, RegionSnapshot, Sofar, State};
use crate::tree::{BinaryOp, Tree};

/// Walks the object at the tail of `path` and returns the tree built for it.
///
/// `region` is the open-region slot shared by the whole walk of one region:
/// the first region boundary (or bare solid) crossed below a closed slot
/// fills it. Crossing a region boundary while it is already filled is an
/// invariant violation.
pub fn recurse(
    state: &State,
    path: &mut FullPath,
    region: &mut Option<RegionSnapshot>,
) -> Result<Tree, WalkError> {
    let entry = path.last().cloned().ok_or(WalkError::EmptyPath)?;
    let db = state.database()?;
    debug!(path = %path, sofar = ?state.sofar, open = region.is_some(), "recurse");

    let raw = db.get_external(&entry)?;
    match entry.kind {
        ObjectKind::Combination => walk_combination(state, path, region, db.as_ref(), &entry, &raw),
        ObjectKind::Solid => walk_solid(state, path, region, db.as_ref(), &raw),
    }
}

fn walk_combination(
    state: &State,
    path: &mut FullPath,
    region: &mut Option<RegionSnapshot>,
    db: &dyn Database,
    entry: &DirectoryEntry,
    raw: &Bytes,
) -> Result<Tree, WalkError> {
    let comb = db.decode_combination(entry, raw)?;
    let mut nts = state.duplicate();
    let starts = nts.apply_combination(path, &comb)? == CombOutcome::StartsRegion;

    if starts && nts.hooks.on_region_start(&nts, path) == RegionVerdict::Reject {
        debug!(path = %path, "region start hook rejected region");
        return Err(WalkError::RegionRejected(path.to_string()));
    }

    let mut tree = if starts && nts.stop_at_regions {
        Tree::Nop
    } else {
        if starts {
            if region.is_some() {
                error!(path = %path, "region start while a region snapshot is open");
                return Err(WalkError::RegionAlreadyOpen(path.to_string()));
            }
            debug!(path = %path, "region snapshot taken");
            *region = Some(RegionSnapshot::capture(&nts, path));
        }
        match comb.tree {
            Some(mut subtree) => {
                walk_subtree(&mut subtree, &nts, path, region)?;
                subtree
            }
            None => Tree::Nop,
        }
    };

    if starts {
        tree = nts.hooks.on_region_end(&nts, path, tree);
    }
    Ok(tree)
}

/// Replaces every leaf of `tree` with the tree walked for the member it
/// names. Members that fail collapse to [`Tree::Nop`]; only fatal errors
/// propagate.
fn walk_subtree(
    tree: &mut Tree,
    state: &State,
    path: &mut FullPath,
    region: &mut Option<RegionSnapshot>,
) -> Result<(), WalkError> {
    match tree {
        Tree::Leaf { name, matrix } => {
            let name = name.clone();
            let matrix = *matrix;
            *tree = walk_member(&name, matrix.as_ref(), state, path, region)?;
            Ok(())
        }
        Tree::Binary { op, left, right } => {
            walk_subtree(left, state, path, region)?;
            let flag = match op {
                BinaryOp::Subtract => Sofar::UNDER_SUBTRACT,
                BinaryOp::Intersect => Sofar::UNDER_INTERSECT,
                BinaryOp::Union | BinaryOp::Xor => Sofar::empty(),
            };
            if flag.is_empty() {
                walk_subtree(right, state, path, region)
            } else {
                let mut rs = state.duplicate();
                rs.sofar |= flag;
                walk_subtree(right, &rs, path, region)
            }
        }
        Tree::Unary { child, .. } => walk_subtree(child, state, path, region),
        Tree::Nop => Ok(()),
        Tree::Region(_) | Tree::Solid(_) => Err(WalkError::UnexpectedNode(tree.kind_name())),
    }
}

fn walk_member(
    name: &str,
    matrix: Option<&Mat4>,
    state: &State,
    path: &mut FullPath,
    region: &mut Option<RegionSnapshot>,
) -> Result<Tree, WalkError> {
    let mut memb = state.duplicate();
    if memb.apply_member(path, name, matrix).is_err() {
        return Ok(Tree::Nop);
    }

    let result = if memb.detect_cycles && path.loops_back(name) {
        Err(WalkError::Cycle {
            path: path.to_string(),
            name: name.to_owned(),
        })
    } else {
        recurse(&memb, path, region)
    };
    path.pop();
    match result {
        Ok(subtree) => Ok(subtree),
        Err(err) if err.is_fatal() => Err(err),
        Err(err @ WalkError::Cycle { .. }) => {
            warn!(error = %err, "cyclic reference skipped");
            Ok(Tree::Nop)
        }
        Err(err) => {
            debug!(member = name, error = %err, "member collapsed to nop");
            Ok(Tree::Nop)
        }
    }
}

fn walk_solid(
    state: &State,
    path: &FullPath,
    region: &mut Option<RegionSnapshot>,
    db: &dyn Database,
    raw: &Bytes,
) -> Result<Tree, WalkError> {
    let Some(kind) = db.identify_solid(raw) else {
        warn!(path = %path, "unable to identify solid");
        return Err(WalkError::Decode {
            name: path.to_string(),
            reason: "unrecognized solid record".into(),
        });
    };

    let (xy, yz, xz) = state.transform.axis_dots();
    if [xy, yz, xz].iter().any(|d| !near_zero(*d, ORTHO_TOLERANCE)) {
        warn!(path = %path, xy, yz, xz, "matrix does not preserve axis perpendicularity");
        return Err(WalkError::Orthogonality {
            path: path.to_string(),
            xy,
            yz,
            xz,
        });
    }

    if !state.inside_region() && !state.stop_at_regions && region.is_none() {
        debug!(path = %path, "solid not contained in a region, creating one");
        let mut snap = RegionSnapshot::capture(state, path);
        snap.state.sofar |= Sofar::INSIDE_REGION;
        *region = Some(snap);
    }

    state
        .hooks
        .on_leaf(state, path, raw, kind)
        .ok_or_else(|| WalkError::LeafRejected(path.to_string()))
}
