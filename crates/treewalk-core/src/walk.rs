// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Top-level orchestration: resolve, discover, rewrite, partition, dispatch.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::WalkConfig;
use crate::db::Database;
use crate::dispatch::{dispatch, DispatchContext};
use crate::error::WalkError;
use crate::hooks::{DiscoverHooks, WalkHooks};
use crate::partition::tally_regions;
use crate::path::FullPath;
use crate::resolve::follow_path_for_state;
use crate::rewrite::normalize;
use crate::state::State;
use crate::tree::Tree;
use crate::walker::recurse;

/// Result of [`walk_tree`].
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// `on_region_end` outputs keyed by region slot, in slot order.
    pub regions: Vec<(usize, Tree)>,
    /// Requested names that produced no tree.
    pub skipped: usize,
}

/// Walks every object named in `names` and reports each region through
/// `hooks`.
///
/// `init` supplies the starting transform and material; its database, hooks
/// and walk flags are replaced. Names that cannot be resolved or walked are
/// counted in [`WalkOutcome::skipped`]; the call fails with
/// [`WalkError::NothingWalked`] only when no name produced a tree.
#[instrument(skip(db, names, init, hooks), fields(names = names.len(), workers = config.workers))]
pub fn walk_tree<S: AsRef<str>>(
    db: &Arc<dyn Database>,
    names: &[S],
    config: &WalkConfig,
    init: &State,
    hooks: Arc<dyn WalkHooks>,
) -> Result<WalkOutcome, WalkError> {
    let discover: Arc<dyn WalkHooks> = Arc::new(DiscoverHooks {
        caller: Arc::clone(&hooks),
    });

    let mut whole: Option<Tree> = None;
    let mut skipped = 0;
    for name in names {
        let name = name.as_ref();
        let mut state = init.duplicate();
        state.db = Some(Arc::clone(db));
        state.detect_cycles = config.detect_cycles;
        state.stop_at_regions = false;

        let mut path = FullPath::new();
        if let Err(err) = follow_path_for_state(&mut state, &mut path, name, config.noisy) {
            warn!(name, error = %err, "not found");
            skipped += 1;
            continue;
        }
        if path.is_empty() {
            continue;
        }

        state.stop_at_regions = true;
        state.hooks = Arc::clone(&discover);
        let mut region = None;
        let tree = match recurse(&state, &mut path, &mut region) {
            Ok(tree) => tree,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(name, error = %err, "first pass produced no tree");
                skipped += 1;
                continue;
            }
        };
        debug!(name, tree = %tree, "tree after first pass");

        whole = Some(match whole.take() {
            None => tree,
            Some(acc) => Tree::union(acc, tree),
        });
    }

    let Some(mut whole) = whole else {
        return Err(WalkError::NothingWalked);
    };

    normalize(&mut whole);
    debug!(tree = %whole, "tree after normalize");

    let slots = tally_regions(&mut whole);
    drop(whole);
    for (idx, slot) in slots.iter().enumerate() {
        match slot {
            Some(Tree::Region(snap)) => debug!(slot = idx, path = %snap.path, "waiting region"),
            Some(other) => debug!(slot = idx, tree = %other, "waiting subtree"),
            None => debug!(slot = idx, "empty slot"),
        }
    }

    let ctx = DispatchContext::new(slots, Arc::clone(db), hooks);
    let regions = dispatch(&ctx, config.effective_workers())?;

    if skipped > 0 {
        warn!(skipped, "some objects were not walked");
    }
    info!(regions = regions.len(), skipped, "walk complete");
    Ok(WalkOutcome { regions, skipped })
}
