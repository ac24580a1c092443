// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Second pass: expanding region subtrees across a pool of workers.
//!
//! Workers claim slots through a shared atomic counter, so slots are handed
//! out in index order while completion order is unspecified. A failure
//! inside one region collapses that region only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use crate::db::Database;
use crate::error::WalkError;
use crate::hooks::{ExpandHooks, WalkHooks};
use crate::state::{RegionSnapshot, Sofar};
use crate::tree::Tree;
use crate::walker::recurse;

/// Shared, read-mostly context handed to every worker.
pub struct DispatchContext {
    slots: Vec<Mutex<Option<Tree>>>,
    next: AtomicUsize,
    db: Arc<dyn Database>,
    hooks: Arc<dyn WalkHooks>,
    expand: Arc<dyn WalkHooks>,
}

impl DispatchContext {
    /// Builds the context from the partitioned region slots.
    pub fn new(regions: Vec<Option<Tree>>, db: Arc<dyn Database>, hooks: Arc<dyn WalkHooks>) -> Self {
        let expand: Arc<dyn WalkHooks> = Arc::new(ExpandHooks {
            caller: Arc::clone(&hooks),
        });
        Self {
            slots: regions.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
            db,
            hooks,
            expand,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Next unclaimed slot index, or `None` once every slot is taken.
    fn claim(&self) -> Option<usize> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        (idx < self.slots.len()).then_some(idx)
    }

    fn take(&self, idx: usize) -> Option<Tree> {
        self.slots
            .get(idx)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Claims slots until none remain, returning `(slot, region_end output)`
    /// for every region that produced a snapshot.
    fn work(&self) -> Result<Vec<(usize, Tree)>, WalkError> {
        let mut out = Vec::new();
        while let Some(idx) = self.claim() {
            let Some(mut tree) = self.take(idx) else {
                continue;
            };
            debug!(slot = idx, "walking region");

            let mut region = None;
            self.expand_subtree(&mut tree, &mut region)?;

            let Some(snap) = region else {
                warn!(slot = idx, tree = %tree, "region started with no state");
                continue;
            };
            let output = self.hooks.on_region_end(&snap.state, &snap.path, tree);
            out.push((idx, output));
        }
        Ok(out)
    }

    /// Replaces every `Region` placeholder in `tree` with its fully walked
    /// subtree.
    fn expand_subtree(
        &self,
        tree: &mut Tree,
        region: &mut Option<RegionSnapshot>,
    ) -> Result<(), WalkError> {
        match tree {
            Tree::Nop => Ok(()),
            Tree::Region(_) => {
                if let Tree::Region(snap) = core::mem::take(tree) {
                    *tree = self.expand_region(*snap, region)?;
                }
                Ok(())
            }
            Tree::Unary { child, .. } => self.expand_subtree(child, region),
            Tree::Binary { left, right, .. } => {
                self.expand_subtree(left, region)?;
                self.expand_subtree(right, region)
            }
            Tree::Leaf { .. } | Tree::Solid(_) => Err(WalkError::UnexpectedNode(tree.kind_name())),
        }
    }

    fn expand_region(
        &self,
        snap: RegionSnapshot,
        region: &mut Option<RegionSnapshot>,
    ) -> Result<Tree, WalkError> {
        let RegionSnapshot { mut state, mut path } = snap;
        if path.is_empty() {
            warn!("region placeholder with empty path");
            return Ok(Tree::Nop);
        }

        state.db = Some(Arc::clone(&self.db));
        state.stop_at_regions = false;
        state.hooks = Arc::clone(&self.expand);
        state.sofar.set(Sofar::INSIDE_REGION, region.is_some());

        match recurse(&state, &mut path, region) {
            Ok(subtree) => Ok(subtree),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(path = %path, error = %err, "region walk failed");
                Ok(Tree::Nop)
            }
        }
    }
}

/// Walks every slot of `ctx` using `workers` threads (`0` or `1` runs inline)
/// and returns the region-end outputs sorted by slot index.
///
/// All workers are joined before a fatal error is returned.
#[instrument(skip(ctx), fields(regions = ctx.len()))]
pub fn dispatch(ctx: &DispatchContext, workers: usize) -> Result<Vec<(usize, Tree)>, WalkError> {
    let mut results = if workers <= 1 {
        ctx.work()?
    } else {
        let per_worker: Vec<Result<Vec<(usize, Tree)>, WalkError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers).map(|_| s.spawn(|| ctx.work())).collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(res) => res,
                    Err(e) => std::panic::resume_unwind(e),
                })
                .collect()
        });
        let mut merged = Vec::new();
        for res in per_worker {
            merged.extend(res?);
        }
        merged
    };
    results.sort_by_key(|(idx, _)| *idx);
    debug!(produced = results.len(), "dispatch complete");
    Ok(results)
}
