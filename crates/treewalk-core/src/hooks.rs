// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Caller-supplied callbacks invoked at region boundaries and leaves.

use std::sync::Arc;

use bytes::Bytes;

use crate::db::SolidType;
use crate::path::FullPath;
use crate::state::{RegionSnapshot, State};
use crate::tree::Tree;

/// Answer from [`WalkHooks::on_region_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionVerdict {
    /// Walk the region.
    Accept,
    /// Omit the region and everything below it.
    Reject,
}

/// Callbacks driven by the walker.
///
/// During [`crate::walk_tree`], `on_region_start` runs on the calling thread
/// while `on_region_end` and `on_leaf` may run concurrently on worker
/// threads; implementations with shared side effects must synchronize.
pub trait WalkHooks: Send + Sync {
    /// Called when a region boundary is crossed, before anything below it is
    /// visited.
    fn on_region_start(&self, _state: &State, _path: &FullPath) -> RegionVerdict {
        RegionVerdict::Accept
    }

    /// Called once a region has been fully walked. The returned tree
    /// replaces `tree`.
    fn on_region_end(&self, _state: &State, _path: &FullPath, tree: Tree) -> Tree {
        tree
    }

    /// Produces the tree node for a solid. `None` fails that leaf.
    fn on_leaf(&self, state: &State, path: &FullPath, raw: &Bytes, kind: SolidType)
        -> Option<Tree>;
}

/// Hooks that accept every region and reject every leaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl WalkHooks for NullHooks {
    fn on_leaf(&self, _: &State, _: &FullPath, _: &Bytes, _: SolidType) -> Option<Tree> {
        None
    }
}

/// First pass: asks the caller whether to take each region, then records
/// every region (and every bare solid) as a [`Tree::Region`] placeholder.
pub(crate) struct DiscoverHooks {
    pub(crate) caller: Arc<dyn WalkHooks>,
}

impl WalkHooks for DiscoverHooks {
    fn on_region_start(&self, state: &State, path: &FullPath) -> RegionVerdict {
        self.caller.on_region_start(state, path)
    }

    fn on_region_end(&self, state: &State, path: &FullPath, _tree: Tree) -> Tree {
        Tree::region(RegionSnapshot::capture(state, path))
    }

    fn on_leaf(&self, state: &State, path: &FullPath, _: &Bytes, _: SolidType) -> Option<Tree> {
        Some(Tree::region(RegionSnapshot::capture(state, path)))
    }
}

/// Second pass: every region was already accepted, region ends are
/// reported by the dispatcher, and leaves go to the caller.
pub(crate) struct ExpandHooks {
    pub(crate) caller: Arc<dyn WalkHooks>,
}

impl WalkHooks for ExpandHooks {
    fn on_leaf(&self, state: &State, path: &FullPath, raw: &Bytes, kind: SolidType) -> Option<Tree> {
        self.caller.on_leaf(state, path, raw, kind)
    }
}
