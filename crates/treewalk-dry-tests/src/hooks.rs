// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Walk hooks that record what the walker hands them.

use std::sync::Mutex;

use bytes::Bytes;
use treewalk_core::math::Mat4;
use treewalk_core::{FullPath, Material, RegionVerdict, Sofar, SolidType, State, Tree, WalkHooks};

/// One `on_leaf` call.
#[derive(Debug, Clone)]
pub struct LeafVisit {
    /// Path of the solid.
    pub path: String,
    /// Region bits at the leaf.
    pub sofar: Sofar,
    /// Accumulated transform at the leaf.
    pub transform: Mat4,
    /// Accumulated material at the leaf.
    pub material: Material,
    /// Region id in effect at the leaf.
    pub region_id: i32,
}

#[derive(Debug, Default)]
struct Recorded {
    region_starts: Vec<String>,
    region_ends: Vec<String>,
    leaves: Vec<LeafVisit>,
}

/// [`WalkHooks`] that record every call.
///
/// Leaves become `Tree::solid(path)` so the region-end trees can be
/// inspected. Regions and leaves can be rejected by path.
///
/// # Example
///
/// ```
/// use treewalk_dry_tests::RecordingHooks;
///
/// let hooks = RecordingHooks::new().reject_region("/top/sub");
/// assert!(hooks.leaves().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingHooks {
    inner: Mutex<Recorded>,
    reject_regions: Vec<String>,
    reject_leaves: Vec<String>,
}

impl RecordingHooks {
    /// Hooks that accept everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the region rooted at `path`.
    pub fn reject_region(mut self, path: &str) -> Self {
        self.reject_regions.push(path.to_owned());
        self
    }

    /// Returns no tree for the solid at `path`.
    pub fn reject_leaf(mut self, path: &str) -> Self {
        self.reject_leaves.push(path.to_owned());
        self
    }

    /// Paths passed to `on_region_start`, in call order.
    pub fn region_starts(&self) -> Vec<String> {
        self.lock().region_starts.clone()
    }

    /// Paths passed to `on_region_end`, sorted.
    pub fn region_ends(&self) -> Vec<String> {
        let mut out = self.lock().region_ends.clone();
        out.sort();
        out
    }

    /// Every `on_leaf` call, sorted by path.
    pub fn leaves(&self) -> Vec<LeafVisit> {
        let mut out = self.lock().leaves.clone();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// Leaf paths, sorted.
    pub fn leaf_paths(&self) -> Vec<String> {
        self.leaves().into_iter().map(|v| v.path).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WalkHooks for RecordingHooks {
    fn on_region_start(&self, _state: &State, path: &FullPath) -> RegionVerdict {
        let path = path.to_string();
        let verdict = if self.reject_regions.contains(&path) {
            RegionVerdict::Reject
        } else {
            RegionVerdict::Accept
        };
        self.lock().region_starts.push(path);
        verdict
    }

    fn on_region_end(&self, _state: &State, path: &FullPath, tree: Tree) -> Tree {
        self.lock().region_ends.push(path.to_string());
        tree
    }

    fn on_leaf(&self, state: &State, path: &FullPath, _raw: &Bytes, _kind: SolidType) -> Option<Tree> {
        let path = path.to_string();
        self.lock().leaves.push(LeafVisit {
            path: path.clone(),
            sofar: state.sofar,
            transform: state.transform,
            material: state.material.clone(),
            region_id: state.region_id,
        });
        if self.reject_leaves.contains(&path) {
            return None;
        }
        Some(Tree::solid(path))
    }
}
