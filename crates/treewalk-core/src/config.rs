// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-walk configuration.

/// Knobs for one call to [`crate::walk_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WalkConfig {
    /// Number of worker threads used for region dispatch. `0` and `1` both
    /// run a single worker inline on the calling thread.
    pub workers: usize,
    /// Report lookup failures for top-level names.
    pub noisy: bool,
    /// Collapse members that loop back onto the current path instead of
    /// recursing into them.
    pub detect_cycles: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkConfig {
    /// Single worker, noisy lookups, cycle detection on.
    pub const fn new() -> Self {
        Self {
            workers: 1,
            noisy: true,
            detect_cycles: true,
        }
    }

    /// Sets the worker count.
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets whether top-level lookups are reported.
    pub const fn with_noisy(mut self, noisy: bool) -> Self {
        self.noisy = noisy;
        self
    }

    /// Enables or disables cycle detection.
    pub const fn with_cycle_detection(mut self, detect_cycles: bool) -> Self {
        self.detect_cycles = detect_cycles;
        self
    }

    /// Worker count with `0` clamped to `1`.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}
