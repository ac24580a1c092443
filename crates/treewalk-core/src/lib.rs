// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! treewalk-core: hierarchical CSG tree walker.
//!
//! Given a database of boolean combinations and primitive solids, the walker
//! resolves per-path transform and material state, builds a boolean tree for
//! each requested object, rewrites it so that every region can be extracted
//! on its own, and then expands each region (optionally on several threads)
//! through caller-supplied [`WalkHooks`].
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Column-major `f64` matrix and vector types.
pub mod math;

mod config;
mod db;
mod dispatch;
mod error;
mod hooks;
mod matrix;
mod partition;
mod path;
mod resolve;
mod rewrite;
mod state;
mod tree;
mod walk;
mod walker;

/// Per-walk configuration.
pub use config::WalkConfig;
/// Database seam and the in-memory implementation.
pub use db::{
    encode_solid, Animation, AnimationEffect, Combination, Database, DirectoryEntry, MemoryDb,
    ObjectKind, SolidType,
};
/// Parallel region expansion.
pub use dispatch::{dispatch, DispatchContext};
/// Error type shared by every operation.
pub use error::WalkError;
/// Region and leaf callbacks.
pub use hooks::{NullHooks, RegionVerdict, WalkHooks};
/// Path-derived transforms.
pub use matrix::{path_to_matrix, region_matrix, shader_matrix};
/// Region extraction from a normalized tree.
pub use partition::{count_regions, tally_regions};
/// Root-to-object chain of directory entries.
pub use path::FullPath;
/// Path resolution.
pub use resolve::{apply_one_member, follow_path, follow_path_for_state};
/// Boolean rewriting.
pub use rewrite::{normalize, rebalance_left_heavy};
/// Walk state, material inheritance, and region snapshots.
pub use state::{
    animation_matches, CombOutcome, Inherit, Material, RegionSnapshot, Sofar, State,
};
/// Boolean expression tree.
pub use tree::{BinaryOp, SolidHandle, Tree, UnaryOp};
/// Top-level walk.
pub use walk::{walk_tree, WalkOutcome};
/// Single-object recursive walk.
pub use walker::recurse;
