// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for treewalk crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`db`] - In-memory database builders
//! - [`hooks`] - Recording walk hooks
//! - [`scenarios`] - Small databases shared by the integration suites

pub mod db;
pub mod hooks;
pub mod scenarios;

pub use db::{CombBuilder, DbBuilder, BOX};
pub use hooks::{LeafVisit, RecordingHooks};
