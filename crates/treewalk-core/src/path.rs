// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::fmt;
use std::sync::Arc;

use crate::db::{Database, DirectoryEntry};
use crate::error::WalkError;

/// Root-to-current chain of directory entries visited during a walk.
///
/// Pushes happen before descending into a member and pops on return, so the
/// tail is always a direct member of the entry before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullPath {
    entries: Vec<Arc<DirectoryEntry>>,
}

impl FullPath {
    /// Empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up every element of a slash separated path. Empty components are
    /// skipped, so `"/a//b/"` and `"a/b"` are the same path.
    pub fn parse(db: &dyn Database, text: &str, noisy: bool) -> Result<Self, WalkError> {
        let mut path = Self::new();
        for name in text.split('/').filter(|s| !s.is_empty()) {
            let entry = db
                .lookup(name, noisy)
                .ok_or_else(|| WalkError::Lookup(name.to_owned()))?;
            path.push(entry);
        }
        Ok(path)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no element has been pushed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: Arc<DirectoryEntry>) {
        self.entries.push(entry);
    }

    /// Removes and returns the tail entry.
    pub fn pop(&mut self) -> Option<Arc<DirectoryEntry>> {
        self.entries.pop()
    }

    /// Tail entry (current position).
    pub fn last(&self) -> Option<&Arc<DirectoryEntry>> {
        self.entries.last()
    }

    /// Entry at `idx`, rootward first.
    pub fn get(&self, idx: usize) -> Option<&Arc<DirectoryEntry>> {
        self.entries.get(idx)
    }

    /// Iterates rootward to leafward.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<DirectoryEntry>> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Element names, rootward first.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// `true` if `name` occurs anywhere before the tail entry.
    ///
    /// Called right after a member has been pushed, this detects a member
    /// that refers back to one of its own ancestors.
    pub fn loops_back(&self, name: &str) -> bool {
        self.entries
            .split_last()
            .is_some_and(|(_, above)| above.iter().any(|e| e.name == name))
    }
}

impl fmt::Display for FullPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("/");
        }
        for entry in &self.entries {
            write!(f, "/{}", entry.name)?;
        }
        Ok(())
    }
}
