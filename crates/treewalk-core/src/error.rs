// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use thiserror::Error;

/// Errors surfaced by path resolution, tree walking, and the matrix helpers.
///
/// Most variants are local: the caller of a per-leaf or per-region step
/// catches them and substitutes [`crate::Tree::Nop`]. Variants for which
/// [`WalkError::is_fatal`] returns `true` signal corrupted walker state and
/// are never contained.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WalkError {
    /// A name could not be found in the database.
    #[error("object not found: {0}")]
    Lookup(String),
    /// The external form of an object could not be decoded.
    #[error("unable to decode {name}: {reason}")]
    Decode {
        /// Object whose record failed to decode.
        name: String,
        /// Short description from the decoder.
        reason: String,
    },
    /// The accumulated transform shears the basis axes of a solid.
    #[error("{path}: non-orthogonal matrix (X.Y={xy:e}, Y.Z={yz:e}, X.Z={xz:e})")]
    Orthogonality {
        /// Path of the offending solid.
        path: String,
        /// Dot product of the transformed X and Y axes.
        xy: f64,
        /// Dot product of the transformed Y and Z axes.
        yz: f64,
        /// Dot product of the transformed X and Z axes.
        xz: f64,
    },
    /// A region boundary was crossed while another region was still open.
    #[error("{0}: region snapshot already open")]
    RegionAlreadyOpen(String),
    /// A tree node showed up where the walker cannot handle it.
    #[error("unexpected tree node: {0}")]
    UnexpectedNode(&'static str),
    /// The region-start hook declined the region.
    #[error("{0}: region rejected")]
    RegionRejected(String),
    /// The leaf hook produced no tree for a solid.
    #[error("{0}: leaf rejected")]
    LeafRejected(String),
    /// A member refers back to an entry already on the current path.
    #[error("{path}: cycle through {name}")]
    Cycle {
        /// Path at the point the cycle was found.
        path: String,
        /// Member that closes the cycle.
        name: String,
    },
    /// A combination does not list the requested member.
    #[error("{parent}: no member named {member}")]
    MemberNotFound {
        /// Combination that was searched.
        parent: String,
        /// Member that was requested.
        member: String,
    },
    /// A path names further elements below a solid or an empty combination.
    #[error("{0} is a leaf; remaining path elements cannot be followed")]
    LeafReachedEarly(String),
    /// A combination was expected but the entry is something else.
    #[error("{0} is not a combination")]
    NotACombination(String),
    /// An empty path or name was supplied.
    #[error("empty path")]
    EmptyPath,
    /// The state carries no database handle.
    #[error("state has no database")]
    NoDatabase,
    /// A matrix that must be inverted is singular.
    #[error("singular matrix for {0}")]
    SingularMatrix(String),
    /// The bounding box given to the shader matrix builder has no volume.
    #[error("empty bounding box for {0}")]
    EmptyBounds(String),
    /// None of the requested top-level names produced a tree.
    #[error("no objects could be walked")]
    NothingWalked,
}

impl WalkError {
    /// Returns `true` for internal invariant violations that must not be
    /// collapsed into an empty subtree.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RegionAlreadyOpen(_) | Self::UnexpectedNode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violations_are_fatal() {
        assert!(WalkError::RegionAlreadyOpen("/r".into()).is_fatal());
        assert!(WalkError::UnexpectedNode("leaf").is_fatal());
        assert!(!WalkError::Lookup("x".into()).is_fatal());
        assert!(!WalkError::RegionRejected("/r".into()).is_fatal());
        assert!(!WalkError::NothingWalked.is_fatal());
    }

    #[test]
    fn orthogonality_message_carries_dot_products() {
        let err = WalkError::Orthogonality {
            path: "/a/b".into(),
            xy: 0.5,
            yz: 0.0,
            xz: 0.0,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("/a/b"));
        assert!(msg.contains("X.Y=5e-1"));
    }
}
