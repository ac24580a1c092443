// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Boolean (CSG) expression tree.
//!
//! Every node owns its children. Splicing a subtree in place of a node is a
//! plain assignment through `&mut Tree`; the displaced node is dropped or
//! moved out with [`core::mem::take`] (which leaves [`Tree::Nop`] behind).
//! Cloning is always a deep copy, so two parents never alias one child.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::math::Mat4;
use crate::state::RegionSnapshot;

/// Opaque payload produced by a leaf hook.
pub type SolidHandle = Arc<dyn Any + Send + Sync>;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Complement.
    Not,
    /// Guard.
    Guard,
    /// Pass-through.
    Xnop,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `A ∪ B`
    Union,
    /// `A ∩ B`
    Intersect,
    /// `A − B`
    Subtract,
    /// `A ⊕ B`
    Xor,
}

impl BinaryOp {
    /// Single-character operator used by the tree printer.
    pub const fn symbol(self) -> char {
        match self {
            Self::Union => 'u',
            Self::Intersect => '+',
            Self::Subtract => '-',
            Self::Xor => '^',
        }
    }
}

/// One node of a boolean expression tree.
#[derive(Clone, Default)]
pub enum Tree {
    /// Empty.
    #[default]
    Nop,
    /// Reference to a named member, optionally with an arc matrix.
    Leaf {
        /// Member name.
        name: String,
        /// Arc matrix; `None` means identity.
        matrix: Option<Mat4>,
    },
    /// Region boundary discovered by the first pass, awaiting expansion.
    Region(Box<RegionSnapshot>),
    /// Caller-produced leaf payload.
    Solid(SolidHandle),
    /// Unary operator node.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        child: Box<Tree>,
    },
    /// Binary operator node.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Tree>,
        /// Right operand.
        right: Box<Tree>,
    },
}

impl Tree {
    /// Member reference without a matrix.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf {
            name: name.into(),
            matrix: None,
        }
    }

    /// Member reference with an arc matrix.
    pub fn leaf_with_matrix(name: impl Into<String>, matrix: Mat4) -> Self {
        Self::Leaf {
            name: name.into(),
            matrix: Some(matrix),
        }
    }

    /// Wraps a region snapshot.
    pub fn region(snapshot: RegionSnapshot) -> Self {
        Self::Region(Box::new(snapshot))
    }

    /// Wraps an opaque payload.
    pub fn solid<T: Any + Send + Sync>(payload: T) -> Self {
        Self::Solid(Arc::new(payload))
    }

    /// Binary node.
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Unary node.
    pub fn unary(op: UnaryOp, child: Self) -> Self {
        Self::Unary {
            op,
            child: Box::new(child),
        }
    }

    /// `left ∪ right`
    pub fn union(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Union, left, right)
    }

    /// `left ∩ right`
    pub fn intersect(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Intersect, left, right)
    }

    /// `left − right`
    pub fn subtract(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Subtract, left, right)
    }

    /// `true` for [`Tree::Nop`].
    pub fn is_nop(&self) -> bool {
        matches!(self, Self::Nop)
    }

    /// `true` for a union node.
    pub fn is_union(&self) -> bool {
        matches!(
            self,
            Self::Binary {
                op: BinaryOp::Union,
                ..
            }
        )
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Leaf { .. } => "leaf",
            Self::Region(_) => "region",
            Self::Solid(_) => "solid",
            Self::Unary { .. } => "unary",
            Self::Binary { .. } => "binary",
        }
    }

    /// Counts terminal nodes (`Nop`, `Leaf`, `Region`, `Solid`).
    pub fn count_nodes(&self) -> usize {
        match self {
            Self::Nop | Self::Leaf { .. } | Self::Region(_) | Self::Solid(_) => 1,
            Self::Unary { child, .. } => child.count_nodes(),
            Self::Binary { left, right, .. } => left.count_nodes() + right.count_nodes(),
        }
    }

    /// Counts `Leaf` nodes.
    pub fn count_leaves(&self) -> usize {
        let mut n = 0;
        self.for_each_leaf(&mut |_, _| n += 1);
        n
    }

    /// First `Leaf` named `name`, searching depth-first, left to right.
    pub fn find_named_leaf(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Leaf { name: n, .. } if n == name => Some(self),
            Self::Unary { child, .. } => child.find_named_leaf(name),
            Self::Binary { left, right, .. } => left
                .find_named_leaf(name)
                .or_else(|| right.find_named_leaf(name)),
            _ => None,
        }
    }

    /// Left-multiplies every leaf matrix by `m`. Leaves without a matrix
    /// receive a copy of `m`.
    pub fn mul_leaf_matrices(&mut self, m: &Mat4) {
        match self {
            Self::Leaf { matrix, .. } => {
                *matrix = Some(matrix.map_or(*m, |own| *m * own));
            }
            Self::Unary { child, .. } => child.mul_leaf_matrices(m),
            Self::Binary { left, right, .. } => {
                left.mul_leaf_matrices(m);
                right.mul_leaf_matrices(m);
            }
            Self::Nop | Self::Region(_) | Self::Solid(_) => {}
        }
    }

    /// Visits every `Leaf` left to right.
    pub fn for_each_leaf<F>(&self, f: &mut F)
    where
        F: FnMut(&str, Option<&Mat4>),
    {
        match self {
            Self::Leaf { name, matrix } => f(name, matrix.as_ref()),
            Self::Unary { child, .. } => child.for_each_leaf(f),
            Self::Binary { left, right, .. } => {
                left.for_each_leaf(f);
                right.for_each_leaf(f);
            }
            Self::Nop | Self::Region(_) | Self::Solid(_) => {}
        }
    }

    /// Leaf names and region paths reachable from this node, left to right.
    pub fn identities(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_identities(&mut out);
        out
    }

    fn collect_identities(&self, out: &mut Vec<String>) {
        match self {
            Self::Leaf { name, .. } => out.push(name.clone()),
            Self::Region(snap) => out.push(snap.path.to_string()),
            Self::Unary { child, .. } => child.collect_identities(out),
            Self::Binary { left, right, .. } => {
                left.collect_identities(out);
                right.collect_identities(out);
            }
            Self::Nop | Self::Solid(_) => {}
        }
    }

    /// `true` if the only operators in the tree are unions.
    pub fn is_all_unions(&self) -> bool {
        match self {
            Self::Nop | Self::Leaf { .. } | Self::Region(_) | Self::Solid(_) => true,
            Self::Binary {
                op: BinaryOp::Union,
                left,
                right,
            } => left.is_all_unions() && right.is_all_unions(),
            Self::Binary { .. } | Self::Unary { .. } => false,
        }
    }

    /// `true` if every binary operator has a terminal right operand. With
    /// `no_unions`, any union fails the check.
    pub fn check_left_heavy(&self, no_unions: bool) -> bool {
        match self {
            Self::Nop | Self::Leaf { .. } | Self::Region(_) | Self::Solid(_) => true,
            Self::Binary { op, left, right } => {
                if no_unions && *op == BinaryOp::Union {
                    return false;
                }
                right.is_terminal() && left.check_left_heavy(no_unions)
            }
            Self::Unary { .. } => false,
        }
    }

    /// GIFT convention: unions bind loosest (all at the top), and below them
    /// every non-union subtree is left-heavy.
    pub fn check_gift(&self) -> bool {
        match self {
            Self::Binary {
                op: BinaryOp::Union,
                left,
                right,
            } => left.check_gift() && right.check_gift(),
            Self::Binary { .. } => self.check_left_heavy(true),
            Self::Nop | Self::Leaf { .. } | Self::Region(_) | Self::Solid(_) => true,
            Self::Unary { .. } => false,
        }
    }

    /// `true` if no union node anywhere in the tree has a union right child.
    pub fn is_left_leaning(&self) -> bool {
        match self {
            Self::Binary { op, left, right } => {
                !(*op == BinaryOp::Union && right.is_union())
                    && left.is_left_leaning()
                    && right.is_left_leaning()
            }
            Self::Unary { child, .. } => child.is_left_leaning(),
            Self::Nop | Self::Leaf { .. } | Self::Region(_) | Self::Solid(_) => true,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Nop | Self::Leaf { .. } | Self::Region(_) | Self::Solid(_)
        )
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => f.write_str("Nop"),
            Self::Leaf { name, matrix } => f
                .debug_struct("Leaf")
                .field("name", name)
                .field("matrix", matrix)
                .finish(),
            Self::Region(snap) => f.debug_tuple("Region").field(&snap.path.to_string()).finish(),
            Self::Solid(_) => f.write_str("Solid(..)"),
            Self::Unary { op, child } => f
                .debug_struct("Unary")
                .field("op", op)
                .field("child", child)
                .finish(),
            Self::Binary { op, left, right } => f
                .debug_struct("Binary")
                .field("op", op)
                .field("left", left)
                .field("right", right)
                .finish(),
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => f.write_str("NOP"),
            Self::Leaf { name, .. } => f.write_str(name),
            Self::Region(snap) => write!(f, "REGION({})", snap.path),
            Self::Solid(_) => f.write_str("SOLID"),
            Self::Unary { op, child } => {
                let tag = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Guard => "G",
                    UnaryOp::Xnop => "X",
                };
                write!(f, "{tag}({child})")
            }
            Self::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
        }
    }
}
