// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Small databases shared by the integration suites.

use std::sync::Arc;

use treewalk_core::{Database, Tree};

use crate::db::{CombBuilder, DbBuilder};

/// `top = a u b` over two solids, with no region anywhere.
pub fn bare_union() -> Arc<dyn Database> {
    DbBuilder::new()
        .solids(&["a", "b"])
        .comb("top", CombBuilder::new(Tree::union(Tree::leaf("a"), Tree::leaf("b"))))
        .build()
}

/// Region `R = S u x` where `S = y u z` is also flagged as a region.
pub fn nested_regions() -> Arc<dyn Database> {
    DbBuilder::new()
        .solids(&["x", "y", "z"])
        .comb(
            "S",
            CombBuilder::new(Tree::union(Tree::leaf("y"), Tree::leaf("z"))).region(2000),
        )
        .comb(
            "R",
            CombBuilder::new(Tree::union(Tree::leaf("S"), Tree::leaf("x"))).region(1000),
        )
        .build()
}

/// `(A u B) - C` as an unwalked member expression.
pub fn distribute_expr() -> Tree {
    Tree::subtract(
        Tree::union(Tree::leaf("A"), Tree::leaf("B")),
        Tree::leaf("C"),
    )
}

/// `top = sub u other`, both regions; `sub = s1 u s2`, `other = o1 - o2`.
pub fn sibling_regions() -> Arc<dyn Database> {
    DbBuilder::new()
        .solids(&["s1", "s2", "o1", "o2"])
        .comb(
            "sub",
            CombBuilder::new(Tree::union(Tree::leaf("s1"), Tree::leaf("s2"))).region(1),
        )
        .comb(
            "other",
            CombBuilder::new(Tree::subtract(Tree::leaf("o1"), Tree::leaf("o2"))).region(2),
        )
        .comb(
            "top",
            CombBuilder::new(Tree::union(Tree::leaf("sub"), Tree::leaf("other"))),
        )
        .build()
}

/// `top = (sub u other) - cutter`, where all three members are regions over
/// the single solids `s`, `o` and `c`.
pub fn subtracted_regions() -> Arc<dyn Database> {
    DbBuilder::new()
        .solids(&["s", "o", "c"])
        .comb("sub", CombBuilder::new(Tree::leaf("s")).region(1))
        .comb("other", CombBuilder::new(Tree::leaf("o")).region(2))
        .comb("cutter", CombBuilder::new(Tree::leaf("c")).region(3))
        .comb(
            "top",
            CombBuilder::new(Tree::subtract(
                Tree::union(Tree::leaf("sub"), Tree::leaf("other")),
                Tree::leaf("cutter"),
            )),
        )
        .build()
}

/// `group` unions `count` regions `r0..`, each region holding its own pair
/// of solids `r{i}a - r{i}b`.
pub fn region_group(count: usize) -> Arc<dyn Database> {
    let mut builder = DbBuilder::new();
    let mut group: Option<Tree> = None;
    for i in 0..count {
        let name = format!("r{i}");
        let (a, b) = (format!("r{i}a"), format!("r{i}b"));
        builder = builder.solid(&a).solid(&b).comb(
            &name,
            CombBuilder::new(Tree::subtract(Tree::leaf(a.as_str()), Tree::leaf(b.as_str())))
                .region(i32::try_from(i).unwrap_or(i32::MAX)),
        );
        let leaf = Tree::leaf(name);
        group = Some(match group.take() {
            None => leaf,
            Some(acc) => Tree::union(acc, leaf),
        });
    }
    match group {
        Some(tree) => builder.comb("group", CombBuilder::new(tree)),
        None => builder.comb("group", CombBuilder::empty()),
    }
    .build()
}
