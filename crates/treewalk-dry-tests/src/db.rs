// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory database builders.

use std::sync::Arc;

use treewalk_core::{
    Animation, AnimationEffect, Combination, Database, Inherit, MemoryDb, SolidType, Tree,
};

/// Solid type used by every fixture solid.
pub const BOX: SolidType = SolidType(1);

/// Builder for a [`Combination`] record.
///
/// # Example
///
/// ```
/// use treewalk_core::Tree;
/// use treewalk_dry_tests::CombBuilder;
///
/// let comb = CombBuilder::new(Tree::union(Tree::leaf("a"), Tree::leaf("b")))
///     .region(1000)
///     .build();
/// assert!(comb.region);
/// assert_eq!(comb.region_id, 1000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CombBuilder {
    comb: Combination,
}

impl CombBuilder {
    /// Combination over `tree`.
    pub fn new(tree: Tree) -> Self {
        Self {
            comb: Combination {
                tree: Some(tree),
                ..Combination::default()
            },
        }
    }

    /// Combination with no members.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flags the combination as a region with the given id.
    pub fn region(mut self, id: i32) -> Self {
        self.comb.region = true;
        self.comb.region_id = id;
        self
    }

    /// Sets the air code.
    pub fn air(mut self, code: i32) -> Self {
        self.comb.air_code = code;
        self
    }

    /// Sets the material code and line-of-sight percentage.
    pub fn material(mut self, code: i32, los: i32) -> Self {
        self.comb.material_code = code;
        self.comb.los = los;
        self
    }

    /// Sets the color and how it propagates.
    pub fn color(mut self, rgb: [u8; 3], inherit: Inherit) -> Self {
        self.comb.color = Some(rgb);
        self.comb.color_inherit = inherit;
        self
    }

    /// Sets the shader and how it (and the temperature) propagates.
    pub fn shader(mut self, shader: &str, inherit: Inherit) -> Self {
        self.comb.shader = shader.to_owned();
        self.comb.shader_inherit = inherit;
        self
    }

    /// Sets the temperature in degrees Kelvin.
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.comb.temperature = kelvin;
        self
    }

    /// Finishes the record.
    pub fn build(self) -> Combination {
        self.comb
    }
}

/// Fluent wrapper around [`MemoryDb`].
#[derive(Debug, Default)]
pub struct DbBuilder {
    db: MemoryDb,
}

impl DbBuilder {
    /// Empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a [`BOX`] solid with an empty payload.
    pub fn solid(mut self, name: &str) -> Self {
        self.db.insert_solid(name, BOX, &[]);
        self
    }

    /// Adds several [`BOX`] solids.
    pub fn solids(mut self, names: &[&str]) -> Self {
        for name in names {
            self.db.insert_solid(name, BOX, &[]);
        }
        self
    }

    /// Adds a combination.
    pub fn comb(mut self, name: &str, comb: CombBuilder) -> Self {
        self.db.insert_combination(name, comb.build());
        self
    }

    /// Adds an object whose record cannot be decoded.
    pub fn corrupt_solid(mut self, name: &str) -> Self {
        self.db.insert_corrupt(name, treewalk_core::ObjectKind::Solid);
        self
    }

    /// Attaches an animation to the entry named by the last element of
    /// `path`.
    pub fn animate(mut self, path: &str, effect: AnimationEffect) -> Self {
        let anim = Animation::new(path, effect);
        if let Some(owner) = anim.path.last().cloned() {
            self.db.add_animation(&owner, anim);
        }
        self
    }

    /// Adds a database-wide root animation.
    pub fn animate_root(mut self, path: &str, effect: AnimationEffect) -> Self {
        self.db.add_root_animation(Animation::new(path, effect));
        self
    }

    /// Finishes the database as a shared trait object.
    pub fn build(self) -> Arc<dyn Database> {
        Arc::new(self.db)
    }

    /// Finishes the database, keeping the concrete type.
    pub fn into_memory(self) -> MemoryDb {
        self.db
    }
}
