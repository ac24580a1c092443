// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-path walk state and the transitions applied while descending.
//!
//! A [`State`] is duplicated on entry to every child scope and dropped on
//! leaving it, so each scope sees only what its ancestors set.

use core::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::db::{Animation, Combination, Database, DirectoryEntry};
use crate::error::WalkError;
use crate::hooks::{NullHooks, WalkHooks};
use crate::math::Mat4;
use crate::path::FullPath;

/// How a material property set on a combination propagates to its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Inherit {
    /// Lower combinations may override (the lock stays open).
    #[default]
    Lower,
    /// This combination's value wins over anything below it.
    Higher,
}

/// Material properties accumulated along a path.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Color override in unit range. `None` means no override.
    pub color: Option<[f32; 3]>,
    /// Color lock.
    pub color_inherit: Inherit,
    /// Shader string. Never `Some("")`.
    pub shader: Option<String>,
    /// Shader lock, shared with the temperature.
    pub shader_inherit: Inherit,
    /// Temperature in degrees Kelvin; zero means unset.
    pub temperature: f64,
}

bitflags! {
    /// Region bookkeeping bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Sofar: u8 {
        /// A region has started above this point.
        const INSIDE_REGION   = 0b0000_0001;
        /// Somewhere above, this subtree is the right operand of a subtraction.
        const UNDER_SUBTRACT  = 0b0000_0010;
        /// Somewhere above, this subtree is the right operand of an intersection.
        const UNDER_INTERSECT = 0b0000_0100;
    }
}

/// Result of applying a combination to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombOutcome {
    /// Ordinary combination.
    Continue,
    /// The combination starts a new region.
    StartsRegion,
}

/// Accumulated state at one point of a walk.
pub struct State {
    /// Database being walked. `None` only for detached states.
    pub db: Option<Arc<dyn Database>>,
    /// Model-to-here transform.
    pub transform: Mat4,
    /// Accumulated material.
    pub material: Material,
    /// Region bookkeeping.
    pub sofar: Sofar,
    /// Region id of the enclosing region.
    pub region_id: i32,
    /// Air code of the enclosing region.
    pub air_code: i32,
    /// Material code of the enclosing region.
    pub material_code: i32,
    /// Line-of-sight percentage of the enclosing region.
    pub los: i32,
    /// Stop descending at region boundaries (first pass).
    pub stop_at_regions: bool,
    /// Collapse members that refer back to an ancestor.
    pub detect_cycles: bool,
    /// Region and leaf callbacks.
    pub hooks: Arc<dyn WalkHooks>,
}

impl State {
    /// Fresh state over `db` with an identity transform and no hooks.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db: Some(db),
            ..Self::detached()
        }
    }

    /// Fresh state without a database; install one before walking.
    pub fn detached() -> Self {
        Self {
            db: None,
            transform: Mat4::identity(),
            material: Material::default(),
            sofar: Sofar::empty(),
            region_id: 0,
            air_code: 0,
            material_code: 0,
            los: 0,
            stop_at_regions: false,
            detect_cycles: true,
            hooks: Arc::new(NullHooks),
        }
    }

    /// Replaces the hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn WalkHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Database handle, or [`WalkError::NoDatabase`].
    pub fn database(&self) -> Result<Arc<dyn Database>, WalkError> {
        self.db.clone().ok_or(WalkError::NoDatabase)
    }

    /// Independent copy. The shader string gets its own storage; an empty
    /// shader becomes `None` in the copy.
    pub fn duplicate(&self) -> Self {
        let mut material = self.material.clone();
        material.shader = self.material.shader.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
        Self {
            db: self.db.clone(),
            transform: self.transform,
            material,
            sofar: self.sofar,
            region_id: self.region_id,
            air_code: self.air_code,
            material_code: self.material_code,
            los: self.los,
            stop_at_regions: self.stop_at_regions,
            detect_cycles: self.detect_cycles,
            hooks: Arc::clone(&self.hooks),
        }
    }

    /// Drops the shader string and the database handle.
    pub fn release(&mut self) {
        self.material.shader = None;
        self.db = None;
    }

    /// `true` once a region has started above this point.
    pub fn inside_region(&self) -> bool {
        self.sofar.contains(Sofar::INSIDE_REGION)
    }

    /// `true` when this scope is being subtracted or intersected away,
    /// which silences the "ignored inside region" diagnostics.
    fn quiet(&self) -> bool {
        self.sofar
            .intersects(Sofar::UNDER_SUBTRACT | Sofar::UNDER_INTERSECT)
    }

    /// Folds a combination's material and region properties into the state.
    ///
    /// `path` must end at the combination; it is used for diagnostics.
    pub fn apply_combination(
        &mut self,
        path: &FullPath,
        comb: &Combination,
    ) -> Result<CombOutcome, WalkError> {
        if path.is_empty() {
            return Err(WalkError::EmptyPath);
        }

        if let Some(rgb) = comb.color {
            if self.inside_region() {
                if !self.quiet() {
                    warn!(path = %path, "color override in combination within region, ignored");
                }
            } else if self.material.color_inherit == Inherit::Lower {
                self.material.color = Some(rgb.map(|c| f32::from(c) / 255.0));
                self.material.color_inherit = comb.color_inherit;
            }
        }

        if comb.temperature > 0.0 {
            if self.inside_region() {
                if !self.quiet() {
                    warn!(path = %path, "temperature in combination below region, ignored");
                }
            } else if self.material.shader_inherit == Inherit::Lower {
                self.material.temperature = comb.temperature;
            }
        }

        if !comb.shader.is_empty() {
            if self.inside_region() {
                if !self.quiet() {
                    warn!(path = %path, "shader in combination below region, ignored");
                }
            } else if self.material.shader_inherit == Inherit::Lower {
                self.material.shader = Some(comb.shader.clone());
                self.material.shader_inherit = comb.shader_inherit;
            }
        }

        if comb.region {
            if self.inside_region() {
                if !self.quiet() {
                    warn!(path = %path, "region nested in region, lower region info ignored");
                }
            } else {
                self.sofar |= Sofar::INSIDE_REGION;
                self.region_id = comb.region_id;
                self.air_code = comb.air_code;
                self.material_code = comb.material_code;
                self.los = comb.los;
                return Ok(CombOutcome::StartsRegion);
            }
        }
        Ok(CombOutcome::Continue)
    }

    /// Resolves member `name`, pushes it onto `path`, and folds its arc
    /// matrix (after animations) into the transform.
    ///
    /// On a failed lookup nothing is pushed. Once inside a region,
    /// animations still move the arc but cannot touch the material.
    pub fn apply_member(
        &mut self,
        path: &mut FullPath,
        name: &str,
        matrix: Option<&Mat4>,
    ) -> Result<(), WalkError> {
        let db = self.database()?;
        let Some(entry) = db.lookup(name, false) else {
            warn!(member = name, path = %path, "member lookup failed");
            return Err(WalkError::Lookup(name.to_owned()));
        };
        path.push(Arc::clone(&entry));

        let old = self.transform;
        let mut local = matrix.copied().unwrap_or_default();
        let root: &[Animation] = if path.len() == 1 {
            db.root_animations()
        } else {
            &[]
        };
        self.animate(db.as_ref(), path, &entry, root, &old, &mut local);
        self.transform = old * local;
        Ok(())
    }

    /// Applies the root-level animations whose first element names `entry`,
    /// starting from an identity arc. Used for the first element of a path.
    pub(crate) fn apply_root_animations(&mut self, db: &dyn Database, entry: &DirectoryEntry) {
        for anim in db.root_animations() {
            if anim.path.first().map(String::as_str) != Some(entry.name.as_str()) {
                continue;
            }
            let old = self.transform;
            let mut local = Mat4::identity();
            debug!(object = %entry.name, "root animation");
            db.apply_animation(anim, &old, &mut local, Some(&mut self.material));
            self.transform = old * local;
        }
    }

    fn animate(
        &mut self,
        db: &dyn Database,
        path: &FullPath,
        entry: &DirectoryEntry,
        extra: &[Animation],
        old: &Mat4,
        local: &mut Mat4,
    ) {
        // Below a region start the region owns the material.
        let locked = self.inside_region();
        for anim in entry.animations.iter().chain(extra) {
            if animation_matches(anim, path) {
                debug!(path = %path, anim = ?anim.path, "animation applied");
                let material = (!locked).then_some(&mut self.material);
                db.apply_animation(anim, old, local, material);
            }
        }
    }
}

/// `true` if the animation's path agrees with the trailing elements of
/// `path`, compared leafward to rootward. Running off either path with
/// everything so far equal counts as a match.
pub fn animation_matches(anim: &Animation, path: &FullPath) -> bool {
    anim.path
        .iter()
        .rev()
        .zip(path.iter().rev())
        .all(|(want, have)| *want == have.name)
}

impl Clone for State {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("has_db", &self.db.is_some())
            .field("transform", &self.transform)
            .field("material", &self.material)
            .field("sofar", &self.sofar)
            .field("region_id", &self.region_id)
            .field("air_code", &self.air_code)
            .field("material_code", &self.material_code)
            .field("los", &self.los)
            .field("stop_at_regions", &self.stop_at_regions)
            .finish_non_exhaustive()
    }
}

/// State and path frozen at a region boundary.
#[derive(Debug, Clone)]
pub struct RegionSnapshot {
    /// State at the boundary.
    pub state: State,
    /// Path at the boundary.
    pub path: FullPath,
}

impl RegionSnapshot {
    /// Deep copies `state` and `path`.
    pub fn capture(state: &State, path: &FullPath) -> Self {
        Self {
            state: state.duplicate(),
            path: path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::db::{AnimationEffect, MemoryDb, SolidType};

    fn path_of(names: &[&str]) -> FullPath {
        let mut p = FullPath::new();
        for n in names {
            p.push(Arc::new(DirectoryEntry::combination(*n, 1)));
        }
        p
    }

    #[test]
    fn duplicate_gives_shader_its_own_storage() {
        let mut a = State::detached();
        a.material.shader = Some("plastic sh=4".into());
        let mut b = a.duplicate();
        assert_eq!(a.material.shader, b.material.shader);
        assert_ne!(
            a.material.shader.as_ref().unwrap().as_ptr(),
            b.material.shader.as_ref().unwrap().as_ptr()
        );
        b.release();
        assert!(b.material.shader.is_none());
        assert!(b.db.is_none());
        assert_eq!(a.material.shader.as_deref(), Some("plastic sh=4"));
    }

    #[test]
    fn duplicate_normalizes_empty_shader() {
        let mut a = State::detached();
        a.material.shader = Some(String::new());
        assert!(a.duplicate().material.shader.is_none());
    }

    #[test]
    fn color_lock_is_honored() {
        let p = path_of(&["top"]);
        let mut s = State::detached();
        let upper = Combination {
            color: Some([255, 0, 0]),
            color_inherit: Inherit::Higher,
            ..Combination::default()
        };
        let lower = Combination {
            color: Some([0, 255, 0]),
            ..Combination::default()
        };
        s.apply_combination(&p, &upper).unwrap();
        s.apply_combination(&p, &lower).unwrap();
        assert_eq!(s.material.color, Some([1.0, 0.0, 0.0]));
    }

    #[test]
    fn lower_inherit_lets_members_override() {
        let p = path_of(&["top"]);
        let mut s = State::detached();
        for rgb in [[255, 255, 255], [0, 0, 255]] {
            let c = Combination {
                color: Some(rgb),
                ..Combination::default()
            };
            s.apply_combination(&p, &c).unwrap();
        }
        assert_eq!(s.material.color, Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn temperature_shares_the_shader_lock() {
        let p = path_of(&["top"]);
        let mut s = State::detached();
        let upper = Combination {
            shader: "glass".into(),
            shader_inherit: Inherit::Higher,
            temperature: 300.0,
            ..Combination::default()
        };
        let lower = Combination {
            shader: "metal".into(),
            temperature: 900.0,
            ..Combination::default()
        };
        s.apply_combination(&p, &upper).unwrap();
        s.apply_combination(&p, &lower).unwrap();
        assert_eq!(s.material.shader.as_deref(), Some("glass"));
        assert_eq!(s.material.temperature, 300.0);
    }

    #[test]
    fn region_starts_once() {
        let p = path_of(&["r"]);
        let mut s = State::detached();
        let region = Combination {
            region: true,
            region_id: 42,
            los: 100,
            ..Combination::default()
        };
        assert_eq!(
            s.apply_combination(&p, &region).unwrap(),
            CombOutcome::StartsRegion
        );
        assert!(s.inside_region());
        assert_eq!((s.region_id, s.los), (42, 100));

        let nested = Combination {
            region: true,
            region_id: 7,
            color: Some([1, 2, 3]),
            ..Combination::default()
        };
        assert_eq!(s.apply_combination(&p, &nested).unwrap(), CombOutcome::Continue);
        assert_eq!(s.region_id, 42);
        assert!(s.material.color.is_none());
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut s = State::detached();
        assert_eq!(
            s.apply_combination(&FullPath::new(), &Combination::default()),
            Err(WalkError::EmptyPath)
        );
    }

    #[test]
    fn animation_paths_match_from_the_leaf_end() {
        let p = path_of(&["top", "mid", "leaf"]);
        let hit = |s: &str| animation_matches(&Animation::new(s, AnimationEffect::Shader(String::new())), &p);
        assert!(hit("mid/leaf"));
        assert!(hit("/top/mid/leaf"));
        assert!(hit("world/top/mid/leaf"));
        assert!(!hit("top/leaf"));
        assert!(!hit("mid"));
    }

    #[test]
    fn apply_member_pushes_and_accumulates() {
        let mut db = MemoryDb::new();
        db.insert_solid("s", SolidType(1), &[]);
        db.add_animation(
            "s",
            Animation::new("top/s", AnimationEffect::PreMultiply(Mat4::scale(2.0, 2.0, 2.0))),
        );
        let mut p = FullPath::new();
        p.push(Arc::new(DirectoryEntry::combination("top", 1)));
        let mut s = State::new(Arc::new(db));
        s.transform = Mat4::translation(1.0, 0.0, 0.0);
        s.apply_member(&mut p, "s", Some(&Mat4::translation(0.0, 3.0, 0.0)))
            .unwrap();
        assert_eq!(p.to_string(), "/top/s");
        let expected = Mat4::translation(1.0, 0.0, 0.0)
            * Mat4::scale(2.0, 2.0, 2.0)
            * Mat4::translation(0.0, 3.0, 0.0);
        assert!(s.transform.approx_eq(&expected, 1e-12));

        assert_eq!(
            s.apply_member(&mut p, "nope", None),
            Err(WalkError::Lookup("nope".into()))
        );
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn animations_cannot_recolor_inside_a_region() {
        let mut db = MemoryDb::new();
        db.insert_solid("s", SolidType(1), &[]);
        db.add_animation("s", Animation::new("s", AnimationEffect::Color([1.0, 0.0, 0.0])));
        db.add_animation(
            "s",
            Animation::new("s", AnimationEffect::PostMultiply(Mat4::translation(0.0, 0.0, 2.0))),
        );
        let db: Arc<dyn Database> = Arc::new(db);

        let mut outside = State::new(Arc::clone(&db));
        let mut p = path_of(&["top"]);
        outside.apply_member(&mut p, "s", None).unwrap();
        assert_eq!(outside.material.color, Some([1.0, 0.0, 0.0]));

        let mut inside = State::new(db);
        inside.sofar |= Sofar::INSIDE_REGION;
        inside.material.color = Some([0.0, 0.0, 1.0]);
        let mut p = path_of(&["top"]);
        inside.apply_member(&mut p, "s", None).unwrap();
        assert_eq!(inside.material.color, Some([0.0, 0.0, 1.0]));
        assert!(inside.transform.approx_eq(&Mat4::translation(0.0, 0.0, 2.0), 1e-12));
    }
}
