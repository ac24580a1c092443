// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object database seam consumed by the walker.
//!
//! The walker never parses records itself. It asks a [`Database`] for
//! directory entries, raw external bytes, decoded combinations, and solid
//! type tags. [`MemoryDb`] is a complete in-memory implementation used by
//! tests and by callers that build hierarchies programmatically.

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::WalkError;
use crate::math::Mat4;
use crate::state::{Inherit, Material};
use crate::tree::Tree;

/// Kind of a database object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Boolean combination of named members.
    Combination,
    /// Primitive solid.
    Solid,
}

/// Opaque solid type tag returned by [`Database::identify_solid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolidType(pub u16);

/// What an animation does when its path matches.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEffect {
    /// Replace the arc (local) matrix.
    ReplaceLocal(Mat4),
    /// `local = m * local`.
    PreMultiply(Mat4),
    /// `local = local * m`.
    PostMultiply(Mat4),
    /// Replace the accumulated matrix: the arc becomes whatever takes the
    /// stack above it to `m`.
    ReplaceStack(Mat4),
    /// Override the material color (unit-range RGB).
    Color([f32; 3]),
    /// Override the shader string. Empty clears it.
    Shader(String),
}

impl AnimationEffect {
    /// Applies the effect to an arc matrix and, when given, the material.
    pub fn apply(&self, old: &Mat4, local: &mut Mat4, material: Option<&mut Material>) {
        match self {
            Self::ReplaceLocal(m) => *local = *m,
            Self::PreMultiply(m) => *local = *m * *local,
            Self::PostMultiply(m) => *local = *local * *m,
            Self::ReplaceStack(m) => match old.inverse() {
                Some(inv) => *local = inv * *m,
                None => warn!("stack replacement skipped: accumulated matrix is singular"),
            },
            Self::Color(rgb) => {
                if let Some(material) = material {
                    material.color = Some(*rgb);
                }
            }
            Self::Shader(shader) => {
                if let Some(material) = material {
                    material.shader = (!shader.is_empty()).then(|| shader.clone());
                }
            }
        }
    }
}

/// An animation attached to a directory entry or to the database root.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// Names from rootward to leafward. Matched against the trailing
    /// elements of the current path.
    pub path: Vec<String>,
    /// Effect applied on a match.
    pub effect: AnimationEffect,
}

impl Animation {
    /// Builds an animation from a slash separated path.
    pub fn new(path: &str, effect: AnimationEffect) -> Self {
        Self {
            path: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            effect,
        }
    }
}

/// Directory entry: identity and shape of one database object.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    /// Object name.
    pub name: String,
    /// Object kind.
    pub kind: ObjectKind,
    /// Number of members (combinations only).
    pub member_count: usize,
    /// Animations attached to this object.
    pub animations: Vec<Animation>,
}

impl DirectoryEntry {
    /// Directory entry for a combination.
    pub fn combination(name: impl Into<String>, member_count: usize) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Combination,
            member_count,
            animations: Vec::new(),
        }
    }

    /// Directory entry for a solid.
    pub fn solid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Solid,
            member_count: 0,
            animations: Vec::new(),
        }
    }

    /// `true` for combinations.
    pub fn is_combination(&self) -> bool {
        self.kind == ObjectKind::Combination
    }
}

/// Decoded combination record.
#[derive(Debug, Clone, Default)]
pub struct Combination {
    /// Marks the top of a region.
    pub region: bool,
    /// Region identifier.
    pub region_id: i32,
    /// Air code (non-zero for air regions).
    pub air_code: i32,
    /// Material code.
    pub material_code: i32,
    /// Line-of-sight equivalence percentage.
    pub los: i32,
    /// Color override as raw bytes.
    pub color: Option<[u8; 3]>,
    /// How the color propagates to members.
    pub color_inherit: Inherit,
    /// Shader string; empty means none.
    pub shader: String,
    /// How the shader (and temperature) propagates to members.
    pub shader_inherit: Inherit,
    /// Temperature in degrees Kelvin; zero or negative means unset.
    pub temperature: f64,
    /// Boolean expression over members, or `None` for an empty combination.
    pub tree: Option<Tree>,
}

/// Read-only object store consumed by the walker.
///
/// Implementations must tolerate concurrent reads; the dispatcher shares one
/// handle across all workers.
pub trait Database: Send + Sync {
    /// Looks up a directory entry. `noisy` asks the implementation to report
    /// a miss.
    fn lookup(&self, name: &str, noisy: bool) -> Option<Arc<DirectoryEntry>>;

    /// Reads the external (encoded) form of an object.
    fn get_external(&self, entry: &DirectoryEntry) -> Result<Bytes, WalkError>;

    /// Decodes a combination from its external form. The returned tree is
    /// owned by the caller.
    fn decode_combination(
        &self,
        entry: &DirectoryEntry,
        raw: &Bytes,
    ) -> Result<Combination, WalkError>;

    /// Returns the solid type tag, or `None` if `raw` is not a solid.
    fn identify_solid(&self, raw: &Bytes) -> Option<SolidType>;

    /// Animations attached to the database root.
    fn root_animations(&self) -> &[Animation];

    /// Applies one animation to an arc matrix and material.
    fn apply_animation(
        &self,
        anim: &Animation,
        old: &Mat4,
        local: &mut Mat4,
        material: Option<&mut Material>,
    ) {
        anim.effect.apply(old, local, material);
    }
}

/// Encodes a solid record as `[u16 LE type tag][payload]`.
pub fn encode_solid(kind: SolidType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + payload.len());
    buf.put_u16_le(kind.0);
    buf.put_slice(payload);
    buf.freeze()
}

#[derive(Debug, Clone)]
enum Record {
    Combination(Combination),
    Solid(Bytes),
    Corrupt,
}

/// In-memory [`Database`].
#[derive(Debug, Default)]
pub struct MemoryDb {
    entries: FxHashMap<String, Arc<DirectoryEntry>>,
    records: FxHashMap<String, Record>,
    root_animations: Vec<Animation>,
}

impl MemoryDb {
    /// Empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) a combination. The member count is derived from
    /// the number of leaves in its tree.
    pub fn insert_combination(&mut self, name: &str, comb: Combination) -> Arc<DirectoryEntry> {
        let members = comb.tree.as_ref().map_or(0, Tree::count_leaves);
        self.insert_entry(
            DirectoryEntry::combination(name, members),
            Record::Combination(comb),
        )
    }

    /// Inserts (or replaces) a solid with the given type tag and payload.
    pub fn insert_solid(&mut self, name: &str, kind: SolidType, payload: &[u8]) -> Arc<DirectoryEntry> {
        self.insert_entry(
            DirectoryEntry::solid(name),
            Record::Solid(encode_solid(kind, payload)),
        )
    }

    /// Inserts a solid whose external form is `raw` verbatim.
    pub fn insert_raw_solid(&mut self, name: &str, raw: Bytes) -> Arc<DirectoryEntry> {
        self.insert_entry(DirectoryEntry::solid(name), Record::Solid(raw))
    }

    /// Inserts an entry whose record cannot be decoded.
    pub fn insert_corrupt(&mut self, name: &str, kind: ObjectKind) -> Arc<DirectoryEntry> {
        let entry = match kind {
            ObjectKind::Combination => DirectoryEntry::combination(name, 1),
            ObjectKind::Solid => DirectoryEntry::solid(name),
        };
        self.insert_entry(entry, Record::Corrupt)
    }

    /// Attaches an animation to an existing entry. Returns `false` if the
    /// name is unknown.
    pub fn add_animation(&mut self, name: &str, anim: Animation) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                Arc::make_mut(entry).animations.push(anim);
                true
            }
            None => false,
        }
    }

    /// Attaches an animation to the database root.
    pub fn add_root_animation(&mut self, anim: Animation) {
        self.root_animations.push(anim);
    }

    fn insert_entry(&mut self, entry: DirectoryEntry, record: Record) -> Arc<DirectoryEntry> {
        let entry = Arc::new(entry);
        self.records.insert(entry.name.clone(), record);
        self.entries.insert(entry.name.clone(), Arc::clone(&entry));
        entry
    }
}

impl Database for MemoryDb {
    fn lookup(&self, name: &str, noisy: bool) -> Option<Arc<DirectoryEntry>> {
        let found = self.entries.get(name).cloned();
        if found.is_none() && noisy {
            warn!(name, "object not found");
        }
        found
    }

    fn get_external(&self, entry: &DirectoryEntry) -> Result<Bytes, WalkError> {
        match self.records.get(&entry.name) {
            Some(Record::Solid(raw)) => Ok(raw.clone()),
            Some(Record::Combination(_)) => Ok(Bytes::copy_from_slice(entry.name.as_bytes())),
            Some(Record::Corrupt) => Ok(Bytes::new()),
            None => Err(WalkError::Lookup(entry.name.clone())),
        }
    }

    fn decode_combination(
        &self,
        entry: &DirectoryEntry,
        _raw: &Bytes,
    ) -> Result<Combination, WalkError> {
        match self.records.get(&entry.name) {
            Some(Record::Combination(comb)) => Ok(comb.clone()),
            Some(Record::Solid(_)) => Err(WalkError::NotACombination(entry.name.clone())),
            Some(Record::Corrupt) => Err(WalkError::Decode {
                name: entry.name.clone(),
                reason: "corrupt record".into(),
            }),
            None => Err(WalkError::Lookup(entry.name.clone())),
        }
    }

    fn identify_solid(&self, raw: &Bytes) -> Option<SolidType> {
        let mut buf = raw.as_ref();
        if buf.remaining() < 2 {
            return None;
        }
        Some(SolidType(buf.get_u16_le()))
    }

    fn root_animations(&self) -> &[Animation] {
        &self.root_animations
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn solid_tag_round_trips_through_external_form() {
        let mut db = MemoryDb::new();
        let entry = db.insert_solid("ball", SolidType(7), b"r=1");
        let raw = db.get_external(&entry).unwrap();
        assert_eq!(db.identify_solid(&raw), Some(SolidType(7)));
        assert_eq!(&raw[2..], b"r=1");
    }

    #[test]
    fn short_solid_record_is_unidentified() {
        let mut db = MemoryDb::new();
        let entry = db.insert_raw_solid("junk", Bytes::from_static(&[1]));
        let raw = db.get_external(&entry).unwrap();
        assert_eq!(db.identify_solid(&raw), None);
    }

    #[test]
    fn member_count_follows_tree_leaves() {
        let mut db = MemoryDb::new();
        let comb = Combination {
            tree: Some(Tree::union(Tree::leaf("a"), Tree::leaf("b"))),
            ..Combination::default()
        };
        let entry = db.insert_combination("c", comb);
        assert_eq!(entry.member_count, 2);
        assert!(entry.is_combination());
    }

    #[test]
    fn corrupt_combination_fails_to_decode() {
        let mut db = MemoryDb::new();
        let entry = db.insert_corrupt("bad", ObjectKind::Combination);
        let raw = db.get_external(&entry).unwrap();
        assert!(matches!(
            db.decode_combination(&entry, &raw),
            Err(WalkError::Decode { .. })
        ));
    }

    #[test]
    fn animations_attach_to_entries_after_insert() {
        let mut db = MemoryDb::new();
        db.insert_solid("s", SolidType(1), &[]);
        let anim = Animation::new("/top/s", AnimationEffect::Color([1.0, 0.0, 0.0]));
        assert_eq!(anim.path, vec!["top".to_owned(), "s".to_owned()]);
        assert!(db.add_animation("s", anim));
        assert!(!db.add_animation("missing", Animation::new("x", AnimationEffect::Shader(String::new()))));
        assert_eq!(db.lookup("s", false).unwrap().animations.len(), 1);
    }

    #[test]
    fn replace_stack_makes_accumulated_matrix_exact() {
        let old = Mat4::translation(1.0, 2.0, 3.0);
        let target = Mat4::scale(2.0, 2.0, 2.0);
        let mut local = Mat4::identity();
        AnimationEffect::ReplaceStack(target).apply(&old, &mut local, None);
        assert!((old * local).approx_eq(&target, 1e-12));
    }
}
