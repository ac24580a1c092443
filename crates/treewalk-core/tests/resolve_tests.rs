// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Path resolution, animations, and the path-derived matrix helpers.

#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use treewalk_core::math::{Mat4, Vec3};
use treewalk_core::{
    follow_path, follow_path_for_state, path_to_matrix, region_matrix, shader_matrix,
    AnimationEffect, Database, FullPath, Sofar, State, Tree, WalkError,
};
use treewalk_dry_tests::{scenarios, CombBuilder, DbBuilder};

const TOL: f64 = 1e-12;

/// `assy -> top(T(0,5,0)) -> { a(T(1,0,0)), b }`, plus a flattened arc.
fn assembly() -> DbBuilder {
    DbBuilder::new()
        .solids(&["a", "b"])
        .comb(
            "top",
            CombBuilder::new(Tree::union(
                Tree::leaf_with_matrix("a", Mat4::translation(1.0, 0.0, 0.0)),
                Tree::leaf("b"),
            )),
        )
        .comb(
            "assy",
            CombBuilder::new(Tree::union(
                Tree::leaf_with_matrix("top", Mat4::translation(0.0, 5.0, 0.0)),
                Tree::leaf_with_matrix("flat", Mat4::scale(0.0, 1.0, 1.0)),
            )),
        )
        .solid("flat")
}

fn parse(db: &Arc<dyn Database>, text: &str) -> FullPath {
    FullPath::parse(db.as_ref(), text, true).unwrap()
}

fn follow(db: &Arc<dyn Database>, text: &str, depth: isize) -> Result<(State, FullPath), WalkError> {
    let mut state = State::new(Arc::clone(db));
    let mut total = FullPath::new();
    follow_path(&mut state, &mut total, &parse(db, text), true, depth)?;
    Ok((state, total))
}

fn close(a: &Vec3, b: &Vec3) -> bool {
    let d = a.sub(b);
    d.dot(&d) < TOL * TOL
}

fn origin(m: &Mat4) -> Vec3 {
    m.transform_point(&Vec3::ZERO)
}

#[test]
fn full_path_accumulates_every_arc() {
    let db = assembly().build();
    let (state, total) = follow(&db, "assy/top/a", 0).unwrap();
    assert_eq!(total.to_string(), "/assy/top/a");
    assert_eq!(origin(&state.transform), Vec3::new(1.0, 5.0, 0.0));
}

#[test]
fn depth_limits_the_arcs_used() {
    let db = assembly().build();
    for depth in [1, -1] {
        let (state, total) = follow(&db, "assy/top/a", depth).unwrap();
        assert_eq!(total.to_string(), "/assy/top", "depth {depth}");
        assert_eq!(origin(&state.transform), Vec3::new(0.0, 5.0, 0.0));
    }
    let (_, total) = follow(&db, "assy/top/a", 9).unwrap();
    assert_eq!(total.to_string(), "/assy/top/a");
    let (_, total) = follow(&db, "assy/top/a", -2).unwrap();
    assert_eq!(total.to_string(), "/assy");
    assert_eq!(follow(&db, "assy/top/a", -3).unwrap_err(), WalkError::EmptyPath);
}

#[test]
fn continuing_from_a_partial_path() {
    let db = assembly().build();
    let mut state = State::new(Arc::clone(&db));
    let mut total = FullPath::new();
    follow_path(&mut state, &mut total, &parse(&db, "assy"), true, 0).unwrap();
    follow_path(&mut state, &mut total, &parse(&db, "top/a"), true, 0).unwrap();
    assert_eq!(total.to_string(), "/assy/top/a");
    assert_eq!(origin(&state.transform), Vec3::new(1.0, 5.0, 0.0));
}

#[test]
fn path_errors() {
    let db = assembly().build();
    assert_eq!(
        follow(&db, "assy/top/a/b", 0).unwrap_err(),
        WalkError::LeafReachedEarly("/assy/top/a".into())
    );
    assert_eq!(
        follow(&db, "assy/a", 0).unwrap_err(),
        WalkError::MemberNotFound {
            parent: "assy".into(),
            member: "a".into(),
        }
    );
    assert_eq!(
        FullPath::parse(db.as_ref(), "assy/ghost", false).unwrap_err(),
        WalkError::Lookup("ghost".into())
    );
}

#[test]
fn blank_names_resolve_to_nothing() {
    let db = assembly().build();
    let mut state = State::new(Arc::clone(&db));
    let mut total = FullPath::new();
    follow_path_for_state(&mut state, &mut total, "//", true).unwrap();
    assert!(total.is_empty());
    assert_eq!(state.transform, Mat4::identity());
}

#[test]
fn region_and_subtraction_bits_are_picked_up_along_the_path() {
    let db = scenarios::sibling_regions();
    let (state, _) = follow(&db, "top/other/o2", 0).unwrap();
    assert!(state.sofar.contains(Sofar::INSIDE_REGION | Sofar::UNDER_SUBTRACT));
    assert_eq!(state.region_id, 2);

    let (state, _) = follow(&db, "top/other/o1", 0).unwrap();
    assert!(!state.sofar.contains(Sofar::UNDER_SUBTRACT));
}

#[test]
fn entry_animation_replaces_the_arc() {
    let db = assembly()
        .animate("assy/top", AnimationEffect::ReplaceLocal(Mat4::translation(0.0, 9.0, 0.0)))
        .animate("elsewhere/top", AnimationEffect::ReplaceLocal(Mat4::scale(3.0, 3.0, 3.0)))
        .build();
    let (state, _) = follow(&db, "assy/top/a", 0).unwrap();
    assert_eq!(origin(&state.transform), Vec3::new(1.0, 9.0, 0.0));
}

#[test]
fn stack_replacement_pins_the_accumulated_matrix() {
    let pinned = Mat4::translation(7.0, 7.0, 7.0);
    let db = assembly()
        .animate("top/a", AnimationEffect::ReplaceStack(pinned))
        .build();
    let (state, _) = follow(&db, "assy/top/a", 0).unwrap();
    assert!(state.transform.approx_eq(&pinned, TOL));
}

#[test]
fn root_animations_touch_the_first_element_only() {
    let db = assembly()
        .animate_root("assy", AnimationEffect::PreMultiply(Mat4::translation(2.0, 0.0, 0.0)))
        .animate_root("assy", AnimationEffect::Color([0.5, 0.25, 1.0]))
        .animate_root("top", AnimationEffect::Color([0.0, 0.0, 0.0]))
        .build();
    let (state, _) = follow(&db, "assy/top/a", 0).unwrap();
    assert_eq!(origin(&state.transform), Vec3::new(3.0, 5.0, 0.0));
    assert_eq!(state.material.color, Some([0.5, 0.25, 1.0]));
}

#[test]
fn duplicate_and_release() {
    let db = assembly().build();
    let (mut state, _) = follow(&db, "assy/top", 0).unwrap();
    state.material.shader = Some("glass".into());

    let mut copy = state.duplicate();
    copy.transform = Mat4::identity();
    copy.material.shader = Some("metal".into());
    copy.release();

    assert!(copy.material.shader.is_none());
    assert!(matches!(copy.database(), Err(WalkError::NoDatabase)));
    assert_eq!(state.material.shader.as_deref(), Some("glass"));
    assert_eq!(origin(&state.transform), Vec3::new(0.0, 5.0, 0.0));
    assert!(state.database().is_ok());
}

#[test]
fn model_to_region_inverts_region_to_model() {
    let db = assembly().build();
    let forward = path_to_matrix(&db, &parse(&db, "assy/top/a"), 0).unwrap();
    let inverse = region_matrix(&db, "assy/top/a").unwrap();
    assert!((forward * inverse).approx_eq(&Mat4::identity(), TOL));
    assert_eq!(origin(&inverse), Vec3::new(-1.0, -5.0, 0.0));

    let shallow = path_to_matrix(&db, &parse(&db, "assy/top/a"), 1).unwrap();
    assert_eq!(origin(&shallow), Vec3::new(0.0, 5.0, 0.0));
}

#[test]
fn flattened_arc_has_no_region_matrix() {
    let db = assembly().build();
    assert_eq!(
        region_matrix(&db, "assy/flat").unwrap_err(),
        WalkError::SingularMatrix("assy/flat".into())
    );
}

#[test]
fn shader_matrix_maps_bounds_to_unit_cube() {
    let db = assembly().build();
    let lo = Vec3::ZERO;
    let hi = Vec3::new(2.0, 4.0, 8.0);
    let m = shader_matrix(&db, "assy/top/a", &lo, &hi).unwrap();

    let at_min = m.transform_point(&Vec3::new(1.0, 5.0, 0.0));
    let at_max = m.transform_point(&Vec3::new(3.0, 9.0, 8.0));
    assert!(close(&at_min, &Vec3::ZERO));
    assert!(close(&at_max, &Vec3::new(1.0, 1.0, 1.0)));

    assert_eq!(
        shader_matrix(&db, "assy/top/a", &hi, &hi).unwrap_err(),
        WalkError::EmptyBounds("assy/top/a".into())
    );
}
