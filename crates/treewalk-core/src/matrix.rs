// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transforms derived from database paths.

use std::sync::Arc;

use crate::db::Database;
use crate::error::WalkError;
use crate::math::{Mat4, Vec3};
use crate::path::FullPath;
use crate::resolve::follow_path;
use crate::state::State;

/// Accumulated model transform along `path`, arc by arc, with animations.
///
/// `depth` has the same meaning as in [`follow_path`].
pub fn path_to_matrix(
    db: &Arc<dyn Database>,
    path: &FullPath,
    depth: isize,
) -> Result<Mat4, WalkError> {
    let mut state = State::new(Arc::clone(db));
    let mut total = FullPath::new();
    follow_path(&mut state, &mut total, path, true, depth)?;
    Ok(state.transform)
}

/// Maps model coordinates into the coordinate system of the region at
/// `name` (a slash separated path).
pub fn region_matrix(db: &Arc<dyn Database>, name: &str) -> Result<Mat4, WalkError> {
    let path = FullPath::parse(db.as_ref(), name, true)?;
    let region_to_model = path_to_matrix(db, &path, 0)?;
    region_to_model
        .inverse()
        .ok_or_else(|| WalkError::SingularMatrix(name.to_owned()))
}

/// Maps model coordinates into the region's shader space: region
/// coordinates, with the box `p_min..p_max` moved to the origin and scaled
/// to the unit cube.
///
/// A flat axis maps to an infinite scale. Equal corners are rejected.
pub fn shader_matrix(
    db: &Arc<dyn Database>,
    name: &str,
    p_min: &Vec3,
    p_max: &Vec3,
) -> Result<Mat4, WalkError> {
    if p_min == p_max {
        return Err(WalkError::EmptyBounds(name.to_owned()));
    }
    let model_to_region = region_matrix(db, name)?;

    let [tx, ty, tz] = p_min.scale(-1.0).to_array();
    let [sx, sy, sz] = p_max.sub(p_min).recip().to_array();
    Ok(Mat4::scale(sx, sy, sz) * Mat4::translation(tx, ty, tz) * model_to_region)
}
