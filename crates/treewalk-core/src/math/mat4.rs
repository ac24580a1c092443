// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::{Vec3, EPSILON};

/// Column‑major 4×4 matrix.
///
/// - Stored in column‑major order; translation occupies the last column.
/// - Represents affine transforms; perspective terms are preserved but the
///   point helpers treat them homogeneously (`w = 1`).
///
/// # Examples
/// ```
/// use treewalk_core::math::{Mat4, Vec3};
/// let t = Mat4::translation(5.0, -3.0, 2.0);
/// let p = Vec3::new(2.0, 4.0, -1.0);
/// assert_eq!(t.transform_point(&p).to_array(), [7.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mat4 {
    data: [f64; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    /// Returns the identity matrix.
    pub const fn identity() -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, 0.0, // col 0
                0.0, 1.0, 0.0, 0.0, // col 1
                0.0, 0.0, 1.0, 0.0, // col 2
                0.0, 0.0, 0.0, 1.0, // col 3
            ],
        }
    }

    /// Builds a translation matrix.
    pub const fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, 0.0, // col 0
                0.0, 1.0, 0.0, 0.0, // col 1
                0.0, 0.0, 1.0, 0.0, // col 2
                tx, ty, tz, 1.0, // col 3 (translation)
            ],
        }
    }

    /// Builds a non-uniform scale matrix.
    pub const fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            data: [
                sx, 0.0, 0.0, 0.0, // col 0
                0.0, sy, 0.0, 0.0, // col 1
                0.0, 0.0, sz, 0.0, // col 2
                0.0, 0.0, 0.0, 1.0, // col 3
            ],
        }
    }

    /// Creates a matrix from column-major array data.
    pub const fn new(data: [f64; 16]) -> Self {
        Self { data }
    }

    /// Returns the matrix as a column‑major array.
    pub fn to_array(self) -> [f64; 16] {
        self.data
    }

    /// Element at `row`, `col`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[col * 4 + row]
    }

    /// Multiplies the matrix with another matrix (`self * rhs`).
    ///
    /// Accumulating down a path is `acc = acc * local`: the local arc
    /// transform is applied first, then everything above it.
    pub fn multiply(&self, rhs: &Self) -> Self {
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.at(row, k) * rhs.at(k, col);
                }
                out[col * 4 + row] = sum;
            }
        }
        Self::new(out)
    }

    /// Transforms a point (assumes `w = 1`, no perspective divide).
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        let moved = self.transform_direction(point);
        moved.add(&Vec3::new(self.at(0, 3), self.at(1, 3), self.at(2, 3)))
    }

    /// Transforms a direction vector (ignores translation, `w = 0`).
    pub fn transform_direction(&self, direction: &Vec3) -> Vec3 {
        let x = direction.component(0);
        let y = direction.component(1);
        let z = direction.component(2);

        let nx = self.at(0, 0) * x + self.at(0, 1) * y + self.at(0, 2) * z;
        let ny = self.at(1, 0) * x + self.at(1, 1) * y + self.at(1, 2) * z;
        let nz = self.at(2, 0) * x + self.at(2, 1) * y + self.at(2, 2) * z;

        Vec3::new(nx, ny, nz)
    }

    /// Pairwise dot products `(X·Y, Y·Z, X·Z)` of the transformed unit axes.
    ///
    /// All three are zero for any transform built from rotations, uniform
    /// or axis-aligned scales, and translations. Shears show up here.
    pub fn axis_dots(&self) -> (f64, f64, f64) {
        let a = self.transform_direction(&Vec3::UNIT_X);
        let b = self.transform_direction(&Vec3::UNIT_Y);
        let c = self.transform_direction(&Vec3::UNIT_Z);
        (a.dot(&b), b.dot(&c), a.dot(&c))
    }

    /// Returns the inverse, or `None` when the matrix is singular.
    ///
    /// Gauss-Jordan elimination with partial pivoting.
    pub fn inverse(&self) -> Option<Self> {
        let mut aug = [[0.0_f64; 8]; 4];
        for (row, line) in aug.iter_mut().enumerate() {
            for col in 0..4 {
                line[col] = self.at(row, col);
            }
            line[4 + row] = 1.0;
        }

        for col in 0..4 {
            let mut pivot = col;
            for row in (col + 1)..4 {
                if aug[row][col].abs() > aug[pivot][col].abs() {
                    pivot = row;
                }
            }
            if aug[pivot][col].abs() <= EPSILON {
                return None;
            }
            aug.swap(col, pivot);

            let p = aug[col][col];
            for v in &mut aug[col] {
                *v /= p;
            }
            let pivot_row = aug[col];
            for (row, line) in aug.iter_mut().enumerate() {
                if row == col {
                    continue;
                }
                let factor = line[col];
                if factor == 0.0 {
                    continue;
                }
                for (v, pv) in line.iter_mut().zip(pivot_row.iter()) {
                    *v -= factor * pv;
                }
            }
        }

        let mut out = [0.0; 16];
        for (row, line) in aug.iter().enumerate() {
            for col in 0..4 {
                out[col * 4 + row] = line[4 + col];
            }
        }
        Some(Self::new(out))
    }

    /// Element-wise comparison within `tol`.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl From<[f64; 16]> for Mat4 {
    fn from(value: [f64; 16]) -> Self {
        Self { data: value }
    }
}

impl core::ops::Mul for Mat4 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.multiply(&rhs)
    }
}

impl core::fmt::Display for Mat4 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for row in 0..4 {
            writeln!(
                f,
                "  {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
                self.at(row, 0),
                self.at(row, 1),
                self.at(row, 2),
                self.at(row, 3)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn inverse_of_translation_scale_round_trips() {
        let m = Mat4::translation(1.0, -2.0, 3.0) * Mat4::scale(2.0, 4.0, 0.5);
        let inv = m.inverse().expect("invertible");
        assert!((m * inv).approx_eq(&Mat4::identity(), EPS));
        assert!((inv * m).approx_eq(&Mat4::identity(), EPS));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Mat4::scale(1.0, 0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn scale_and_translation_keep_axes_perpendicular() {
        let m = Mat4::translation(4.0, 5.0, 6.0) * Mat4::scale(2.0, 3.0, 0.5);
        let (xy, yz, xz) = m.axis_dots();
        assert!(xy.abs() < EPS && yz.abs() < EPS && xz.abs() < EPS);
    }

    #[test]
    fn shear_breaks_perpendicularity() {
        let mut data = Mat4::identity().to_array();
        // X picks up a Y component: column 0, row 1.
        data[1] = 0.5;
        let (xy, _, _) = Mat4::new(data).axis_dots();
        assert!((xy - 0.5).abs() < EPS);
    }
}
