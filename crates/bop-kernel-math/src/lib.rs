#![warn(missing_docs)]

//! Math types for the BOP kernel.
//!
//! nalgebra aliases for points and vectors, a similarity transform for
//! moving shapes, and the tolerance constants every proximity test is
//! measured against.

use nalgebra::{Similarity3, Translation3, Unit, UnitQuaternion, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit direction in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in the parameter plane of a surface.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in a surface parameter plane.
pub type Vec2 = Vector2<f64>;

/// Rigid motion with a uniform scale.
///
/// Shapes stay valid under it: angles are kept and tolerances scale by
/// [`scale_factor`](Transform::scale_factor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    inner: Similarity3<f64>,
}

impl Transform {
    /// No motion.
    pub fn identity() -> Self {
        Self {
            inner: Similarity3::identity(),
        }
    }

    /// Move by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            inner: Similarity3::from_parts(
                Translation3::new(dx, dy, dz),
                UnitQuaternion::identity(),
                1.0,
            ),
        }
    }

    /// Turn by `angle` radians about `axis` through the origin.
    pub fn rotation(axis: &Dir3, angle: f64) -> Self {
        Self {
            inner: Similarity3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(axis, angle),
                1.0,
            ),
        }
    }

    /// Scale by `s` about the origin; `s` must be positive.
    pub fn scale(s: f64) -> Self {
        Self {
            inner: Similarity3::from_scaling(s),
        }
    }

    /// `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            inner: self.inner * other.inner,
        }
    }

    /// Image of a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.inner.transform_point(p)
    }

    /// Image of a vector; translation does not apply.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.inner.transform_vector(v)
    }

    /// Length ratio between images and sources.
    pub fn scale_factor(&self) -> f64 {
        self.inner.scaling().abs()
    }

    /// The motion undoing this one.
    pub fn inverse(&self) -> Self {
        Self {
            inner: self.inner.inverse(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants.
pub struct Tolerance;

impl Tolerance {
    /// Smallest distance at which two points are considered distinct.
    pub const CONFUSION: f64 = 1e-7;
}

/// Proximity gap of two tolerant entities widened by a fuzzy value.
///
/// Negative fuzzy values count as zero.
pub fn combined_tolerance(tol_a: f64, tol_b: f64, fuzzy: f64) -> f64 {
    tol_a + tol_b + fuzzy.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_translation_moves_points_not_vectors() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let p = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p, Point3::new(11.0, 22.0, 33.0));
        assert_relative_eq!(t.apply_vec(&Vec3::x()), Vec3::x());
        assert_relative_eq!(t.scale_factor(), 1.0);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let t = Transform::rotation(&Vec3::z_axis(), FRAC_PI_2);
        let p = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_then_applies_other_first() {
        let moved = Transform::scale(2.0).then(&Transform::translation(1.0, 0.0, 0.0));
        assert_relative_eq!(moved.apply_point(&Point3::origin()), Point3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(moved.scale_factor(), 2.0);

        let p = Point3::new(5.0, 6.0, 7.0);
        let back = moved.inverse().then(&moved);
        assert_relative_eq!(back.apply_point(&p), p, epsilon = 1e-12);
        assert_eq!(Transform::default(), Transform::identity());
    }

    #[test]
    fn test_combined_tolerance_ignores_negative_fuzzy() {
        assert_relative_eq!(combined_tolerance(0.1, 0.2, -5.0), 0.3);
        assert_relative_eq!(combined_tolerance(0.1, 0.2, 0.5), 0.8);
    }
}
