#![warn(missing_docs)]

//! Geometry carried by BOP kernel shapes.
//!
//! The Boolean engine never inspects geometry directly: edges hold a
//! [`Curve3d`], faces a [`Surface`], and every query goes through those
//! traits or through a geometry provider. [`Line3d`] and [`Plane`] are the
//! carriers of polyhedral shapes; [`Aabb3`] is the box filter used before
//! any intersection.

mod bbox;

pub use bbox::Aabb3;

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use bop_kernel_math::{Dir3, Point2, Point3, Transform, Vec3};

/// Curve under an edge, parameterized by a scalar.
pub trait Curve3d: Send + Sync + Debug {
    /// Point at parameter `t`.
    fn evaluate(&self, t: f64) -> Point3;

    /// Derivative at `t`.
    fn tangent(&self, t: f64) -> Vec3;

    /// Parameter of the foot of `p` on the unbounded curve.
    fn project(&self, p: &Point3) -> f64;

    /// Concrete type, for providers that specialize on it.
    fn as_any(&self) -> &dyn Any;

    /// Moved copy.
    fn transform(&self, t: &Transform) -> Arc<dyn Curve3d>;
}

/// Surface under a face, parameterized by `(u, v)`.
pub trait Surface: Send + Sync + Debug {
    /// Point at `uv`.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Unit normal at `uv`, before face orientation is applied.
    fn normal(&self, uv: Point2) -> Dir3;

    /// Parameters of the foot of `p` on the surface.
    fn project(&self, p: &Point3) -> Point2;

    /// Concrete type, for providers that specialize on it.
    fn as_any(&self) -> &dyn Any;

    /// Moved copy.
    fn transform(&self, t: &Transform) -> Arc<dyn Surface>;
}

/// Unbounded straight line `origin + t * direction`.
#[derive(Debug, Clone)]
pub struct Line3d {
    /// Point at `t = 0`.
    pub origin: Point3,
    /// Direction; its magnitude sets the parameter speed.
    pub direction: Vec3,
}

impl Line3d {
    /// Line through `start` (`t = 0`) and `end` (`t = 1`).
    pub fn from_points(start: Point3, end: Point3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }

    /// Distance covered per unit of parameter.
    pub fn speed(&self) -> f64 {
        self.direction.norm()
    }
}

impl Curve3d for Line3d {
    fn evaluate(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    fn tangent(&self, _t: f64) -> Vec3 {
        self.direction
    }

    fn project(&self, p: &Point3) -> f64 {
        let speed2 = self.direction.norm_squared();
        if speed2 <= f64::MIN_POSITIVE {
            0.0
        } else {
            self.direction.dot(&(p - self.origin)) / speed2
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Arc<dyn Curve3d> {
        Arc::new(Self {
            origin: t.apply_point(&self.origin),
            direction: t.apply_vec(&self.direction),
        })
    }
}

/// Unbounded plane with an orthonormal frame.
///
/// `(u, v)` maps to `origin + u * x_dir + v * y_dir`; the normal is
/// `x_dir × y_dir`.
#[derive(Debug, Clone)]
pub struct Plane {
    /// Point at `(0, 0)`.
    pub origin: Point3,
    /// Unit `u` axis.
    pub x_dir: Dir3,
    /// Unit `v` axis.
    pub y_dir: Dir3,
    /// Unit normal.
    pub normal_dir: Dir3,
}

impl Plane {
    /// Plane through `origin` spanned by `x` and `y`, which need not be unit
    /// length but must be orthogonal.
    pub fn new(origin: Point3, x: Vec3, y: Vec3) -> Self {
        Self {
            origin,
            x_dir: Dir3::new_normalize(x),
            y_dir: Dir3::new_normalize(y),
            normal_dir: Dir3::new_normalize(x.cross(&y)),
        }
    }

    /// Plane of a closed polygon with its normal following the winding.
    ///
    /// The origin is the first point and the `u` axis runs along the first
    /// non-degenerate side. `None` when the polygon has no area.
    pub fn from_polygon(points: &[Point3]) -> Option<Self> {
        let origin = *points.first()?;
        let area = polygon_area_vector(points);
        if points.len() < 3 || area.norm() <= f64::EPSILON {
            return None;
        }
        let n = area.normalize();
        let side = points[1..]
            .iter()
            .map(|p| p - origin)
            .find(|d| d.norm() > f64::EPSILON)?;
        let x = (side - n * n.dot(&side)).normalize();
        Some(Self::new(origin, x, n.cross(&x)))
    }

    /// Distance from the plane, positive on the normal side.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal_dir.dot(&(p - self.origin))
    }
}

impl Surface for Plane {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + self.x_dir.into_inner() * uv.x + self.y_dir.into_inner() * uv.y
    }

    fn normal(&self, _uv: Point2) -> Dir3 {
        self.normal_dir
    }

    fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(self.x_dir.dot(&d), self.y_dir.dot(&d))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Arc<dyn Surface> {
        Arc::new(Plane::new(
            t.apply_point(&self.origin),
            t.apply_vec(&self.x_dir),
            t.apply_vec(&self.y_dir),
        ))
    }
}

/// Twice the vector area of a closed polygon (Newell).
fn polygon_area_vector(points: &[Point3]) -> Vec3 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .fold(Vec3::zeros(), |acc, (a, b)| acc + a.coords.cross(&b.coords))
}
