//! Planar face boundaries flattened into the face's parameter plane.

use bop_kernel_geom::{Plane, Surface};
use bop_kernel_math::{Point2, Point3};
use bop_kernel_topo::{Orientation, Shape, ShapeKind};

use crate::{IntersectError, Result, State};

/// Boundary segments of one planar face, in 3D and in the plane's uv space.
#[derive(Debug, Clone)]
pub(crate) struct FacePolygon {
    pub plane: Plane,
    /// Boundary segments of the forward face.
    pub segments: Vec<(Point3, Point3)>,
    pub segments_uv: Vec<(Point2, Point2)>,
}

impl FacePolygon {
    pub fn from_face(face: &Shape) -> Result<Self> {
        let plane = face
            .surface()
            .and_then(|s| s.as_any().downcast_ref::<Plane>())
            .ok_or(IntersectError::Unsupported("face surface is not a plane"))?
            .clone();
        let forward = face.oriented(Orientation::Forward);
        let mut segments = Vec::new();
        for edge in forward.explore(ShapeKind::Edge) {
            if !matches!(edge.orientation(), Orientation::Forward | Orientation::Reversed) {
                continue;
            }
            let a = edge.start_vertex().and_then(|v| v.point());
            let b = edge.end_vertex().and_then(|v| v.point());
            if let (Some(a), Some(b)) = (a, b) {
                segments.push((a, b));
            }
        }
        let segments_uv = segments
            .iter()
            .map(|(a, b)| (plane.project(a), plane.project(b)))
            .collect();
        Ok(Self {
            plane,
            segments,
            segments_uv,
        })
    }

    /// Classify a point that is already known to lie on the plane.
    pub fn classify_uv(&self, uv: &Point2, tol: f64) -> State {
        if self.boundary_distance_uv(uv) <= tol {
            return State::On;
        }
        if point_in_segments(uv, &self.segments_uv) {
            State::In
        } else {
            State::Out
        }
    }

    /// Full classification: off-plane points are `Out`.
    pub fn classify(&self, p: &Point3, tol: f64) -> State {
        if self.plane.signed_distance(p).abs() > tol {
            return State::Out;
        }
        self.classify_uv(&self.plane.project(p), tol)
    }

    pub fn boundary_distance_uv(&self, uv: &Point2) -> f64 {
        self.segments_uv
            .iter()
            .map(|(a, b)| point_segment_distance_2d(uv, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Even-odd crossing test over an unordered set of closed-loop segments.
///
/// Holes need no special handling: their segments flip the parity.
pub(crate) fn point_in_segments(p: &Point2, segments: &[(Point2, Point2)]) -> bool {
    let mut inside = false;
    for (a, b) in segments {
        if (a.y > p.y) != (b.y > p.y) {
            let x_at = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_at {
                inside = !inside;
            }
        }
    }
    inside
}

pub(crate) fn point_segment_distance_2d(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::MIN_POSITIVE {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

pub(crate) fn point_segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::MIN_POSITIVE {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<(Point2, Point2)> {
        let p = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        (0..4).map(|i| (p[i], p[(i + 1) % 4])).collect()
    }

    #[test]
    fn test_point_in_segments() {
        let sq = square();
        assert!(point_in_segments(&Point2::new(1.0, 1.0), &sq));
        assert!(!point_in_segments(&Point2::new(5.0, 1.0), &sq));
    }

    #[test]
    fn test_hole_flips_parity() {
        let mut segs = square();
        let h = [
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 1.0),
        ];
        segs.extend((0..4).map(|i| (h[i], h[(i + 1) % 4])));
        assert!(!point_in_segments(&Point2::new(2.0, 2.0), &segs));
        assert!(point_in_segments(&Point2::new(0.5, 2.0), &segs));
    }

    #[test]
    fn test_segment_distance() {
        let d = point_segment_distance_2d(
            &Point2::new(2.0, 1.0),
            &Point2::new(0.0, 0.0),
            &Point2::new(4.0, 0.0),
        );
        assert!((d - 1.0).abs() < 1e-12);
        let d = point_segment_distance(
            &Point3::new(-3.0, 4.0, 0.0),
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-12);
    }
}
