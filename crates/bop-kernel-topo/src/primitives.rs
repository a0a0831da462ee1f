//! Polyhedral primitives.
//!
//! Every face is planar with straight edges; edges and vertices are shared
//! between adjacent faces so the resulting shells are closed.

use std::collections::HashMap;
use std::sync::Arc;

use bop_kernel_geom::Plane;
use bop_kernel_math::{Point3, Tolerance};

use crate::{Orientation, Shape};

struct PolyBuilder {
    vertices: Vec<Shape>,
    edges: HashMap<(usize, usize), Shape>,
}

impl PolyBuilder {
    fn new(points: &[Point3]) -> Self {
        Self {
            vertices: points
                .iter()
                .map(|p| Shape::vertex(*p, Tolerance::CONFUSION))
                .collect(),
            edges: HashMap::new(),
        }
    }

    /// Edge from `a` to `b`, shared with any earlier use of the same pair.
    fn edge(&mut self, a: usize, b: usize) -> Shape {
        let key = (a.min(b), a.max(b));
        let vertices = &self.vertices;
        let edge = self
            .edges
            .entry(key)
            .or_insert_with(|| Shape::line(&vertices[key.0], &vertices[key.1]));
        if a == key.0 {
            edge.oriented(Orientation::Forward)
        } else {
            edge.oriented(Orientation::Reversed)
        }
    }

    fn face(&mut self, ring: &[usize], plane: Plane) -> Shape {
        let n = ring.len();
        let edges = (0..n)
            .map(|i| self.edge(ring[i], ring[(i + 1) % n]))
            .collect();
        Shape::face(
            Arc::new(plane),
            vec![Shape::wire(edges)],
            Tolerance::CONFUSION,
        )
    }
}

/// Create an axis-aligned box with one corner at `origin`.
///
/// Vertex layout (origin at v0):
/// ```text
///     v7 ---- v6
///    /|      /|
///   v4 ---- v5|
///   | v3 ---|-v2
///   |/      |/
///   v0 ---- v1
/// ```
/// Faces are oriented with outward normals.
pub fn make_box(origin: Point3, dx: f64, dy: f64, dz: f64) -> Shape {
    let (x0, y0, z0) = (origin.x, origin.y, origin.z);
    let (x1, y1, z1) = (x0 + dx, y0 + dy, z0 + dz);
    let points = [
        Point3::new(x0, y0, z0),
        Point3::new(x1, y0, z0),
        Point3::new(x1, y1, z0),
        Point3::new(x0, y1, z0),
        Point3::new(x0, y0, z1),
        Point3::new(x1, y0, z1),
        Point3::new(x1, y1, z1),
        Point3::new(x0, y1, z1),
    ];
    let rings: [[usize; 4]; 6] = [
        [0, 3, 2, 1], // bottom (-Z)
        [4, 5, 6, 7], // top (+Z)
        [0, 1, 5, 4], // front (-Y)
        [2, 3, 7, 6], // back (+Y)
        [0, 4, 7, 3], // left (-X)
        [1, 2, 6, 5], // right (+X)
    ];
    let mut builder = PolyBuilder::new(&points);
    let faces = rings
        .iter()
        .map(|ring| {
            let p0 = points[ring[0]];
            let plane = Plane::new(p0, points[ring[1]] - p0, points[ring[3]] - p0);
            builder.face(ring, plane)
        })
        .collect();
    Shape::solid(vec![Shape::shell(faces)])
}

/// Create a closed polyhedron from points and outward-wound face rings.
///
/// Returns `None` if any ring is degenerate.
pub fn make_polyhedron(points: &[Point3], rings: &[Vec<usize>]) -> Option<Shape> {
    let mut builder = PolyBuilder::new(points);
    let mut faces = Vec::with_capacity(rings.len());
    for ring in rings {
        let ring_points: Vec<Point3> = ring.iter().map(|&i| points[i]).collect();
        let plane = Plane::from_polygon(&ring_points)?;
        faces.push(builder.face(ring, plane));
    }
    Some(Shape::solid(vec![Shape::shell(faces)]))
}

/// Create a planar face from a closed polygon; the winding defines the normal.
pub fn make_polygon_face(points: &[Point3]) -> Option<Shape> {
    let plane = Plane::from_polygon(points)?;
    let ring: Vec<usize> = (0..points.len()).collect();
    let mut builder = PolyBuilder::new(points);
    Some(builder.face(&ring, plane))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{volume, ShapeKind};
    use approx::assert_relative_eq;

    #[test]
    fn test_box_face_normals_point_outward() {
        let b = make_box(Point3::new(1.0, 1.0, 1.0), 2.0, 2.0, 2.0);
        let center = Point3::new(2.0, 2.0, 2.0);
        for face in b.explore(ShapeKind::Face) {
            let n = face.face_normal().unwrap();
            let p = face.sub_shapes(ShapeKind::Vertex)[0].point().unwrap();
            assert!((p - center).dot(&n) > 0.0);
        }
    }

    #[test]
    fn test_tetrahedron() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let rings = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]];
        let tet = make_polyhedron(&points, &rings).unwrap();
        assert_eq!(tet.sub_shapes(ShapeKind::Edge).len(), 6);
        assert_relative_eq!(volume(&tet), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_face() {
        let face = make_polygon_face(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(face.kind(), ShapeKind::Face);
        assert_relative_eq!(face.face_normal().unwrap().z, 1.0, epsilon = 1e-12);
        assert!(make_polygon_face(&[Point3::origin(), Point3::origin()]).is_none());
    }
}
