//! Provider for straight edges on planar faces.

use bop_kernel_geom::{Aabb3, Line3d, Surface};
use bop_kernel_math::{Point2, Point3, Vec3};
use bop_kernel_topo::{Orientation, Shape, ShapeKind};
use tracing::debug;

use crate::polygon::{point_segment_distance, FacePolygon};
use crate::{
    EdgeEdgeHit, EdgeFaceHit, FaceFaceHit, GeometryProvider, IntersectError, Result,
    SectionSegment, State,
};

/// Sine of the angle below which two directions are treated as parallel.
const PARALLEL_EPS: f64 = 1e-10;

/// Probe directions for point-in-solid ray casting, tried in order until one
/// misses every face boundary.
const RAY_DIRECTIONS: [[f64; 3]; 4] = [
    [1.0, 1e-7, 1.3e-7],
    [0.31, 0.87, 0.39],
    [-0.61, 0.27, 0.74],
    [0.13, -0.52, 0.84],
];

/// [`GeometryProvider`] for polyhedral shapes: [`Line3d`] edges on
/// [`bop_kernel_geom::Plane`] faces.
///
/// Anything else yields [`IntersectError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearProvider;

impl LinearProvider {
    /// Create a provider.
    pub fn new() -> Self {
        Self
    }
}

/// Bounded line carried by an edge.
#[derive(Debug, Clone, Copy)]
struct Segment {
    origin: Point3,
    direction: Vec3,
    first: f64,
    last: f64,
}

impl Segment {
    fn from_edge(edge: &Shape) -> Result<Self> {
        let (curve, first, last) = edge
            .curve()
            .ok_or(IntersectError::Unsupported("shape is not an edge"))?;
        let line = curve
            .as_any()
            .downcast_ref::<Line3d>()
            .ok_or(IntersectError::Unsupported("edge curve is not a line"))?;
        if line.speed() <= f64::EPSILON {
            return Err(IntersectError::Singular("degenerate line"));
        }
        Ok(Self {
            origin: line.origin,
            direction: line.direction,
            first: first.min(last),
            last: first.max(last),
        })
    }

    fn point(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    fn speed(&self) -> f64 {
        self.direction.norm()
    }

    fn project(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.direction) / self.direction.norm_squared()
    }

    fn clamp(&self, t: f64) -> f64 {
        t.clamp(self.first, self.last)
    }

    fn start(&self) -> Point3 {
        self.point(self.first)
    }

    fn end(&self) -> Point3 {
        self.point(self.last)
    }
}

/// Parameters of the closest points of two unbounded lines, `None` if parallel.
fn closest_params(p0: &Point3, u: &Vec3, q0: &Point3, v: &Vec3) -> Option<(f64, f64)> {
    let w0 = p0 - q0;
    let a = u.dot(u);
    let b = u.dot(v);
    let c = v.dot(v);
    let d = u.dot(&w0);
    let e = v.dot(&w0);
    let den = a * c - b * b;
    if den <= PARALLEL_EPS * PARALLEL_EPS * a * c {
        return None;
    }
    Some(((b * e - c * d) / den, (a * e - b * d) / den))
}

fn is_parallel(u: &Vec3, v: &Vec3) -> bool {
    u.cross(v).norm() <= PARALLEL_EPS * u.norm() * v.norm()
}

/// Parameters where the line `origin + s * dir` enters or leaves the face
/// boundary, then the sub-ranges of the line lying in the face (boundary
/// included). The line is assumed to lie in the face plane.
fn clip_line_to_face(origin: &Point3, dir: &Vec3, poly: &FacePolygon, tol: f64) -> Vec<(f64, f64)> {
    let len2 = dir.norm_squared();
    let mut cuts = Vec::new();
    for (c, d) in &poly.segments {
        let v = d - c;
        let vlen = v.norm();
        if vlen <= f64::EPSILON {
            continue;
        }
        if is_parallel(dir, &v) {
            let sc = (c - origin).dot(dir) / len2;
            if (origin + dir * sc - c).norm() <= tol {
                cuts.push(sc);
                cuts.push((d - origin).dot(dir) / len2);
            }
            continue;
        }
        if let Some((s, u)) = closest_params(origin, dir, c, &v) {
            let slack = tol / vlen;
            if u < -slack || u > 1.0 + slack {
                continue;
            }
            let dist = (origin + dir * s - (c + v * u.clamp(0.0, 1.0))).norm();
            if dist <= tol {
                cuts.push(s);
            }
        }
    }
    cuts.sort_by(|a, b| a.total_cmp(b));
    let step = tol / len2.sqrt();
    cuts.dedup_by(|b, a| (*b - *a).abs() <= step);

    let mut ranges: Vec<(f64, f64)> = Vec::new();
    for w in cuts.windows(2) {
        let (s0, s1) = (w[0], w[1]);
        let mid = origin + dir * (0.5 * (s0 + s1));
        let state = poly.classify_uv(&poly.plane.project(&mid), tol);
        if !matches!(state, State::In | State::On) {
            continue;
        }
        match ranges.last_mut() {
            Some(last) if (last.1 - s0).abs() <= step => last.1 = s1,
            _ => ranges.push((s0, s1)),
        }
    }
    ranges
}

/// Intersection of two sorted, disjoint range lists.
fn intersect_ranges(a: &[(f64, f64)], b: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        let lo = a[i].0.max(b[j].0);
        let hi = a[i].1.min(b[j].1);
        if hi > lo {
            out.push((lo, hi));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Whether two coplanar polygons share interior area.
fn coplanar_overlap(p1: &FacePolygon, p2: &FacePolygon, tol: f64) -> bool {
    let inside = |poly: &FacePolygon, p: &Point3| poly.classify(p, tol) == State::In;
    let vertex_inside = |a: &FacePolygon, b: &FacePolygon| {
        b.segments.iter().any(|(p, _)| inside(a, p))
    };
    let centroid_inside = |a: &FacePolygon, b: &FacePolygon| {
        if b.segments.is_empty() {
            return false;
        }
        let sum = b
            .segments
            .iter()
            .fold(Vec3::zeros(), |acc, (p, _)| acc + p.coords);
        inside(a, &Point3::from(sum / b.segments.len() as f64))
    };
    if vertex_inside(p1, p2) || vertex_inside(p2, p1) {
        return true;
    }
    if centroid_inside(p1, p2) || centroid_inside(p2, p1) {
        return true;
    }
    // edge midpoints nudged off the boundary, for overlaps bounded by
    // collinear edges
    let step = 4.0 * tol.max(f64::EPSILON);
    let normal = p1.plane.normal_dir.into_inner();
    let nudged_inside = |b: &FacePolygon| {
        b.segments.iter().any(|(p, q)| {
            let side = normal.cross(&(q - p));
            let len = side.norm();
            if len <= f64::EPSILON {
                return false;
            }
            let mid = Point3::from((p.coords + q.coords) * 0.5);
            [step, -step].iter().any(|d| {
                let x = mid + side * (d / len);
                inside(p1, &x) && inside(p2, &x)
            })
        })
    };
    if nudged_inside(p1) || nudged_inside(p2) {
        return true;
    }
    // proper crossings of boundary segments
    p1.segments.iter().any(|(a, b)| {
        p2.segments.iter().any(|(c, d)| {
            let (u, v) = (b - a, d - c);
            match closest_params(a, &u, c, &v) {
                Some((s, t)) => {
                    let (ls, lt) = (tol / u.norm(), tol / v.norm());
                    s > ls
                        && s < 1.0 - ls
                        && t > lt
                        && t < 1.0 - lt
                        && (a + u * s - (c + v * t)).norm() <= tol
                }
                None => false,
            }
        })
    })
}

impl LinearProvider {
    fn in_plane_ranges(&self, seg: &Segment, poly: &FacePolygon, tol: f64) -> Vec<(f64, f64)> {
        let a = seg.start();
        let dir = seg.end() - a;
        let span = seg.last - seg.first;
        clip_line_to_face(&a, &dir, poly, tol)
            .into_iter()
            .filter_map(|(s0, s1)| {
                let (s0, s1) = (s0.max(0.0), s1.min(1.0));
                if (s1 - s0) * dir.norm() <= tol {
                    return None;
                }
                Some((seg.first + s0 * span, seg.first + s1 * span))
            })
            .collect()
    }
}

impl GeometryProvider for LinearProvider {
    fn bounding_box(&self, shape: &Shape) -> Aabb3 {
        let corners: Vec<Point3> = shape
            .sub_shapes(ShapeKind::Vertex)
            .iter()
            .filter_map(Shape::point)
            .collect();
        let mut bbox = Aabb3::from_points(&corners);
        if let Ok(seg) = Segment::from_edge(shape) {
            bbox.include_point(&seg.start());
            bbox.include_point(&seg.end());
        }
        bbox.enlarged(shape.tolerance())
    }

    fn evaluate(&self, edge: &Shape, t: f64) -> Result<Point3> {
        Ok(Segment::from_edge(edge)?.point(t))
    }

    fn vertex_on_edge(&self, vertex: &Shape, edge: &Shape, tol: f64) -> Result<Option<(f64, f64)>> {
        let p = vertex
            .point()
            .ok_or(IntersectError::Unsupported("shape is not a vertex"))?;
        let seg = Segment::from_edge(edge)?;
        let t = seg.clamp(seg.project(&p));
        let dist = (seg.point(t) - p).norm();
        Ok((dist <= tol).then_some((t, dist)))
    }

    fn vertex_in_face(
        &self,
        vertex: &Shape,
        face: &Shape,
        tol: f64,
    ) -> Result<Option<(Point2, f64)>> {
        let p = vertex
            .point()
            .ok_or(IntersectError::Unsupported("shape is not a vertex"))?;
        let poly = FacePolygon::from_face(face)?;
        let dist = poly.plane.signed_distance(&p).abs();
        if dist > tol {
            return Ok(None);
        }
        let uv = poly.plane.project(&p);
        Ok((poly.classify_uv(&uv, tol) == State::In).then_some((uv, dist)))
    }

    fn intersect_edges(&self, e1: &Shape, e2: &Shape, tol: f64) -> Result<Vec<EdgeEdgeHit>> {
        let s1 = Segment::from_edge(e1)?;
        let s2 = Segment::from_edge(e2)?;

        if is_parallel(&s1.direction, &s2.direction) {
            let a = s2.start();
            let ta = s1.project(&a);
            if (s1.point(ta) - a).norm() > tol {
                return Ok(Vec::new());
            }
            let tb = s1.project(&s2.end());
            let lo = ta.min(tb).max(s1.first);
            let hi = ta.max(tb).min(s1.last);
            let ptol = tol / s1.speed();
            if hi - lo > ptol {
                let r0 = s2.clamp(s2.project(&s1.point(lo)));
                let r1 = s2.clamp(s2.project(&s1.point(hi)));
                return Ok(vec![EdgeEdgeHit::Overlap {
                    range1: (lo, hi),
                    range2: (r0.min(r1), r0.max(r1)),
                }]);
            }
            if hi - lo < -ptol {
                return Ok(Vec::new());
            }
            // end-to-end touch
            let t1 = s1.clamp(0.5 * (lo + hi));
            let p1 = s1.point(t1);
            let t2 = s2.clamp(s2.project(&p1));
            let p2 = s2.point(t2);
            let distance = (p1 - p2).norm();
            if distance > tol {
                return Ok(Vec::new());
            }
            return Ok(vec![EdgeEdgeHit::Point {
                t1,
                t2,
                point: midpoint(&p1, &p2),
                distance,
            }]);
        }

        let (_, t2) = closest_params(&s1.origin, &s1.direction, &s2.origin, &s2.direction)
            .ok_or(IntersectError::Singular("edge directions nearly parallel"))?;
        // clamp to the second range, then settle both parameters by projection
        let t2 = s2.clamp(t2);
        let t1 = s1.clamp(s1.project(&s2.point(t2)));
        let t2 = s2.clamp(s2.project(&s1.point(t1)));
        let (p1, p2) = (s1.point(t1), s2.point(t2));
        let distance = (p1 - p2).norm();
        if distance > tol {
            return Ok(Vec::new());
        }
        Ok(vec![EdgeEdgeHit::Point {
            t1,
            t2,
            point: midpoint(&p1, &p2),
            distance,
        }])
    }

    fn intersect_edge_face(&self, edge: &Shape, face: &Shape, tol: f64) -> Result<Vec<EdgeFaceHit>> {
        let seg = Segment::from_edge(edge)?;
        let poly = FacePolygon::from_face(face)?;
        let da = poly.plane.signed_distance(&seg.start());
        let db = poly.plane.signed_distance(&seg.end());

        if da.abs() <= tol && db.abs() <= tol {
            return Ok(self
                .in_plane_ranges(&seg, &poly, tol)
                .into_iter()
                .map(|range| EdgeFaceHit::Overlap { range })
                .collect());
        }
        if (da > tol && db > tol) || (da < -tol && db < -tol) {
            return Ok(Vec::new());
        }
        let s = da / (da - db);
        let t = seg.first + s * (seg.last - seg.first);
        let point = seg.point(t);
        let uv = poly.plane.project(&point);
        if poly.classify_uv(&uv, tol) != State::In {
            return Ok(Vec::new());
        }
        Ok(vec![EdgeFaceHit::Point {
            t,
            uv,
            point,
            distance: poly.plane.signed_distance(&point).abs(),
        }])
    }

    fn intersect_faces(&self, f1: &Shape, f2: &Shape, tol: f64) -> Result<FaceFaceHit> {
        let p1 = FacePolygon::from_face(f1)?;
        let p2 = FacePolygon::from_face(f2)?;
        let n1 = p1.plane.normal_dir.into_inner();
        let n2 = p2.plane.normal_dir.into_inner();

        let dir = n1.cross(&n2);
        if dir.norm() <= PARALLEL_EPS {
            let dist = p1.plane.signed_distance(&p2.plane.origin).abs();
            return Ok(FaceFaceHit {
                sections: Vec::new(),
                coplanar: dist <= tol && coplanar_overlap(&p1, &p2, tol),
            });
        }

        // Point on both planes closest to the world origin.
        let d1 = n1.dot(&p1.plane.origin.coords);
        let d2 = n2.dot(&p2.plane.origin.coords);
        let n1n2 = n1.dot(&n2);
        let det = 1.0 - n1n2 * n1n2;
        if det.abs() < 1e-15 {
            return Err(IntersectError::Singular("plane/plane system"));
        }
        let c1 = (d1 - d2 * n1n2) / det;
        let c2 = (d2 - d1 * n1n2) / det;
        let origin = Point3::from(n1 * c1 + n2 * c2);
        let dir = dir.normalize();

        let r1 = clip_line_to_face(&origin, &dir, &p1, tol);
        let r2 = clip_line_to_face(&origin, &dir, &p2, tol);
        let sections = intersect_ranges(&r1, &r2)
            .into_iter()
            .filter(|(lo, hi)| hi - lo > tol)
            .map(|(lo, hi)| SectionSegment {
                start: origin + dir * lo,
                end: origin + dir * hi,
                tolerance: tol,
            })
            .collect();
        Ok(FaceFaceHit {
            sections,
            coplanar: false,
        })
    }

    fn classify_point_in_face(&self, point: &Point3, face: &Shape, tol: f64) -> Result<State> {
        Ok(FacePolygon::from_face(face)?.classify(point, tol))
    }

    fn classify_point_in_solid(&self, point: &Point3, solid: &Shape, tol: f64) -> Result<State> {
        let faces = solid
            .explore(ShapeKind::Face)
            .into_iter()
            .filter(|f| matches!(f.orientation(), Orientation::Forward | Orientation::Reversed))
            .map(|f| FacePolygon::from_face(&f))
            .collect::<Result<Vec<_>>>()?;

        if faces.iter().any(|poly| poly.classify(point, tol) != State::Out) {
            return Ok(State::On);
        }

        'rays: for (attempt, d) in RAY_DIRECTIONS.iter().enumerate() {
            let dir = Vec3::new(d[0], d[1], d[2]).normalize();
            let mut crossings = 0u32;
            for poly in &faces {
                let n = poly.plane.normal_dir.into_inner();
                let denom = n.dot(&dir);
                if denom.abs() < 1e-9 {
                    continue;
                }
                let t = -poly.plane.signed_distance(point) / denom;
                if t <= 0.0 {
                    continue;
                }
                let hit = point + dir * t;
                match poly.classify_uv(&poly.plane.project(&hit), tol) {
                    State::In => crossings += 1,
                    State::On => {
                        debug!(attempt, "probe ray grazes a face boundary, retrying");
                        continue 'rays;
                    }
                    _ => {}
                }
            }
            return Ok(if crossings % 2 == 1 { State::In } else { State::Out });
        }
        Err(IntersectError::Singular("every probe ray grazes the boundary"))
    }

    fn sample_point_in_face(&self, face: &Shape, index: usize) -> Option<Point3> {
        let poly = FacePolygon::from_face(face).ok()?;
        let n = poly.plane.normal_dir.into_inner();
        let mut candidates: Vec<(f64, usize, Point3)> = Vec::new();
        for (i, (a, b)) in poly.segments.iter().enumerate() {
            let d = b - a;
            if d.norm() <= f64::EPSILON {
                continue;
            }
            let mid = midpoint(a, b);
            let clearance = poly
                .segments
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (c, e))| point_segment_distance(&mid, c, e))
                .fold(f64::INFINITY, f64::min);
            if !clearance.is_finite() || clearance <= f64::EPSILON {
                continue;
            }
            let inward = n.cross(&d).normalize();
            let p = mid + inward * (0.5 * clearance);
            if poly.classify(&p, 0.0) == State::In {
                candidates.push((clearance, i, p));
            }
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        candidates.get(index).map(|c| c.2)
    }
}

fn midpoint(a: &Point3, b: &Point3) -> Point3 {
    Point3::from((a.coords + b.coords) * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bop_kernel_math::Tolerance;
    use bop_kernel_topo::{make_box, make_polygon_face};

    const TOL: f64 = 1e-7;

    fn edge(a: [f64; 3], b: [f64; 3]) -> Shape {
        let va = Shape::vertex(Point3::new(a[0], a[1], a[2]), TOL);
        let vb = Shape::vertex(Point3::new(b[0], b[1], b[2]), TOL);
        Shape::line(&va, &vb)
    }

    fn square(z: f64, size: f64) -> Shape {
        make_polygon_face(&[
            Point3::new(0.0, 0.0, z),
            Point3::new(size, 0.0, z),
            Point3::new(size, size, z),
            Point3::new(0.0, size, z),
        ])
        .unwrap()
    }

    #[test]
    fn test_crossing_edges() {
        let p = LinearProvider;
        let hits = p
            .intersect_edges(&edge([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]), &edge([1.0, -1.0, 0.0], [1.0, 3.0, 0.0]), TOL)
            .unwrap();
        assert_eq!(hits.len(), 1);
        match &hits[0] {
            EdgeEdgeHit::Point { t1, t2, point, .. } => {
                assert_relative_eq!(*t1, 0.5, epsilon = 1e-12);
                assert_relative_eq!(*t2, 0.25, epsilon = 1e-12);
                assert_relative_eq!(point.x, 1.0, epsilon = 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_skew_edges_miss() {
        let hits = LinearProvider
            .intersect_edges(&edge([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]), &edge([1.0, -1.0, 1.0], [1.0, 1.0, 1.0]), TOL)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_collinear_overlap() {
        let hits = LinearProvider
            .intersect_edges(&edge([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]), &edge([3.0, 0.0, 0.0], [1.0, 0.0, 0.0]), TOL)
            .unwrap();
        match &hits[..] {
            [EdgeEdgeHit::Overlap { range1, range2 }] => {
                assert_relative_eq!(range1.0, 0.5, epsilon = 1e-12);
                assert_relative_eq!(range1.1, 1.0, epsilon = 1e-12);
                assert_relative_eq!(range2.0, 0.5, epsilon = 1e-12);
                assert_relative_eq!(range2.1, 1.0, epsilon = 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_collinear_touch_at_end() {
        let hits = LinearProvider
            .intersect_edges(&edge([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]), &edge([1.0, 0.0, 0.0], [2.0, 0.0, 0.0]), TOL)
            .unwrap();
        assert!(matches!(hits[..], [EdgeEdgeHit::Point { .. }]));
    }

    #[test]
    fn test_vertex_on_edge() {
        let v = Shape::vertex(Point3::new(0.5, 1e-8, 0.0), TOL);
        let e = edge([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let (t, d) = LinearProvider.vertex_on_edge(&v, &e, 2.0 * TOL).unwrap().unwrap();
        assert_relative_eq!(t, 0.25, epsilon = 1e-9);
        assert!(d < 2.0 * TOL);
        let far = Shape::vertex(Point3::new(0.5, 1.0, 0.0), TOL);
        assert!(LinearProvider.vertex_on_edge(&far, &e, TOL).unwrap().is_none());
    }

    #[test]
    fn test_edge_pierces_face() {
        let f = square(0.0, 2.0);
        let e = edge([1.0, 1.0, -1.0], [1.0, 1.0, 3.0]);
        let hits = LinearProvider.intersect_edge_face(&e, &f, TOL).unwrap();
        match &hits[..] {
            [EdgeFaceHit::Point { t, point, .. }] => {
                assert_relative_eq!(*t, 0.25, epsilon = 1e-12);
                assert_relative_eq!(point.z, 0.0, epsilon = 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
        // crossing the plane outside the face
        let miss = edge([5.0, 1.0, -1.0], [5.0, 1.0, 1.0]);
        assert!(LinearProvider.intersect_edge_face(&miss, &f, TOL).unwrap().is_empty());
    }

    #[test]
    fn test_edge_in_face_plane_is_clipped() {
        let f = square(0.0, 2.0);
        let e = edge([-1.0, 1.0, 0.0], [3.0, 1.0, 0.0]);
        let hits = LinearProvider.intersect_edge_face(&e, &f, TOL).unwrap();
        match &hits[..] {
            [EdgeFaceHit::Overlap { range }] => {
                assert_relative_eq!(range.0, 0.25, epsilon = 1e-9);
                assert_relative_eq!(range.1, 0.75, epsilon = 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_perpendicular_faces_section() {
        let f1 = square(0.0, 2.0);
        // vertical square x = 1, y in [-1, 1], z in [-1, 1]
        let f2 = make_polygon_face(&[
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, -1.0, 1.0),
        ])
        .unwrap();
        let hit = LinearProvider.intersect_faces(&f1, &f2, TOL).unwrap();
        assert!(!hit.coplanar);
        assert_eq!(hit.sections.len(), 1);
        let s = &hit.sections[0];
        let len = (s.end - s.start).norm();
        assert_relative_eq!(len, 1.0, epsilon = 1e-9);
        let (ya, yb) = (s.start.y.min(s.end.y), s.start.y.max(s.end.y));
        assert_relative_eq!(ya, 0.0, epsilon = 1e-9);
        assert_relative_eq!(yb, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coplanar_faces() {
        let hit = LinearProvider
            .intersect_faces(&square(0.0, 2.0), &square(0.0, 1.0), TOL)
            .unwrap();
        assert!(hit.coplanar);
        assert!(hit.sections.is_empty());

        let apart = LinearProvider
            .intersect_faces(&square(0.0, 2.0), &square(1.0, 2.0), TOL)
            .unwrap();
        assert!(apart.is_empty());
    }

    #[test]
    fn test_partly_overlapping_coplanar_faces() {
        let side = |x0: f64| {
            make_polygon_face(&[
                Point3::new(x0, 0.0, 0.0),
                Point3::new(x0 + 1.0, 0.0, 0.0),
                Point3::new(x0 + 1.0, 0.0, 1.0),
                Point3::new(x0, 0.0, 1.0),
            ])
            .unwrap()
        };
        // every corner of each face lies on the other's boundary
        let hit = LinearProvider
            .intersect_faces(&side(0.0), &side(0.5), TOL)
            .unwrap();
        assert!(hit.coplanar);

        let adjacent = LinearProvider
            .intersect_faces(&side(0.0), &side(1.0), TOL)
            .unwrap();
        assert!(!adjacent.coplanar);
    }

    #[test]
    fn test_classify_point_in_solid() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let p = LinearProvider;
        assert_eq!(p.classify_point_in_solid(&Point3::new(0.5, 0.5, 0.5), &b, TOL).unwrap(), State::In);
        assert_eq!(p.classify_point_in_solid(&Point3::new(1.5, 0.5, 0.5), &b, TOL).unwrap(), State::Out);
        assert_eq!(p.classify_point_in_solid(&Point3::new(1.0, 0.5, 0.5), &b, TOL).unwrap(), State::On);
        // on the ray's path through an edge of the box
        assert_eq!(p.classify_point_in_solid(&Point3::new(-1.0, 0.0, 0.0), &b, TOL).unwrap(), State::Out);
    }

    #[test]
    fn test_sample_point_in_face() {
        let f = square(3.0, 2.0);
        let p = LinearProvider.sample_point_in_face(&f, 0).unwrap();
        assert_eq!(LinearProvider.classify_point_in_face(&p, &f, TOL).unwrap(), State::In);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-12);
        assert!(LinearProvider.sample_point_in_face(&f, 3).is_some());
        assert!(LinearProvider.sample_point_in_face(&f, 4).is_none());
    }

    #[test]
    fn test_bounding_box_includes_tolerance() {
        let b = LinearProvider.bounding_box(&edge([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]));
        assert!(b.min.x < 0.0);
        assert_relative_eq!(b.max.z, 3.0 + Tolerance::CONFUSION, epsilon = 1e-12);
    }
}
