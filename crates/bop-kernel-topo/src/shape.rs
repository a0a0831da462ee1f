//! Shape handles and the shared topology behind them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bop_kernel_geom::{Curve3d, Line3d, Surface};
use bop_kernel_math::{Point2, Point3, Tolerance, Transform, Vec3};

use crate::{Orientation, ShapeKind};

/// Identity of the shared topology behind a [`Shape`].
///
/// Stable for as long as any handle to the shape is alive. Useful as a map
/// key; carries no ordering meaning across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(usize);

#[derive(Debug)]
enum Geometry {
    None,
    Point(Point3),
    Curve {
        curve: Arc<dyn Curve3d>,
        first: f64,
        last: f64,
    },
    Surface(Arc<dyn Surface>),
}

#[derive(Debug)]
struct TShape {
    kind: ShapeKind,
    geometry: Geometry,
    tolerance: f64,
    children: Vec<Shape>,
}

/// Handle to an immutable, shared topological shape.
///
/// `PartialEq` compares identity *and* orientation; use [`Shape::is_same`]
/// to ignore orientation.
#[derive(Clone)]
pub struct Shape {
    tshape: Arc<TShape>,
    orientation: Orientation,
}

impl Shape {
    fn build(kind: ShapeKind, geometry: Geometry, tolerance: f64, children: Vec<Shape>) -> Self {
        Self {
            tshape: Arc::new(TShape {
                kind,
                geometry,
                tolerance,
                children,
            }),
            orientation: Orientation::Forward,
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// A vertex at `point` with the given tolerance radius.
    pub fn vertex(point: Point3, tolerance: f64) -> Self {
        Self::build(
            ShapeKind::Vertex,
            Geometry::Point(point),
            tolerance.max(Tolerance::CONFUSION),
            Vec::new(),
        )
    }

    /// An edge on `curve` between parameters `first` (at `start`) and `last` (at `end`).
    pub fn edge(
        curve: Arc<dyn Curve3d>,
        start: &Shape,
        end: &Shape,
        first: f64,
        last: f64,
        tolerance: f64,
    ) -> Self {
        Self::build(
            ShapeKind::Edge,
            Geometry::Curve { curve, first, last },
            tolerance.max(Tolerance::CONFUSION),
            vec![
                start.oriented(Orientation::Forward),
                end.oriented(Orientation::Reversed),
            ],
        )
    }

    /// A straight edge between two vertices, parameterized on `[0, 1]`.
    pub fn line(start: &Shape, end: &Shape) -> Self {
        let (a, b) = (start.point_or_origin(), end.point_or_origin());
        Self::edge(
            Arc::new(Line3d::from_points(a, b)),
            start,
            end,
            0.0,
            1.0,
            Tolerance::CONFUSION,
        )
    }

    /// A wire from edges already oriented in traversal order.
    pub fn wire(edges: Vec<Shape>) -> Self {
        Self::build(ShapeKind::Wire, Geometry::None, 0.0, edges)
    }

    /// A face on `surface` bounded by `wires` (the first one is the outer boundary).
    ///
    /// Internal wires and vertices may be passed with [`Orientation::Internal`].
    pub fn face(surface: Arc<dyn Surface>, wires: Vec<Shape>, tolerance: f64) -> Self {
        Self::build(
            ShapeKind::Face,
            Geometry::Surface(surface),
            tolerance.max(Tolerance::CONFUSION),
            wires,
        )
    }

    /// A shell from oriented faces.
    pub fn shell(faces: Vec<Shape>) -> Self {
        Self::build(ShapeKind::Shell, Geometry::None, 0.0, faces)
    }

    /// A solid from shells; the first one is the outer boundary.
    pub fn solid(shells: Vec<Shape>) -> Self {
        Self::build(ShapeKind::Solid, Geometry::None, 0.0, shells)
    }

    /// A compound of arbitrary shapes.
    pub fn compound(shapes: Vec<Shape>) -> Self {
        Self::build(ShapeKind::Compound, Geometry::None, 0.0, shapes)
    }

    /// An empty compound.
    pub fn empty() -> Self {
        Self::compound(Vec::new())
    }

    // =========================================================================
    // Identity and orientation
    // =========================================================================

    /// Kind of the shape.
    pub fn kind(&self) -> ShapeKind {
        self.tshape.kind
    }

    /// Identity of the underlying topology.
    pub fn id(&self) -> ShapeId {
        ShapeId(Arc::as_ptr(&self.tshape) as usize)
    }

    /// Orientation of this handle.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Same underlying topology, orientation ignored.
    pub fn is_same(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.tshape, &other.tshape)
    }

    /// Copy of this handle with a new orientation.
    pub fn oriented(&self, orientation: Orientation) -> Self {
        Self {
            tshape: Arc::clone(&self.tshape),
            orientation,
        }
    }

    /// Copy of this handle with Forward and Reversed swapped.
    pub fn reversed(&self) -> Self {
        self.oriented(self.orientation.reversed())
    }

    /// Copy of this handle with `orientation` composed on top of its own.
    pub fn composed(&self, orientation: Orientation) -> Self {
        self.oriented(orientation.compose(self.orientation))
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Direct children, orientations composed with this handle's orientation.
    pub fn children(&self) -> impl Iterator<Item = Shape> + '_ {
        let parent = self.orientation;
        self.tshape
            .children
            .iter()
            .map(move |c| c.oriented(parent.compose(c.orientation)))
    }

    /// Number of direct children.
    pub fn nb_children(&self) -> usize {
        self.tshape.children.len()
    }

    /// A container with no children.
    pub fn is_empty(&self) -> bool {
        self.kind() != ShapeKind::Vertex && self.tshape.children.is_empty()
    }

    // =========================================================================
    // Geometry access
    // =========================================================================

    /// Tolerance of a vertex, edge or face; 0 for containers.
    pub fn tolerance(&self) -> f64 {
        self.tshape.tolerance
    }

    /// Location of a vertex.
    pub fn point(&self) -> Option<Point3> {
        match &self.tshape.geometry {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    fn point_or_origin(&self) -> Point3 {
        self.point().unwrap_or_else(Point3::origin)
    }

    /// Curve and parameter range of an edge.
    pub fn curve(&self) -> Option<(&Arc<dyn Curve3d>, f64, f64)> {
        match &self.tshape.geometry {
            Geometry::Curve { curve, first, last } => Some((curve, *first, *last)),
            _ => None,
        }
    }

    /// Surface of a face.
    pub fn surface(&self) -> Option<&Arc<dyn Surface>> {
        match &self.tshape.geometry {
            Geometry::Surface(s) => Some(s),
            _ => None,
        }
    }

    /// Vertex of an edge at its `first` parameter, ignoring orientation.
    pub fn first_vertex(&self) -> Option<Shape> {
        self.edge_vertex(0)
    }

    /// Vertex of an edge at its `last` parameter, ignoring orientation.
    pub fn last_vertex(&self) -> Option<Shape> {
        self.edge_vertex(1)
    }

    fn edge_vertex(&self, i: usize) -> Option<Shape> {
        if self.kind() != ShapeKind::Edge {
            return None;
        }
        self.tshape
            .children
            .get(i)
            .map(|v| v.oriented(Orientation::Forward))
    }

    /// Vertex where traversal of this oriented edge starts.
    pub fn start_vertex(&self) -> Option<Shape> {
        match self.orientation {
            Orientation::Reversed => self.last_vertex(),
            _ => self.first_vertex(),
        }
    }

    /// Vertex where traversal of this oriented edge ends.
    pub fn end_vertex(&self) -> Option<Shape> {
        match self.orientation {
            Orientation::Reversed => self.first_vertex(),
            _ => self.last_vertex(),
        }
    }

    /// Point on an edge's curve at parameter `t`.
    pub fn point_at(&self, t: f64) -> Option<Point3> {
        self.curve().map(|(c, _, _)| c.evaluate(t))
    }

    /// Unit tangent of this oriented edge at parameter `t`, in traversal direction.
    pub fn direction_at(&self, t: f64) -> Option<Vec3> {
        let (c, _, _) = self.curve()?;
        let d = c.tangent(t);
        let len = d.norm();
        if len <= f64::EPSILON {
            return None;
        }
        Some(d / len * self.orientation.sign())
    }

    /// Outward normal of an oriented face, taken at the surface origin.
    pub fn face_normal(&self) -> Option<Vec3> {
        let s = self.surface()?;
        Some(s.normal(Point2::origin()).into_inner() * self.orientation.sign())
    }

    // =========================================================================
    // Transformation
    // =========================================================================

    /// Deep copy with every geometry transformed; sharing is preserved.
    pub fn transformed(&self, t: &Transform) -> Shape {
        let mut memo: HashMap<ShapeId, Arc<TShape>> = HashMap::new();
        Shape {
            tshape: transform_tshape(self, t, t.scale_factor(), &mut memo),
            orientation: self.orientation,
        }
    }
}

fn transform_tshape(
    shape: &Shape,
    t: &Transform,
    scale: f64,
    memo: &mut HashMap<ShapeId, Arc<TShape>>,
) -> Arc<TShape> {
    if let Some(done) = memo.get(&shape.id()) {
        return Arc::clone(done);
    }
    let src = &shape.tshape;
    let geometry = match &src.geometry {
        Geometry::None => Geometry::None,
        Geometry::Point(p) => Geometry::Point(t.apply_point(p)),
        Geometry::Curve { curve, first, last } => Geometry::Curve {
            curve: curve.transform(t),
            first: *first,
            last: *last,
        },
        Geometry::Surface(s) => Geometry::Surface(s.transform(t)),
    };
    let children = src
        .children
        .iter()
        .map(|c| Shape {
            tshape: transform_tshape(c, t, scale, memo),
            orientation: c.orientation,
        })
        .collect();
    let out = Arc::new(TShape {
        kind: src.kind,
        geometry,
        tolerance: src.tolerance * scale,
        children,
    });
    memo.insert(shape.id(), Arc::clone(&out));
    out
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other) && self.orientation == other.orientation
    }
}

impl Eq for Shape {}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Shape");
        s.field("kind", &self.kind())
            .field("id", &self.id().0)
            .field("orientation", &self.orientation);
        if let Some(p) = self.point() {
            s.field("point", &(p.x, p.y, p.z));
        }
        if !self.tshape.children.is_empty() {
            s.field("children", &self.tshape.children.len());
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(x: f64, y: f64, z: f64) -> Shape {
        Shape::vertex(Point3::new(x, y, z), 1e-7)
    }

    #[test]
    fn test_edge_vertices_follow_orientation() {
        let a = v(0.0, 0.0, 0.0);
        let b = v(2.0, 0.0, 0.0);
        let e = Shape::line(&a, &b);
        assert!(e.start_vertex().unwrap().is_same(&a));
        assert!(e.end_vertex().unwrap().is_same(&b));

        let r = e.reversed();
        assert!(r.is_same(&e));
        assert_ne!(r, e);
        assert!(r.start_vertex().unwrap().is_same(&b));
        assert_relative_eq!(r.direction_at(0.5).unwrap().x, -1.0);
    }

    #[test]
    fn test_children_compose_orientation() {
        let a = v(0.0, 0.0, 0.0);
        let b = v(1.0, 0.0, 0.0);
        let e = Shape::line(&a, &b);
        let w = Shape::wire(vec![e.reversed()]);
        let kids: Vec<Shape> = w.reversed().children().collect();
        assert_eq!(kids[0].orientation(), Orientation::Forward);
        assert_eq!(w.nb_children(), 1);
    }

    #[test]
    fn test_vertex_tolerance_floor() {
        let p = Shape::vertex(Point3::origin(), 0.0);
        assert_relative_eq!(p.tolerance(), Tolerance::CONFUSION);
        assert!(!p.is_empty());
        assert!(Shape::empty().is_empty());
    }

    #[test]
    fn test_transformed_preserves_sharing() {
        let a = v(0.0, 0.0, 0.0);
        let b = v(1.0, 0.0, 0.0);
        let e1 = Shape::line(&a, &b);
        let e2 = Shape::line(&b, &a);
        let c = Shape::compound(vec![e1, e2]);
        let moved = c.transformed(&Transform::translation(0.0, 0.0, 5.0));
        let edges: Vec<Shape> = moved.children().collect();
        let last_of_first = edges[0].last_vertex().unwrap();
        let first_of_second = edges[1].first_vertex().unwrap();
        assert!(last_of_first.is_same(&first_of_second));
        assert_relative_eq!(last_of_first.point().unwrap().z, 5.0);
        assert!(!moved.is_same(&c));
    }
}
