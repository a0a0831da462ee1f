//! Two-dimensional area builder and the face splitting stage.

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::sync::Arc;

use bop_kernel_geom::Surface;
use bop_kernel_intersect::{GeometryProvider, State};
use bop_kernel_math::{Point2, Point3, Vec2};
use bop_kernel_topo::{Orientation, Shape, ShapeId, ShapeKind};
use tracing::debug;

use super::area::{dangling_parts, is_boundary, AreaBuilder};
use super::{map_items, Builder};
use crate::{BopError, BopWarning, Result};

/// Angles below this count as a full turn.
const ANGLE_EPS: f64 = 1e-9;

/// Rebuilds faces on one surface from a soup of oriented split edges.
///
/// Boundary edges are given once with the orientation they have in the
/// face; edges lying inside are given in both orientations. Loops are
/// walked by always turning to the edge with the smallest clockwise angle
/// from the incoming one, so each loop bounds a minimal region.
pub struct BuilderFace<'a> {
    provider: &'a dyn GeometryProvider,
    face: usize,
    surface: Arc<dyn Surface>,
    tolerance: f64,
    edges: Vec<Shape>,
    vertices: Vec<Shape>,
    avoid_internal: bool,
    avoided: Vec<usize>,
    loops: Vec<Vec<usize>>,
    degenerate: Vec<usize>,
    areas: Vec<Shape>,
    warnings: Vec<BopWarning>,
}

impl<'a> BuilderFace<'a> {
    /// A builder for the face at index `face`, lying on `surface`.
    pub fn new(
        provider: &'a dyn GeometryProvider,
        face: usize,
        surface: Arc<dyn Surface>,
        tolerance: f64,
    ) -> Self {
        Self {
            provider,
            face,
            surface,
            tolerance,
            edges: Vec::new(),
            vertices: Vec::new(),
            avoid_internal: false,
            avoided: Vec::new(),
            loops: Vec::new(),
            degenerate: Vec::new(),
            areas: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Oriented edges to build from.
    pub fn set_edges(&mut self, edges: Vec<Shape>) {
        self.edges = edges;
    }

    /// Isolated vertices to place inside the new faces.
    pub fn set_vertices(&mut self, vertices: Vec<Shape>) {
        self.vertices = vertices;
    }

    /// Drop dangling edges and isolated vertices instead of keeping them `Internal`.
    pub fn set_avoid_internal_shapes(&mut self, avoid: bool) {
        self.avoid_internal = avoid;
    }

    /// Warnings of the last run.
    pub fn warnings(&self) -> &[BopWarning] {
        &self.warnings
    }

    fn uv(&self, p: &Point3) -> Point2 {
        self.surface.project(p)
    }

    /// Traversal direction of `edge` at `t`, mapped to the surface.
    fn uv_direction(&self, edge: &Shape, t: f64) -> Option<Vec2> {
        let p = edge.point_at(t)?;
        let d = edge.direction_at(t)?;
        let v = self.uv(&(p + d)) - self.uv(&p);
        (v.norm() > f64::EPSILON).then_some(v)
    }

    /// Next edge after `current` among `candidates` leaving its end vertex.
    fn next_edge(&self, current: usize, candidates: &[usize]) -> Option<usize> {
        let edge = &self.edges[current];
        let (_, t_end) = traversal_range(edge)?;
        let back = -self.uv_direction(edge, t_end)?;
        let base = back.y.atan2(back.x);
        candidates
            .iter()
            .filter_map(|&c| {
                let (t_start, _) = traversal_range(&self.edges[c])?;
                let out = self.uv_direction(&self.edges[c], t_start)?;
                let mut angle = (base - out.y.atan2(out.x)).rem_euclid(TAU);
                if angle < ANGLE_EPS {
                    angle = TAU;
                }
                Some((angle, c))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }

    /// Signed uv area of a closed loop; positive when counter-clockwise.
    fn loop_area(&self, chain: &[usize]) -> f64 {
        let pts: Vec<Point2> = chain
            .iter()
            .filter_map(|&i| self.edges[i].start_vertex()?.point())
            .map(|p| self.uv(&p))
            .collect();
        let n = pts.len();
        (0..n)
            .map(|i| {
                let (a, b) = (pts[i], pts[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            * 0.5
    }

    /// Vertices and edge midpoints of a loop, used to place it.
    fn probe_points(&self, chain: &[usize]) -> Vec<Point3> {
        let mut points = Vec::with_capacity(2 * chain.len());
        for &i in chain {
            let e = &self.edges[i];
            points.extend(e.start_vertex().and_then(|v| v.point()));
            points.extend(traversal_range(e).and_then(|(a, b)| e.point_at(0.5 * (a + b))));
        }
        points
    }

    fn state_in(&self, point: &Point3, face: &Shape) -> State {
        self.provider
            .classify_point_in_face(point, face, self.tolerance)
            .unwrap_or(State::Unknown)
    }

    fn new_face(&self, wires: Vec<Shape>) -> Shape {
        Shape::face(self.surface.clone(), wires, self.tolerance)
    }
}

impl AreaBuilder for BuilderFace<'_> {
    fn perform_shapes_to_avoid(&mut self) -> Result<()> {
        self.avoided = dangling_parts(&self.edges, ShapeKind::Vertex);
        Ok(())
    }

    fn perform_loops(&mut self) -> Result<()> {
        let n = self.edges.len();
        let mut used = vec![false; n];
        for &i in &self.avoided {
            used[i] = true;
        }
        let mut outgoing: HashMap<ShapeId, Vec<usize>> = HashMap::new();
        for (i, e) in self.edges.iter().enumerate() {
            if !used[i] {
                if let Some(v) = e.start_vertex() {
                    outgoing.entry(v.id()).or_default().push(i);
                }
            }
        }

        let not_closed = BopError::WireNotClosed { face: self.face };
        self.loops.clear();
        for start in 0..n {
            if used[start] {
                continue;
            }
            used[start] = true;
            let mut chain = vec![start];
            let mut current = start;
            loop {
                let end = self.edges[current]
                    .end_vertex()
                    .ok_or_else(|| not_closed.clone())?;
                let candidates = outgoing.get(&end.id()).map_or(&[][..], Vec::as_slice);
                let next = self
                    .next_edge(current, candidates)
                    .ok_or_else(|| not_closed.clone())?;
                if next == start {
                    break;
                }
                if used[next] {
                    return Err(not_closed);
                }
                used[next] = true;
                chain.push(next);
                current = next;
            }
            self.loops.push(chain);
        }
        Ok(())
    }

    fn perform_areas(&mut self) -> Result<()> {
        struct Outer {
            chain: Vec<usize>,
            area: f64,
            probe: Shape,
            holes: Vec<Shape>,
        }

        let mut outers: Vec<Outer> = Vec::new();
        let mut holes: Vec<Vec<usize>> = Vec::new();
        self.degenerate.clear();
        let min_area = self.tolerance * self.tolerance;
        for chain in &self.loops {
            let area = self.loop_area(chain);
            if area.abs() <= min_area {
                self.degenerate.extend(chain.iter().copied());
            } else if area > 0.0 {
                let wire = Shape::wire(chain.iter().map(|&i| self.edges[i].clone()).collect());
                outers.push(Outer {
                    chain: chain.clone(),
                    area,
                    probe: self.new_face(vec![wire]),
                    holes: Vec::new(),
                });
            } else {
                holes.push(chain.clone());
            }
        }

        for hole in holes {
            let points = self.probe_points(&hole);
            let container = outers
                .iter()
                .enumerate()
                .filter(|(_, o)| {
                    let states: Vec<State> = points.iter().map(|p| self.state_in(p, &o.probe)).collect();
                    states.contains(&State::In) && !states.contains(&State::Out)
                })
                .min_by(|a, b| a.1.area.total_cmp(&b.1.area))
                .map(|(i, _)| i);
            match container {
                Some(i) => {
                    let wire = Shape::wire(hole.iter().map(|&e| self.edges[e].clone()).collect());
                    outers[i].holes.push(wire);
                }
                None => {
                    debug!(face = self.face, "hole loop fits in no outer loop");
                    self.warnings
                        .push(BopWarning::UnclassifiedHole { shape: self.face });
                }
            }
        }

        self.areas = outers
            .into_iter()
            .map(|o| {
                let mut wires = vec![Shape::wire(
                    o.chain.iter().map(|&i| self.edges[i].clone()).collect(),
                )];
                wires.extend(o.holes);
                self.new_face(wires)
            })
            .collect();
        Ok(())
    }

    fn perform_internal_shapes(&mut self) -> Result<()> {
        if self.avoid_internal || self.areas.is_empty() {
            return Ok(());
        }
        let mut seen = HashSet::new();
        let internal_edges: Vec<Shape> = self
            .avoided
            .iter()
            .chain(&self.degenerate)
            .map(|&i| &self.edges[i])
            .filter(|e| seen.insert(e.id()))
            .map(|e| e.oriented(Orientation::Forward))
            .collect();
        let used: HashSet<ShapeId> = self
            .areas
            .iter()
            .flat_map(|a| a.sub_shapes(ShapeKind::Vertex))
            .chain(internal_edges.iter().flat_map(|e| e.sub_shapes(ShapeKind::Vertex)))
            .map(|v| v.id())
            .collect();
        let free_vertices: Vec<&Shape> = self
            .vertices
            .iter()
            .filter(|v| !used.contains(&v.id()))
            .collect();
        if internal_edges.is_empty() && free_vertices.is_empty() {
            return Ok(());
        }

        let mut extras: Vec<Vec<Shape>> = vec![Vec::new(); self.areas.len()];
        for edge in internal_edges {
            let mid = traversal_range(&edge).and_then(|(a, b)| edge.point_at(0.5 * (a + b)));
            let Some(mid) = mid else { continue };
            if let Some(i) = self.areas.iter().position(|a| self.state_in(&mid, a) == State::In) {
                extras[i].push(Shape::wire(vec![edge]).oriented(Orientation::Internal));
            }
        }
        for vertex in free_vertices {
            let Some(p) = vertex.point() else { continue };
            if let Some(i) = self.areas.iter().position(|a| self.state_in(&p, a) == State::In) {
                extras[i].push(vertex.oriented(Orientation::Internal));
            }
        }
        for (i, extra) in extras.into_iter().enumerate() {
            if !extra.is_empty() {
                let mut children: Vec<Shape> = self.areas[i].children().collect();
                children.extend(extra);
                self.areas[i] = self.new_face(children);
            }
        }
        Ok(())
    }

    fn areas(&self) -> &[Shape] {
        &self.areas
    }
}

/// Parameters where traversal of an oriented edge starts and ends.
fn traversal_range(edge: &Shape) -> Option<(f64, f64)> {
    let (_, first, last) = edge.curve()?;
    Some(if edge.orientation() == Orientation::Reversed {
        (last, first)
    } else {
        (first, last)
    })
}

type FaceImages = (Vec<Shape>, Vec<BopWarning>);

impl Builder<'_> {
    /// Split every face with the images of its edges and the edges and
    /// vertices found inside it.
    pub(super) fn split_faces(&mut self) -> Result<()> {
        let faces: Vec<usize> = self.ds.indices_of_kind(ShapeKind::Face).collect();
        let built = map_items(self.options.run_parallel, &faces, |&f| self.build_face(f));
        let mut changed = 0;
        for (&f, result) in faces.iter().zip(built) {
            let (images, warnings) = result?;
            for w in warnings {
                self.report.warn(w);
            }
            if !(images.len() == 1 && images[0].is_same(self.ds.shape(f)?)) {
                changed += 1;
            }
            for image in &images {
                self.images.add_origin(image, f);
            }
            self.images.faces.insert(f, images);
        }
        debug!(faces = faces.len(), changed, "faces split");
        Ok(())
    }

    fn build_face(&self, f: usize) -> Result<FaceImages> {
        let ds = self.ds;
        let face = ds.shape(f)?;
        let mut edges: Vec<Shape> = Vec::new();
        let mut inner: Vec<Shape> = Vec::new();
        let mut vertices: Vec<Shape> = Vec::new();
        let mut unchanged = true;

        for child in face.children() {
            if child.kind() == ShapeKind::Vertex {
                let v = ds.index_of(&child).map(|i| ds.same_domain_index(i));
                vertices.push(match v {
                    Some(v) => ds.shape(v)?.clone(),
                    None => child.oriented(Orientation::Forward),
                });
                unchanged = false;
                continue;
            }
            for occ in child.children() {
                let images = match ds.index_of(&occ).and_then(|e| self.images.edges.get(&e)) {
                    Some(images) => images.clone(),
                    None => vec![occ.oriented(Orientation::Forward)],
                };
                if !(images.len() == 1 && images[0].is_same(&occ)) {
                    unchanged = false;
                }
                match occ.orientation() {
                    Orientation::Forward => edges.extend(images),
                    Orientation::Reversed => edges.extend(images.iter().rev().map(Shape::reversed)),
                    _ => inner.extend(images),
                }
            }
        }

        let mut present: HashSet<ShapeId> = edges.iter().map(Shape::id).collect();
        let mut extra = 0;
        if let Some(info) = ds.face_info(f) {
            for &pb in info.blocks_in.iter().chain(&info.blocks_sc) {
                if let Some(split) = self.images.blocks.get(&ds.real_pave_block(pb)) {
                    inner.push(split.oriented(Orientation::Forward));
                }
            }
            for &v in &info.vertices_in {
                vertices.push(ds.shape(ds.same_domain_index(v))?.clone());
            }
        }
        for e in inner {
            if present.insert(e.id()) {
                edges.push(e.reversed());
                edges.push(e);
                extra += 1;
            }
        }
        let mut seen = HashSet::new();
        vertices.retain(|v| seen.insert(v.id()));

        if unchanged && extra == 0 && vertices.is_empty() {
            return Ok((vec![face.clone()], Vec::new()));
        }
        let surface = face
            .surface()
            .ok_or_else(|| BopError::InvalidArguments(format!("face {f} has no surface")))?
            .clone();
        let mut builder = BuilderFace::new(self.provider, f, surface, face.tolerance());
        builder.set_edges(edges);
        builder.set_vertices(vertices);
        builder.set_avoid_internal_shapes(self.options.avoid_internal_shapes);
        builder.perform()?;
        Ok((builder.areas().to_vec(), builder.warnings().to_vec()))
    }

    /// Replace coincident split faces of different faces by one shared face.
    ///
    /// Two images coincide when they are bounded by the same split edges.
    /// The shared face takes the geometry of the first member and is
    /// reversed for members whose normal points the other way.
    pub(super) fn merge_same_domain_faces(&mut self) -> Result<()> {
        let mut groups: HashMap<Vec<ShapeId>, Vec<(usize, usize)>> = HashMap::new();
        let mut faces: Vec<usize> = self.images.faces.keys().copied().collect();
        faces.sort_unstable();
        for &f in &faces {
            for (k, image) in self.images.faces[&f].iter().enumerate() {
                let mut key: Vec<ShapeId> = image
                    .explore(ShapeKind::Edge)
                    .iter()
                    .filter(|e| is_boundary(e))
                    .map(Shape::id)
                    .collect();
                key.sort_unstable();
                key.dedup();
                if !key.is_empty() {
                    groups.entry(key).or_default().push((f, k));
                }
            }
        }
        let mut groups: Vec<Vec<(usize, usize)>> = groups
            .into_values()
            .filter(|members| members.iter().any(|m| m.0 != members[0].0))
            .collect();
        groups.sort_unstable();

        for members in &groups {
            let (f0, k0) = members[0];
            let first = self.images.faces[&f0][k0].oriented(Orientation::Forward);
            let Some(surface) = first.surface().cloned() else { continue };
            let tolerance = members
                .iter()
                .map(|&(f, k)| self.images.faces[&f][k].tolerance())
                .fold(0.0, f64::max);
            let shared = Shape::face(surface, first.children().collect(), tolerance);
            let reference = shared.face_normal();
            for &(f, k) in members {
                let image = &self.images.faces[&f][k];
                let opposite = match (image.face_normal(), reference) {
                    (Some(n), Some(r)) => n.dot(&r) < 0.0,
                    _ => false,
                };
                let replacement = if opposite { shared.reversed() } else { shared.clone() };
                self.images.add_origin(&replacement, f);
                if let Some(list) = self.images.faces.get_mut(&f) {
                    list[k] = replacement;
                }
            }
        }
        debug!(groups = groups.len(), "same-domain faces merged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bop_kernel_intersect::LinearProvider;
    use bop_kernel_math::Tolerance;
    use bop_kernel_topo::{face_area, make_polygon_face};

    use super::*;

    fn square_edges() -> (Vec<Shape>, Vec<Shape>) {
        let p = |x: f64, y: f64| Shape::vertex(Point3::new(x, y, 0.0), Tolerance::CONFUSION);
        let v = vec![p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0)];
        let edges = (0..4).map(|i| Shape::line(&v[i], &v[(i + 1) % 4])).collect();
        (v, edges)
    }

    fn xy_plane() -> Arc<dyn Surface> {
        let face = make_polygon_face(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        face.surface().unwrap().clone()
    }

    fn run(edges: Vec<Shape>, vertices: Vec<Shape>) -> Vec<Shape> {
        let provider = LinearProvider::new();
        let mut builder = BuilderFace::new(&provider, 0, xy_plane(), Tolerance::CONFUSION);
        builder.set_edges(edges);
        builder.set_vertices(vertices);
        builder.perform().unwrap();
        builder.areas().to_vec()
    }

    #[test]
    fn test_diagonal_splits_square_in_two() {
        let (v, mut edges) = square_edges();
        let diagonal = Shape::line(&v[0], &v[2]);
        edges.push(diagonal.clone());
        edges.push(diagonal.reversed());
        let areas = run(edges, Vec::new());
        assert_eq!(areas.len(), 2);
        for a in &areas {
            assert!((face_area(a) - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_inner_loop_becomes_hole() {
        let (_, mut edges) = square_edges();
        let p = |x: f64, y: f64| Shape::vertex(Point3::new(x, y, 0.0), Tolerance::CONFUSION);
        let h = [p(0.5, 0.5), p(0.5, 1.5), p(1.5, 1.5), p(1.5, 0.5)];
        // clockwise, so it reads as a hole
        for i in 0..4 {
            edges.push(Shape::line(&h[i], &h[(i + 1) % 4]));
        }
        let areas = run(edges, Vec::new());
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].nb_children(), 2);
        assert!((face_area(&areas[0]) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_dangling_edge_and_vertex_kept_internal() {
        let (v, mut edges) = square_edges();
        let inside = Shape::vertex(Point3::new(1.0, 1.0, 0.0), Tolerance::CONFUSION);
        let spike = Shape::line(&v[0], &inside);
        edges.push(spike.clone());
        edges.push(spike.reversed());
        let lone = Shape::vertex(Point3::new(1.5, 0.5, 0.0), Tolerance::CONFUSION);
        let areas = run(edges, vec![lone.clone()]);
        assert_eq!(areas.len(), 1);
        let children: Vec<Shape> = areas[0].children().collect();
        assert!(children
            .iter()
            .any(|c| c.kind() == ShapeKind::Wire && c.orientation() == Orientation::Internal));
        assert!(children
            .iter()
            .any(|c| c.is_same(&lone) && c.orientation() == Orientation::Internal));
        assert!((face_area(&areas[0]) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_boundary_is_an_error() {
        let (_, mut edges) = square_edges();
        edges.pop();
        let provider = LinearProvider::new();
        let mut builder = BuilderFace::new(&provider, 7, xy_plane(), Tolerance::CONFUSION);
        // loops only, so the open chain is not set aside as dangling
        builder.set_edges(edges);
        assert!(matches!(
            builder.perform_loops(),
            Err(BopError::WireNotClosed { face: 7 })
        ));
    }
}
