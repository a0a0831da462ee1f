//! Vertex/edge and edge/edge interferences.

use bop_kernel_ds::{Coincidence, Interference, InterferenceKind, Param};
use bop_kernel_intersect::{EdgeEdgeHit, IntersectError};
use bop_kernel_math::{combined_tolerance, Point3, Tolerance};
use bop_kernel_topo::ShapeKind;
use tracing::debug;

use super::{map_pairs, Filling};
use crate::Result;

type VertexHit = std::result::Result<Option<(usize, f64, f64)>, IntersectError>;

impl Filling<'_> {
    /// Put vertices lying on edges of other arguments onto those edges.
    pub(super) fn perform_ve(&mut self) -> Result<()> {
        let pairs = self.candidate_pairs(ShapeKind::Vertex, ShapeKind::Edge)?;
        let hits = self.vertex_edge_hits(&pairs);
        let mut placed = 0;
        for (&(v, e), hit) in pairs.iter().zip(hits) {
            match hit {
                None => {}
                Some(Err(err)) => self.warn_failed(v, e, &err),
                Some(Ok(None)) => {}
                Some(Ok(Some((vertex, t, dist)))) => {
                    self.record_vertex_on_edge(vertex, e, t, dist)?;
                    placed += 1;
                }
            }
        }
        debug!(pairs = pairs.len(), placed, "vertex/edge done");
        Ok(())
    }

    /// Provider answers for `(vertex, edge)` pairs; `None` where the vertex
    /// is already a pave of the edge.
    fn vertex_edge_hits(&self, pairs: &[(usize, usize)]) -> Vec<Option<VertexHit>> {
        let ds = &self.ds;
        let provider = self.provider;
        let fuzzy = self.fuzzy;
        map_pairs(self.options.run_parallel, pairs, |v, e| {
            let vertex = ds.same_domain_index(v);
            if Self::edge_has_vertex(ds, e, vertex) {
                return None;
            }
            let (vs, es) = (ds.shape(vertex).ok()?, ds.shape(e).ok()?);
            let tol = combined_tolerance(vs.tolerance(), es.tolerance(), fuzzy);
            Some(
                provider
                    .vertex_on_edge(vs, es, tol)
                    .map(|hit| hit.map(|(t, dist)| (vertex, t, dist))),
            )
        })
    }

    fn record_vertex_on_edge(&mut self, vertex: usize, edge: usize, t: f64, dist: f64) -> Result<()> {
        let vertex = self.put_pave(edge, t, vertex)?;
        self.ds.add_interference(
            Interference::new(
                InterferenceKind::VertexEdge,
                edge,
                vertex,
                Coincidence::Point,
                dist.max(Tolerance::CONFUSION),
            )
            .with_param(Param::Point(t))
            .with_vertex(vertex),
        )?;
        Ok(())
    }

    /// Intersect edges of different arguments.
    pub(super) fn perform_ee(&mut self) -> Result<()> {
        let pairs = self.candidate_pairs(ShapeKind::Edge, ShapeKind::Edge)?;
        let (points, overlaps) = self.intersect_edge_pairs(&pairs)?;
        debug!(pairs = pairs.len(), points, overlaps, "edge/edge done");
        Ok(())
    }

    /// Intersect `pairs` of edges and apply every solution.
    ///
    /// Returns the number of point and overlap solutions.
    fn intersect_edge_pairs(&mut self, pairs: &[(usize, usize)]) -> Result<(usize, usize)> {
        let ds = &self.ds;
        let provider = self.provider;
        let fuzzy = self.fuzzy;
        let results = map_pairs(self.options.run_parallel, pairs, |e1, e2| {
            let (s1, s2) = (ds.shape(e1).ok()?, ds.shape(e2).ok()?);
            let tol = combined_tolerance(s1.tolerance(), s2.tolerance(), fuzzy);
            Some(provider.intersect_edges(s1, s2, tol))
        });

        let (mut points, mut overlaps) = (0, 0);
        for (&(e1, e2), result) in pairs.iter().zip(results) {
            let hits = match result {
                None => continue,
                Some(Err(err)) => {
                    self.warn_failed(e1, e2, &err);
                    continue;
                }
                Some(Ok(hits)) => hits,
            };
            for hit in hits {
                match hit {
                    EdgeEdgeHit::Point {
                        t1,
                        t2,
                        point,
                        distance,
                    } => {
                        self.record_edge_edge_point(e1, e2, (t1, t2), point, distance)?;
                        points += 1;
                    }
                    EdgeEdgeHit::Overlap { range1, range2 } => {
                        self.ds.add_interference(
                            Interference::new(
                                InterferenceKind::EdgeEdge,
                                e1,
                                e2,
                                Coincidence::Overlap,
                                self.pair_tolerance(e1, e2),
                            )
                            .with_params(
                                Param::Range(range1.0, range1.1),
                                Param::Range(range2.0, range2.1),
                            ),
                        )?;
                        overlaps += 1;
                    }
                }
            }
        }
        Ok((points, overlaps))
    }

    /// Bind a crossing point of two edges to one vertex on both.
    ///
    /// A pave already sitting at the point on either edge is reused. When
    /// both edges already share the vertex there nothing is recorded.
    fn record_edge_edge_point(
        &mut self,
        e1: usize,
        e2: usize,
        (t1, t2): (f64, f64),
        point: Point3,
        distance: f64,
    ) -> Result<()> {
        let vertex = match (self.pave_vertex_near(e1, t1), self.pave_vertex_near(e2, t2)) {
            (Some(a), Some(b)) if a == b => return Ok(()),
            (Some(a), Some(b)) => {
                self.pending_merges.push((a, b));
                a
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => {
                let tol = self.tolerance(e1).max(self.tolerance(e2)) + 0.5 * distance;
                self.new_vertex(point, tol)?
            }
        };
        let vertex = self.put_pave(e1, t1, vertex)?;
        self.put_pave(e2, t2, vertex)?;
        self.ds.add_interference(
            Interference::new(
                InterferenceKind::EdgeEdge,
                e1,
                e2,
                Coincidence::Point,
                distance.max(Tolerance::CONFUSION),
            )
            .with_params(Param::Point(t1), Param::Point(t2))
            .with_vertex(vertex),
        )?;
        Ok(())
    }

    /// Intersect every section edge with the other edges and the inner
    /// vertices of the faces it was built on.
    pub(super) fn perform_same_face_edges(&mut self) -> Result<()> {
        let mut edge_pairs: Vec<(usize, usize)> = Vec::new();
        let mut vertex_pairs: Vec<(usize, usize)> = Vec::new();
        let mut faces: Vec<usize> = self.face_sections.keys().copied().collect();
        faces.sort_unstable();
        for face in faces {
            let sections = self.face_sections.get(&face).cloned().unwrap_or_default();
            let others = self.edges_on_face(face)?;
            for &s in &sections {
                for &o in &others {
                    let pair = (s.min(o), s.max(o));
                    if s != o
                        && !edge_pairs.contains(&pair)
                        && !self.ds.has_interference(s, o)
                        && self.info(s)?.bbox.overlaps(&self.info(o)?.bbox)
                    {
                        edge_pairs.push(pair);
                    }
                }
                for &v in self.face_vertices.get(&face).into_iter().flatten() {
                    let pair = (self.ds.same_domain_index(v), s);
                    if !vertex_pairs.contains(&pair) {
                        vertex_pairs.push(pair);
                    }
                }
            }
        }

        let hits = self.vertex_edge_hits(&vertex_pairs);
        for (&(v, e), hit) in vertex_pairs.iter().zip(hits) {
            match hit {
                Some(Err(err)) => self.warn_failed(v, e, &err),
                Some(Ok(Some((vertex, t, dist)))) => self.record_vertex_on_edge(vertex, e, t, dist)?,
                _ => {}
            }
        }
        let (points, overlaps) = self.intersect_edge_pairs(&edge_pairs)?;
        debug!(
            pairs = edge_pairs.len(),
            points, overlaps, "same-face edges done"
        );
        Ok(())
    }

    /// Boundary edges, edges lying in, and section edges of `face`.
    pub(super) fn edges_on_face(&self, face: usize) -> Result<Vec<usize>> {
        let mut edges = self.ds.sub_shapes_of_kind(face, ShapeKind::Edge)?;
        for list in [self.face_edges_in.get(&face), self.face_sections.get(&face)]
            .into_iter()
            .flatten()
        {
            for &e in list {
                if !edges.contains(&e) {
                    edges.push(e);
                }
            }
        }
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bop_kernel_ds::IntersectionDs;
    use bop_kernel_intersect::LinearProvider;
    use bop_kernel_topo::Shape;

    use super::*;
    use crate::{BopOptions, PaveFiller};

    fn segment(a: [f64; 3], b: [f64; 3]) -> Shape {
        let va = Shape::vertex(Point3::new(a[0], a[1], a[2]), Tolerance::CONFUSION);
        let vb = Shape::vertex(Point3::new(b[0], b[1], b[2]), Tolerance::CONFUSION);
        Shape::line(&va, &vb)
    }

    fn fill(args: &[Shape]) -> IntersectionDs {
        let mut filler = PaveFiller::new(Arc::new(LinearProvider::new()), BopOptions::default());
        filler.perform(args).unwrap()
    }

    #[test]
    fn test_crossing_edges_share_new_vertex() {
        let a = segment([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let b = segment([1.0, -1.0, 0.0], [1.0, 1.0, 0.0]);
        let ds = fill(&[a, b]);
        let rec = ds.interferences(InterferenceKind::EdgeEdge).next().unwrap();
        let v = rec.vertex.unwrap();
        assert!(ds.is_new_shape(v));
        // edge of each argument has its own index after its vertices
        let (e1, e2) = (2, 5);
        assert_eq!(ds.paves(e1).len(), 3);
        assert_eq!(ds.paves(e2).len(), 3);
        assert_eq!(ds.paves(e1)[1].vertex, ds.paves(e2)[1].vertex);
        assert_eq!(ds.pave_blocks(e1).len(), 2);
    }

    #[test]
    fn test_vertex_on_edge_interior() {
        let a = segment([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let b = segment([1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let ds = fill(&[a, b]);
        assert_eq!(ds.interferences(InterferenceKind::VertexEdge).count(), 1);
        let paves = ds.paves(2);
        assert_eq!(paves.len(), 3);
        assert!((paves[1].parameter - 0.5).abs() < 1e-9);
        assert_eq!(paves[1].vertex, 3);
        // the touching point is a pave of both, so no edge/edge point is added
        assert_eq!(
            ds.interferences(InterferenceKind::EdgeEdge)
                .filter(|r| r.coincidence == Coincidence::Point)
                .count(),
            0
        );
    }

    #[test]
    fn test_collinear_overlap_forms_common_block() {
        let a = segment([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let b = segment([1.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
        let ds = fill(&[a, b]);
        assert_eq!(ds.interferences(InterferenceKind::VertexEdge).count(), 2);
        assert!(ds
            .interferences(InterferenceKind::EdgeEdge)
            .any(|r| r.coincidence == Coincidence::Overlap));
        assert_eq!(ds.common_blocks().len(), 1);
        assert_eq!(ds.common_blocks()[0].pave_blocks.len(), 2);
    }
}
