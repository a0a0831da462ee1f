//! Vertex/face, edge/face and face/face interferences.

use std::sync::Arc;

use bop_kernel_ds::{Coincidence, Interference, InterferenceKind, Param};
use bop_kernel_geom::Line3d;
use bop_kernel_intersect::{EdgeFaceHit, SectionSegment};
use bop_kernel_math::{combined_tolerance, Point3, Tolerance};
use bop_kernel_topo::{Shape, ShapeKind};
use tracing::debug;

use super::{map_pairs, Filling};
use crate::Result;

impl Filling<'_> {
    /// Record vertices lying strictly inside faces of other arguments.
    pub(super) fn perform_vf(&mut self) -> Result<()> {
        let pairs = self.candidate_pairs(ShapeKind::Vertex, ShapeKind::Face)?;
        let mut work = Vec::with_capacity(pairs.len());
        for &(v, f) in &pairs {
            let vertex = self.ds.same_domain_index(v);
            if !self.face_has_vertex(f, vertex)? {
                work.push((vertex, f));
            }
        }
        let ds = &self.ds;
        let provider = self.provider;
        let fuzzy = self.fuzzy;
        let hits = map_pairs(self.options.run_parallel, &work, |v, f| {
            let (vs, fs) = (ds.shape(v).ok()?, ds.shape(f).ok()?);
            let tol = combined_tolerance(vs.tolerance(), fs.tolerance(), fuzzy);
            Some(provider.vertex_in_face(vs, fs, tol))
        });

        let mut found = 0;
        for (&(v, f), hit) in work.iter().zip(hits) {
            match hit {
                Some(Err(err)) => self.warn_failed(v, f, &err),
                Some(Ok(Some((uv, dist)))) => {
                    let added = self.ds.add_interference(
                        Interference::new(
                            InterferenceKind::VertexFace,
                            f,
                            v,
                            Coincidence::Point,
                            dist.max(Tolerance::CONFUSION),
                        )
                        .with_param(Param::Uv(uv.x, uv.y))
                        .with_vertex(v),
                    )?;
                    if added {
                        self.face_vertex(f, v);
                        found += 1;
                    }
                }
                _ => {}
            }
        }
        debug!(pairs = work.len(), found, "vertex/face done");
        Ok(())
    }

    /// Intersect edges with faces of other arguments.
    pub(super) fn perform_ef(&mut self) -> Result<()> {
        let pairs = self.candidate_pairs(ShapeKind::Edge, ShapeKind::Face)?;
        let ds = &self.ds;
        let provider = self.provider;
        let fuzzy = self.fuzzy;
        let results = map_pairs(self.options.run_parallel, &pairs, |e, f| {
            let (es, fs) = (ds.shape(e).ok()?, ds.shape(f).ok()?);
            let tol = combined_tolerance(es.tolerance(), fs.tolerance(), fuzzy);
            Some(provider.intersect_edge_face(es, fs, tol))
        });

        let (mut points, mut overlaps) = (0, 0);
        for (&(e, f), result) in pairs.iter().zip(results) {
            let hits = match result {
                None => continue,
                Some(Err(err)) => {
                    self.warn_failed(e, f, &err);
                    continue;
                }
                Some(Ok(hits)) => hits,
            };
            for hit in hits {
                match hit {
                    EdgeFaceHit::Point {
                        t,
                        uv,
                        point,
                        distance,
                    } => {
                        let vertex = match self.pave_vertex_near(e, t) {
                            Some(v) => v,
                            None => match self.known_vertex_near(f, &point, distance)? {
                                Some(v) => v,
                                None => {
                                    let tol = self.tolerance(e).max(distance);
                                    self.new_vertex(point, tol)?
                                }
                            },
                        };
                        let vertex = self.put_pave(e, t, vertex)?;
                        self.ds.add_interference(
                            Interference::new(
                                InterferenceKind::EdgeFace,
                                e,
                                f,
                                Coincidence::Point,
                                distance.max(Tolerance::CONFUSION),
                            )
                            .with_params(Param::Point(t), Param::Uv(uv.x, uv.y))
                            .with_vertex(vertex),
                        )?;
                        self.face_vertex(f, vertex);
                        points += 1;
                    }
                    EdgeFaceHit::Overlap { range } => {
                        for t in [range.0, range.1] {
                            self.ensure_pave(e, t, f)?;
                        }
                        self.ds.add_interference(
                            Interference::new(
                                InterferenceKind::EdgeFace,
                                e,
                                f,
                                Coincidence::Overlap,
                                self.pair_tolerance(e, f),
                            )
                            .with_param(Param::Range(range.0, range.1)),
                        )?;
                        let list = self.face_edges_in.entry(f).or_default();
                        if !list.contains(&e) {
                            list.push(e);
                        }
                        overlaps += 1;
                    }
                }
            }
        }
        debug!(pairs = pairs.len(), points, overlaps, "edge/face done");
        Ok(())
    }

    /// Intersect faces of different arguments and build section edges.
    pub(super) fn perform_ff(&mut self) -> Result<()> {
        let pairs = self.candidate_pairs(ShapeKind::Face, ShapeKind::Face)?;
        let ds = &self.ds;
        let provider = self.provider;
        let fuzzy = self.fuzzy;
        let results = map_pairs(self.options.run_parallel, &pairs, |f1, f2| {
            let (s1, s2) = (ds.shape(f1).ok()?, ds.shape(f2).ok()?);
            let tol = combined_tolerance(s1.tolerance(), s2.tolerance(), fuzzy);
            Some(provider.intersect_faces(s1, s2, tol))
        });

        let (mut coplanar, mut sections) = (0, 0);
        for (&(f1, f2), result) in pairs.iter().zip(results) {
            let hit = match result {
                None => continue,
                Some(Err(err)) => {
                    self.warn_failed(f1, f2, &err);
                    continue;
                }
                Some(Ok(hit)) => hit,
            };
            if hit.coplanar {
                self.ds.add_interference(Interference::new(
                    InterferenceKind::FaceFace,
                    f1,
                    f2,
                    Coincidence::Coplanar,
                    self.pair_tolerance(f1, f2),
                ))?;
                coplanar += 1;
                continue;
            }
            let mut edges = Vec::new();
            let mut tolerance = self.pair_tolerance(f1, f2);
            for segment in &hit.sections {
                if let Some(edge) = self.section_edge(segment, f1, f2)? {
                    edges.push(edge);
                    tolerance = tolerance.max(segment.tolerance);
                }
            }
            if edges.is_empty() {
                continue;
            }
            sections += edges.len();
            for f in [f1, f2] {
                self.face_sections.entry(f).or_default().extend(&edges);
            }
            self.ds.add_interference(Interference::new(
                InterferenceKind::FaceFace,
                f1,
                f2,
                Coincidence::Sections(edges),
                tolerance,
            ))?;
        }
        debug!(pairs = pairs.len(), coplanar, sections, "face/face done");
        Ok(())
    }

    /// Build the section edge of one segment, or `None` when an edge of
    /// either face already spans it.
    fn section_edge(&mut self, segment: &SectionSegment, f1: usize, f2: usize) -> Result<Option<usize>> {
        let faces = [f1, f2];
        let va = self.vertex_for_point(&segment.start, segment.tolerance, &faces)?;
        let vb = self.vertex_for_point(&segment.end, segment.tolerance, &faces)?;
        let (va, vb) = (self.ds.same_domain_index(va), self.ds.same_domain_index(vb));
        if va == vb || self.edge_spans(va, vb, &faces)? {
            return Ok(None);
        }
        let (sa, sb) = (self.info(va)?.shape.clone(), self.info(vb)?.shape.clone());
        let (pa, pb) = (self.point_of(va)?, self.point_of(vb)?);
        let line = Line3d::from_points(pa, pb);
        let edge = Shape::edge(Arc::new(line), &sa, &sb, 0.0, 1.0, segment.tolerance);
        let index = self.append(&edge)?;
        Ok(Some(index))
    }

    /// True if some edge on one of `faces` carries both vertices.
    fn edge_spans(&self, va: usize, vb: usize, faces: &[usize]) -> Result<bool> {
        for &f in faces {
            for e in self.edges_on_face(f)? {
                if Self::edge_has_vertex(&self.ds, e, va) && Self::edge_has_vertex(&self.ds, e, vb) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// A vertex at `point`: an existing one near it on one of `faces`, or a
    /// new one put on every face edge passing through it.
    fn vertex_for_point(&mut self, point: &Point3, tol: f64, faces: &[usize]) -> Result<usize> {
        for &f in faces {
            if let Some(v) = self.known_vertex_near(f, point, tol)? {
                return Ok(v);
            }
        }
        let vertex = self.new_vertex(*point, tol)?;
        for &f in faces {
            for e in self.edges_on_face(f)? {
                self.put_on_edge(vertex, e)?;
            }
            self.face_vertex(f, vertex);
        }
        Ok(self.ds.same_domain_index(vertex))
    }

    /// Put a pave at `t` on `edge` unless one is there, reusing a vertex of
    /// `face` when possible.
    fn ensure_pave(&mut self, edge: usize, t: f64, face: usize) -> Result<()> {
        if self.pave_vertex_near(edge, t).is_some() {
            return Ok(());
        }
        let point = self.provider.evaluate(self.ds.shape(edge)?, t);
        let point = match point {
            Ok(p) => p,
            Err(err) => {
                self.warn_failed(edge, face, &err);
                return Ok(());
            }
        };
        let tol = self.tolerance(edge);
        let vertex = self.vertex_for_point(&point, tol, &[face])?;
        self.put_pave(edge, t, vertex)?;
        Ok(())
    }

    /// Put `vertex` on `edge` if it lies there.
    fn put_on_edge(&mut self, vertex: usize, edge: usize) -> Result<()> {
        if Self::edge_has_vertex(&self.ds, edge, vertex) {
            return Ok(());
        }
        let (vs, es) = (self.ds.shape(vertex)?, self.ds.shape(edge)?);
        let tol = combined_tolerance(vs.tolerance(), es.tolerance(), self.fuzzy);
        match self.provider.vertex_on_edge(vs, es, tol) {
            Ok(Some((t, _))) => {
                self.put_pave(edge, t, vertex)?;
            }
            Ok(None) => {}
            Err(err) => self.warn_failed(vertex, edge, &err),
        }
        Ok(())
    }

    /// Nearest vertex of `face` (boundary, paves of its edges, or known
    /// inner vertex) within tolerance of `point`.
    fn known_vertex_near(&self, face: usize, point: &Point3, tol: f64) -> Result<Option<usize>> {
        let mut candidates: Vec<usize> = Vec::new();
        for e in self.edges_on_face(face)? {
            candidates.extend(self.ds.paves(e).iter().map(|p| self.ds.same_domain_index(p.vertex)));
        }
        for v in self.ds.sub_shapes_of_kind(face, ShapeKind::Vertex)? {
            candidates.push(self.ds.same_domain_index(v));
        }
        for &v in self.face_vertices.get(&face).into_iter().flatten() {
            candidates.push(self.ds.same_domain_index(v));
        }
        let mut best: Option<(f64, usize)> = None;
        for v in candidates {
            let d = (self.point_of(v)? - point).norm();
            if d <= combined_tolerance(self.tolerance(v), tol, self.fuzzy)
                && best.map_or(true, |(bd, _)| d < bd)
            {
                best = Some((d, v));
            }
        }
        Ok(best.map(|(_, v)| v))
    }

    /// True if `vertex` bounds `face` or is a pave of one of its edges.
    fn face_has_vertex(&self, face: usize, vertex: usize) -> Result<bool> {
        for e in self.ds.sub_shapes_of_kind(face, ShapeKind::Edge)? {
            if Self::edge_has_vertex(&self.ds, e, vertex) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn face_vertex(&mut self, face: usize, vertex: usize) {
        let list = self.face_vertices.entry(face).or_default();
        if !list.contains(&vertex) {
            list.push(vertex);
        }
    }
}
