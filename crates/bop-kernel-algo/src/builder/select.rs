//! Piece selection per operation and assembly of the result.

use std::collections::{BTreeMap, HashMap, HashSet};

use bop_kernel_ds::UnionFind;
use bop_kernel_intersect::State;
use bop_kernel_topo::{Orientation, Shape, ShapeId, ShapeKind};
use tracing::debug;

use super::area::{is_boundary, AreaBuilder};
use super::classify::Piece;
use super::{BooleanOp, Builder, BuilderSolid};
use crate::Result;

impl Builder<'_> {
    /// Keep the pieces that belong to the result of `operation`.
    pub(super) fn select(&mut self, pieces: Vec<Piece>, operation: Option<BooleanOp>) -> Vec<Piece> {
        let objects: Vec<usize> = (0..self.nb_objects).collect();
        let tools: Vec<usize> = (self.nb_objects..self.ds.arguments().len()).collect();
        let total = pieces.len();
        let mut selected = Vec::with_capacity(total);
        for piece in pieces {
            let keep = match operation {
                None | Some(BooleanOp::Fuse) => true,
                Some(BooleanOp::Common) => {
                    self.inside_any(&piece, &objects) && self.inside_any(&piece, &tools)
                }
                Some(BooleanOp::Cut) => {
                    self.inside_any(&piece, &objects) && !self.inside_any(&piece, &tools)
                }
                Some(BooleanOp::CutReverse) => {
                    self.inside_any(&piece, &tools) && !self.inside_any(&piece, &objects)
                }
                Some(BooleanOp::Section) => false,
            };
            if keep {
                selected.push(piece);
            }
        }
        debug!(total, selected = selected.len(), "pieces selected");
        selected
    }

    fn inside_any(&mut self, piece: &Piece, ranks: &[usize]) -> bool {
        ranks.iter().any(|&r| self.classify(piece, r) == State::In)
    }

    /// Glue selected pieces into the result compound.
    ///
    /// The general fuse returns every piece as is. Otherwise solids sharing
    /// faces are rebuilt as one solid without the shared faces, and lower
    /// dimensional pieces not already part of a result solid are added.
    pub(super) fn assemble(
        &mut self,
        pieces: Vec<Piece>,
        operation: Option<BooleanOp>,
    ) -> Result<Shape> {
        if operation.is_none() {
            return Ok(Shape::compound(pieces.into_iter().map(|p| p.shape).collect()));
        }
        let (solids, others): (Vec<Piece>, Vec<Piece>) = pieces
            .into_iter()
            .partition(|p| p.shape.kind() == ShapeKind::Solid);

        let mut uf = UnionFind::new(solids.len());
        let mut owner: HashMap<ShapeId, usize> = HashMap::new();
        for (i, piece) in solids.iter().enumerate() {
            for face in piece.shape.explore(ShapeKind::Face) {
                if is_boundary(&face) {
                    let first = *owner.entry(face.id()).or_insert(i);
                    uf.union(first, i);
                }
            }
        }
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..solids.len() {
            groups.entry(uf.find(i)).or_default().push(i);
        }

        let mut parts: Vec<Shape> = Vec::new();
        for members in groups.values() {
            if let [single] = members.as_slice() {
                parts.push(solids[*single].shape.clone());
                continue;
            }
            let shapes: Vec<Shape> = members.iter().map(|&i| solids[i].shape.clone()).collect();
            let glued = self.glue_solids(&shapes, operation)?;
            for s in &shapes {
                self.merged.insert(s.id(), glued.clone());
            }
            parts.extend(glued);
        }

        let mut in_solids: HashSet<ShapeId> = HashSet::new();
        for part in &parts {
            for kind in [ShapeKind::Face, ShapeKind::Edge, ShapeKind::Vertex] {
                in_solids.extend(part.sub_shapes(kind).iter().map(Shape::id));
            }
        }
        for piece in others {
            let kind = match piece.shape.kind() {
                ShapeKind::Wire => ShapeKind::Edge,
                kind => kind,
            };
            let covered = piece
                .shape
                .sub_shapes(kind)
                .iter()
                .all(|s| in_solids.contains(&s.id()));
            if !covered {
                parts.push(piece.shape);
            }
        }
        Ok(Shape::compound(parts))
    }

    /// One solid (or more when they do not touch) from solids sharing faces.
    fn glue_solids(&mut self, solids: &[Shape], operation: Option<BooleanOp>) -> Result<Vec<Shape>> {
        let mut order: Vec<Shape> = Vec::new();
        let mut count: HashMap<ShapeId, usize> = HashMap::new();
        let mut internal: Vec<Shape> = Vec::new();
        for face in solids.iter().flat_map(|s| s.explore(ShapeKind::Face)) {
            if !is_boundary(&face) {
                internal.push(face);
                continue;
            }
            let c = count.entry(face.id()).or_default();
            if *c == 0 {
                order.push(face);
            }
            *c += 1;
        }
        let avoid = self.options.avoid_internal_shapes;
        let keep_shared = operation == Some(BooleanOp::Fuse) && !avoid;
        let mut boundary = Vec::new();
        for face in order {
            if count[&face.id()] == 1 {
                boundary.push(face);
            } else if keep_shared && self.joins_objects_and_tools(&face) {
                internal.push(face.oriented(Orientation::Forward));
            }
        }
        if avoid {
            internal.clear();
        }

        let index = solids
            .first()
            .and_then(|s| self.images.origins(s).first().copied())
            .unwrap_or_default();
        let mut builder = BuilderSolid::new(self.provider, index, self.classification_tolerance());
        builder.set_faces(boundary);
        builder.set_internal_faces(internal);
        builder.set_avoid_internal_shapes(avoid);
        builder.perform()?;
        for w in builder.warnings() {
            self.report.warn(w.clone());
        }
        Ok(builder.areas().to_vec())
    }

    /// True for a face shared by an object face and a tool face.
    fn joins_objects_and_tools(&self, face: &Shape) -> bool {
        let ranks: Vec<usize> = self
            .images
            .origins(face)
            .iter()
            .filter_map(|&o| self.ds.rank(o))
            .collect();
        ranks.iter().any(|&r| self.is_object(r)) && ranks.iter().any(|&r| !self.is_object(r))
    }

    /// Section edges and intersection vertices between the arguments.
    pub(super) fn build_section(&mut self) -> Result<Shape> {
        let ds = self.ds;
        let mut section = Section::default();

        for e in ds.indices_of_kind(ShapeKind::Edge) {
            if ds.is_new_shape(e) {
                for split in self.images.edges.get(&e).into_iter().flatten() {
                    section.add(split);
                }
            }
        }
        for f in ds.indices_of_kind(ShapeKind::Face) {
            for &pb in ds.face_info(f).map_or(&[][..], |info| info.blocks_in.as_slice()) {
                if let Some(split) = self.images.blocks.get(&ds.real_pave_block(pb)) {
                    section.add(split);
                }
            }
        }
        for cb in ds.common_blocks() {
            let ranks: HashSet<usize> = cb
                .pave_blocks
                .iter()
                .filter_map(|&pb| ds.pave_block(pb))
                .filter_map(|b| ds.rank(b.edge))
                .collect();
            if ranks.len() < 2 {
                continue;
            }
            if let Some(&first) = cb.pave_blocks.first() {
                if let Some(split) = self.images.blocks.get(&ds.real_pave_block(first)) {
                    section.add(split);
                }
            }
        }

        let mut vertices: Vec<usize> = Vec::new();
        for rec in ds.all_interferences().iter().filter(|r| !r.superseded) {
            let (a, b) = rec.indices;
            for i in [Some(a), Some(b), rec.vertex].into_iter().flatten() {
                if ds.kind(i)? == ShapeKind::Vertex {
                    let v = ds.same_domain_index(i);
                    if !vertices.contains(&v) {
                        vertices.push(v);
                    }
                }
            }
        }
        let on_edges: HashSet<ShapeId> = section
            .parts
            .iter()
            .flat_map(|e| e.sub_shapes(ShapeKind::Vertex))
            .map(|v| v.id())
            .collect();
        for v in vertices {
            let vertex = ds.shape(v)?;
            if !on_edges.contains(&vertex.id()) {
                section.add(vertex);
            }
        }
        debug!(parts = section.parts.len(), "section built");
        Ok(Shape::compound(section.parts))
    }
}

/// Distinct parts of a section result.
#[derive(Default)]
struct Section {
    parts: Vec<Shape>,
    seen: HashSet<ShapeId>,
}

impl Section {
    fn add(&mut self, shape: &Shape) {
        if self.seen.insert(shape.id()) {
            self.parts.push(shape.oriented(Orientation::Forward));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use bop_kernel_intersect::LinearProvider;
    use bop_kernel_math::Point3;
    use bop_kernel_topo::{make_box, volume};

    use super::*;
    use crate::{BopOptions, BuildOutput, PaveFiller};

    fn build(args: &[Shape], op: BooleanOp, options: BopOptions) -> BuildOutput {
        let provider = LinearProvider::new();
        let ds = PaveFiller::new(Arc::new(LinearProvider::new()), options.clone())
            .perform(args)
            .unwrap();
        Builder::new(&ds, &provider, &options)
            .with_objects(1)
            .perform(Some(op))
            .unwrap()
    }

    fn touching() -> [Shape; 2] {
        [
            make_box(Point3::origin(), 1.0, 1.0, 1.0),
            make_box(Point3::new(1.0, 0.0, 0.0), 1.0, 1.0, 1.0),
        ]
    }

    fn internal_faces(shape: &Shape) -> usize {
        shape
            .explore(ShapeKind::Face)
            .iter()
            .filter(|f| f.orientation() == Orientation::Internal)
            .count()
    }

    #[test]
    fn test_fuse_of_touching_boxes_keeps_shared_face_inside() {
        let out = build(&touching(), BooleanOp::Fuse, BopOptions::default());
        assert_eq!(out.shape.sub_shapes(ShapeKind::Solid).len(), 1);
        assert_relative_eq!(volume(&out.shape), 2.0, epsilon = 1e-9);
        assert_eq!(internal_faces(&out.shape), 1);
    }

    #[test]
    fn test_fuse_can_drop_shared_face() {
        let options = BopOptions {
            avoid_internal_shapes: true,
            ..BopOptions::default()
        };
        let out = build(&touching(), BooleanOp::Fuse, options);
        assert_eq!(internal_faces(&out.shape), 0);
        assert_relative_eq!(volume(&out.shape), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_common_of_touching_boxes_is_empty() {
        let out = build(&touching(), BooleanOp::Common, BopOptions::default());
        assert_eq!(out.shape.nb_children(), 0);
    }

    #[test]
    fn test_section_of_touching_boxes_is_the_shared_square() {
        let out = build(&touching(), BooleanOp::Section, BopOptions::default());
        let edges = out.shape.sub_shapes(ShapeKind::Edge);
        assert_eq!(edges.len(), 4);
        for e in &edges {
            for v in e.sub_shapes(ShapeKind::Vertex) {
                assert!((v.point().unwrap().x - 1.0).abs() < 1e-9);
            }
        }
        assert_eq!(out.shape.nb_children(), 4);
    }

    #[test]
    fn test_cut_of_nested_box_leaves_cavity() {
        let outer = make_box(Point3::origin(), 3.0, 3.0, 3.0);
        let inner = make_box(Point3::new(1.0, 1.0, 1.0), 1.0, 1.0, 1.0);
        let out = build(&[outer, inner], BooleanOp::Cut, BopOptions::default());
        assert_relative_eq!(volume(&out.shape), 26.0, epsilon = 1e-9);
    }
}
