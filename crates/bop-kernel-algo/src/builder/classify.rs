//! Pieces of the arguments and their classification against other arguments.

use std::collections::{HashMap, HashSet};

use bop_kernel_intersect::State;
use bop_kernel_math::Point3;
use bop_kernel_topo::{Shape, ShapeId, ShapeKind};
use tracing::warn;

use super::area::{is_boundary, AreaBuilder};
use super::{Builder, BuilderWire};
use crate::{BopWarning, Result};

/// One split part of the arguments, a candidate for the result.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub shape: Shape,
    /// Ranks of the arguments the piece belongs to.
    pub arguments: Vec<usize>,
}

type PieceKey = (ShapeKind, Vec<ShapeId>);

fn piece_key(shape: &Shape) -> PieceKey {
    let mut ids: Vec<ShapeId> = match shape.kind() {
        ShapeKind::Solid => shape
            .explore(ShapeKind::Face)
            .iter()
            .filter(|f| is_boundary(f))
            .map(Shape::id)
            .collect(),
        _ => vec![shape.id()],
    };
    ids.sort_unstable();
    ids.dedup();
    (shape.kind(), ids)
}

impl Builder<'_> {
    /// Split parts of every argument, with coincident parts merged.
    ///
    /// Solids come from the solid images; faces, wires, edges and vertices
    /// not bounding a higher-dimensional part of the same argument are
    /// pieces of their own.
    pub(super) fn collect_pieces(&self) -> Result<Vec<Piece>> {
        let ds = self.ds;
        let mut pieces: Vec<Piece> = Vec::new();
        let mut by_key: HashMap<PieceKey, usize> = HashMap::new();
        let mut push = |shape: Shape, rank: usize| {
            let key = piece_key(&shape);
            match by_key.get(&key) {
                Some(&i) => {
                    if !pieces[i].arguments.contains(&rank) {
                        pieces[i].arguments.push(rank);
                    }
                    if ds.index_of(&shape).is_some() && ds.index_of(&pieces[i].shape).is_none() {
                        pieces[i].shape = shape;
                    }
                }
                None => {
                    by_key.insert(key, pieces.len());
                    pieces.push(Piece {
                        shape,
                        arguments: vec![rank],
                    });
                }
            }
        };

        for (rank, argument) in ds.arguments().iter().enumerate() {
            let mut bounded: HashSet<ShapeId> = HashSet::new();
            for solid in argument.sub_shapes(ShapeKind::Solid) {
                bounded.extend(solid.sub_shapes(ShapeKind::Face).iter().map(Shape::id));
                if let Some(s) = ds.index_of(&solid) {
                    for image in self.images.solids.get(&s).into_iter().flatten() {
                        push(image.clone(), rank);
                    }
                }
            }
            for face in argument.sub_shapes(ShapeKind::Face) {
                if bounded.insert(face.id()) {
                    if let Some(f) = ds.index_of(&face) {
                        for image in self.images.faces.get(&f).into_iter().flatten() {
                            push(image.composed(face.orientation()), rank);
                        }
                    }
                }
                bounded.extend(face.sub_shapes(ShapeKind::Edge).iter().map(Shape::id));
            }
            for wire in argument.sub_shapes(ShapeKind::Wire) {
                let edges: Vec<Shape> = wire
                    .explore(ShapeKind::Edge)
                    .iter()
                    .filter(|e| !bounded.contains(&e.id()))
                    .flat_map(|e| self.edge_images(e))
                    .collect();
                bounded.extend(wire.sub_shapes(ShapeKind::Edge).iter().map(Shape::id));
                if edges.is_empty() {
                    continue;
                }
                let mut builder = BuilderWire::new(edges);
                builder.perform()?;
                for w in builder.areas() {
                    push(w.clone(), rank);
                }
            }
            for edge in argument.sub_shapes(ShapeKind::Edge) {
                if bounded.insert(edge.id()) {
                    for image in self.edge_images(&edge) {
                        push(image, rank);
                    }
                }
                bounded.extend(edge.sub_shapes(ShapeKind::Vertex).iter().map(Shape::id));
            }
            for vertex in argument.sub_shapes(ShapeKind::Vertex) {
                if bounded.contains(&vertex.id()) {
                    continue;
                }
                if let Some(v) = ds.index_of(&vertex) {
                    push(ds.shape(ds.same_domain_index(v))?.clone(), rank);
                }
            }
        }
        Ok(pieces)
    }

    /// Split images of an edge occurrence, following its orientation.
    fn edge_images(&self, edge: &Shape) -> Vec<Shape> {
        let images = self
            .ds
            .index_of(edge)
            .and_then(|e| self.images.edges.get(&e))
            .cloned()
            .unwrap_or_else(|| vec![edge.clone()]);
        images.into_iter().map(|i| i.composed(edge.orientation())).collect()
    }

    /// State of `piece` relative to the argument of rank `rank`.
    ///
    /// A piece of the argument itself is `In`; against an argument without
    /// solids everything is `Out`. Otherwise sample points of the piece
    /// are classified against the argument's solids and combined with the
    /// classification policy.
    pub(super) fn classify(&mut self, piece: &Piece, rank: usize) -> State {
        if piece.arguments.contains(&rank) {
            return State::In;
        }
        let Some(argument) = self.ds.arguments().get(rank) else {
            return State::Unknown;
        };
        let solids = argument.sub_shapes(ShapeKind::Solid);
        if solids.is_empty() {
            return State::Out;
        }
        let states: Vec<State> = self
            .sample_points(piece, rank)
            .iter()
            .map(|p| self.state_in_solids(p, &solids))
            .collect();
        let (state, disagreed) = self.options.classification.resolve(&states);
        if disagreed {
            warn!(rank, ?state, "sample points of a piece disagree");
            self.report
                .warn(BopWarning::AmbiguousClassification { argument: rank });
        }
        state
    }

    /// Points on `piece` away from faces that came from argument `rank`.
    fn sample_points(&self, piece: &Piece, rank: usize) -> Vec<Point3> {
        let wanted = self.options.classification.samples.max(1);
        let mut points = Vec::with_capacity(wanted);
        match piece.shape.kind() {
            ShapeKind::Vertex => points.extend(piece.shape.point()),
            ShapeKind::Wire | ShapeKind::Edge => {
                for edge in piece.shape.sub_shapes(ShapeKind::Edge) {
                    if let Some((_, a, b)) = edge.curve() {
                        points.extend(edge.point_at(0.5 * (a + b)));
                    }
                }
            }
            _ => {
                let faces = piece.shape.sub_shapes(ShapeKind::Face);
                let foreign = |f: &Shape| {
                    self.images
                        .origins(f)
                        .iter()
                        .any(|&o| self.ds.rank(o) == Some(rank))
                };
                for face in faces.iter().filter(|f| !foreign(f)) {
                    for k in 0..wanted {
                        match self.provider.sample_point_in_face(face, k) {
                            Some(p) => points.push(p),
                            None => break,
                        }
                    }
                    if points.len() >= wanted {
                        break;
                    }
                }
            }
        }
        points.truncate(wanted);
        points
    }

    fn state_in_solids(&self, point: &Point3, solids: &[Shape]) -> State {
        let tolerance = self.classification_tolerance();
        let mut state = State::Unknown;
        for solid in solids {
            match self.provider.classify_point_in_solid(point, solid, tolerance) {
                Ok(State::In) => return State::In,
                Ok(State::On) => state = State::On,
                Ok(State::Out) if state == State::Unknown => state = State::Out,
                _ => {}
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bop_kernel_intersect::LinearProvider;
    use bop_kernel_topo::make_box;

    use super::*;
    use crate::{BopOptions, PaveFiller};

    #[test]
    fn test_overlapping_boxes_give_three_pieces() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
        let options = BopOptions::default();
        let provider = LinearProvider::new();
        let ds = PaveFiller::new(Arc::new(LinearProvider::new()), options.clone())
            .perform(&[a, b])
            .unwrap();
        let mut builder = Builder::new(&ds, &provider, &options);
        builder.split_edges().unwrap();
        builder.split_faces().unwrap();
        builder.merge_same_domain_faces().unwrap();
        builder.split_solids().unwrap();
        let pieces = builder.collect_pieces().unwrap();
        assert_eq!(pieces.len(), 3);
        let shared: Vec<&Piece> = pieces.iter().filter(|p| p.arguments.len() == 2).collect();
        assert_eq!(shared.len(), 1);

        let states: Vec<(State, State)> = pieces
            .iter()
            .map(|p| (builder.classify(p, 0), builder.classify(p, 1)))
            .collect();
        assert!(states.contains(&(State::In, State::Out)));
        assert!(states.contains(&(State::In, State::In)));
        assert!(states.contains(&(State::Out, State::In)));
        assert!(builder.report.warnings.is_empty());
    }

    #[test]
    fn test_edge_argument_is_a_piece() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let p = Shape::vertex(Point3::new(0.5, 0.5, -1.0), 1e-7);
        let q = Shape::vertex(Point3::new(0.5, 0.5, 2.0), 1e-7);
        let rod = Shape::line(&p, &q);
        let options = BopOptions::default();
        let provider = LinearProvider::new();
        let ds = PaveFiller::new(Arc::new(LinearProvider::new()), options.clone())
            .perform(&[a, rod])
            .unwrap();
        let mut builder = Builder::new(&ds, &provider, &options);
        builder.split_edges().unwrap();
        builder.split_faces().unwrap();
        builder.merge_same_domain_faces().unwrap();
        builder.split_solids().unwrap();
        let pieces = builder.collect_pieces().unwrap();
        let edges: Vec<&Piece> = pieces
            .iter()
            .filter(|p| p.shape.kind() == ShapeKind::Edge)
            .collect();
        assert_eq!(edges.len(), 3);
        let inside = edges
            .iter()
            .filter(|p| builder.classify(p, 0) == State::In)
            .count();
        assert_eq!(inside, 1);
    }
}
