//! The Builder: turns a closed [`IntersectionDs`] into result shapes.
//!
//! Stages, in order:
//! 1. split edges along their pave blocks, one shared edge per common block;
//! 2. split faces with their edge images, inner edges and section edges;
//! 3. unify coincident split faces of different arguments;
//! 4. split solids with their face images and foreign faces inside them;
//! 5. collect pieces and classify them against the other arguments;
//! 6. select pieces for the operation and glue them into the result.

mod area;
mod classify;
mod edges;
mod face;
mod select;
mod solid;
mod wire;

use std::collections::HashMap;

use bop_kernel_ds::IntersectionDs;
use bop_kernel_intersect::GeometryProvider;
use bop_kernel_math::{combined_tolerance, Tolerance};
use bop_kernel_topo::{Shape, ShapeId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::history::History;
use crate::{BopOptions, Report, Result};

pub use area::AreaBuilder;
pub use face::BuilderFace;
pub use solid::BuilderSolid;
pub use wire::BuilderWire;

/// Boolean operation between the objects and the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    /// Parts inside at least one object and at least one tool.
    Common,
    /// Everything.
    Fuse,
    /// Object parts outside every tool.
    Cut,
    /// Tool parts outside every object.
    CutReverse,
    /// Intersection edges and vertices only.
    Section,
}

impl std::fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BooleanOp::Common => "common",
            BooleanOp::Fuse => "fuse",
            BooleanOp::Cut => "cut",
            BooleanOp::CutReverse => "cut-reverse",
            BooleanOp::Section => "section",
        };
        f.write_str(name)
    }
}

/// Split images of indexed sub-shapes.
#[derive(Debug, Clone, Default)]
pub struct Images {
    /// Split edge of each real pave block.
    pub(crate) blocks: HashMap<usize, Shape>,
    /// Ordered split edges of each edge, oriented like the edge.
    pub(crate) edges: HashMap<usize, Vec<Shape>>,
    /// Split faces of each face.
    pub(crate) faces: HashMap<usize, Vec<Shape>>,
    /// Split solids of each solid.
    pub(crate) solids: HashMap<usize, Vec<Shape>>,
    origins: HashMap<ShapeId, Vec<usize>>,
}

impl Images {
    /// Images of the indexed shape `index`, empty when it was not split.
    pub fn of(&self, index: usize) -> &[Shape] {
        [&self.edges, &self.faces, &self.solids]
            .into_iter()
            .find_map(|map| map.get(&index))
            .map_or(&[], Vec::as_slice)
    }

    /// Indices of the shapes `image` was split from.
    pub fn origins(&self, image: &Shape) -> &[usize] {
        self.origins.get(&image.id()).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn add_origin(&mut self, image: &Shape, index: usize) {
        let list = self.origins.entry(image.id()).or_default();
        if !list.contains(&index) {
            list.push(index);
        }
    }
}

/// Output of a builder run.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The result compound.
    pub shape: Shape,
    /// What happened to every source sub-shape.
    pub history: History,
    /// Warnings of the build.
    pub report: Report,
}

/// Builds result shapes from a closed intersection data structure.
///
/// The first `nb_objects` arguments are objects, the rest tools. Without
/// an operation every piece is returned (the general fuse).
pub struct Builder<'a> {
    ds: &'a IntersectionDs,
    provider: &'a dyn GeometryProvider,
    options: &'a BopOptions,
    nb_objects: usize,
    report: Report,
    images: Images,
    /// Result solids made from each glued piece.
    merged: HashMap<ShapeId, Vec<Shape>>,
}

impl<'a> Builder<'a> {
    /// A builder over `ds`; every argument is an object.
    pub fn new(
        ds: &'a IntersectionDs,
        provider: &'a dyn GeometryProvider,
        options: &'a BopOptions,
    ) -> Self {
        Self {
            ds,
            provider,
            options,
            nb_objects: ds.arguments().len(),
            report: Report::new(),
            images: Images::default(),
            merged: HashMap::new(),
        }
    }

    /// Treat the first `nb_objects` arguments as objects and the rest as tools.
    pub fn with_objects(mut self, nb_objects: usize) -> Self {
        self.nb_objects = nb_objects.min(self.ds.arguments().len());
        self
    }

    /// Images built so far.
    pub fn images(&self) -> &Images {
        &self.images
    }

    /// Build the result of `operation`, or of the general fuse for `None`.
    #[instrument(skip(self), fields(shapes = self.ds.nb_shapes()))]
    pub fn perform(mut self, operation: Option<BooleanOp>) -> Result<BuildOutput> {
        self.split_edges()?;
        self.split_faces()?;
        self.merge_same_domain_faces()?;
        self.split_solids()?;
        let shape = match operation {
            Some(BooleanOp::Section) => self.build_section()?,
            _ => {
                let pieces = self.collect_pieces()?;
                let selected = self.select(pieces, operation);
                self.assemble(selected, operation)?
            }
        };
        debug!(parts = shape.nb_children(), "result assembled");
        let history = History::new(self.ds, &self.images, &self.merged, &shape);
        Ok(BuildOutput {
            shape,
            history,
            report: self.report,
        })
    }

    fn is_object(&self, rank: usize) -> bool {
        rank < self.nb_objects
    }

    /// Band used for point classification.
    fn classification_tolerance(&self) -> f64 {
        combined_tolerance(Tolerance::CONFUSION, Tolerance::CONFUSION, self.options.fuzzy())
    }
}

/// Apply `f` to every item, on the rayon pool when `parallel` is set.
pub(crate) fn map_items<T, R, F>(parallel: bool, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use bop_kernel_geom::Aabb3;
    use bop_kernel_intersect::{
        EdgeEdgeHit, EdgeFaceHit, FaceFaceHit, IntersectError, LinearProvider, State,
    };
    use bop_kernel_math::{Point2, Point3};
    use bop_kernel_topo::{make_box, volume, ShapeKind};

    use super::*;
    use crate::{BopWarning, PaveFiller};

    fn build(args: &[Shape], nb_objects: usize, op: Option<BooleanOp>) -> BuildOutput {
        let options = BopOptions::default();
        let provider = LinearProvider::new();
        let ds = PaveFiller::new(Arc::new(LinearProvider::new()), options.clone())
            .perform(args)
            .unwrap();
        Builder::new(&ds, &provider, &options)
            .with_objects(nb_objects)
            .perform(op)
            .unwrap()
    }

    fn solids(shape: &Shape) -> Vec<Shape> {
        shape.sub_shapes(ShapeKind::Solid)
    }

    #[test]
    fn test_general_fuse_of_overlapping_boxes() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
        let out = build(&[a, b], 2, None);
        let pieces = solids(&out.shape);
        // left of A, shared middle, right of B
        assert_eq!(pieces.len(), 3);
        let mut volumes: Vec<f64> = pieces.iter().map(volume).collect();
        volumes.sort_by(f64::total_cmp);
        for v in volumes {
            assert!((v - 0.5).abs() < 1e-9, "{v}");
        }
    }

    #[test]
    fn test_common_of_overlapping_boxes() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
        let out = build(&[a, b], 1, Some(BooleanOp::Common));
        assert_relative_eq!(volume(&out.shape), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cut_of_overlapping_boxes() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
        let out = build(&[a, b], 1, Some(BooleanOp::Cut));
        assert_relative_eq!(volume(&out.shape), 0.5, epsilon = 1e-9);
        let out = build(
            &[
                make_box(Point3::origin(), 1.0, 1.0, 1.0),
                make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0),
            ],
            1,
            Some(BooleanOp::CutReverse),
        );
        assert_relative_eq!(volume(&out.shape), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_fuse_glues_into_one_solid() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
        let out = build(&[a, b], 1, Some(BooleanOp::Fuse));
        assert_eq!(solids(&out.shape).len(), 1);
        assert_relative_eq!(volume(&out.shape), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_disjoint_general_fuse_keeps_arguments() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(3.0, 0.0, 0.0), 1.0, 1.0, 1.0);
        let out = build(&[a.clone(), b.clone()], 2, None);
        let pieces = solids(&out.shape);
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().any(|s| s.is_same(&a)));
        assert!(pieces.iter().any(|s| s.is_same(&b)));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(BooleanOp::CutReverse.to_string(), "cut-reverse");
    }

    /// Planar provider that cannot classify points against solids.
    struct NoSolidClassification(LinearProvider);

    type Provided<T> = bop_kernel_intersect::Result<T>;

    impl GeometryProvider for NoSolidClassification {
        fn bounding_box(&self, shape: &Shape) -> Aabb3 {
            self.0.bounding_box(shape)
        }

        fn evaluate(&self, edge: &Shape, t: f64) -> Provided<Point3> {
            self.0.evaluate(edge, t)
        }

        fn vertex_on_edge(&self, v: &Shape, e: &Shape, tol: f64) -> Provided<Option<(f64, f64)>> {
            self.0.vertex_on_edge(v, e, tol)
        }

        fn vertex_in_face(&self, v: &Shape, f: &Shape, tol: f64) -> Provided<Option<(Point2, f64)>> {
            self.0.vertex_in_face(v, f, tol)
        }

        fn intersect_edges(&self, e1: &Shape, e2: &Shape, tol: f64) -> Provided<Vec<EdgeEdgeHit>> {
            self.0.intersect_edges(e1, e2, tol)
        }

        fn intersect_edge_face(&self, e: &Shape, f: &Shape, tol: f64) -> Provided<Vec<EdgeFaceHit>> {
            self.0.intersect_edge_face(e, f, tol)
        }

        fn intersect_faces(&self, f1: &Shape, f2: &Shape, tol: f64) -> Provided<FaceFaceHit> {
            self.0.intersect_faces(f1, f2, tol)
        }

        fn classify_point_in_face(&self, p: &Point3, f: &Shape, tol: f64) -> Provided<State> {
            self.0.classify_point_in_face(p, f, tol)
        }

        fn classify_point_in_solid(&self, _: &Point3, _: &Shape, _: f64) -> Provided<State> {
            Err(IntersectError::Singular("no solid classifier"))
        }

        fn sample_point_in_face(&self, face: &Shape, index: usize) -> Option<Point3> {
            self.0.sample_point_in_face(face, index)
        }
    }

    #[test]
    fn test_failed_solid_classification_is_a_warning() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(1.0, 0.0, 0.0), 1.0, 1.0, 1.0);
        let options = BopOptions::default();
        let ds = PaveFiller::new(Arc::new(LinearProvider::new()), options.clone())
            .perform(&[a, b])
            .unwrap();
        let provider = NoSolidClassification(LinearProvider::new());
        let out = Builder::new(&ds, &provider, &options)
            .with_objects(1)
            .perform(None)
            .unwrap();
        assert!(out.report.errors.is_empty());
        assert!(out
            .report
            .warnings
            .iter()
            .any(|w| matches!(w, BopWarning::IntersectionFailed { .. })));
        let pieces = solids(&out.shape);
        assert_eq!(pieces.len(), 2);
        assert_relative_eq!(pieces.iter().map(volume).sum::<f64>(), 2.0, epsilon = 1e-9);
    }
}
