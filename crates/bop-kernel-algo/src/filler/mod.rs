//! The Pave Filler: pairwise intersection of all arguments into one
//! [`IntersectionDs`].
//!
//! The filler runs in fixed phases:
//! 1. **Init**: index every sub-shape and cache bounding boxes.
//! 2. **Pairs**: vertex/vertex, vertex/edge, edge/edge, vertex/face,
//!    edge/face and face/face pairs of different arguments whose boxes
//!    overlap, in that order.
//! 3. **Same-face edges**: section edges against the other edges of their
//!    faces.
//! 4. **Merge**: remaining coincident vertices are merged, paves re-pointed,
//!    and edges cut into pave blocks.
//!
//! Provider calls of one phase run on the rayon pool; their results are
//! applied to the data structure serially, in pair order.

mod edges;
mod faces;
mod vertices;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bop_kernel_ds::{IntersectionDs, ShapeInfo};
use bop_kernel_intersect::{GeometryProvider, IntersectError};
use bop_kernel_math::{combined_tolerance, Point3};
use bop_kernel_topo::{Shape, ShapeKind};
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::{BopError, BopOptions, BopWarning, Report, Result};

/// Intersects arguments and records every coincidence between them.
///
/// ```
/// use std::sync::Arc;
/// use bop_kernel_algo::{BopOptions, PaveFiller};
/// use bop_kernel_intersect::LinearProvider;
/// use bop_kernel_math::Point3;
/// use bop_kernel_topo::make_box;
///
/// let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
/// let b = make_box(Point3::new(3.0, 0.0, 0.0), 1.0, 1.0, 1.0);
/// let mut filler = PaveFiller::new(Arc::new(LinearProvider::new()), BopOptions::default());
/// let ds = filler.perform(&[a, b]).unwrap();
/// assert!(ds.all_interferences().is_empty());
/// ```
pub struct PaveFiller {
    provider: Arc<dyn GeometryProvider>,
    options: BopOptions,
    report: Report,
}

impl PaveFiller {
    /// A filler using `provider` for all geometric queries.
    pub fn new(provider: Arc<dyn GeometryProvider>, options: BopOptions) -> Self {
        Self {
            provider,
            options,
            report: Report::new(),
        }
    }

    /// Options in use.
    pub fn options(&self) -> &BopOptions {
        &self.options
    }

    /// Diagnostics of the last run.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Take the diagnostics of the last run, leaving an empty report.
    pub fn take_report(&mut self) -> Report {
        std::mem::take(&mut self.report)
    }

    /// Intersect `arguments` and return the closed data structure.
    #[instrument(skip(self, arguments), fields(arguments = arguments.len()))]
    pub fn perform(&mut self, arguments: &[Shape]) -> Result<IntersectionDs> {
        self.report.clear();
        check_arguments(arguments)?;
        let mut filling = Filling::new(&*self.provider, &self.options, &mut self.report);
        filling.run(arguments)?;
        Ok(filling.ds)
    }
}

/// Reject argument lists no phase can work with.
pub(crate) fn check_arguments(arguments: &[Shape]) -> Result<()> {
    if arguments.is_empty() {
        return Err(BopError::EmptyArguments);
    }
    for (index, arg) in arguments.iter().enumerate() {
        if arg.kind() != ShapeKind::Compound && arg.is_empty() {
            return Err(BopError::NullShape {
                index,
                kind: arg.kind(),
            });
        }
        if let Some(j) = arguments[..index].iter().position(|a| a.is_same(arg)) {
            return Err(BopError::InvalidArguments(format!(
                "argument {index} repeats argument {j}"
            )));
        }
    }
    Ok(())
}

/// Run `f` over `pairs`, on the rayon pool when `parallel`.
pub(crate) fn map_pairs<T, F>(parallel: bool, pairs: &[(usize, usize)], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, usize) -> T + Sync + Send,
{
    if parallel {
        pairs.par_iter().map(|&(i, j)| f(i, j)).collect()
    } else {
        pairs.iter().map(|&(i, j)| f(i, j)).collect()
    }
}

/// Mutable state of one filler run.
pub(crate) struct Filling<'a> {
    provider: &'a dyn GeometryProvider,
    options: &'a BopOptions,
    report: &'a mut Report,
    ds: IntersectionDs,
    fuzzy: f64,
    /// Vertices found to coincide after they were placed.
    pending_merges: Vec<(usize, usize)>,
    /// Vertices known to lie inside each face.
    face_vertices: HashMap<usize, Vec<usize>>,
    /// Edges of other arguments lying in each face.
    face_edges_in: HashMap<usize, Vec<usize>>,
    /// Section edges produced on each face.
    face_sections: HashMap<usize, Vec<usize>>,
}

impl<'a> Filling<'a> {
    pub(crate) fn new(
        provider: &'a dyn GeometryProvider,
        options: &'a BopOptions,
        report: &'a mut Report,
    ) -> Self {
        let fuzzy = options.fuzzy();
        Self {
            provider,
            options,
            report,
            ds: IntersectionDs::with_fuzzy_value(fuzzy),
            fuzzy,
            pending_merges: Vec::new(),
            face_vertices: HashMap::new(),
            face_edges_in: HashMap::new(),
            face_sections: HashMap::new(),
        }
    }

    fn run(&mut self, arguments: &[Shape]) -> Result<()> {
        let start = Instant::now();
        self.ds.init(arguments)?;
        self.compute_bounding_boxes()?;
        debug!(
            shapes = self.ds.nb_shapes(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "init done"
        );

        self.perform_vv()?;
        self.perform_ve()?;
        self.perform_ee()?;
        self.perform_vf()?;
        self.perform_ef()?;
        self.perform_ff()?;
        self.perform_same_face_edges()?;
        self.merge_remaining_vertices()?;

        self.ds.update_paves_with_sd_vertices()?;
        self.ds.make_blocks()?;
        self.ds.close();
        debug!(
            shapes = self.ds.nb_shapes(),
            interferences = self.ds.all_interferences().len(),
            common_blocks = self.ds.common_blocks().len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "pave filler done"
        );
        Ok(())
    }

    fn compute_bounding_boxes(&mut self) -> Result<()> {
        let targets: Vec<(usize, Shape)> = (0..self.ds.nb_shapes())
            .filter_map(|i| {
                let info = self.ds.get(i)?;
                matches!(
                    info.kind,
                    ShapeKind::Vertex | ShapeKind::Edge | ShapeKind::Face | ShapeKind::Solid
                )
                .then(|| (i, info.shape.clone()))
            })
            .collect();
        let provider = self.provider;
        let boxes: Vec<_> = if self.options.run_parallel {
            targets
                .par_iter()
                .map(|(i, s)| (*i, provider.bounding_box(s)))
                .collect()
        } else {
            targets
                .iter()
                .map(|(i, s)| (*i, provider.bounding_box(s)))
                .collect()
        };
        for (i, bbox) in boxes {
            self.ds.set_bounding_box(i, bbox)?;
        }
        Ok(())
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    fn info(&self, index: usize) -> Result<&ShapeInfo> {
        Ok(self.ds.info(index)?)
    }

    fn tolerance(&self, index: usize) -> f64 {
        self.ds.get(index).map_or(0.0, |s| s.tolerance)
    }

    fn pair_tolerance(&self, i: usize, j: usize) -> f64 {
        combined_tolerance(self.tolerance(i), self.tolerance(j), self.fuzzy)
    }

    fn point_of(&self, vertex: usize) -> Result<Point3> {
        self.info(vertex)?
            .shape
            .point()
            .ok_or(BopError::InvalidArguments(format!(
                "shape {vertex} is not a vertex"
            )))
    }

    /// Pairs of source sub-shapes of different arguments with overlapping boxes.
    fn candidate_pairs(&self, k1: ShapeKind, k2: ShapeKind) -> Result<Vec<(usize, usize)>> {
        let source = |kind| -> Vec<usize> {
            self.ds
                .indices_of_kind(kind)
                .filter(|&i| !self.ds.is_new_shape(i))
                .collect()
        };
        let (first, second) = (source(k1), source(k2));
        let mut pairs = Vec::new();
        for &i in &first {
            let a = self.info(i)?;
            for &j in &second {
                if k1 == k2 && j <= i {
                    continue;
                }
                if self.ds.rank(i) == self.ds.rank(j) {
                    continue;
                }
                if a.bbox.overlaps(&self.info(j)?.bbox) {
                    pairs.push((i, j));
                }
            }
        }
        Ok(pairs)
    }

    /// Append a synthesized shape with its bounding box.
    fn append(&mut self, shape: &Shape) -> Result<usize> {
        let index = self.ds.append_shape(shape)?;
        self.ds
            .set_bounding_box(index, self.provider.bounding_box(shape))?;
        Ok(index)
    }

    fn new_vertex(&mut self, point: Point3, tolerance: f64) -> Result<usize> {
        self.append(&Shape::vertex(point, tolerance))
    }

    /// Same-domain representative of the vertex sitting near `t` on `edge`.
    fn pave_vertex_near(&self, edge: usize, t: f64) -> Option<usize> {
        self.ds
            .paves(edge)
            .iter()
            .find(|p| (p.parameter - t).abs() <= self.ds.parameter_tolerance(edge, p.vertex))
            .map(|p| self.ds.same_domain_index(p.vertex))
    }

    /// Put `vertex` on `edge` at `t` and return the vertex that ends up there.
    ///
    /// A different vertex already near `t` wins; both are queued for merging.
    fn put_pave(&mut self, edge: usize, t: f64, vertex: usize) -> Result<usize> {
        let vertex = self.ds.same_domain_index(vertex);
        let ptol = self.ds.parameter_tolerance(edge, vertex);
        let near = self.ds.paves(edge).iter().find(|p| {
            (p.parameter - t).abs() <= ptol.max(self.ds.parameter_tolerance(edge, p.vertex))
        });
        if let Some(p) = near {
            let existing = self.ds.same_domain_index(p.vertex);
            if existing != vertex {
                self.pending_merges.push((existing, vertex));
            }
            return Ok(existing);
        }
        self.ds.add_pave(edge, t, vertex)?;
        Ok(vertex)
    }

    /// True if `vertex` (a same-domain representative) is already a pave of `edge`.
    fn edge_has_vertex(ds: &IntersectionDs, edge: usize, vertex: usize) -> bool {
        ds.paves(edge)
            .iter()
            .any(|p| ds.same_domain_index(p.vertex) == vertex)
    }

    fn warn_failed(&mut self, first: usize, second: usize, err: &IntersectError) {
        warn!(first, second, %err, "intersection failed, pair skipped");
        self.report.warn(BopWarning::IntersectionFailed {
            first,
            second,
            reason: err.to_string(),
        });
    }
}
