#![warn(missing_docs)]

//! Boolean operations on boundary-representation shapes.
//!
//! [`BuilderAlgo`] runs the general fuse of a set of arguments: every
//! argument is split by all the others and every split part is returned.
//! [`BooleanOperation`] splits arguments into objects and tools and keeps
//! the parts selected by a [`BooleanOp`].
//!
//! ```
//! use bop_kernel::{topo::make_box, topo::volume, math::Point3, BooleanOperation};
//!
//! let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
//! let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
//! let mut op = BooleanOperation::fuse(vec![a], vec![b]);
//! op.build().unwrap();
//! assert!((volume(op.shape().unwrap()) - 1.5).abs() < 1e-9);
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{info, instrument, warn};

pub use bop_kernel_algo::{
    BooleanOp, BopError, BopOptions, BopWarning, ClassificationPolicy, History, Report, Result,
    ShapeState,
};
pub use bop_kernel_ds::IntersectionDs;
pub use bop_kernel_intersect::{GeometryProvider, LinearProvider, State};
pub use bop_kernel_topo::Shape;

pub use bop_kernel_algo as algo;
pub use bop_kernel_ds as ds;
pub use bop_kernel_geom as geom;
pub use bop_kernel_intersect as intersect;
pub use bop_kernel_math as math;
pub use bop_kernel_topo as topo;

use bop_kernel_algo::{BuildOutput, Builder, PaveFiller};

/// General fuse of a set of arguments, with history.
///
/// Queries made before a successful [`build`](BuilderAlgo::build), or about
/// shapes that are not part of an argument, return empty results.
pub struct BuilderAlgo {
    arguments: Vec<Shape>,
    tools: Vec<Shape>,
    operation: Option<BooleanOp>,
    options: BopOptions,
    provider: Arc<dyn GeometryProvider>,
    ds: Option<IntersectionDs>,
    output: Option<BuildOutput>,
    report: Report,
}

impl Default for BuilderAlgo {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderAlgo {
    /// An empty algorithm using the planar [`LinearProvider`].
    pub fn new() -> Self {
        Self::with_provider(Arc::new(LinearProvider::new()))
    }

    /// An empty algorithm using `provider` for all geometric queries.
    pub fn with_provider(provider: Arc<dyn GeometryProvider>) -> Self {
        Self {
            arguments: Vec::new(),
            tools: Vec::new(),
            operation: None,
            options: BopOptions::default(),
            provider,
            ds: None,
            output: None,
            report: Report::new(),
        }
    }

    /// Shapes to fuse; for a Boolean operation, the objects.
    pub fn set_arguments(&mut self, arguments: Vec<Shape>) {
        self.arguments = arguments;
    }

    /// Shapes set by [`set_arguments`](Self::set_arguments).
    pub fn arguments(&self) -> &[Shape] {
        &self.arguments
    }

    /// Extra tolerance for every proximity test; negative values become 0.
    pub fn set_fuzzy_value(&mut self, value: f64) {
        self.options.fuzzy_value = value.max(0.0);
    }

    /// Run intersection and splitting on the rayon pool.
    pub fn set_run_parallel(&mut self, parallel: bool) {
        self.options.run_parallel = parallel;
    }

    /// Drop internal parts instead of keeping them with `Internal` orientation.
    pub fn set_avoid_internal_shapes(&mut self, avoid: bool) {
        self.options.avoid_internal_shapes = avoid;
    }

    /// Replace every option at once.
    pub fn set_options(&mut self, options: BopOptions) {
        self.options = options;
        self.options.fuzzy_value = self.options.fuzzy();
    }

    /// Options in use.
    pub fn options(&self) -> &BopOptions {
        &self.options
    }

    /// Intersect the arguments and build the result.
    ///
    /// Errors are also recorded in [`report`](Self::report).
    #[instrument(skip(self), fields(arguments = self.arguments.len(), tools = self.tools.len()))]
    pub fn build(&mut self) -> Result<()> {
        self.ds = None;
        self.output = None;
        self.report.clear();
        let result = self.run();
        match &result {
            Ok(()) => info!(
                warnings = self.report.warnings.len(),
                "boolean operation done"
            ),
            Err(err) => {
                warn!(%err, "boolean operation failed");
                self.report.fail(err.clone());
            }
        }
        result
    }

    fn run(&mut self) -> Result<()> {
        if self.operation.is_some() && self.tools.is_empty() {
            return Err(BopError::InvalidArguments("no tools given".into()));
        }
        let mut all = self.arguments.clone();
        all.extend(self.tools.iter().cloned());

        let mut filler = PaveFiller::new(self.provider.clone(), self.options.clone());
        let filled = filler.perform(&all);
        self.report.merge(filler.take_report());
        let ds = filled?;

        let built = Builder::new(&ds, self.provider.as_ref(), &self.options)
            .with_objects(self.arguments.len())
            .perform(self.operation);
        self.ds = Some(ds);
        let mut output = built?;
        self.report.merge(std::mem::take(&mut output.report));
        self.output = Some(output);
        Ok(())
    }

    /// True after a build that produced a result without errors.
    pub fn is_done(&self) -> bool {
        self.output.is_some() && !self.report.has_errors()
    }

    /// The result compound.
    pub fn shape(&self) -> Option<&Shape> {
        self.output.as_ref().map(|o| &o.shape)
    }

    /// History of the last build.
    pub fn history(&self) -> Option<&History> {
        self.output.as_ref().map(|o| &o.history)
    }

    /// The single result shape replacing `shape`, if it was modified.
    pub fn modified(&self, shape: &Shape) -> &[Shape] {
        self.history().map_or(&[], |h| h.modified(shape))
    }

    /// The result shapes `shape` was split into.
    pub fn generated(&self, shape: &Shape) -> &[Shape] {
        self.history().map_or(&[], |h| h.generated(shape))
    }

    /// True if nothing of `shape` is in the result.
    pub fn is_deleted(&self, shape: &Shape) -> bool {
        self.history().is_some_and(|h| h.is_deleted(shape))
    }

    /// True if some argument sub-shape was modified.
    pub fn has_modified(&self) -> bool {
        self.history().is_some_and(History::has_modified)
    }

    /// True if some argument sub-shape was split.
    pub fn has_generated(&self) -> bool {
        self.history().is_some_and(History::has_generated)
    }

    /// True if some argument sub-shape was deleted.
    pub fn has_deleted(&self) -> bool {
        self.history().is_some_and(History::has_deleted)
    }

    /// Warnings and errors of the last build.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Intersection data of the last build.
    pub fn ds(&self) -> Option<&IntersectionDs> {
        self.ds.as_ref()
    }
}

/// A Boolean operation between objects and tools.
///
/// Dereferences to [`BuilderAlgo`] for options, build and queries; the
/// arguments set there are the objects.
pub struct BooleanOperation {
    algo: BuilderAlgo,
}

impl BooleanOperation {
    /// An operation with no objects or tools yet.
    pub fn new(operation: BooleanOp) -> Self {
        let mut algo = BuilderAlgo::new();
        algo.operation = Some(operation);
        Self { algo }
    }

    fn with(operation: BooleanOp, objects: Vec<Shape>, tools: Vec<Shape>) -> Self {
        let mut op = Self::new(operation);
        op.set_arguments(objects);
        op.set_tools(tools);
        op
    }

    /// Parts inside both an object and a tool.
    pub fn common(objects: Vec<Shape>, tools: Vec<Shape>) -> Self {
        Self::with(BooleanOp::Common, objects, tools)
    }

    /// Union of objects and tools.
    pub fn fuse(objects: Vec<Shape>, tools: Vec<Shape>) -> Self {
        Self::with(BooleanOp::Fuse, objects, tools)
    }

    /// Objects minus tools.
    pub fn cut(objects: Vec<Shape>, tools: Vec<Shape>) -> Self {
        Self::with(BooleanOp::Cut, objects, tools)
    }

    /// Tools minus objects.
    pub fn cut_reverse(objects: Vec<Shape>, tools: Vec<Shape>) -> Self {
        Self::with(BooleanOp::CutReverse, objects, tools)
    }

    /// Intersection edges and vertices of objects and tools.
    pub fn section(objects: Vec<Shape>, tools: Vec<Shape>) -> Self {
        Self::with(BooleanOp::Section, objects, tools)
    }

    /// Shapes applied to the objects.
    pub fn set_tools(&mut self, tools: Vec<Shape>) {
        self.algo.tools = tools;
    }

    /// Shapes set by [`set_tools`](Self::set_tools).
    pub fn tools(&self) -> &[Shape] {
        &self.algo.tools
    }

    /// Change the operation.
    pub fn set_operation(&mut self, operation: BooleanOp) {
        self.algo.operation = Some(operation);
    }

    /// The operation.
    pub fn operation(&self) -> BooleanOp {
        self.algo.operation.unwrap_or(BooleanOp::Fuse)
    }
}

impl Deref for BooleanOperation {
    type Target = BuilderAlgo;

    fn deref(&self) -> &BuilderAlgo {
        &self.algo
    }
}

impl DerefMut for BooleanOperation {
    fn deref_mut(&mut self) -> &mut BuilderAlgo {
        &mut self.algo
    }
}
