//! What happened to every source sub-shape in a Boolean result.

use std::collections::{HashMap, HashSet};

use bop_kernel_ds::IntersectionDs;
use bop_kernel_topo::{Shape, ShapeId, ShapeKind};
use serde::{Deserialize, Serialize};

use crate::builder::Images;

/// Fate of a source sub-shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeState {
    /// Present in the result as is.
    Unchanged,
    /// Replaced by a single different shape.
    Modified,
    /// Replaced by several shapes.
    Generated,
    /// Nothing of it is in the result.
    Deleted,
}

#[derive(Debug, Clone)]
struct Entry {
    state: ShapeState,
    images: Vec<Shape>,
}

/// Modified, generated and deleted queries for vertices, edges, faces and
/// solids of the arguments.
///
/// Only images present in the result count. Shapes that are not
/// sub-shapes of an argument have no history.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: HashMap<ShapeId, Entry>,
}

impl History {
    pub(crate) fn new(
        ds: &IntersectionDs,
        images: &Images,
        merged: &HashMap<ShapeId, Vec<Shape>>,
        result: &Shape,
    ) -> Self {
        let mut present: HashSet<ShapeId> = HashSet::new();
        for kind in [
            ShapeKind::Solid,
            ShapeKind::Face,
            ShapeKind::Edge,
            ShapeKind::Vertex,
        ] {
            present.extend(result.sub_shapes(kind).iter().map(Shape::id));
        }

        let mut entries = HashMap::new();
        for index in 0..ds.nb_source_shapes() {
            let Ok(source) = ds.shape(index) else { continue };
            let candidates: Vec<Shape> = match source.kind() {
                ShapeKind::Vertex => ds
                    .shape(ds.same_domain_index(index))
                    .map(|v| vec![v.clone()])
                    .unwrap_or_default(),
                ShapeKind::Edge | ShapeKind::Face => images.of(index).to_vec(),
                ShapeKind::Solid => images
                    .of(index)
                    .iter()
                    .flat_map(|piece| {
                        merged
                            .get(&piece.id())
                            .cloned()
                            .unwrap_or_else(|| vec![piece.clone()])
                    })
                    .collect(),
                _ => continue,
            };
            let mut seen = HashSet::new();
            let survivors: Vec<Shape> = candidates
                .into_iter()
                .filter(|s| present.contains(&s.id()) && seen.insert(s.id()))
                .collect();
            let state = match survivors.as_slice() {
                [] => ShapeState::Deleted,
                [only] if only.is_same(source) => ShapeState::Unchanged,
                [_] => ShapeState::Modified,
                _ => ShapeState::Generated,
            };
            entries.insert(
                source.id(),
                Entry {
                    state,
                    images: survivors,
                },
            );
        }
        Self { entries }
    }

    /// State of `shape`, `None` when it has no history.
    pub fn state(&self, shape: &Shape) -> Option<ShapeState> {
        self.entries.get(&shape.id()).map(|e| e.state)
    }

    /// Result shapes made from `shape`, whatever its state.
    pub fn images(&self, shape: &Shape) -> &[Shape] {
        self.entries
            .get(&shape.id())
            .map_or(&[], |e| e.images.as_slice())
    }

    /// The single replacement of a modified shape, empty otherwise.
    pub fn modified(&self, shape: &Shape) -> &[Shape] {
        self.images_if(shape, ShapeState::Modified)
    }

    /// The replacements of a shape split into several, empty otherwise.
    pub fn generated(&self, shape: &Shape) -> &[Shape] {
        self.images_if(shape, ShapeState::Generated)
    }

    /// True if nothing of `shape` is in the result.
    pub fn is_deleted(&self, shape: &Shape) -> bool {
        self.state(shape) == Some(ShapeState::Deleted)
    }

    /// True if some tracked shape was modified.
    pub fn has_modified(&self) -> bool {
        self.has_state(ShapeState::Modified)
    }

    /// True if some tracked shape was split into several.
    pub fn has_generated(&self) -> bool {
        self.has_state(ShapeState::Generated)
    }

    /// True if some tracked shape was deleted.
    pub fn has_deleted(&self) -> bool {
        self.has_state(ShapeState::Deleted)
    }

    /// Number of tracked shapes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn images_if(&self, shape: &Shape, state: ShapeState) -> &[Shape] {
        match self.entries.get(&shape.id()) {
            Some(e) if e.state == state => &e.images,
            _ => &[],
        }
    }

    fn has_state(&self, state: ShapeState) -> bool {
        self.entries.values().any(|e| e.state == state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bop_kernel_intersect::LinearProvider;
    use bop_kernel_math::Point3;
    use bop_kernel_topo::make_box;

    use super::*;
    use crate::{BooleanOp, BopOptions, Builder, PaveFiller};

    fn run(a: &Shape, b: &Shape, op: BooleanOp) -> History {
        let options = BopOptions::default();
        let provider = LinearProvider::new();
        let ds = PaveFiller::new(Arc::new(LinearProvider::new()), options.clone())
            .perform(&[a.clone(), b.clone()])
            .unwrap();
        Builder::new(&ds, &provider, &options)
            .with_objects(1)
            .perform(Some(op))
            .unwrap()
            .history
    }

    #[test]
    fn test_cut_history() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.0, 0.0), 1.0, 1.0, 1.0);
        let history = run(&a, &b, BooleanOp::Cut);

        let faces = a.sub_shapes(ShapeKind::Face);
        let left = faces
            .iter()
            .find(|f| f.sub_shapes(ShapeKind::Vertex).iter().all(|v| v.point().unwrap().x == 0.0))
            .unwrap();
        let right = faces
            .iter()
            .find(|f| f.sub_shapes(ShapeKind::Vertex).iter().all(|v| v.point().unwrap().x == 1.0))
            .unwrap();
        assert_eq!(history.state(left), Some(ShapeState::Unchanged));
        assert!(history.modified(left).is_empty());
        assert!(history.is_deleted(right));
        assert!(history.has_modified());
        assert!(history.has_deleted());
        // the tool's far face is gone too
        assert!(b
            .sub_shapes(ShapeKind::Face)
            .iter()
            .any(|f| history.is_deleted(f)));
        assert!(history.images(&Shape::empty()).is_empty());
        assert_eq!(history.state(&Shape::empty()), None);
    }

    #[test]
    fn test_every_source_shape_is_tracked() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(0.5, 0.5, 0.5), 1.0, 1.0, 1.0);
        let history = run(&a, &b, BooleanOp::Fuse);
        for shape in [&a, &b] {
            for kind in [ShapeKind::Solid, ShapeKind::Face, ShapeKind::Edge, ShapeKind::Vertex] {
                for s in shape.sub_shapes(kind) {
                    assert!(history.state(&s).is_some());
                }
            }
        }
        assert_eq!(history.len(), 2 * (1 + 6 + 12 + 8));
    }
}
