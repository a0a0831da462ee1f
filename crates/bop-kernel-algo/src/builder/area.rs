//! The area-builder strategy shared by the wire, face and solid builders.

use std::collections::{HashMap, HashSet};

use bop_kernel_topo::{Orientation, Shape, ShapeId, ShapeKind};

use crate::Result;

/// Splits a bounded region into new regions from a soup of boundary parts.
///
/// Parts are edges for faces and faces for solids. The run is fixed:
/// parts that cannot bound anything are set aside, the rest are chained
/// into closed loops, loops become areas (outer loops with their holes),
/// and finally the set-aside parts are attached inside the areas that
/// contain them.
pub trait AreaBuilder {
    /// Set aside parts with a free boundary.
    fn perform_shapes_to_avoid(&mut self) -> Result<()>;

    /// Chain the remaining parts into closed loops.
    fn perform_loops(&mut self) -> Result<()>;

    /// Turn loops into areas, putting each hole in its outer loop.
    fn perform_areas(&mut self) -> Result<()>;

    /// Attach internal parts to the areas containing them.
    fn perform_internal_shapes(&mut self) -> Result<()>;

    /// Areas built by the last run.
    fn areas(&self) -> &[Shape];

    /// Run every stage in order.
    fn perform(&mut self) -> Result<()> {
        self.perform_shapes_to_avoid()?;
        self.perform_loops()?;
        self.perform_areas()?;
        self.perform_internal_shapes()
    }
}

/// True for occurrences that bound their parent.
pub(crate) fn is_boundary(shape: &Shape) -> bool {
    matches!(
        shape.orientation(),
        Orientation::Forward | Orientation::Reversed
    )
}

/// Positions of `parts` that hang on a free sub-shape of `kind`.
///
/// Only bounding occurrences count. A sub-shape is free when it is touched
/// by a single distinct part; a part given in both orientations still
/// counts once. Removal repeats
/// until no free sub-shape is left, so whole dangling chains go.
pub(crate) fn dangling_parts(parts: &[Shape], kind: ShapeKind) -> Vec<usize> {
    let subs: Vec<Vec<ShapeId>> = parts
        .iter()
        .map(|p| {
            p.explore(kind)
                .iter()
                .filter(|s| is_boundary(s))
                .map(Shape::id)
                .collect()
        })
        .collect();
    let mut removed = vec![false; parts.len()];
    loop {
        let mut users: HashMap<ShapeId, HashSet<ShapeId>> = HashMap::new();
        for (i, part) in parts.iter().enumerate() {
            if removed[i] {
                continue;
            }
            for s in &subs[i] {
                users.entry(*s).or_default().insert(part.id());
            }
        }
        let mut changed = false;
        for i in 0..parts.len() {
            if !removed[i] && subs[i].iter().any(|s| users.get(s).map_or(0, HashSet::len) < 2) {
                removed[i] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    removed
        .iter()
        .enumerate()
        .filter(|(_, r)| **r)
        .map(|(i, _)| i)
        .collect()
}
