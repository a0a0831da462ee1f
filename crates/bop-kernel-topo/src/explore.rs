//! Sub-shape enumeration.

use std::collections::{HashMap, HashSet};

use crate::{Shape, ShapeId, ShapeKind};

impl Shape {
    /// Unique sub-shapes of `kind` in depth-first order of first occurrence.
    ///
    /// Each sub-shape is returned once, with the orientation of its first
    /// occurrence composed down from `self`. The shape itself is included
    /// when it has the requested kind.
    pub fn sub_shapes(&self, kind: ShapeKind) -> Vec<Shape> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        collect_unique(self, kind, &mut seen, &mut out);
        out
    }

    /// Every occurrence of sub-shapes of `kind`, with composed orientation.
    ///
    /// Unlike [`Shape::sub_shapes`], a shared sub-shape is returned once per
    /// occurrence (an edge shared by two faces of a shell shows up twice).
    /// The search does not descend below shapes of the requested kind.
    pub fn explore(&self, kind: ShapeKind) -> Vec<Shape> {
        let mut out = Vec::new();
        collect_all(self, kind, &mut out);
        out
    }

    /// True if `other` occurs anywhere in this shape, including the shape itself.
    pub fn contains(&self, other: &Shape) -> bool {
        if self.is_same(other) {
            return true;
        }
        if self.kind() != ShapeKind::Compound && other.kind() <= self.kind() {
            return false;
        }
        self.children().any(|c| c.contains(other))
    }
}

fn collect_unique(
    shape: &Shape,
    kind: ShapeKind,
    seen: &mut HashSet<ShapeId>,
    out: &mut Vec<Shape>,
) {
    if shape.kind() == kind {
        if seen.insert(shape.id()) {
            out.push(shape.clone());
        }
        return;
    }
    if shape.kind() > kind {
        return;
    }
    for child in shape.children() {
        collect_unique(&child, kind, seen, out);
    }
}

fn collect_all(shape: &Shape, kind: ShapeKind, out: &mut Vec<Shape>) {
    if shape.kind() == kind {
        out.push(shape.clone());
        return;
    }
    if shape.kind() > kind {
        return;
    }
    for child in shape.children() {
        collect_all(&child, kind, out);
    }
}

/// Map each sub-shape of `kind` to the ancestors of `ancestor_kind` containing it.
///
/// Ancestors are listed once each, in enumeration order, with the orientation
/// they have inside `root`.
pub fn map_ancestors(
    root: &Shape,
    kind: ShapeKind,
    ancestor_kind: ShapeKind,
) -> HashMap<ShapeId, Vec<Shape>> {
    let mut map: HashMap<ShapeId, Vec<Shape>> = HashMap::new();
    for ancestor in root.sub_shapes(ancestor_kind) {
        for sub in ancestor.sub_shapes(kind) {
            let entry = map.entry(sub.id()).or_default();
            if !entry.iter().any(|a| a.is_same(&ancestor)) {
                entry.push(ancestor.clone());
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{make_box, Orientation};
    use bop_kernel_math::Point3;

    #[test]
    fn test_box_counts() {
        let b = make_box(Point3::origin(), 1.0, 2.0, 3.0);
        assert_eq!(b.sub_shapes(ShapeKind::Vertex).len(), 8);
        assert_eq!(b.sub_shapes(ShapeKind::Edge).len(), 12);
        assert_eq!(b.sub_shapes(ShapeKind::Wire).len(), 6);
        assert_eq!(b.sub_shapes(ShapeKind::Face).len(), 6);
        assert_eq!(b.sub_shapes(ShapeKind::Shell).len(), 1);
        assert_eq!(b.sub_shapes(ShapeKind::Solid).len(), 1);
        // every edge is used by two faces
        assert_eq!(b.explore(ShapeKind::Edge).len(), 24);
    }

    #[test]
    fn test_sub_shapes_is_stable() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let first: Vec<_> = b.sub_shapes(ShapeKind::Edge).iter().map(|e| e.id()).collect();
        let second: Vec<_> = b.sub_shapes(ShapeKind::Edge).iter().map(|e| e.id()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_edges_have_opposite_orientations() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let uses = b.explore(ShapeKind::Edge);
        for e in b.sub_shapes(ShapeKind::Edge) {
            let orients: Vec<Orientation> = uses
                .iter()
                .filter(|u| u.is_same(&e))
                .map(|u| u.orientation())
                .collect();
            assert_eq!(orients.len(), 2);
            assert_ne!(orients[0], orients[1]);
        }
    }

    #[test]
    fn test_map_ancestors_edge_faces() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let map = map_ancestors(&b, ShapeKind::Edge, ShapeKind::Face);
        assert_eq!(map.len(), 12);
        assert!(map.values().all(|faces| faces.len() == 2));
    }

    #[test]
    fn test_contains() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let v = b.sub_shapes(ShapeKind::Vertex)[3].clone();
        assert!(b.contains(&v));
        let other = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        assert!(!b.contains(&other.sub_shapes(ShapeKind::Vertex)[0]));
    }
}
