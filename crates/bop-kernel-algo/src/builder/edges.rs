//! Split edges: one new edge per real pave block.

use std::collections::HashSet;

use bop_kernel_ds::{DsError, PaveBlock};
use bop_kernel_topo::{Shape, ShapeKind};
use tracing::debug;

use super::{map_items, Builder};
use crate::Result;

impl Builder<'_> {
    /// Build the split edge of every real pave block and the ordered images
    /// of every edge.
    pub(super) fn split_edges(&mut self) -> Result<()> {
        let ds = self.ds;
        let mut reals = Vec::new();
        let mut seen = HashSet::new();
        for edge in ds.indices_of_kind(ShapeKind::Edge) {
            for &pb in ds.pave_blocks(edge) {
                let real = ds.real_pave_block(pb);
                if seen.insert(real) {
                    reals.push(real);
                }
            }
        }
        let made = map_items(self.options.run_parallel, &reals, |&real| {
            self.make_split_edge(real).map(|edge| (real, edge))
        });
        for result in made {
            let (real, edge) = result?;
            self.images.blocks.insert(real, edge);
        }

        let mut changed = 0;
        for edge in ds.indices_of_kind(ShapeKind::Edge) {
            let original = ds.shape(edge)?;
            let mut list = Vec::with_capacity(ds.pave_blocks(edge).len());
            for &pb in ds.pave_blocks(edge) {
                let block = ds.pave_block(pb).ok_or(DsError::UnknownIndex(pb))?;
                let real = ds.real_pave_block(pb);
                let split = self
                    .images
                    .blocks
                    .get(&real)
                    .ok_or(DsError::UnknownIndex(real))?;
                list.push(oriented_like(split, original, block));
            }
            if !(list.len() == 1 && list[0].is_same(original)) {
                changed += 1;
            }
            for split in &list {
                self.images.add_origin(split, edge);
            }
            self.images.edges.insert(edge, list);
        }
        debug!(blocks = reals.len(), changed, "edges split");
        Ok(())
    }

    fn make_split_edge(&self, real: usize) -> Result<Shape> {
        let ds = self.ds;
        let pb = ds.pave_block(real).ok_or(DsError::UnknownIndex(real))?;
        let members = match pb.common_block.and_then(|cb| ds.common_block(cb)) {
            Some(cb) => cb.pave_blocks.clone(),
            None => vec![real],
        };
        for &m in &members {
            if let Some(edge) = self.untouched_edge(m)? {
                return Ok(edge);
            }
        }

        let edge = ds.shape(pb.edge)?;
        let (curve, _, _) = edge.curve().ok_or(DsError::NotAnEdge(pb.edge))?;
        let v1 = ds.shape(pb.pave1.vertex)?;
        let v2 = ds.shape(pb.pave2.vertex)?;
        let tolerance = members
            .iter()
            .filter_map(|&m| ds.pave_block(m))
            .filter_map(|b| ds.get(b.edge))
            .map(|info| info.tolerance)
            .fold(0.0, f64::max);
        Ok(Shape::edge(
            curve.clone(),
            v1,
            v2,
            pb.pave1.parameter,
            pb.pave2.parameter,
            tolerance,
        ))
    }

    /// The edge of block `id` when the block is the whole edge between its
    /// original vertices.
    fn untouched_edge(&self, id: usize) -> Result<Option<Shape>> {
        let ds = self.ds;
        let pb = ds.pave_block(id).ok_or(DsError::UnknownIndex(id))?;
        let edge = ds.shape(pb.edge)?;
        let Some((_, first, last)) = edge.curve() else {
            return Ok(None);
        };
        let same_vertex =
            |v: Option<Shape>, index: usize| v.and_then(|v| ds.index_of(&v)) == Some(index);
        let untouched = ds.pave_blocks(pb.edge).len() == 1
            && pb.is_whole_edge(first, last)
            && same_vertex(edge.first_vertex(), pb.pave1.vertex)
            && same_vertex(edge.last_vertex(), pb.pave2.vertex);
        Ok(untouched.then(|| edge.clone()))
    }
}

/// `split` turned to run the same way as `original` along `block`.
fn oriented_like(split: &Shape, original: &Shape, block: &PaveBlock) -> Shape {
    let mid = split.curve().map_or(0.0, |(_, a, b)| 0.5 * (a + b));
    let along = split.direction_at(mid);
    let reference = original.direction_at(block.mid_parameter());
    match (along, reference) {
        (Some(a), Some(r)) if a.dot(&r) < 0.0 => split.reversed(),
        _ => split.clone(),
    }
}
