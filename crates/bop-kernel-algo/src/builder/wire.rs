//! One-dimensional area builder: chains split edges back into wires.

use std::collections::HashMap;

use bop_kernel_topo::{Shape, ShapeId};

use super::area::AreaBuilder;
use crate::Result;

/// Groups edges connected through shared vertices into wires.
///
/// Edges keep their orientation; within a wire they are ordered by a walk
/// from the first edge of each connected group.
#[derive(Debug, Default)]
pub struct BuilderWire {
    edges: Vec<Shape>,
    groups: Vec<Vec<usize>>,
    areas: Vec<Shape>,
}

impl BuilderWire {
    /// A builder over `edges`.
    pub fn new(edges: Vec<Shape>) -> Self {
        Self {
            edges,
            ..Self::default()
        }
    }
}

impl AreaBuilder for BuilderWire {
    fn perform_shapes_to_avoid(&mut self) -> Result<()> {
        // open chains are valid wires
        Ok(())
    }

    fn perform_loops(&mut self) -> Result<()> {
        let mut by_vertex: HashMap<ShapeId, Vec<usize>> = HashMap::new();
        for (i, e) in self.edges.iter().enumerate() {
            for v in [e.start_vertex(), e.end_vertex()].into_iter().flatten() {
                by_vertex.entry(v.id()).or_default().push(i);
            }
        }
        let mut used = vec![false; self.edges.len()];
        self.groups.clear();
        for start in 0..self.edges.len() {
            if used[start] {
                continue;
            }
            used[start] = true;
            let mut group = vec![start];
            let mut cursor = 0;
            while cursor < group.len() {
                let e = &self.edges[group[cursor]];
                for v in [e.start_vertex(), e.end_vertex()].into_iter().flatten() {
                    for &next in by_vertex.get(&v.id()).into_iter().flatten() {
                        if !used[next] {
                            used[next] = true;
                            group.push(next);
                        }
                    }
                }
                cursor += 1;
            }
            self.groups.push(group);
        }
        Ok(())
    }

    fn perform_areas(&mut self) -> Result<()> {
        self.areas = self
            .groups
            .iter()
            .map(|g| Shape::wire(g.iter().map(|&i| self.edges[i].clone()).collect()))
            .collect();
        Ok(())
    }

    fn perform_internal_shapes(&mut self) -> Result<()> {
        Ok(())
    }

    fn areas(&self) -> &[Shape] {
        &self.areas
    }
}
