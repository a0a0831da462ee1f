//! Vertex/vertex interferences and vertex merging.

use bop_kernel_ds::{Coincidence, Interference, InterferenceKind, UnionFind};
use bop_kernel_math::{combined_tolerance, Point3, Vec3};
use bop_kernel_topo::ShapeKind;
use tracing::{debug, warn};

use super::{map_pairs, Filling};
use crate::{BopError, BopWarning, Result};

impl Filling<'_> {
    /// Group coincident vertices of different arguments and merge each group
    /// into one new vertex.
    pub(super) fn perform_vv(&mut self) -> Result<()> {
        let pairs = self.candidate_pairs(ShapeKind::Vertex, ShapeKind::Vertex)?;
        let ds = &self.ds;
        let fuzzy = self.fuzzy;
        let hits: Vec<Option<f64>> = map_pairs(self.options.run_parallel, &pairs, |i, j| {
            let (a, b) = (ds.shape(i).ok()?, ds.shape(j).ok()?);
            let d = (a.point()? - b.point()?).norm();
            let tol = combined_tolerance(a.tolerance(), b.tolerance(), fuzzy);
            (d <= tol).then_some(d)
        });

        let mut uf = UnionFind::new(self.ds.nb_shapes());
        let mut found = Vec::new();
        for (&(i, j), hit) in pairs.iter().zip(hits) {
            if let Some(d) = hit {
                uf.union(i, j);
                found.push((i, j, d));
            }
        }
        for group in uf.groups() {
            let merged = self.merge_vertices(&group)?;
            for &(i, j, d) in found.iter().filter(|(i, _, _)| group.contains(i)) {
                self.ds.add_interference(
                    Interference::new(InterferenceKind::VertexVertex, i, j, Coincidence::Point, d)
                        .with_vertex(merged),
                )?;
            }
        }
        debug!(pairs = pairs.len(), coincident = found.len(), "vertex/vertex done");
        Ok(())
    }

    /// Replace `members` by one vertex at their centroid whose tolerance
    /// covers every member ball.
    pub(super) fn merge_vertices(&mut self, members: &[usize]) -> Result<usize> {
        let mut balls = Vec::with_capacity(members.len());
        for &m in members {
            balls.push((self.point_of(m)?, self.tolerance(m)));
        }
        let n = balls.len().max(1) as f64;
        let center = Point3::from(
            balls
                .iter()
                .fold(Vec3::zeros(), |acc, (p, _)| acc + p.coords)
                / n,
        );
        let tolerance = balls
            .iter()
            .map(|(p, t)| (p - center).norm() + t)
            .fold(0.0, f64::max);
        let largest = balls.iter().map(|(_, t)| *t).fold(0.0, f64::max);
        let growth = tolerance - largest;
        if let Some(limit) = self.options.max_tolerance_growth {
            if growth > limit && self.options.strict {
                return Err(BopError::ToleranceConflict { growth, limit });
            }
        }

        let merged = self.new_vertex(center, tolerance)?;
        for &m in members {
            self.ds.add_shape_sd(m, merged)?;
        }
        if let Some(limit) = self.options.max_tolerance_growth {
            if growth > limit {
                warn!(vertex = merged, growth, limit, "merged vertex tolerance grew past the limit");
                self.report.warn(BopWarning::ToleranceConflict {
                    vertex: merged,
                    growth,
                });
            }
        }
        Ok(merged)
    }

    /// Merge vertices queued as coincident during the pair phases, plus any
    /// synthesized vertex that ended up within tolerance of another live one.
    pub(super) fn merge_remaining_vertices(&mut self) -> Result<()> {
        let live: Vec<usize> = self
            .ds
            .indices_of_kind(ShapeKind::Vertex)
            .filter(|&v| !self.ds.has_shape_sd(v))
            .collect();
        let mut uf = UnionFind::new(self.ds.nb_shapes());
        for (a, b) in std::mem::take(&mut self.pending_merges) {
            let (a, b) = (self.ds.same_domain_index(a), self.ds.same_domain_index(b));
            if a != b {
                uf.union(a, b);
            }
        }
        for &i in live.iter().filter(|&&i| self.ds.is_new_shape(i)) {
            let bi = &self.info(i)?.bbox;
            for &j in &live {
                if j == i || !bi.overlaps(&self.info(j)?.bbox) {
                    continue;
                }
                let d = (self.point_of(i)? - self.point_of(j)?).norm();
                if d <= self.pair_tolerance(i, j) {
                    uf.union(i, j);
                }
            }
        }
        let groups = uf.groups();
        for group in &groups {
            self.merge_vertices(group)?;
        }
        debug!(groups = groups.len(), "remaining vertices merged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bop_kernel_intersect::LinearProvider;
    use bop_kernel_topo::Shape;

    use super::*;
    use crate::{BopOptions, PaveFiller};

    fn vertex(x: f64, tol: f64) -> Shape {
        Shape::vertex(Point3::new(x, 0.0, 0.0), tol)
    }

    #[test]
    fn test_close_vertices_merge_to_covering_ball() {
        let mut filler =
            PaveFiller::new(Arc::new(LinearProvider::new()), BopOptions::default());
        let ds = filler
            .perform(&[vertex(0.0, 1e-3), vertex(1e-3, 1e-3)])
            .unwrap();
        assert_eq!(ds.nb_shapes(), 3);
        let merged = ds.same_domain_index(0);
        assert_eq!(merged, 2);
        assert_eq!(ds.same_domain_index(1), 2);
        let info = ds.info(merged).unwrap();
        assert!((info.shape.point().unwrap().x - 5e-4).abs() < 1e-12);
        assert!(info.tolerance >= 1.5e-3 - 1e-12);
        assert_eq!(ds.interferences(InterferenceKind::VertexVertex).count(), 1);
    }

    #[test]
    fn test_fuzzy_value_widens_matching() {
        let args = [vertex(0.0, 1e-7), vertex(0.01, 1e-7)];
        let mut exact = PaveFiller::new(Arc::new(LinearProvider::new()), BopOptions::default());
        assert!(exact.perform(&args).unwrap().all_interferences().is_empty());

        let fuzzy = BopOptions {
            fuzzy_value: 0.02,
            ..BopOptions::default()
        };
        let mut loose = PaveFiller::new(Arc::new(LinearProvider::new()), fuzzy);
        assert_eq!(loose.perform(&args).unwrap().all_interferences().len(), 1);
    }

    #[test]
    fn test_tolerance_growth_limit() {
        let args = [vertex(0.0, 1e-3), vertex(1.5e-3, 1e-3)];
        let limited = BopOptions {
            max_tolerance_growth: Some(1e-4),
            ..BopOptions::default()
        };
        let mut filler = PaveFiller::new(Arc::new(LinearProvider::new()), limited.clone());
        filler.perform(&args).unwrap();
        assert!(filler
            .report()
            .warnings
            .iter()
            .any(|w| matches!(w, BopWarning::ToleranceConflict { .. })));

        let strict = BopOptions {
            strict: true,
            ..limited
        };
        let mut filler = PaveFiller::new(Arc::new(LinearProvider::new()), strict);
        assert!(matches!(
            filler.perform(&args),
            Err(BopError::ToleranceConflict { .. })
        ));
    }
}
