//! Three-dimensional area builder and the solid splitting stage.

use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::TAU;

use bop_kernel_intersect::{GeometryProvider, State};
use bop_kernel_math::{Point3, Vec3};
use bop_kernel_topo::{signed_volume, Orientation, Shape, ShapeId, ShapeKind};
use tracing::{debug, warn};

use super::area::{dangling_parts, is_boundary, AreaBuilder};
use super::{map_items, Builder};
use crate::{BopError, BopWarning, Result};

const ANGLE_EPS: f64 = 1e-9;

/// Rebuilds solids from a soup of oriented split faces.
///
/// Faces of the original boundary are given with their outward
/// orientation, faces lying inside in both orientations. Around every
/// edge a shell continues into the neighbour reached by the smallest
/// rotation through the material, so each shell bounds a minimal volume.
pub struct BuilderSolid<'a> {
    provider: &'a dyn GeometryProvider,
    solid: usize,
    tolerance: f64,
    faces: Vec<Shape>,
    internal: Vec<Shape>,
    avoid_internal: bool,
    avoided: Vec<usize>,
    shells: Vec<Vec<usize>>,
    degenerate: Vec<usize>,
    areas: Vec<Shape>,
    warnings: Vec<BopWarning>,
}

impl<'a> BuilderSolid<'a> {
    /// A builder for the solid at index `solid`.
    pub fn new(provider: &'a dyn GeometryProvider, solid: usize, tolerance: f64) -> Self {
        Self {
            provider,
            solid,
            tolerance,
            faces: Vec::new(),
            internal: Vec::new(),
            avoid_internal: false,
            avoided: Vec::new(),
            shells: Vec::new(),
            degenerate: Vec::new(),
            areas: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Oriented faces to build from.
    pub fn set_faces(&mut self, faces: Vec<Shape>) {
        self.faces = faces;
    }

    /// Faces to keep inside the result without splitting it.
    pub fn set_internal_faces(&mut self, faces: Vec<Shape>) {
        self.internal = faces;
    }

    /// Drop dangling faces instead of keeping them `Internal`.
    pub fn set_avoid_internal_shapes(&mut self, avoid: bool) {
        self.avoid_internal = avoid;
    }

    /// Warnings of the last run.
    pub fn warnings(&self) -> &[BopWarning] {
        &self.warnings
    }

    /// Neighbour of face `i` across its edge occurrence `edge`.
    fn next_face(&self, i: usize, edge: &Shape, users: &[(usize, Shape)]) -> Option<usize> {
        let t = edge_direction(edge)?;
        let nf = self.faces[i].face_normal()?;
        let bf = nf.cross(&t);
        users
            .iter()
            .filter(|(j, _)| *j != i)
            .filter_map(|(j, occ)| {
                let tg = edge_direction(occ)?;
                if tg.dot(&t) >= 0.0 {
                    return None;
                }
                let bg = self.faces[*j].face_normal()?.cross(&tg);
                let mut angle = bf.cross(&bg).dot(&(-t)).atan2(bf.dot(&bg));
                if angle <= ANGLE_EPS {
                    angle += TAU;
                }
                Some((angle, *j))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, j)| j)
    }

    fn sample(&self, face: &Shape) -> Option<Point3> {
        self.provider
            .sample_point_in_face(&face.oriented(Orientation::Forward), 0)
    }

    fn state_in(&self, point: &Point3, solid: &Shape) -> State {
        self.provider
            .classify_point_in_solid(point, solid, self.tolerance)
            .unwrap_or(State::Unknown)
    }
}

impl AreaBuilder for BuilderSolid<'_> {
    fn perform_shapes_to_avoid(&mut self) -> Result<()> {
        self.avoided = dangling_parts(&self.faces, ShapeKind::Edge);
        Ok(())
    }

    fn perform_loops(&mut self) -> Result<()> {
        let n = self.faces.len();
        let mut used = vec![false; n];
        for &i in &self.avoided {
            used[i] = true;
        }
        let mut users: HashMap<ShapeId, Vec<(usize, Shape)>> = HashMap::new();
        for (i, face) in self.faces.iter().enumerate() {
            if used[i] {
                continue;
            }
            for occ in face.explore(ShapeKind::Edge).into_iter().filter(is_boundary) {
                users.entry(occ.id()).or_default().push((i, occ));
            }
        }

        self.shells.clear();
        for start in 0..n {
            if used[start] {
                continue;
            }
            used[start] = true;
            let mut shell = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(i) = queue.pop_front() {
                for occ in self.faces[i].explore(ShapeKind::Edge).into_iter().filter(is_boundary) {
                    let Some(list) = users.get(&occ.id()) else { continue };
                    if let Some(next) = self.next_face(i, &occ, list) {
                        if !used[next] {
                            used[next] = true;
                            shell.push(next);
                            queue.push_back(next);
                        }
                    }
                }
            }
            self.shells.push(shell);
        }
        Ok(())
    }

    fn perform_areas(&mut self) -> Result<()> {
        let mut outers: Vec<(Vec<Shape>, f64, Vec<Shape>)> = Vec::new();
        let mut holes: Vec<Vec<Shape>> = Vec::new();
        self.degenerate.clear();
        for shell in &self.shells {
            let faces: Vec<Shape> = shell.iter().map(|&i| self.faces[i].clone()).collect();
            let mut count: HashMap<ShapeId, usize> = HashMap::new();
            for e in faces.iter().flat_map(|f| f.explore(ShapeKind::Edge)) {
                if is_boundary(&e) {
                    *count.entry(e.id()).or_default() += 1;
                }
            }
            if count.values().any(|&c| c < 2) {
                return Err(BopError::ShellNotClosed { solid: self.solid });
            }
            let volume = signed_volume(faces.iter().cloned());
            if volume.abs() <= self.tolerance.powi(3) {
                self.degenerate.extend(shell.iter().copied());
            } else if volume > 0.0 {
                outers.push((faces, volume, Vec::new()));
            } else {
                holes.push(faces);
            }
        }

        for hole in holes {
            let points: Vec<Point3> = hole.iter().filter_map(|f| self.sample(f)).take(3).collect();
            let container = outers
                .iter()
                .enumerate()
                .filter(|(_, (faces, _, _))| {
                    let probe = Shape::solid(vec![Shape::shell(faces.clone())]);
                    let states: Vec<State> = points.iter().map(|p| self.state_in(p, &probe)).collect();
                    states.contains(&State::In) && !states.contains(&State::Out)
                })
                .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
                .map(|(i, _)| i);
            match container {
                Some(i) => outers[i].2.push(Shape::shell(hole)),
                None => {
                    debug!(solid = self.solid, "hole shell fits in no outer shell");
                    self.warnings
                        .push(BopWarning::UnclassifiedHole { shape: self.solid });
                }
            }
        }

        self.areas = outers
            .into_iter()
            .map(|(faces, _, holes)| {
                let mut shells = vec![Shape::shell(faces)];
                shells.extend(holes);
                Shape::solid(shells)
            })
            .collect();
        Ok(())
    }

    fn perform_internal_shapes(&mut self) -> Result<()> {
        if self.avoid_internal || self.areas.is_empty() {
            return Ok(());
        }
        let mut seen = HashSet::new();
        let candidates: Vec<Shape> = self
            .avoided
            .iter()
            .chain(&self.degenerate)
            .map(|&i| self.faces[i].clone())
            .chain(self.internal.iter().cloned())
            .filter(|f| seen.insert(f.id()))
            .collect();
        let mut extras: Vec<Vec<Shape>> = vec![Vec::new(); self.areas.len()];
        for face in candidates {
            let Some(p) = self.sample(&face) else { continue };
            if let Some(i) = self.areas.iter().position(|a| self.state_in(&p, a) == State::In) {
                extras[i].push(face.oriented(Orientation::Internal));
            }
        }
        for (i, extra) in extras.into_iter().enumerate() {
            if !extra.is_empty() {
                let mut shells: Vec<Shape> = self.areas[i].children().collect();
                shells.push(Shape::shell(extra));
                self.areas[i] = Shape::solid(shells);
            }
        }
        Ok(())
    }

    fn areas(&self) -> &[Shape] {
        &self.areas
    }
}

/// Unit direction of an oriented edge occurrence at its middle.
fn edge_direction(edge: &Shape) -> Option<Vec3> {
    let (_, a, b) = edge.curve()?;
    edge.direction_at(0.5 * (a + b))
}

type SolidImages = (Vec<Shape>, Vec<BopWarning>);

impl Builder<'_> {
    /// Split every solid with the images of its faces and the faces of
    /// other arguments found inside it.
    pub(super) fn split_solids(&mut self) -> Result<()> {
        let solids: Vec<usize> = self.ds.indices_of_kind(ShapeKind::Solid).collect();
        let built = map_items(self.options.run_parallel, &solids, |&s| self.build_solid(s));
        for (&s, result) in solids.iter().zip(built) {
            let (images, warnings) = result?;
            for w in warnings {
                self.report.warn(w);
            }
            for image in &images {
                self.images.add_origin(image, s);
            }
            self.images.solids.insert(s, images);
        }
        debug!(solids = solids.len(), "solids split");
        Ok(())
    }

    fn build_solid(&self, s: usize) -> Result<SolidImages> {
        let ds = self.ds;
        let solid = ds.shape(s)?;
        let rank = ds.rank(s);
        let mut faces: Vec<Shape> = Vec::new();
        let mut unchanged = true;
        for occ in solid.explore(ShapeKind::Face) {
            let images = match ds.index_of(&occ).and_then(|f| self.images.faces.get(&f)) {
                Some(images) => images.clone(),
                None => vec![occ.oriented(Orientation::Forward)],
            };
            if !(images.len() == 1
                && images[0].is_same(&occ)
                && images[0].orientation() == Orientation::Forward)
            {
                unchanged = false;
            }
            if is_boundary(&occ) {
                faces.extend(images.iter().map(|f| f.composed(occ.orientation())));
            } else {
                for f in images {
                    faces.push(f.oriented(Orientation::Forward));
                    faces.push(f.oriented(Orientation::Reversed));
                }
            }
        }

        let tolerance = self.classification_tolerance();
        let bbox = ds.info(s)?.bbox;
        let mut present: HashSet<ShapeId> = faces.iter().map(Shape::id).collect();
        let mut inside: Vec<Shape> = Vec::new();
        let mut warnings: Vec<BopWarning> = Vec::new();
        for f in ds.indices_of_kind(ShapeKind::Face) {
            if ds.rank(f) == rank || !ds.info(f)?.bbox.overlaps(&bbox) {
                continue;
            }
            for image in self.images.faces.get(&f).into_iter().flatten() {
                if present.contains(&image.id()) {
                    continue;
                }
                let forward = image.oriented(Orientation::Forward);
                let Some(p) = self.provider.sample_point_in_face(&forward, 0) else {
                    continue;
                };
                match self.provider.classify_point_in_solid(&p, solid, tolerance) {
                    Ok(State::In) => {
                        present.insert(image.id());
                        inside.push(forward);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(face = f, solid = s, %err, "classification failed, face skipped");
                        warnings.push(BopWarning::IntersectionFailed {
                            first: f,
                            second: s,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        if unchanged && inside.is_empty() {
            return Ok((vec![solid.clone()], warnings));
        }
        for f in inside {
            faces.push(f.reversed());
            faces.push(f);
        }
        let mut builder = BuilderSolid::new(self.provider, s, tolerance);
        builder.set_faces(faces);
        builder.set_avoid_internal_shapes(self.options.avoid_internal_shapes);
        builder.perform()?;
        warnings.extend_from_slice(builder.warnings());
        Ok((builder.areas().to_vec(), warnings))
    }
}
