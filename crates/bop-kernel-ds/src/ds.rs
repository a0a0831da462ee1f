//! The intersection data structure.

use std::collections::{BTreeMap, HashMap};

use bop_kernel_geom::Aabb3;
use bop_kernel_topo::{Orientation, Shape, ShapeId, ShapeKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pave::push_unique;
use crate::{
    Coincidence, CommonBlock, DsError, FaceInfo, IndexRange, Interference, InterferenceKind,
    Param, PassKey, Pave, PaveBlock, Result, ShapeInfo, UnionFind,
};

/// Per-argument enumeration order of sub-shapes.
const INIT_ORDER: [ShapeKind; 7] = [
    ShapeKind::Vertex,
    ShapeKind::Edge,
    ShapeKind::Wire,
    ShapeKind::Face,
    ShapeKind::Shell,
    ShapeKind::Solid,
    ShapeKind::Compound,
];

/// Flat table of every sub-shape of every argument plus everything the
/// filler synthesizes, with the interferences, paves and blocks between them.
///
/// Indices are assigned in argument order, then per-kind order inside the
/// argument (vertices first, the argument itself last). They are only ever
/// appended. Once [`IntersectionDs::close`] is called every mutator fails
/// with [`DsError::Closed`].
#[derive(Debug, Default)]
pub struct IntersectionDs {
    shapes: Vec<ShapeInfo>,
    index: HashMap<ShapeId, usize>,
    arguments: Vec<Shape>,
    ranges: Vec<IndexRange>,
    nb_source: usize,
    fuzzy: f64,
    interferences: Vec<Interference>,
    by_key: HashMap<PassKey, usize>,
    paves: Vec<Vec<Pave>>,
    same_domain: HashMap<usize, usize>,
    pave_blocks: Vec<PaveBlock>,
    edge_blocks: HashMap<usize, Vec<usize>>,
    common_blocks: Vec<CommonBlock>,
    face_info: HashMap<usize, FaceInfo>,
    closed: bool,
}

impl IntersectionDs {
    /// An empty structure with no fuzzy value.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty structure using `fuzzy` as extra proximity tolerance.
    pub fn with_fuzzy_value(fuzzy: f64) -> Self {
        Self {
            fuzzy: fuzzy.max(0.0),
            ..Self::default()
        }
    }

    /// Extra proximity tolerance.
    pub fn fuzzy_value(&self) -> f64 {
        self.fuzzy
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(DsError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.shapes.len() {
            Ok(())
        } else {
            Err(DsError::UnknownIndex(index))
        }
    }

    fn check_edge(&self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if self.shapes[index].kind == ShapeKind::Edge {
            Ok(())
        } else {
            Err(DsError::NotAnEdge(index))
        }
    }

    // =========================================================================
    // Shape table
    // =========================================================================

    /// Index every sub-shape of every argument.
    pub fn init(&mut self, arguments: &[Shape]) -> Result<()> {
        self.check_open()?;
        for arg in arguments {
            let start = self.shapes.len();
            for kind in INIT_ORDER {
                for sub in arg.sub_shapes(kind) {
                    if !sub.is_same(arg) {
                        self.push_shape(&sub);
                    }
                }
            }
            self.push_shape(arg);
            let end = self.shapes.len();
            self.link_new_shapes(start..end);
            self.ranges.push(IndexRange { start, end });
            self.arguments.push(arg.clone());
        }
        self.nb_source = self.shapes.len();
        debug!(
            arguments = arguments.len(),
            shapes = self.nb_source,
            "intersection data structure initialized"
        );
        Ok(())
    }

    /// Append a synthesized shape and return its index.
    ///
    /// A shape already in the table keeps its index. Vertices of a new edge
    /// are appended first when missing, and the edge gets its boundary paves.
    pub fn append_shape(&mut self, shape: &Shape) -> Result<usize> {
        self.check_open()?;
        if let Some(i) = self.index_of(shape) {
            return Ok(i);
        }
        let start = self.shapes.len();
        if shape.kind() == ShapeKind::Edge {
            for v in shape.sub_shapes(ShapeKind::Vertex) {
                self.push_shape(&v);
            }
        }
        let index = self.push_shape(shape);
        self.link_new_shapes(start..self.shapes.len());
        Ok(index)
    }

    fn push_shape(&mut self, shape: &Shape) -> usize {
        if let Some(&i) = self.index.get(&shape.id()) {
            return i;
        }
        let i = self.shapes.len();
        self.shapes.push(ShapeInfo {
            shape: shape.oriented(Orientation::Forward),
            kind: shape.kind(),
            bbox: Aabb3::empty(),
            sub_shapes: Vec::new(),
            tolerance: shape.tolerance(),
        });
        self.paves.push(Vec::new());
        self.index.insert(shape.id(), i);
        i
    }

    /// Fill sub-shape links and boundary paves of freshly pushed entries.
    fn link_new_shapes(&mut self, range: std::ops::Range<usize>) {
        for i in range {
            let shape = self.shapes[i].shape.clone();
            let subs: Vec<usize> = shape
                .children()
                .filter_map(|c| self.index.get(&c.id()).copied())
                .collect();
            self.shapes[i].sub_shapes = subs;
            if let (Some((_, first, last)), Some(v1), Some(v2)) =
                (shape.curve(), shape.first_vertex(), shape.last_vertex())
            {
                let v1 = self.index.get(&v1.id()).copied();
                let v2 = self.index.get(&v2.id()).copied();
                if let (Some(v1), Some(v2)) = (v1, v2) {
                    self.paves[i] = vec![Pave::new(first, v1), Pave::new(last, v2)];
                }
            }
        }
    }

    /// Number of indexed shapes.
    pub fn nb_shapes(&self) -> usize {
        self.shapes.len()
    }

    /// Number of shapes contributed by the arguments.
    pub fn nb_source_shapes(&self) -> usize {
        self.nb_source
    }

    /// Arguments in the order given to `init`.
    pub fn arguments(&self) -> &[Shape] {
        &self.arguments
    }

    /// Index range of each argument.
    pub fn ranges(&self) -> &[IndexRange] {
        &self.ranges
    }

    /// Argument owning `index`, `None` for synthesized shapes.
    pub fn rank(&self, index: usize) -> Option<usize> {
        self.ranges.iter().position(|r| r.contains(index))
    }

    /// True for shapes appended after `init`.
    pub fn is_new_shape(&self, index: usize) -> bool {
        index >= self.nb_source
    }

    /// Index of a shape, orientation ignored.
    pub fn index_of(&self, shape: &Shape) -> Option<usize> {
        self.index.get(&shape.id()).copied()
    }

    /// Cached entry of `index`.
    pub fn info(&self, index: usize) -> Result<&ShapeInfo> {
        self.shapes.get(index).ok_or(DsError::UnknownIndex(index))
    }

    /// Cached entry of `index`, `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&ShapeInfo> {
        self.shapes.get(index)
    }

    /// The shape at `index`, Forward oriented.
    pub fn shape(&self, index: usize) -> Result<&Shape> {
        Ok(&self.info(index)?.shape)
    }

    /// Kind of the shape at `index`.
    pub fn kind(&self, index: usize) -> Result<ShapeKind> {
        Ok(self.info(index)?.kind)
    }

    /// Indices of every shape of `kind`, ascending.
    pub fn indices_of_kind(&self, kind: ShapeKind) -> impl Iterator<Item = usize> + '_ {
        self.shapes
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.kind == kind)
            .map(|(i, _)| i)
    }

    /// Indices of the sub-shapes of `kind` below `index` (unique, DFS order).
    pub fn sub_shapes_of_kind(&self, index: usize, kind: ShapeKind) -> Result<Vec<usize>> {
        Ok(self
            .shape(index)?
            .sub_shapes(kind)
            .iter()
            .filter_map(|s| self.index_of(s))
            .collect())
    }

    /// Store a bounding box, enlarged by half the fuzzy value.
    pub fn set_bounding_box(&mut self, index: usize, bbox: Aabb3) -> Result<()> {
        self.check_open()?;
        self.check_index(index)?;
        self.shapes[index].bbox = bbox.enlarged(0.5 * self.fuzzy);
        Ok(())
    }

    // =========================================================================
    // Interferences
    // =========================================================================

    /// Record an interference.
    ///
    /// Returns `true` for a new record. A re-discovery of the same key is
    /// merged (largest tolerance, existing vertex kept) and returns `false`.
    pub fn add_interference(&mut self, interference: Interference) -> Result<bool> {
        self.check_open()?;
        self.check_index(interference.indices.0)?;
        self.check_index(interference.indices.1)?;
        if let Some(v) = interference.vertex {
            self.check_index(v)?;
        }
        if let Some(&at) = self.by_key.get(&interference.key) {
            let existing = &mut self.interferences[at];
            if existing.kind != interference.kind {
                return Err(DsError::KindCollision {
                    key: interference.key,
                    existing: existing.kind,
                    new: interference.kind,
                });
            }
            existing.merge(&interference);
            return Ok(false);
        }
        self.by_key
            .insert(interference.key.clone(), self.interferences.len());
        self.interferences.push(interference);
        Ok(true)
    }

    /// Records of `kind` in insertion order.
    pub fn interferences(
        &self,
        kind: InterferenceKind,
    ) -> impl Iterator<Item = &Interference> + Clone + '_ {
        self.interferences.iter().filter(move |i| i.kind == kind)
    }

    /// Every record in insertion order.
    pub fn all_interferences(&self) -> &[Interference] {
        &self.interferences
    }

    /// Record stored under `key`.
    pub fn interference(&self, key: &PassKey) -> Option<&Interference> {
        self.by_key.get(key).map(|&i| &self.interferences[i])
    }

    /// True if `i` and `j` already interfere.
    pub fn has_interference(&self, i: usize, j: usize) -> bool {
        self.by_key.contains_key(&PassKey::from_pair(i, j))
    }

    /// Flag a record as obsolete. Returns `false` if the key is unknown.
    pub fn mark_superseded(&mut self, key: &PassKey) -> Result<bool> {
        self.check_open()?;
        match self.by_key.get(key) {
            Some(&i) => {
                self.interferences[i].superseded = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Paves
    // =========================================================================

    /// Parameter tolerance for placing `vertex` on `edge`.
    pub fn parameter_tolerance(&self, edge: usize, vertex: usize) -> f64 {
        let Some(info) = self.shapes.get(edge) else {
            return 0.0;
        };
        let vtol = self.shapes.get(vertex).map_or(0.0, |v| v.tolerance);
        let tol = info.tolerance + vtol + self.fuzzy;
        let speed = info
            .shape
            .curve()
            .map(|(c, first, last)| c.tangent(0.5 * (first + last)).norm())
            .unwrap_or(1.0);
        if speed > f64::EPSILON {
            tol / speed
        } else {
            tol
        }
    }

    /// Insert a pave in parameter order.
    ///
    /// Returns `false` when the same (same-domain) vertex already sits at
    /// that parameter. A different vertex at the parameter, or the same
    /// vertex at another parameter, is an [`DsError::InconsistentPave`].
    pub fn add_pave(&mut self, edge: usize, parameter: f64, vertex: usize) -> Result<bool> {
        self.check_open()?;
        self.check_edge(edge)?;
        self.check_index(vertex)?;
        let vertex_sd = self.same_domain_index(vertex);
        for p in &self.paves[edge] {
            let ptol = self
                .parameter_tolerance(edge, vertex)
                .max(self.parameter_tolerance(edge, p.vertex));
            let close = (p.parameter - parameter).abs() <= ptol;
            let same = self.same_domain_index(p.vertex) == vertex_sd;
            match (close, same) {
                (true, true) => return Ok(false),
                (false, false) => {}
                _ => {
                    return Err(DsError::InconsistentPave {
                        edge,
                        parameter,
                        vertex,
                        existing: p.vertex,
                    })
                }
            }
        }
        let paves = &mut self.paves[edge];
        let at = paves.partition_point(|p| p.parameter < parameter);
        paves.insert(at, Pave::new(parameter, vertex));
        Ok(true)
    }

    /// Paves of an edge in increasing parameter order.
    pub fn paves(&self, edge: usize) -> &[Pave] {
        self.paves.get(edge).map_or(&[], |p| p.as_slice())
    }

    /// The pave of `edge` within tolerance of `parameter`.
    pub fn pave_at(&self, edge: usize, parameter: f64) -> Option<Pave> {
        self.paves(edge)
            .iter()
            .find(|p| (p.parameter - parameter).abs() <= self.parameter_tolerance(edge, p.vertex))
            .copied()
    }

    // =========================================================================
    // Same-domain vertices
    // =========================================================================

    /// Link `index` (and whatever it is already merged into) to `sd`.
    pub fn add_shape_sd(&mut self, index: usize, sd: usize) -> Result<()> {
        self.check_open()?;
        self.check_index(index)?;
        self.check_index(sd)?;
        let target = self.same_domain_index(sd);
        let root = self.same_domain_index(index);
        if root != target {
            self.same_domain.insert(root, target);
        }
        Ok(())
    }

    /// Final same-domain representative of `index` (itself if unlinked).
    pub fn same_domain_index(&self, index: usize) -> usize {
        let mut cur = index;
        for _ in 0..=self.same_domain.len() {
            match self.same_domain.get(&cur) {
                Some(&next) => cur = next,
                None => break,
            }
        }
        cur
    }

    /// True if `index` was merged into another shape.
    pub fn has_shape_sd(&self, index: usize) -> bool {
        self.same_domain.contains_key(&index)
    }

    /// Re-point every pave to the same-domain vertex and collapse duplicates.
    pub fn update_paves_with_sd_vertices(&mut self) -> Result<()> {
        self.check_open()?;
        for edge in 0..self.paves.len() {
            if self.paves[edge].is_empty() {
                continue;
            }
            let old = std::mem::take(&mut self.paves[edge]);
            let last_param = old.last().map(|p| p.parameter);
            let mut updated: Vec<Pave> = Vec::with_capacity(old.len());
            for p in &old {
                let pave = Pave::new(p.parameter, self.same_domain_index(p.vertex));
                if let Some(prev) = updated.iter_mut().find(|q| q.vertex == pave.vertex) {
                    let ptol = 2.0 * self.parameter_tolerance(edge, pave.vertex);
                    if (pave.parameter - prev.parameter).abs() > ptol {
                        return Err(DsError::InconsistentPave {
                            edge,
                            parameter: pave.parameter,
                            vertex: pave.vertex,
                            existing: prev.vertex,
                        });
                    }
                    if Some(pave.parameter) == last_param {
                        prev.parameter = pave.parameter;
                    }
                    continue;
                }
                updated.push(pave);
            }
            self.paves[edge] = updated;
        }
        Ok(())
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Cut every edge into pave blocks, group coincident blocks of different
    /// edges into common blocks and collect per-face information.
    pub fn make_blocks(&mut self) -> Result<()> {
        self.check_open()?;
        self.pave_blocks.clear();
        self.edge_blocks.clear();
        self.common_blocks.clear();
        self.face_info.clear();

        for edge in 0..self.shapes.len() {
            if self.shapes[edge].kind != ShapeKind::Edge {
                continue;
            }
            let mut ids = Vec::new();
            for w in self.paves[edge].windows(2) {
                ids.push(self.pave_blocks.len());
                self.pave_blocks.push(PaveBlock {
                    edge,
                    pave1: w[0],
                    pave2: w[1],
                    common_block: None,
                });
            }
            self.edge_blocks.insert(edge, ids);
        }
        self.build_common_blocks();
        self.build_face_info();
        debug!(
            pave_blocks = self.pave_blocks.len(),
            common_blocks = self.common_blocks.len(),
            faces = self.face_info.len(),
            "blocks built"
        );
        Ok(())
    }

    fn build_common_blocks(&mut self) {
        let mut groups: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for (id, pb) in self.pave_blocks.iter().enumerate() {
            let (a, b) = pb.vertex_pair();
            if a != b {
                groups.entry((a, b)).or_default().push(id);
            }
        }
        for ids in groups.values().filter(|ids| ids.len() > 1) {
            let mut uf = UnionFind::new(ids.len());
            for i in 0..ids.len() {
                for j in i + 1..ids.len() {
                    if self.blocks_coincide(ids[i], ids[j]) {
                        uf.union(i, j);
                    }
                }
            }
            for members in uf.groups() {
                let cb = self.common_blocks.len();
                let pave_blocks: Vec<usize> = members.iter().map(|&m| ids[m]).collect();
                for &pb in &pave_blocks {
                    self.pave_blocks[pb].common_block = Some(cb);
                }
                self.common_blocks.push(CommonBlock {
                    pave_blocks,
                    faces: Vec::new(),
                });
            }
        }
    }

    /// Midpoint of each block lies on the other block's curve.
    fn blocks_coincide(&self, a: usize, b: usize) -> bool {
        let (pa, pb) = (&self.pave_blocks[a], &self.pave_blocks[b]);
        if pa.edge == pb.edge {
            return false;
        }
        let ea = &self.shapes[pa.edge];
        let eb = &self.shapes[pb.edge];
        let tol = ea.tolerance + eb.tolerance + self.fuzzy;
        let on_other = |from: &PaveBlock, from_edge: &ShapeInfo, to: &PaveBlock, to_edge: &ShapeInfo| {
            let (Some((ca, _, _)), Some((cb, _, _))) = (from_edge.shape.curve(), to_edge.shape.curve())
            else {
                return false;
            };
            let p = ca.evaluate(from.mid_parameter());
            let (lo, hi) = to.range();
            let t = cb.project(&p).clamp(lo.min(hi), lo.max(hi));
            (cb.evaluate(t) - p).norm() <= tol
        };
        on_other(pa, ea, pb, eb) && on_other(pb, eb, pa, ea)
    }

    fn build_face_info(&mut self) {
        enum Slot {
            VertexIn(usize),
            BlockIn(usize),
            BlockSc(usize),
        }
        let mut entries: Vec<(usize, Slot)> = Vec::new();
        for rec in self.interferences.iter().filter(|r| !r.superseded) {
            let (i, j) = rec.indices;
            match (rec.kind, &rec.coincidence) {
                (InterferenceKind::FaceFace, Coincidence::Sections(edges)) => {
                    for edge in edges {
                        for &pb in self.edge_blocks.get(edge).into_iter().flatten() {
                            entries.push((i, Slot::BlockSc(pb)));
                            entries.push((j, Slot::BlockSc(pb)));
                        }
                    }
                }
                (InterferenceKind::VertexFace, _) => {
                    let (v, f) = self.order_by_kind(i, j, ShapeKind::Vertex);
                    entries.push((f, Slot::VertexIn(self.same_domain_index(v))));
                }
                (InterferenceKind::EdgeFace, Coincidence::Point) => {
                    let (_, f) = self.order_by_kind(i, j, ShapeKind::Edge);
                    if let Some(v) = rec.vertex {
                        entries.push((f, Slot::VertexIn(self.same_domain_index(v))));
                    }
                }
                (InterferenceKind::EdgeFace, Coincidence::Overlap) => {
                    let (e, f) = self.order_by_kind(i, j, ShapeKind::Edge);
                    let Some(Param::Range(t0, t1)) = rec.param_of(e) else {
                        continue;
                    };
                    for &pb in self.edge_blocks.get(&e).into_iter().flatten() {
                        let block = &self.pave_blocks[pb];
                        let ptol = self.parameter_tolerance(e, block.pave1.vertex);
                        let mid = block.mid_parameter();
                        if mid >= t0.min(t1) - ptol && mid <= t0.max(t1) + ptol {
                            entries.push((f, Slot::BlockIn(pb)));
                        }
                    }
                }
                _ => {}
            }
        }
        for (face, slot) in entries {
            let info = self.face_info.entry(face).or_default();
            let pb = match slot {
                Slot::VertexIn(v) => {
                    push_unique(&mut info.vertices_in, v);
                    continue;
                }
                Slot::BlockIn(pb) => {
                    push_unique(&mut info.blocks_in, pb);
                    pb
                }
                Slot::BlockSc(pb) => {
                    push_unique(&mut info.blocks_sc, pb);
                    pb
                }
            };
            if let Some(cb) = self.pave_blocks[pb].common_block {
                push_unique(&mut self.common_blocks[cb].faces, face);
            }
        }
    }

    /// `(a, b)` reordered so the first one has `kind`.
    fn order_by_kind(&self, a: usize, b: usize, kind: ShapeKind) -> (usize, usize) {
        if self.shapes.get(a).map(|s| s.kind) == Some(kind) {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Pave block ids of an edge, in parameter order.
    pub fn pave_blocks(&self, edge: usize) -> &[usize] {
        self.edge_blocks.get(&edge).map_or(&[], |v| v.as_slice())
    }

    /// Pave block by id.
    pub fn pave_block(&self, id: usize) -> Option<&PaveBlock> {
        self.pave_blocks.get(id)
    }

    /// Common block by id.
    pub fn common_block(&self, id: usize) -> Option<&CommonBlock> {
        self.common_blocks.get(id)
    }

    /// Every common block.
    pub fn common_blocks(&self) -> &[CommonBlock] {
        &self.common_blocks
    }

    /// Representative of a pave block: the first member of its common block,
    /// or the block itself.
    pub fn real_pave_block(&self, id: usize) -> usize {
        self.pave_blocks
            .get(id)
            .and_then(|pb| pb.common_block)
            .and_then(|cb| self.common_blocks.get(cb))
            .and_then(|cb| cb.pave_blocks.first().copied())
            .unwrap_or(id)
    }

    /// Intersection results collected for a face.
    pub fn face_info(&self, face: usize) -> Option<&FaceInfo> {
        self.face_info.get(&face)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Freeze the structure; later mutations fail with [`DsError::Closed`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// True once closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Serializable snapshot of the whole structure.
    pub fn dump(&self) -> DsSummary {
        let shapes = self
            .shapes
            .iter()
            .enumerate()
            .map(|(index, s)| ShapeSummary {
                index,
                kind: s.kind,
                rank: self.rank(index),
                same_domain: self.same_domain.get(&index).map(|_| self.same_domain_index(index)),
                tolerance: s.tolerance,
                sub_shapes: s.sub_shapes.clone(),
            })
            .collect();
        let paves = self
            .paves
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
            .map(|(i, p)| (i, p.clone()))
            .collect();
        let mut counts = BTreeMap::new();
        for rec in &self.interferences {
            *counts.entry(rec.kind.tag().to_string()).or_insert(0) += 1;
        }
        DsSummary {
            nb_source_shapes: self.nb_source,
            nb_shapes: self.shapes.len(),
            ranges: self.ranges.clone(),
            shapes,
            interference_counts: counts,
            interferences: self.interferences.clone(),
            paves,
            pave_blocks: self.pave_blocks.clone(),
            common_blocks: self.common_blocks.clone(),
        }
    }
}

/// One shape-table entry in a [`DsSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSummary {
    /// Index in the table.
    pub index: usize,
    /// Kind of the shape.
    pub kind: ShapeKind,
    /// Owning argument, `None` for synthesized shapes.
    pub rank: Option<usize>,
    /// Same-domain representative, if merged.
    pub same_domain: Option<usize>,
    /// Tolerance.
    pub tolerance: f64,
    /// Direct sub-shape indices.
    pub sub_shapes: Vec<usize>,
}

/// Snapshot of an [`IntersectionDs`] for inspection and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsSummary {
    /// Shapes contributed by the arguments.
    pub nb_source_shapes: usize,
    /// All shapes, synthesized included.
    pub nb_shapes: usize,
    /// Index range per argument.
    pub ranges: Vec<IndexRange>,
    /// Shape table.
    pub shapes: Vec<ShapeSummary>,
    /// Number of records per kind tag.
    pub interference_counts: BTreeMap<String, usize>,
    /// Every interference record.
    pub interferences: Vec<Interference>,
    /// Paves per edge index.
    pub paves: BTreeMap<usize, Vec<Pave>>,
    /// Pave blocks.
    pub pave_blocks: Vec<PaveBlock>,
    /// Common blocks.
    pub common_blocks: Vec<CommonBlock>,
}

impl DsSummary {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_kernel_math::Point3;
    use bop_kernel_topo::make_box;

    fn unit_box_ds() -> IntersectionDs {
        let mut ds = IntersectionDs::new();
        ds.init(&[make_box(Point3::origin(), 1.0, 1.0, 1.0)]).unwrap();
        ds
    }

    fn first_edge(ds: &IntersectionDs) -> usize {
        ds.indices_of_kind(ShapeKind::Edge).next().unwrap()
    }

    #[test]
    fn test_init_orders_by_kind() {
        let ds = unit_box_ds();
        assert_eq!(ds.nb_shapes(), 8 + 12 + 6 + 6 + 1 + 1);
        assert_eq!(ds.nb_source_shapes(), ds.nb_shapes());
        let kinds: Vec<ShapeKind> = (0..ds.nb_shapes()).map(|i| ds.kind(i).unwrap()).collect();
        assert!(kinds[..8].iter().all(|k| *k == ShapeKind::Vertex));
        assert!(kinds[8..20].iter().all(|k| *k == ShapeKind::Edge));
        assert_eq!(kinds[33], ShapeKind::Solid);
        assert_eq!(ds.ranges(), &[IndexRange { start: 0, end: 34 }]);
        assert_eq!(ds.rank(33), Some(0));
        assert!(ds.shape(33).unwrap().is_same(&ds.arguments()[0]));
    }

    #[test]
    fn test_init_two_arguments() {
        let a = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        let b = make_box(Point3::new(5.0, 0.0, 0.0), 1.0, 1.0, 1.0);
        let mut ds = IntersectionDs::new();
        ds.init(&[a, b.clone()]).unwrap();
        assert_eq!(ds.ranges().len(), 2);
        assert_eq!(ds.ranges()[1], IndexRange { start: 34, end: 68 });
        assert_eq!(ds.rank(40), Some(1));
        assert_eq!(ds.index_of(&b), Some(67));
        let face = ds.indices_of_kind(ShapeKind::Face).next().unwrap();
        assert_eq!(ds.info(face).unwrap().sub_shapes.len(), 1);
    }

    #[test]
    fn test_boundary_paves_present_after_init() {
        let ds = unit_box_ds();
        let e = first_edge(&ds);
        let paves = ds.paves(e);
        assert_eq!(paves.len(), 2);
        assert_eq!(paves[0].parameter, 0.0);
        assert_eq!(paves[1].parameter, 1.0);
        assert_ne!(paves[0].vertex, paves[1].vertex);
        assert!(ds.paves(0).is_empty());
    }

    #[test]
    fn test_append_shape_is_new() {
        let mut ds = unit_box_ds();
        let n = ds.nb_shapes();
        let v = Shape::vertex(Point3::new(0.5, 0.0, 0.0), 1e-7);
        let i = ds.append_shape(&v).unwrap();
        assert_eq!(i, n);
        assert!(ds.is_new_shape(i));
        assert_eq!(ds.rank(i), None);
        assert_eq!(ds.append_shape(&v).unwrap(), i);
    }

    #[test]
    fn test_append_edge_appends_vertices_and_paves() {
        let mut ds = IntersectionDs::new();
        let a = Shape::vertex(Point3::origin(), 1e-7);
        let b = Shape::vertex(Point3::new(1.0, 0.0, 0.0), 1e-7);
        let e = ds.append_shape(&Shape::line(&a, &b)).unwrap();
        assert_eq!(e, 2);
        assert_eq!(ds.paves(e), &[Pave::new(0.0, 0), Pave::new(1.0, 1)]);
    }

    #[test]
    fn test_interference_dedup_keeps_max_tolerance() {
        let mut ds = unit_box_ds();
        let rec = |tol| Interference::new(InterferenceKind::VertexVertex, 0, 1, Coincidence::Point, tol);
        assert!(ds.add_interference(rec(1e-7)).unwrap());
        let mut again = rec(1e-5);
        again.indices = (1, 0);
        again.key = PassKey::from_pair(1, 0);
        assert!(!ds.add_interference(again).unwrap());
        let all: Vec<_> = ds.interferences(InterferenceKind::VertexVertex).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tolerance, 1e-5);
    }

    #[test]
    fn test_interference_kind_collision() {
        let mut ds = unit_box_ds();
        ds.add_interference(Interference::new(InterferenceKind::VertexEdge, 0, 9, Coincidence::Point, 1e-7))
            .unwrap();
        let err = ds
            .add_interference(Interference::new(InterferenceKind::EdgeEdge, 9, 0, Coincidence::Point, 1e-7))
            .unwrap_err();
        assert!(matches!(err, DsError::KindCollision { .. }));
    }

    #[test]
    fn test_interferences_iterator_is_restartable() {
        let mut ds = unit_box_ds();
        for j in 1..4 {
            ds.add_interference(Interference::new(InterferenceKind::VertexVertex, 0, j, Coincidence::Point, 1e-7))
                .unwrap();
        }
        let it = ds.interferences(InterferenceKind::VertexVertex);
        let first: Vec<usize> = it.clone().map(|r| r.indices.1).collect();
        let second: Vec<usize> = it.map(|r| r.indices.1).collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(ds.interferences(InterferenceKind::FaceFace).count(), 0);
    }

    #[test]
    fn test_mark_superseded() {
        let mut ds = unit_box_ds();
        ds.add_interference(Interference::new(InterferenceKind::VertexVertex, 0, 1, Coincidence::Point, 1e-7))
            .unwrap();
        let key = PassKey::from_pair(1, 0);
        assert!(ds.mark_superseded(&key).unwrap());
        assert!(ds.interference(&key).unwrap().superseded);
        assert!(!ds.mark_superseded(&PassKey::from_pair(2, 3)).unwrap());
        ds.close();
        assert_eq!(ds.mark_superseded(&key), Err(DsError::Closed));
    }

    #[test]
    fn test_add_interference_rejects_unknown_index() {
        let mut ds = unit_box_ds();
        let err = ds
            .add_interference(Interference::new(InterferenceKind::VertexVertex, 0, 999, Coincidence::Point, 1e-7))
            .unwrap_err();
        assert_eq!(err, DsError::UnknownIndex(999));
    }

    #[test]
    fn test_add_pave_keeps_order() {
        let mut ds = unit_box_ds();
        let e = first_edge(&ds);
        let v1 = ds.append_shape(&Shape::vertex(Point3::new(9.0, 9.0, 9.0), 1e-7)).unwrap();
        let v2 = ds.append_shape(&Shape::vertex(Point3::new(8.0, 8.0, 8.0), 1e-7)).unwrap();
        assert!(ds.add_pave(e, 0.75, v1).unwrap());
        assert!(ds.add_pave(e, 0.25, v2).unwrap());
        let params: Vec<f64> = ds.paves(e).iter().map(|p| p.parameter).collect();
        assert_eq!(params, vec![0.0, 0.25, 0.75, 1.0]);
        // same vertex, same parameter: no-op
        assert!(!ds.add_pave(e, 0.25, v2).unwrap());
        assert_eq!(ds.pave_at(e, 0.75).map(|p| p.vertex), Some(v1));
    }

    #[test]
    fn test_add_pave_inconsistencies() {
        let mut ds = unit_box_ds();
        let e = first_edge(&ds);
        let v1 = ds.append_shape(&Shape::vertex(Point3::new(9.0, 9.0, 9.0), 1e-7)).unwrap();
        let v2 = ds.append_shape(&Shape::vertex(Point3::new(8.0, 8.0, 8.0), 1e-7)).unwrap();
        ds.add_pave(e, 0.5, v1).unwrap();
        assert!(matches!(
            ds.add_pave(e, 0.5, v2),
            Err(DsError::InconsistentPave { existing, .. }) if existing == v1
        ));
        assert!(matches!(ds.add_pave(e, 0.25, v1), Err(DsError::InconsistentPave { .. })));
        assert_eq!(ds.add_pave(0, 0.5, v1), Err(DsError::NotAnEdge(0)));
    }

    #[test]
    fn test_same_domain_chain() {
        let mut ds = unit_box_ds();
        ds.add_shape_sd(0, 1).unwrap();
        ds.add_shape_sd(1, 2).unwrap();
        assert_eq!(ds.same_domain_index(0), 2);
        assert!(ds.has_shape_sd(0));
        assert!(!ds.has_shape_sd(2));
        // linking back does not create a cycle
        ds.add_shape_sd(2, 0).unwrap();
        assert_eq!(ds.same_domain_index(0), 2);
    }

    #[test]
    fn test_update_paves_with_sd_vertices() {
        let mut ds = unit_box_ds();
        let e = first_edge(&ds);
        let start = ds.paves(e)[0].vertex;
        let merged = ds.append_shape(&Shape::vertex(Point3::origin(), 1e-7)).unwrap();
        ds.add_shape_sd(start, merged).unwrap();
        ds.update_paves_with_sd_vertices().unwrap();
        assert_eq!(ds.paves(e)[0].vertex, merged);
        // same vertex is now recognized at the boundary parameter
        assert!(!ds.add_pave(e, 0.0, start).unwrap());
    }

    #[test]
    fn test_common_block_for_coincident_edges() {
        let mut ds = IntersectionDs::new();
        let a = Shape::vertex(Point3::origin(), 1e-7);
        let b = Shape::vertex(Point3::new(2.0, 0.0, 0.0), 1e-7);
        let e1 = ds.append_shape(&Shape::line(&a, &b)).unwrap();
        let e2 = ds.append_shape(&Shape::line(&b, &a)).unwrap();
        let a2 = Shape::vertex(Point3::new(0.0, 1.0, 0.0), 1e-7);
        let e3 = ds.append_shape(&Shape::line(&a2, &b)).unwrap();
        ds.make_blocks().unwrap();
        let pb1 = ds.pave_blocks(e1)[0];
        let pb2 = ds.pave_blocks(e2)[0];
        let cb = ds.pave_block(pb1).unwrap().common_block.unwrap();
        assert_eq!(ds.pave_block(pb2).unwrap().common_block, Some(cb));
        assert_eq!(ds.common_block(cb).unwrap().pave_blocks, vec![pb1, pb2]);
        assert_eq!(ds.real_pave_block(pb2), pb1);
        let pb3 = ds.pave_blocks(e3)[0];
        assert_eq!(ds.pave_block(pb3).unwrap().common_block, None);
    }

    #[test]
    fn test_close_rejects_mutation() {
        let mut ds = unit_box_ds();
        ds.close();
        assert!(ds.is_closed());
        assert_eq!(ds.append_shape(&Shape::vertex(Point3::origin(), 1e-7)), Err(DsError::Closed));
        assert_eq!(ds.add_pave(8, 0.5, 0), Err(DsError::Closed));
        assert_eq!(ds.make_blocks(), Err(DsError::Closed));
    }

    #[test]
    fn test_dump_serializes() {
        let mut ds = unit_box_ds();
        ds.add_interference(Interference::new(InterferenceKind::VertexVertex, 0, 1, Coincidence::Point, 1e-7))
            .unwrap();
        let summary = ds.dump();
        assert_eq!(summary.nb_shapes, 34);
        assert_eq!(summary.interference_counts.get("VV"), Some(&1));
        let json = summary.to_json().unwrap();
        assert!(json.contains("VertexVertex"));
        let back: DsSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.paves.len(), 12);
    }
}
