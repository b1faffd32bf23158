//! Flat topology store: object arrays, per-level cell arrays and free-slot
//! bookkeeping.
//!
//! Objects are never renumbered by deletion. Removing an object clears its
//! `used` bit and leaves a hole that later allocations may reuse. Children of
//! an object occupy a contiguous run of slots; line children and children of
//! anisotropically cut quads are aligned pairs, children of isotropically
//! cut quads aligned runs of four.

use crate::topology::cell_type::ReferenceCell;
use crate::topology::orientation::FaceOrientation;
use crate::topology::refinement_case::RefinementCase;
use crate::types::{CellId, INVALID_SUBDOMAIN_ID, INVALID_UNSIGNED_INT, INTERNAL_FACE_BOUNDARY_ID};

/// Arrays describing all objects of one structural dimension.
#[derive(Clone, Debug, Default)]
pub struct TriaObjects {
    structdim: usize,
    stores_cells: bool,
    pub kinds: Vec<ReferenceCell>,
    /// Cached vertex tuples, stride `2^structdim`, padded with
    /// `INVALID_UNSIGNED_INT` for simplices.
    pub vertices: Vec<u32>,
    /// Bounding objects (lines of quads, quads or lines of cells), stride
    /// [`TriaObjects::bounds_stride`]. Empty for lines, whose bounds are
    /// their vertices.
    pub bounds: Vec<u32>,
    /// Index of the first child, `INVALID_UNSIGNED_INT` if none.
    pub children: Vec<u32>,
    pub refinement_cases: Vec<RefinementCase>,
    /// Parent object (for cells: index on the next coarser level).
    pub parents: Vec<u32>,
    pub used: Vec<bool>,
    pub user_flags: Vec<bool>,
    pub user_data: Vec<u64>,
    /// Boundary id for faces and lines, material id for cells.
    pub boundary_or_material_id: Vec<u32>,
    pub manifold_id: Vec<u32>,
    next_free_run: usize,
    next_free_single: usize,
    singles_from_pairs: bool,
}

impl TriaObjects {
    pub fn new(structdim: usize) -> Self {
        TriaObjects {
            structdim,
            ..Default::default()
        }
    }

    /// Object store for the cells of one level.
    pub fn for_cells(dim: usize) -> Self {
        TriaObjects {
            structdim: dim,
            stores_cells: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn structdim(&self) -> usize {
        self.structdim
    }

    #[inline]
    fn vertex_stride(&self) -> usize {
        1 << self.structdim
    }

    /// Number of bounding-object slots per object.
    #[inline]
    pub fn bounds_stride(&self) -> usize {
        match self.structdim {
            0 | 1 => 0,
            2 => 4,
            _ => 6,
        }
    }

    /// Number of raw slots (used or not).
    #[inline]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn n_used(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }

    #[inline]
    pub fn is_used(&self, i: usize) -> bool {
        self.used.get(i).copied().unwrap_or(false)
    }

    #[inline]
    pub fn kind(&self, i: usize) -> ReferenceCell {
        self.kinds[i]
    }

    /// Vertex tuple of object `i`.
    pub fn vertices_of(&self, i: usize) -> &[u32] {
        let s = self.vertex_stride();
        &self.vertices[i * s..i * s + self.kinds[i].n_vertices()]
    }

    pub fn set_vertices(&mut self, i: usize, vertices: &[u32]) {
        let s = self.vertex_stride();
        let slot = &mut self.vertices[i * s..(i + 1) * s];
        slot.fill(INVALID_UNSIGNED_INT);
        slot[..vertices.len()].copy_from_slice(vertices);
    }

    /// Bounding objects of object `i`: vertices for lines, lines for
    /// quads, faces for cells.
    pub fn bounds_of(&self, i: usize) -> &[u32] {
        let s = self.bounds_stride();
        if s == 0 {
            return self.vertices_of(i);
        }
        let n = match self.structdim {
            2 => self.kinds[i].n_lines(),
            _ => self.kinds[i].n_faces(),
        };
        &self.bounds[i * s..i * s + n]
    }

    pub fn set_bounds(&mut self, i: usize, bounds: &[u32]) {
        let s = self.bounds_stride();
        if s == 0 {
            self.set_vertices(i, bounds);
            return;
        }
        let slot = &mut self.bounds[i * s..(i + 1) * s];
        slot.fill(INVALID_UNSIGNED_INT);
        slot[..bounds.len()].copy_from_slice(bounds);
    }

    #[inline]
    pub fn has_children(&self, i: usize) -> bool {
        self.children[i] != INVALID_UNSIGNED_INT
    }

    /// Number of children object `i` currently has.
    pub fn n_children(&self, i: usize) -> usize {
        if !self.has_children(i) {
            return 0;
        }
        let kind = self.kinds[i];
        if kind.is_simplex() && kind.dim() > 1 {
            kind.n_isotropic_children()
        } else {
            self.refinement_cases[i].n_children()
        }
    }

    /// Index of child `k` of object `i`.
    #[inline]
    pub fn child(&self, i: usize, k: usize) -> usize {
        self.children[i] as usize + k
    }

    /// Children of object `i` as an index range.
    pub fn child_range(&self, i: usize) -> std::ops::Range<usize> {
        if self.has_children(i) {
            let first = self.children[i] as usize;
            first..first + self.n_children(i)
        } else {
            0..0
        }
    }

    #[inline]
    pub fn parent(&self, i: usize) -> Option<usize> {
        match self.parents[i] {
            INVALID_UNSIGNED_INT => None,
            p => Some(p as usize),
        }
    }

    fn default_id(&self) -> u32 {
        // faces and lines default to interior, cells to material 0
        if self.stores_cells {
            0
        } else {
            INTERNAL_FACE_BOUNDARY_ID
        }
    }

    fn push_default(&mut self) {
        let id = self.default_id();
        self.kinds.push(ReferenceCell::default_for(self.structdim));
        self.vertices
            .extend(std::iter::repeat_n(INVALID_UNSIGNED_INT, self.vertex_stride()));
        self.bounds
            .extend(std::iter::repeat_n(INVALID_UNSIGNED_INT, self.bounds_stride()));
        self.children.push(INVALID_UNSIGNED_INT);
        self.refinement_cases.push(RefinementCase::NONE);
        self.parents.push(INVALID_UNSIGNED_INT);
        self.used.push(false);
        self.user_flags.push(false);
        self.user_data.push(0);
        self.boundary_or_material_id.push(id);
        self.manifold_id.push(crate::types::FLAT_MANIFOLD_ID);
    }

    /// Grow the arrays to at least `n` slots.
    pub fn grow_to(&mut self, n: usize) {
        while self.len() < n {
            self.push_default();
        }
    }

    /// Reset slot `i` to its unused default state.
    pub fn clear_slot(&mut self, i: usize) {
        let id = self.default_id();
        self.kinds[i] = ReferenceCell::default_for(self.structdim);
        self.set_vertices(i, &[]);
        if self.bounds_stride() > 0 {
            self.set_bounds(i, &[]);
        }
        self.children[i] = INVALID_UNSIGNED_INT;
        self.refinement_cases[i] = RefinementCase::NONE;
        self.parents[i] = INVALID_UNSIGNED_INT;
        self.used[i] = false;
        self.user_flags[i] = false;
        self.user_data[i] = 0;
        self.boundary_or_material_id[i] = id;
        self.manifold_id[i] = crate::types::FLAT_MANIFOLD_ID;
    }

    /// Turn unused slot `i` into a fresh, unrefined object.
    #[allow(clippy::too_many_arguments)]
    pub fn init_slot(
        &mut self,
        i: usize,
        kind: ReferenceCell,
        vertices: &[u32],
        bounds: &[u32],
        parent: Option<usize>,
        id: u32,
        manifold: u32,
    ) {
        self.kinds[i] = kind;
        self.set_vertices(i, vertices);
        if self.bounds_stride() > 0 {
            self.set_bounds(i, bounds);
        }
        self.children[i] = INVALID_UNSIGNED_INT;
        self.refinement_cases[i] = RefinementCase::NONE;
        self.parents[i] = parent.map_or(INVALID_UNSIGNED_INT, |p| p as u32);
        self.used[i] = true;
        self.user_flags[i] = false;
        self.user_data[i] = 0;
        self.boundary_or_material_id[i] = id;
        self.manifold_id[i] = manifold;
    }

    /// Exchange everything stored in slots `a` and `b`. References held by
    /// other objects are not touched.
    pub fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let vs = self.vertex_stride();
        for k in 0..vs {
            self.vertices.swap(a * vs + k, b * vs + k);
        }
        let bs = self.bounds_stride();
        for k in 0..bs {
            self.bounds.swap(a * bs + k, b * bs + k);
        }
        self.kinds.swap(a, b);
        self.children.swap(a, b);
        self.refinement_cases.swap(a, b);
        self.parents.swap(a, b);
        self.used.swap(a, b);
        self.user_flags.swap(a, b);
        self.user_data.swap(a, b);
        self.boundary_or_material_id.swap(a, b);
        self.manifold_id.swap(a, b);
    }

    fn last_used(&self) -> Option<usize> {
        self.used.iter().rposition(|&u| u)
    }

    fn run_is_free(&self, start: usize, n: usize) -> bool {
        start + n <= self.len() && self.used[start..start + n].iter().all(|&u| !u)
    }

    /// Count aligned free runs of length `n`.
    fn count_free_runs(&self, n: usize) -> usize {
        (0..self.len() / n)
            .filter(|&k| self.run_is_free(k * n, n))
            .count()
    }

    /// Make room for `n_quads` aligned runs of four, `n_pairs` aligned pairs
    /// and `n_singles` single slots, so that the following `next_free_*`
    /// calls are served from existing slots.
    pub fn reserve_for_objects(&mut self, n_quads: usize, n_pairs: usize, n_singles: usize) {
        let free = self.used.iter().filter(|&&u| !u).count();
        let quads_avail = self.count_free_runs(4).min(n_quads);
        let pairs_avail = (self.count_free_runs(2) - 2 * quads_avail).min(n_pairs);
        let singles_avail = free - 4 * quads_avail - 2 * pairs_avail;
        let deficit = 4 * (n_quads - quads_avail)
            + 2 * (n_pairs - pairs_avail)
            + n_singles.saturating_sub(singles_avail);
        if deficit > 0 {
            let aligned = self.len().next_multiple_of(4);
            self.grow_to(aligned + deficit.next_multiple_of(4));
        }
        log::trace!(
            "reserve_for_objects(dim {}): {} runs of 4, {} pairs, {} singles; {} slots",
            self.structdim,
            n_quads,
            n_pairs,
            n_singles,
            self.len()
        );
        self.next_free_run = 0;
        self.next_free_single = self.len();
        self.singles_from_pairs = false;
    }

    /// Make room for `n_new` cells allocated in runs on this level.
    pub fn reserve_for_cells(&mut self, n_new: usize) {
        let tail = self.last_used().map_or(0, |i| i + 1);
        self.grow_to(tail + n_new);
        self.next_free_run = 0;
        self.next_free_single = self.len();
        self.singles_from_pairs = false;
    }

    /// First slot of `n` consecutive unused slots starting at a multiple of
    /// `align`. Grows the arrays if no such run exists.
    pub fn next_free_run(&mut self, n: usize, align: usize) -> usize {
        let mut start = self.next_free_run.next_multiple_of(align);
        while start + n <= self.len() {
            if self.run_is_free(start, n) {
                self.next_free_run = start + n;
                return start;
            }
            start += align;
        }
        let start = self.len().next_multiple_of(align);
        log::warn!(
            "object store (dim {}) grew past its reservation for a run of {}",
            self.structdim,
            n
        );
        self.grow_to(start + n);
        self.next_free_run = start + n;
        start
    }

    /// Aligned pair of unused slots.
    #[inline]
    pub fn next_free_pair(&mut self) -> usize {
        self.next_free_run(2, 2)
    }

    /// A single unused slot. Slots whose aligned partner is in use are
    /// handed out first so free pairs stay intact.
    pub fn next_free_single(&mut self) -> usize {
        loop {
            while self.next_free_single > 0 {
                self.next_free_single -= 1;
                let i = self.next_free_single;
                if self.used[i] {
                    continue;
                }
                let partner_used = self.used.get(i ^ 1).copied().unwrap_or(true);
                if self.singles_from_pairs || partner_used {
                    return i;
                }
            }
            if self.singles_from_pairs {
                break;
            }
            self.singles_from_pairs = true;
            self.next_free_single = self.len();
        }
        log::warn!(
            "object store (dim {}) grew past its reservation for a single slot",
            self.structdim
        );
        let i = self.len();
        self.push_default();
        i
    }
}

/// Per-level cell arrays.
#[derive(Clone, Debug, Default)]
pub struct TriaLevel {
    pub cells: TriaObjects,
    pub refine_flags: Vec<RefinementCase>,
    pub coarsen_flags: Vec<bool>,
    pub active_cell_indices: Vec<u32>,
    pub global_active_cell_indices: Vec<u64>,
    pub global_level_cell_indices: Vec<u64>,
    pub subdomain_ids: Vec<u32>,
    pub level_subdomain_ids: Vec<u32>,
    /// Neighbor across each face, stride `n_faces_per_cell`.
    pub neighbors: Vec<Option<CellId>>,
    /// Orientation of each face as seen from the cell; empty in 1D.
    pub face_orientations: Vec<FaceOrientation>,
    /// Codim-1 meshes: whether the cell's normal agrees with its vertex order.
    pub direction_flags: Vec<bool>,
    n_faces_per_cell: usize,
}

impl TriaLevel {
    pub fn new(dim: usize) -> Self {
        TriaLevel {
            cells: TriaObjects::for_cells(dim),
            n_faces_per_cell: 2 * dim,
            ..Default::default()
        }
    }

    #[inline]
    pub fn n_faces_per_cell(&self) -> usize {
        self.n_faces_per_cell
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Grow every per-cell array so that `n_new` cells can be allocated on
    /// this level. Orientation storage is only kept when some face can be
    /// seen in a non-standard way.
    pub fn reserve_for_cells(&mut self, n_new: usize, orientation_needed: bool) {
        self.cells.reserve_for_cells(n_new);
        self.sync_len(orientation_needed);
    }

    /// Resize the parallel arrays to the object store's length.
    pub fn sync_len(&mut self, orientation_needed: bool) {
        let n = self.cells.len();
        let nf = self.n_faces_per_cell;
        self.refine_flags.resize(n, RefinementCase::NONE);
        self.coarsen_flags.resize(n, false);
        self.active_cell_indices.resize(n, INVALID_UNSIGNED_INT);
        self.global_active_cell_indices
            .resize(n, crate::types::INVALID_DOF_INDEX);
        self.global_level_cell_indices
            .resize(n, crate::types::INVALID_DOF_INDEX);
        self.subdomain_ids.resize(n, 0);
        self.level_subdomain_ids.resize(n, INVALID_SUBDOMAIN_ID);
        self.neighbors.resize(n * nf, None);
        if orientation_needed || !self.face_orientations.is_empty() {
            self.face_orientations
                .resize(n * nf, FaceOrientation::STANDARD);
        }
        self.direction_flags.resize(n, true);
    }

    /// Allocate a run of `n` consecutive cell slots.
    pub fn next_free_cells(&mut self, n: usize) -> usize {
        let first = self.cells.next_free_run(n, 1);
        let orientation_needed = !self.face_orientations.is_empty();
        self.sync_len(orientation_needed);
        first
    }

    #[inline]
    pub fn neighbor(&self, i: usize, f: usize) -> Option<CellId> {
        self.neighbors[i * self.n_faces_per_cell + f]
    }

    #[inline]
    pub fn set_neighbor(&mut self, i: usize, f: usize, n: Option<CellId>) {
        self.neighbors[i * self.n_faces_per_cell + f] = n;
    }

    #[inline]
    pub fn face_orientation(&self, i: usize, f: usize) -> FaceOrientation {
        self.face_orientations
            .get(i * self.n_faces_per_cell + f)
            .copied()
            .unwrap_or(FaceOrientation::STANDARD)
    }

    pub fn set_face_orientation(&mut self, i: usize, f: usize, o: FaceOrientation) {
        let k = i * self.n_faces_per_cell + f;
        if self.face_orientations.len() <= k {
            if o.is_standard() {
                return;
            }
            self.face_orientations
                .resize(self.cells.len() * self.n_faces_per_cell, FaceOrientation::STANDARD);
        }
        self.face_orientations[k] = o;
    }

    /// Reset cell slot `i` and every per-cell entry to the unused state.
    pub fn clear_cell(&mut self, i: usize) {
        self.cells.clear_slot(i);
        self.refine_flags[i] = RefinementCase::NONE;
        self.coarsen_flags[i] = false;
        self.active_cell_indices[i] = INVALID_UNSIGNED_INT;
        self.global_active_cell_indices[i] = crate::types::INVALID_DOF_INDEX;
        self.global_level_cell_indices[i] = crate::types::INVALID_DOF_INDEX;
        self.subdomain_ids[i] = 0;
        self.level_subdomain_ids[i] = INVALID_SUBDOMAIN_ID;
        for f in 0..self.n_faces_per_cell {
            self.set_neighbor(i, f, None);
            if !self.face_orientations.is_empty() {
                self.face_orientations[i * self.n_faces_per_cell + f] = FaceOrientation::STANDARD;
            }
        }
        self.direction_flags[i] = true;
    }
}

/// Level-less face and line objects of 2D and 3D meshes.
#[derive(Clone, Debug, Default)]
pub struct TriaFaces {
    /// Lines (2D: the faces; 3D: edges).
    pub lines: TriaObjects,
    /// Quads and triangles (3D only).
    pub quads: TriaObjects,
}

impl TriaFaces {
    pub fn new() -> Self {
        TriaFaces {
            lines: TriaObjects::new(1),
            quads: TriaObjects::new(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(objects: &mut TriaObjects, i: usize) {
        objects.used[i] = true;
    }

    #[test]
    fn line_bounds_are_its_vertices() {
        let mut lines = TriaObjects::new(1);
        lines.grow_to(2);
        lines.set_bounds(1, &[4, 7]);
        assert_eq!(lines.bounds_of(1), &[4, 7]);
        assert_eq!(lines.vertices_of(0), &[INVALID_UNSIGNED_INT; 2]);

        let mut quads = TriaObjects::new(2);
        quads.grow_to(1);
        quads.set_bounds(0, &[3, 1, 4, 1]);
        assert_eq!(quads.bounds_of(0), &[3, 1, 4, 1]);
    }

    #[test]
    fn pairs_are_aligned_and_consecutive() {
        let mut lines = TriaObjects::new(1);
        lines.grow_to(5);
        mark(&mut lines, 1);
        lines.reserve_for_objects(0, 2, 0);
        let a = lines.next_free_pair();
        mark(&mut lines, a);
        mark(&mut lines, a + 1);
        let b = lines.next_free_pair();
        assert_eq!(a % 2, 0);
        assert_eq!(b % 2, 0);
        assert_ne!(a, b);
        assert!(a != 0 && b != 0, "slot 0 has a used partner");
    }

    #[test]
    fn singles_prefer_broken_pairs() {
        let mut lines = TriaObjects::new(1);
        lines.grow_to(4);
        mark(&mut lines, 1);
        lines.reserve_for_objects(0, 1, 1);
        assert_eq!(lines.next_free_single(), 0);
        assert_eq!(lines.next_free_pair(), 2);
    }

    #[test]
    fn reservation_covers_requests() {
        let mut quads = TriaObjects::new(2);
        quads.reserve_for_objects(2, 3, 5);
        let len = quads.len();
        for _ in 0..2 {
            let s = quads.next_free_run(4, 4);
            for k in s..s + 4 {
                mark(&mut quads, k);
            }
        }
        for _ in 0..3 {
            let s = quads.next_free_pair();
            mark(&mut quads, s);
            mark(&mut quads, s + 1);
        }
        for _ in 0..5 {
            let s = quads.next_free_single();
            mark(&mut quads, s);
        }
        assert_eq!(quads.len(), len);
    }

    #[test]
    fn swap_moves_all_fields() {
        let mut quads = TriaObjects::new(2);
        quads.grow_to(2);
        quads.kinds[0] = ReferenceCell::Quadrilateral;
        quads.set_vertices(0, &[1, 2, 3, 4]);
        quads.set_bounds(0, &[5, 6, 7, 8]);
        quads.used[0] = true;
        quads.boundary_or_material_id[0] = 3;
        quads.swap_slots(0, 1);
        assert!(!quads.used[0]);
        assert_eq!(quads.vertices_of(1), &[1, 2, 3, 4]);
        assert_eq!(quads.bounds_of(1), &[5, 6, 7, 8]);
        assert_eq!(quads.boundary_or_material_id[1], 3);
    }

    #[test]
    fn level_arrays_track_cell_slots() {
        let mut level = TriaLevel::new(2);
        level.reserve_for_cells(4, true);
        assert_eq!(level.neighbors.len(), 16);
        assert_eq!(level.face_orientations.len(), 16);
        let first = level.next_free_cells(4);
        assert_eq!(first, 0);
        assert_eq!(level.face_orientation(3, 3), FaceOrientation::STANDARD);
    }
}
