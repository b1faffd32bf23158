//! Neighbor pointers, subface lookups and cell numbering.
//!
//! Neighbors are recomputed from scratch after every structural change.
//! The neighbor of cell `c` across face `f` is found by walking the face
//! object `F` of `c` and its ancestors: the first object referenced by some
//! other cell that is neither an ancestor nor a descendant of `c` and lives
//! on `c`'s level or a coarser one yields the neighbor (the finest such
//! cell). The neighbor is therefore always on the same level or coarser;
//! periodic faces are never neighbors.
//!
//! A neighbor is *coarser* when its face object strictly contains the
//! cell's face object. On anisotropic meshes this happens between cells of
//! the same level, and a neighbor on a lower level may share the face
//! exactly, so coarseness is decided by faces, not levels.

use crate::mesh_error::MeshError;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::templates::template;
use crate::topology::triangulation::Triangulation;
use crate::types::{CellId, INVALID_DOF_INDEX, INVALID_UNSIGNED_INT};

impl Triangulation {
    /// For every face object (every vertex in 1D), the used cells that
    /// reference it.
    pub(crate) fn face_references(&self) -> Vec<Vec<CellId>> {
        let n = match self.dim {
            1 => self.vertices.len(),
            _ => self.face_objects().len(),
        };
        let mut refs = vec![Vec::new(); n];
        for cell in self.used_cells() {
            for &f in self.cell_face_indices(cell) {
                refs[f as usize].push(cell);
            }
        }
        refs
    }

    /// Recompute every neighbor pointer.
    pub(crate) fn update_neighbors(&mut self) {
        let refs = self.face_references();
        let mut updates = Vec::new();
        for cell in self.used_cells() {
            let n_faces = self.cell_kind(cell).n_faces();
            for f in 0..n_faces {
                let mut object = Some(self.cell_face_index(cell, f));
                let mut found = None;
                while let Some(g) = object {
                    let best = refs[g]
                        .iter()
                        .copied()
                        .filter(|&n| {
                            n != cell
                                && n.level <= cell.level
                                && !self.is_ancestor_of(n, cell)
                                && !self.is_ancestor_of(cell, n)
                        })
                        .max_by_key(|n| n.level);
                    if best.is_some() {
                        found = best;
                        break;
                    }
                    object = self.face_parent(g);
                }
                updates.push((cell, f, found));
            }
        }
        for level in &mut self.levels {
            level.neighbors.fill(None);
        }
        for (cell, f, n) in updates {
            self.levels[cell.level()].set_neighbor(cell.index(), f, n);
        }
    }

    /// Neighbor across face `face_no`, if any.
    pub(crate) fn neighbor_of(&self, cell: CellId, face_no: usize) -> Option<CellId> {
        self.levels[cell.level()].neighbor(cell.index(), face_no)
    }

    fn check_face_no(&self, cell: CellId, face_no: usize) -> Result<(), MeshError> {
        self.check_cell(cell)?;
        let n_faces = self.cell_kind(cell).n_faces();
        if face_no >= n_faces {
            return Err(MeshError::InvalidChildIndex {
                index: face_no,
                n_children: n_faces,
            });
        }
        Ok(())
    }

    fn existing_neighbor(&self, cell: CellId, face_no: usize) -> Result<CellId, MeshError> {
        self.check_face_no(cell, face_no)?;
        self.neighbor_of(cell, face_no).ok_or_else(|| {
            MeshError::InvalidInput(format!("cell {cell} has no neighbor across face {face_no}"))
        })
    }

    /// Whether neighbor `n` of `cell` across `face_no` sees a face that
    /// strictly contains `cell`'s face.
    pub(crate) fn face_is_coarser(&self, cell: CellId, face_no: usize, n: CellId) -> bool {
        if self.dim == 1 {
            return n.level < cell.level;
        }
        let face = self.cell_face_index(cell, face_no);
        !self.cell_face_indices(n).iter().any(|&g| g as usize == face)
    }

    /// `true` if the neighbor across `face_no` is coarser than `cell` on
    /// that face; `false` at the boundary.
    pub fn neighbor_is_coarser(&self, cell: CellId, face_no: usize) -> Result<bool, MeshError> {
        self.check_face_no(cell, face_no)?;
        Ok(self
            .neighbor_of(cell, face_no)
            .is_some_and(|n| self.face_is_coarser(cell, face_no, n)))
    }

    /// Face number under which the neighbor across `face_no` sees the
    /// shared face. Fails if that neighbor is coarser.
    pub fn neighbor_of_neighbor(&self, cell: CellId, face_no: usize) -> Result<usize, MeshError> {
        let n = self.existing_neighbor(cell, face_no)?;
        if self.face_is_coarser(cell, face_no, n) {
            return Err(MeshError::InvalidInput(format!(
                "neighbor of cell {cell} across face {face_no} is coarser"
            )));
        }
        let face = self.cell_face_index(cell, face_no);
        self.cell_face_indices(n)
            .iter()
            .position(|&g| g as usize == face)
            .ok_or_else(|| MeshError::internal(format!("neighbor {n} does not share face {face}")))
    }

    /// For a coarser neighbor across `face_no`: the neighbor's face number
    /// and the subface of that face which is `cell`'s face.
    pub fn neighbor_of_coarser_neighbor(
        &self,
        cell: CellId,
        face_no: usize,
    ) -> Result<(usize, usize), MeshError> {
        let n = self.existing_neighbor(cell, face_no)?;
        if !self.face_is_coarser(cell, face_no, n) {
            return Err(MeshError::InvalidInput(format!(
                "neighbor of cell {cell} across face {face_no} is not coarser"
            )));
        }
        let face = self.cell_face_index(cell, face_no);
        if self.dim == 1 {
            let f = self
                .cell_face_indices(n)
                .iter()
                .position(|&g| g as usize == face)
                .ok_or_else(|| MeshError::internal("coarser neighbor does not share vertex"))?;
            return Ok((f, 0));
        }
        for (f, &g) in self.cell_face_indices(n).iter().enumerate() {
            if let Some(sub) = self.subface_number(g as usize, face) {
                return Ok((f, sub));
            }
        }
        Err(MeshError::internal(format!(
            "coarser neighbor {n} of cell {cell} has no face with subface {face}"
        )))
    }

    /// Position of `face` among the subfaces of `parent`, if `face` is a
    /// subface (child, or quarter of an anisotropically refined face).
    pub(crate) fn subface_number(&self, parent: usize, face: usize) -> Option<usize> {
        let objects = self.face_objects();
        let p = objects.parent(face)?;
        if p == parent {
            return (0..objects.n_children(parent)).find(|&k| objects.child(parent, k) == face);
        }
        let gp = objects.parent(p)?;
        if gp != parent
            || self.dim != 3
            || objects.refinement_cases[p] != objects.refinement_cases[gp].uncut_in(2)
        {
            return None;
        }
        let i = (0..objects.n_children(gp)).find(|&k| objects.child(gp, k) == p)?;
        let j = (0..objects.n_children(p)).find(|&k| objects.child(p, k) == face)?;
        match objects.refinement_cases[gp] {
            RefinementCase::CUT_X => Some(i + 2 * j),
            RefinementCase::CUT_Y => Some(j + 2 * i),
            _ => None,
        }
    }

    /// Number of subfaces of a face object as seen from a coarse side.
    pub(crate) fn n_subfaces(&self, face: usize) -> usize {
        if self.dim == 1 {
            return 0;
        }
        let objects = self.face_objects();
        let n = objects.n_children(face);
        if n == 2 && objects.child_range(face).any(|c| objects.has_children(c)) {
            4
        } else {
            n
        }
    }

    /// Subface object `subface` of `face`; inverse of [`Self::subface_number`].
    pub(crate) fn subface_object(&self, face: usize, subface: usize) -> Result<usize, MeshError> {
        let n = self.n_subfaces(face);
        if subface >= n {
            return Err(MeshError::InvalidChildIndex {
                index: subface,
                n_children: n,
            });
        }
        let objects = self.face_objects();
        if objects.n_children(face) == n {
            return Ok(objects.child(face, subface));
        }
        let (i, j) = match objects.refinement_cases[face] {
            RefinementCase::CUT_X => (subface & 1, subface >> 1),
            _ => (subface >> 1, subface & 1),
        };
        let half = objects.child(face, i);
        if objects.has_children(half) {
            Ok(objects.child(half, j))
        } else {
            Ok(half)
        }
    }

    /// `true` if face object `ancestor` is `face` or one of its ancestors.
    pub(crate) fn face_contains(&self, ancestor: usize, face: usize) -> bool {
        let mut f = Some(face);
        while let Some(g) = f {
            if g == ancestor {
                return true;
            }
            f = self.face_parent(g);
        }
        false
    }

    /// Child of the same-level neighbor across `face_no` that is adjacent to
    /// subface `subface` of that face.
    pub fn neighbor_child_on_subface(
        &self,
        cell: CellId,
        face_no: usize,
        subface: usize,
    ) -> Result<CellId, MeshError> {
        let n = self.existing_neighbor(cell, face_no)?;
        if n.level != cell.level || self.face_is_coarser(cell, face_no, n) || !self.has_children(n) {
            return Err(MeshError::InvalidInput(format!(
                "neighbor of cell {cell} across face {face_no} is not refined on the same level"
            )));
        }
        let face = self.cell_face_index(cell, face_no);
        if self.dim == 1 {
            let f = self.neighbor_of_neighbor(cell, face_no)?;
            let t = template(self.cell_kind(n), self.refinement_case(n))
                .ok_or_else(|| MeshError::internal("refined cell without template"))?;
            let k = t.children_on_face(f).first().copied().unwrap_or(0);
            return Ok(self.child(n, k));
        }
        let sub = self.subface_object(face, subface)?;
        self.children(n)
            .find(|&k| {
                self.cell_face_indices(k)
                    .iter()
                    .any(|&g| self.face_contains(g as usize, sub))
            })
            .ok_or_else(|| {
                MeshError::internal(format!("no child of {n} is adjacent to subface {subface}"))
            })
    }

    /// Number the active cells consecutively in (level, index) order.
    pub(crate) fn compute_active_cell_indices(&mut self) {
        let mut next = 0u32;
        for level in &mut self.levels {
            for i in 0..level.len() {
                if level.cells.used[i] && !level.cells.has_children(i) {
                    level.active_cell_indices[i] = next;
                    level.global_active_cell_indices[i] = next as u64;
                    next += 1;
                } else {
                    level.active_cell_indices[i] = INVALID_UNSIGNED_INT;
                    level.global_active_cell_indices[i] = INVALID_DOF_INDEX;
                }
            }
        }
    }

    /// Number the used cells of each level consecutively.
    pub(crate) fn compute_global_level_cell_indices(&mut self) {
        for level in &mut self.levels {
            let mut next = 0u64;
            for i in 0..level.len() {
                if level.cells.used[i] {
                    level.global_level_cell_indices[i] = next;
                    next += 1;
                } else {
                    level.global_level_cell_indices[i] = INVALID_DOF_INDEX;
                }
            }
        }
    }
}
