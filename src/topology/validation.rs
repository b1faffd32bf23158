//! Whole-store consistency checks.
//!
//! [`Triangulation::validate_invariants`] walks every store once and returns
//! the first violation as [`MeshError::InternalInvariant`]. It runs after
//! every structural change when invariant checking is enabled (debug builds
//! or the `strict-invariants` / `check-invariants` features).

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::number_cache::compute_number_cache;
use crate::topology::store::TriaObjects;
use crate::topology::triangulation::Triangulation;
use crate::types::{INTERNAL_FACE_BOUNDARY_ID, INVALID_UNSIGNED_INT};
use itertools::Itertools;

fn fail<T>(msg: String) -> Result<T, MeshError> {
    Err(MeshError::InternalInvariant(msg))
}

/// Children of used objects are used and point back to their parent;
/// bounding objects of used objects are used.
fn check_objects(
    name: &str,
    objects: &TriaObjects,
    bounds: Option<&TriaObjects>,
    vertices_used: &[bool],
) -> Result<(), MeshError> {
    for i in (0..objects.len()).filter(|&i| objects.used[i]) {
        for c in objects.child_range(i) {
            if !objects.is_used(c) || objects.parent(c) != Some(i) {
                return fail(format!("{name} {i}: child {c} is unused or has another parent"));
            }
        }
        if let Some(bounds) = bounds {
            if let Some(&b) = objects.bounds_of(i).iter().find(|&&b| !bounds.is_used(b as usize)) {
                return fail(format!("{name} {i} is bounded by unused object {b}"));
            }
        }
        if let Some(&v) = objects
            .vertices_of(i)
            .iter()
            .find(|&&v| !vertices_used.get(v as usize).copied().unwrap_or(false))
        {
            return fail(format!("{name} {i} uses unused vertex {v}"));
        }
    }
    Ok(())
}

impl Triangulation {
    /// Check the structural invariants of the whole store.
    pub fn validate_invariants(&self) -> Result<(), MeshError> {
        if self.is_empty() {
            return Ok(());
        }
        self.check_stores()?;
        self.check_cell_tree()?;
        self.check_refined_lines()?;
        self.check_neighbors()?;
        self.check_boundary_ids()?;
        self.check_active_indices()?;
        self.check_periodic_map()?;
        let cache = compute_number_cache(
            self.dim,
            &self.levels,
            &self.faces.lines,
            &self.faces.quads,
            &self.vertices_used,
        );
        if cache != self.number_cache {
            return fail("number cache differs from a fresh count".into());
        }
        Ok(())
    }

    fn check_stores(&self) -> Result<(), MeshError> {
        if self.dim >= 2 {
            check_objects("line", &self.faces.lines, None, &self.vertices_used)?;
        }
        if self.dim == 3 {
            check_objects(
                "quad",
                &self.faces.quads,
                Some(&self.faces.lines),
                &self.vertices_used,
            )?;
        }
        Ok(())
    }

    fn check_cell_tree(&self) -> Result<(), MeshError> {
        for cell in self.used_cells() {
            if let Some(&v) = self
                .cell_vertex_indices(cell)
                .iter()
                .find(|&&v| !self.vertex_used(v as usize))
            {
                return fail(format!("cell {cell} uses unused vertex {v}"));
            }
            if self.dim >= 2 {
                if let Some(&f) = self
                    .cell_face_indices(cell)
                    .iter()
                    .find(|&&f| !self.face_objects().is_used(f as usize))
                {
                    return fail(format!("cell {cell} is bounded by unused face {f}"));
                }
            }
            for child in self.children(cell) {
                if !self.is_used(child) || self.parent(child) != Some(cell) {
                    return fail(format!("cell {cell}: child {child} is unused or orphaned"));
                }
            }
            if cell.level() > 0 && self.parent(cell).map_or(true, |p| !self.has_children(p)) {
                return fail(format!("cell {cell} has no refined parent"));
            }
        }
        Ok(())
    }

    /// Children of a refined line split it at a common midpoint.
    fn check_refined_lines(&self) -> Result<(), MeshError> {
        if self.dim < 2 {
            return Ok(());
        }
        let lines = &self.faces.lines;
        for l in (0..lines.len()).filter(|&l| lines.used[l] && lines.has_children(l)) {
            let (c0, c1) = (lines.child(l, 0), lines.child(l, 1));
            let (p, a, b) = (lines.vertices_of(l), lines.vertices_of(c0), lines.vertices_of(c1));
            if a[0] != p[0] || b[1] != p[1] || a[1] != b[0] {
                return fail(format!("children {c0}, {c1} do not split line {l}"));
            }
        }
        Ok(())
    }

    /// Same-level neighbors sharing a face see each other; the face of an
    /// active cell is at most one subface below a coarser neighbor's face.
    fn check_neighbors(&self) -> Result<(), MeshError> {
        for cell in self.used_cells() {
            for f in 0..self.cell_kind(cell).n_faces() {
                let Some(n) = self.neighbor_of(cell, f) else {
                    continue;
                };
                if !self.is_used(n) {
                    return fail(format!("neighbor {n} of cell {cell} is unused"));
                }
                if self.dim == 1 {
                    if self.is_active(cell) && self.is_active(n) && n.level() + 1 < cell.level() {
                        return fail(format!(
                            "active cells {cell} and {n} share a vertex across more than one level"
                        ));
                    }
                    if n.level != cell.level {
                        continue;
                    }
                } else if self.face_is_coarser(cell, f, n) {
                    if self.is_active(cell) {
                        self.neighbor_of_coarser_neighbor(cell, f)?;
                    }
                    continue;
                }
                let g = self.neighbor_of_neighbor(cell, f)?;
                if n.level == cell.level && self.neighbor_of(n, g) != Some(cell) {
                    return fail(format!("neighbor relation {cell} <-> {n} is not symmetric"));
                }
            }
        }
        Ok(())
    }

    /// Faces without a neighbor carry a boundary id.
    fn check_boundary_ids(&self) -> Result<(), MeshError> {
        if self.dim == 1 {
            return Ok(());
        }
        for cell in self.active_cells() {
            for f in 0..self.cell_kind(cell).n_faces() {
                if self.neighbor_of(cell, f).is_some() {
                    continue;
                }
                let face = self.cell_face_index(cell, f);
                if self.face_boundary_id(face) == INTERNAL_FACE_BOUNDARY_ID {
                    return fail(format!(
                        "face {f} of cell {cell} has no neighbor but is marked interior"
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_active_indices(&self) -> Result<(), MeshError> {
        let indices: Vec<u32> = self
            .levels
            .iter()
            .flat_map(|l| l.active_cell_indices.iter().copied())
            .filter(|&i| i != INVALID_UNSIGNED_INT)
            .collect();
        let expected = self.active_cells().len();
        if indices.len() != expected || !indices.iter().copied().eq(0..expected as u32) {
            return fail("active cell indices are not consecutive".into());
        }
        Ok(())
    }

    /// Entries between cells of equal level come in mirrored pairs.
    fn check_periodic_map(&self) -> Result<(), MeshError> {
        for ((a, fa), (b, fb, _)) in self.periodic.iter() {
            if a.level != b.level {
                continue;
            }
            match self.periodic.get(b, fb as usize) {
                Some((c, fc, _)) if c == a && fc == fa => {}
                _ => {
                    return fail(format!(
                        "periodic entry ({a}, {fa}) -> ({b}, {fb}) has no mirror"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Largest difference between the levels of active cells sharing a
    /// vertex.
    pub fn max_vertex_level_difference(&self) -> usize {
        let mut lo = vec![usize::MAX; self.vertices.len()];
        let mut hi = vec![0usize; self.vertices.len()];
        for cell in self.active_cells() {
            for &v in self.cell_vertex_indices(cell) {
                lo[v as usize] = lo[v as usize].min(cell.level());
                hi[v as usize] = hi[v as usize].max(cell.level());
            }
        }
        lo.iter()
            .zip(&hi)
            .filter(|(l, _)| **l != usize::MAX)
            .map(|(l, h)| h - l)
            .max()
            .unwrap_or(0)
    }

    /// In 3D: lines of active cells are refined at most once.
    pub fn max_line_refinement_depth(&self) -> usize {
        if self.dim != 3 {
            return 0;
        }
        let lines = &self.faces.lines;
        let depth = |l: usize| {
            if lines.child_range(l).any(|c| lines.has_children(c)) {
                2
            } else if lines.has_children(l) {
                1
            } else {
                0
            }
        };
        self.active_cells()
            .into_iter()
            .flat_map(|c| {
                let kind = self.cell_kind(c);
                (0..kind.n_lines())
                    .filter_map(move |l| self.accessor(c).line_index(l))
                    .collect_vec()
            })
            .map(depth)
            .max()
            .unwrap_or(0)
    }
}

impl DebugInvariants for Triangulation {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(Triangulation::validate_invariants(self), "triangulation");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        Triangulation::validate_invariants(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::create::{CellData, SubCellData};

    fn unit_square() -> Triangulation {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        let mut tria = Triangulation::new(2, 2).unwrap();
        tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default())
            .unwrap();
        tria
    }

    #[test]
    fn fresh_and_refined_meshes_validate() {
        let mut tria = unit_square();
        assert!(tria.validate_invariants().is_ok());
        tria.refine_global(2).unwrap();
        assert!(tria.validate_invariants().is_ok());
        assert_eq!(tria.max_vertex_level_difference(), 0);
    }

    #[test]
    fn stale_number_cache_is_reported() {
        let mut tria = unit_square();
        tria.number_cache.n_levels = 7;
        assert!(matches!(
            tria.validate_invariants(),
            Err(MeshError::InternalInvariant(_))
        ));
    }

    #[test]
    fn interior_marked_boundary_face_is_reported() {
        let mut tria = unit_square();
        tria.faces.lines.boundary_or_material_id[0] = INTERNAL_FACE_BOUNDARY_ID;
        assert!(tria.validate_invariants().is_err());
    }
}
