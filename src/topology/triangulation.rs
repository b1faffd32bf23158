//! The triangulation: owner of all levels, faces, vertices and caches.
//!
//! # Layout
//! - `levels[l].cells` holds the cells of refinement level `l`; cells are
//!   lines in 1D, quadrilaterals/triangles in 2D and hexahedra/tetrahedra in
//!   3D.
//! - `faces.lines` holds the faces of 2D meshes and the edges of 3D meshes;
//!   `faces.quads` holds the faces of 3D meshes. 1D meshes use vertices as
//!   faces and have no face store.
//! - Cells and quads cache their vertex tuples; every face of a cell records
//!   the orientation under which the cell sees it.
//!
//! # Mutation
//! All mutating operations take `&mut self` and re-establish every
//! invariant before returning: neighbors, the periodic face map, active
//! indices and the number cache are rebuilt after each structural change.

use crate::geometry::manifold::{Manifold, ManifoldRegistry};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ReferenceCell;
use crate::topology::number_cache::{NumberCache, compute_number_cache};
use crate::topology::periodic::PeriodicFaceMap;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::signals::{Signal, Signals};
use crate::topology::smoothing::MeshSmoothing;
use crate::topology::store::{TriaFaces, TriaLevel, TriaObjects};
use crate::types::{CellId, ManifoldId, Point};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Runtime configuration of a triangulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangulationSettings {
    /// Mesh-smoothing rules applied by flag preparation.
    pub smoothing: MeshSmoothing,
    /// Report cells whose children have degenerate Jacobians after
    /// refinement (and coarse cells at creation).
    pub check_for_distorted_cells: bool,
    /// Refine flags on cells of this level are dropped.
    pub max_refinement_level: Option<usize>,
}

impl Default for TriangulationSettings {
    fn default() -> Self {
        TriangulationSettings {
            smoothing: MeshSmoothing::NONE,
            check_for_distorted_cells: false,
            max_refinement_level: None,
        }
    }
}

impl TriangulationSettings {
    pub fn with_smoothing(smoothing: MeshSmoothing) -> Self {
        TriangulationSettings {
            smoothing,
            ..Default::default()
        }
    }
}

/// Adaptive hierarchical mesh of `dim`-dimensional cells embedded in
/// `spacedim`-dimensional space.
#[derive(Debug)]
pub struct Triangulation {
    pub(crate) dim: usize,
    pub(crate) spacedim: usize,
    pub(crate) settings: TriangulationSettings,
    pub(crate) vertices: Vec<Point>,
    pub(crate) vertices_used: Vec<bool>,
    pub(crate) levels: Vec<TriaLevel>,
    pub(crate) faces: TriaFaces,
    pub(crate) manifolds: ManifoldRegistry,
    pub(crate) number_cache: NumberCache,
    pub(crate) periodic: PeriodicFaceMap,
    pub(crate) signals: Signals,
    pub(crate) reference_cells: Vec<ReferenceCell>,
    pub(crate) n_unmatched_subcell_entries: usize,
}

impl Triangulation {
    /// Empty triangulation with default settings.
    pub fn new(dim: usize, spacedim: usize) -> Result<Self, MeshError> {
        Self::with_settings(dim, spacedim, TriangulationSettings::default())
    }

    pub fn with_settings(
        dim: usize,
        spacedim: usize,
        settings: TriangulationSettings,
    ) -> Result<Self, MeshError> {
        if !(1..=3).contains(&dim) || !(dim..=3).contains(&spacedim) || spacedim > dim + 1 {
            return Err(MeshError::InvalidInput(format!(
                "unsupported dimensions dim={dim}, spacedim={spacedim}"
            )));
        }
        Ok(Triangulation {
            dim,
            spacedim,
            settings,
            vertices: Vec::new(),
            vertices_used: Vec::new(),
            levels: Vec::new(),
            faces: TriaFaces::new(),
            manifolds: ManifoldRegistry::default(),
            number_cache: NumberCache::default(),
            periodic: PeriodicFaceMap::default(),
            signals: Signals::default(),
            reference_cells: Vec::new(),
            n_unmatched_subcell_entries: 0,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn spacedim(&self) -> usize {
        self.spacedim
    }

    pub fn settings(&self) -> &TriangulationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TriangulationSettings) {
        self.settings = settings;
    }

    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    pub fn set_manifold(&mut self, id: ManifoldId, manifold: Arc<dyn Manifold>) {
        self.manifolds.set(id, manifold);
    }

    pub fn reset_manifold(&mut self, id: ManifoldId) {
        self.manifolds.reset(id);
    }

    pub fn manifold(&self, id: ManifoldId) -> &dyn Manifold {
        self.manifolds.get(id)
    }

    /// `true` if no cells exist.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Reference-cell kinds present in the mesh.
    pub fn reference_cells(&self) -> &[ReferenceCell] {
        &self.reference_cells
    }

    /// Number of subcell entries at creation that matched no line or face.
    pub fn n_unmatched_subcell_entries(&self) -> usize {
        self.n_unmatched_subcell_entries
    }

    /// Remove everything and notify `clear` observers.
    pub fn clear(&mut self) {
        self.clear_despite_subscriptions();
        self.signals.fire(Signal::Clear);
    }

    /// Remove everything without notifying observers. Manifolds, settings
    /// and observers are kept.
    pub(crate) fn clear_despite_subscriptions(&mut self) {
        self.vertices.clear();
        self.vertices_used.clear();
        self.levels.clear();
        self.faces = TriaFaces::new();
        self.number_cache = NumberCache::default();
        self.periodic = PeriodicFaceMap::default();
        self.reference_cells.clear();
        self.n_unmatched_subcell_entries = 0;
    }

    /// Replace this (empty) triangulation by a copy of `other`. Observers are
    /// not copied; `copy` observers of `self` are notified.
    pub fn copy_triangulation(&mut self, other: &Triangulation) -> Result<(), MeshError> {
        if !self.is_empty() {
            return Err(MeshError::InvalidInput(
                "copy_triangulation requires an empty target".into(),
            ));
        }
        self.dim = other.dim;
        self.spacedim = other.spacedim;
        self.settings = other.settings;
        self.vertices = other.vertices.clone();
        self.vertices_used = other.vertices_used.clone();
        self.levels = other.levels.clone();
        self.faces = other.faces.clone();
        self.manifolds = other.manifolds.clone();
        self.number_cache = other.number_cache.clone();
        self.periodic = other.periodic.clone();
        self.reference_cells = other.reference_cells.clone();
        self.n_unmatched_subcell_entries = other.n_unmatched_subcell_entries;
        self.signals.fire(Signal::Copy);
        Ok(())
    }

    // ----- vertices -------------------------------------------------------

    /// Number of vertex slots, used or not.
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_used_vertices(&self) -> usize {
        self.number_cache.n_used_vertices
    }

    pub fn vertex(&self, i: usize) -> Result<Point, MeshError> {
        self.vertices
            .get(i)
            .copied()
            .ok_or(MeshError::InvalidObjectIndex { structdim: 0, index: i })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn vertex_used(&self, i: usize) -> bool {
        self.vertices_used.get(i).copied().unwrap_or(false)
    }

    pub fn used_vertices(&self) -> &[bool] {
        &self.vertices_used
    }

    // ----- counts ---------------------------------------------------------

    pub fn n_levels(&self) -> usize {
        self.number_cache.n_levels
    }

    pub fn number_cache(&self) -> &NumberCache {
        &self.number_cache
    }

    pub fn n_cells(&self) -> usize {
        self.number_cache.cells(self.dim).n_used
    }

    pub fn n_active_cells(&self) -> usize {
        self.number_cache.cells(self.dim).n_active
    }

    pub fn n_cells_on_level(&self, level: usize) -> usize {
        self.number_cache
            .cells(self.dim)
            .n_used_per_level
            .get(level)
            .copied()
            .unwrap_or(0)
    }

    pub fn n_active_cells_on_level(&self, level: usize) -> usize {
        self.number_cache
            .cells(self.dim)
            .n_active_per_level
            .get(level)
            .copied()
            .unwrap_or(0)
    }

    /// Number of cell slots on `level`, used or not.
    pub fn n_raw_cells(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, |l| l.len())
    }

    pub fn n_lines(&self) -> usize {
        self.number_cache.lines.n_used
    }

    pub fn n_active_lines(&self) -> usize {
        self.number_cache.lines.n_active
    }

    pub fn n_raw_lines(&self) -> usize {
        match self.dim {
            1 => self.levels.iter().map(|l| l.len()).sum(),
            _ => self.faces.lines.len(),
        }
    }

    pub fn n_quads(&self) -> usize {
        self.number_cache.quads.n_used
    }

    pub fn n_active_quads(&self) -> usize {
        self.number_cache.quads.n_active
    }

    pub fn n_raw_quads(&self) -> usize {
        match self.dim {
            1 => 0,
            2 => self.levels.iter().map(|l| l.len()).sum(),
            _ => self.faces.quads.len(),
        }
    }

    pub fn n_hexs(&self) -> usize {
        self.number_cache.hexes.n_used
    }

    pub fn n_active_hexs(&self) -> usize {
        self.number_cache.hexes.n_active
    }

    /// Number of used faces (vertices in 1D).
    pub fn n_faces(&self) -> usize {
        match self.dim {
            1 => self.n_used_vertices(),
            2 => self.n_lines(),
            _ => self.n_quads(),
        }
    }

    pub fn n_active_faces(&self) -> usize {
        match self.dim {
            1 => self.n_used_vertices(),
            2 => self.n_active_lines(),
            _ => self.n_active_quads(),
        }
    }

    // ----- flags ----------------------------------------------------------

    /// Request refinement of an active cell with `case`; `NONE` clears.
    pub fn set_refine_flag(&mut self, cell: CellId, case: RefinementCase) -> Result<(), MeshError> {
        self.check_cell(cell)?;
        let kind = self.cell_kind(cell);
        if !case.is_valid_for(self.dim, kind.is_simplex()) {
            return Err(MeshError::InvalidInput(format!(
                "refinement case {:#05b} not valid for {kind:?} cell {cell}",
                case.bits()
            )));
        }
        if case.is_refined() && !self.is_active(cell) {
            return Err(MeshError::InvalidInput(format!(
                "cell {cell} is not active and cannot be flagged for refinement"
            )));
        }
        self.levels[cell.level()].refine_flags[cell.index()] = case;
        Ok(())
    }

    /// Request isotropic refinement of an active cell.
    pub fn set_isotropic_refine_flag(&mut self, cell: CellId) -> Result<(), MeshError> {
        self.set_refine_flag(cell, RefinementCase::isotropic(self.dim))
    }

    pub fn clear_refine_flag(&mut self, cell: CellId) -> Result<(), MeshError> {
        self.set_refine_flag(cell, RefinementCase::NONE)
    }

    pub fn refine_flag(&self, cell: CellId) -> Result<RefinementCase, MeshError> {
        self.check_cell(cell)?;
        Ok(self.refine_flag_of(cell))
    }

    /// Request coarsening of an active cell (only honored if all siblings
    /// carry the flag).
    pub fn set_coarsen_flag(&mut self, cell: CellId) -> Result<(), MeshError> {
        self.check_cell(cell)?;
        if !self.is_active(cell) {
            return Err(MeshError::InvalidInput(format!(
                "cell {cell} is not active and cannot be flagged for coarsening"
            )));
        }
        self.levels[cell.level()].coarsen_flags[cell.index()] = true;
        Ok(())
    }

    pub fn clear_coarsen_flag(&mut self, cell: CellId) -> Result<(), MeshError> {
        self.check_cell(cell)?;
        self.levels[cell.level()].coarsen_flags[cell.index()] = false;
        Ok(())
    }

    pub fn coarsen_flag(&self, cell: CellId) -> Result<bool, MeshError> {
        self.check_cell(cell)?;
        Ok(self.coarsen_flag_of(cell))
    }

    /// Flag every active cell for isotropic refinement.
    pub fn set_all_refine_flags(&mut self) {
        let iso = RefinementCase::isotropic(self.dim);
        for level in &mut self.levels {
            for i in 0..level.len() {
                if level.cells.used[i] && !level.cells.has_children(i) {
                    level.refine_flags[i] = iso;
                    level.coarsen_flags[i] = false;
                }
            }
        }
    }

    /// Clear all refine and coarsen flags.
    pub fn clear_flags(&mut self) {
        for level in &mut self.levels {
            level.refine_flags.fill(RefinementCase::NONE);
            level.coarsen_flags.fill(false);
        }
    }

    /// Clear the user flags of all cells, faces and lines.
    pub fn clear_user_flags(&mut self) {
        for level in &mut self.levels {
            level.cells.user_flags.fill(false);
        }
        self.faces.lines.user_flags.fill(false);
        self.faces.quads.user_flags.fill(false);
    }

    /// Clear the user data of all cells, faces and lines.
    pub fn clear_user_data(&mut self) {
        for level in &mut self.levels {
            level.cells.user_data.fill(0);
        }
        self.faces.lines.user_data.fill(0);
        self.faces.quads.user_data.fill(0);
    }

    /// Refine every active cell isotropically `times` times.
    pub fn refine_global(&mut self, times: usize) -> Result<(), MeshError> {
        for _ in 0..times {
            self.set_all_refine_flags();
            self.execute_coarsening_and_refinement()?;
        }
        Ok(())
    }

    /// Flag every active cell above level 0 for coarsening and execute.
    pub fn coarsen_global(&mut self) -> Result<(), MeshError> {
        self.clear_flags();
        for l in 1..self.levels.len() {
            let level = &mut self.levels[l];
            for i in 0..level.len() {
                if level.cells.used[i] && !level.cells.has_children(i) {
                    level.coarsen_flags[i] = true;
                }
            }
        }
        self.execute_coarsening_and_refinement()
    }

    // ----- internal helpers shared by the executors -------------------------

    pub(crate) fn check_cell(&self, cell: CellId) -> Result<(), MeshError> {
        let n_levels = self.levels.len();
        let level = self.levels.get(cell.level()).ok_or(MeshError::InvalidLevel {
            level: cell.level(),
            n_levels,
        })?;
        if !level.cells.is_used(cell.index()) {
            return Err(MeshError::InvalidObjectIndex {
                structdim: self.dim,
                index: cell.index(),
            });
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn refine_flag_of(&self, cell: CellId) -> RefinementCase {
        self.levels[cell.level()].refine_flags[cell.index()]
    }

    #[inline]
    pub(crate) fn coarsen_flag_of(&self, cell: CellId) -> bool {
        self.levels[cell.level()].coarsen_flags[cell.index()]
    }

    /// Store of face objects (lines in 2D, quads in 3D). Not used in 1D.
    #[inline]
    pub(crate) fn face_objects(&self) -> &TriaObjects {
        if self.dim == 3 { &self.faces.quads } else { &self.faces.lines }
    }

    #[inline]
    pub(crate) fn face_objects_mut(&mut self) -> &mut TriaObjects {
        if self.dim == 3 { &mut self.faces.quads } else { &mut self.faces.lines }
    }

    #[inline]
    pub(crate) fn cell_kind(&self, cell: CellId) -> ReferenceCell {
        self.levels[cell.level()].cells.kinds[cell.index()]
    }

    #[inline]
    pub(crate) fn cell_vertex_indices(&self, cell: CellId) -> &[u32] {
        self.levels[cell.level()].cells.vertices_of(cell.index())
    }

    /// Face objects of a cell (vertex indices in 1D).
    #[inline]
    pub(crate) fn cell_face_indices(&self, cell: CellId) -> &[u32] {
        self.levels[cell.level()].cells.bounds_of(cell.index())
    }

    #[inline]
    pub(crate) fn cell_face_index(&self, cell: CellId, face_no: usize) -> usize {
        self.cell_face_indices(cell)[face_no] as usize
    }

    #[inline]
    pub(crate) fn is_used(&self, cell: CellId) -> bool {
        self.levels
            .get(cell.level())
            .is_some_and(|l| l.cells.is_used(cell.index()))
    }

    #[inline]
    pub(crate) fn has_children(&self, cell: CellId) -> bool {
        self.levels[cell.level()].cells.has_children(cell.index())
    }

    #[inline]
    pub(crate) fn is_active(&self, cell: CellId) -> bool {
        self.is_used(cell) && !self.has_children(cell)
    }

    #[inline]
    pub(crate) fn n_children(&self, cell: CellId) -> usize {
        self.levels[cell.level()].cells.n_children(cell.index())
    }

    #[inline]
    pub(crate) fn child(&self, cell: CellId, k: usize) -> CellId {
        CellId::new(
            cell.level() + 1,
            self.levels[cell.level()].cells.child(cell.index(), k),
        )
    }

    pub(crate) fn children(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        (0..self.n_children(cell)).map(move |k| self.child(cell, k))
    }

    #[inline]
    pub(crate) fn parent(&self, cell: CellId) -> Option<CellId> {
        if cell.level() == 0 {
            return None;
        }
        self.levels[cell.level()]
            .cells
            .parent(cell.index())
            .map(|p| CellId::new(cell.level() - 1, p))
    }

    #[inline]
    pub(crate) fn refinement_case(&self, cell: CellId) -> RefinementCase {
        self.levels[cell.level()].cells.refinement_cases[cell.index()]
    }

    /// `true` if `a` is a strict ancestor of `b`.
    pub(crate) fn is_ancestor_of(&self, a: CellId, b: CellId) -> bool {
        if a.level >= b.level {
            return false;
        }
        let mut c = b;
        while c.level > a.level {
            match self.parent(c) {
                Some(p) => c = p,
                None => return false,
            }
        }
        c == a
    }

    pub(crate) fn points_of(&self, vertices: &[u32]) -> Vec<Point> {
        vertices.iter().map(|&v| self.vertices[v as usize]).collect()
    }

    /// Vertex indices of face object `face` (a single vertex in 1D).
    pub(crate) fn face_vertex_indices(&self, face: usize) -> Vec<u32> {
        match self.dim {
            1 => vec![face as u32],
            _ => self.face_objects().vertices_of(face).to_vec(),
        }
    }

    /// Parent of a face object (never in 1D).
    pub(crate) fn face_parent(&self, face: usize) -> Option<usize> {
        match self.dim {
            1 => None,
            _ => self.face_objects().parent(face),
        }
    }

    pub(crate) fn face_has_children(&self, face: usize) -> bool {
        self.dim > 1 && self.face_objects().has_children(face)
    }

    pub(crate) fn face_boundary_id(&self, face: usize) -> u32 {
        match self.dim {
            1 => self.vertex_boundary_id(face),
            _ => self.face_objects().boundary_or_material_id[face],
        }
    }

    /// 1D faces are vertices: they sit on the boundary iff exactly one
    /// coarse cell touches them.
    pub(crate) fn vertex_boundary_id(&self, vertex: usize) -> u32 {
        let Some(level0) = self.levels.first() else {
            return crate::types::INTERNAL_FACE_BOUNDARY_ID;
        };
        let mut count = 0;
        let mut id = crate::types::INTERNAL_FACE_BOUNDARY_ID;
        for i in 0..level0.len() {
            if !level0.cells.used[i] {
                continue;
            }
            for (f, &v) in level0.cells.vertices_of(i).iter().enumerate() {
                if v as usize == vertex {
                    count += 1;
                    id = f as u32;
                }
            }
        }
        if count == 1 {
            // the left end is boundary 0, the right end boundary 1
            id
        } else {
            crate::types::INTERNAL_FACE_BOUNDARY_ID
        }
    }

    /// Cell ids of every used cell, level by level.
    pub(crate) fn used_cells(&self) -> Vec<CellId> {
        let mut out = Vec::new();
        for (l, level) in self.levels.iter().enumerate() {
            for i in 0..level.len() {
                if level.cells.used[i] {
                    out.push(CellId::new(l, i));
                }
            }
        }
        out
    }

    /// Cell ids of every active cell, level by level.
    pub(crate) fn active_cells(&self) -> Vec<CellId> {
        let mut out = Vec::new();
        for (l, level) in self.levels.iter().enumerate() {
            for i in 0..level.len() {
                if level.cells.used[i] && !level.cells.has_children(i) {
                    out.push(CellId::new(l, i));
                }
            }
        }
        out
    }

    /// Depth of a face object in its refinement tree.
    pub(crate) fn face_depth(&self, face: usize) -> usize {
        let mut d = 0;
        let mut f = face;
        while let Some(p) = self.face_parent(f) {
            d += 1;
            f = p;
        }
        d
    }

    pub(crate) fn update_number_cache(&mut self) {
        self.number_cache = compute_number_cache(
            self.dim,
            &self.levels,
            &self.faces.lines,
            &self.faces.quads,
            &self.vertices_used,
        );
    }

    /// Rebuild every derived structure after a structural change.
    pub(crate) fn update_after_change(&mut self) -> Result<(), MeshError> {
        self.update_neighbors();
        self.update_periodic_face_map()?;
        self.update_number_cache();
        self.compute_active_cell_indices();
        self.compute_global_level_cell_indices();
        crate::debug_invariants!(self.validate_invariants(), "triangulation after change");
        Ok(())
    }

    pub(crate) fn refinement_case_of_face(&self, face: usize) -> RefinementCase {
        match self.dim {
            1 => RefinementCase::NONE,
            _ => self.face_objects().refinement_cases[face],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_dimensions() {
        assert!(Triangulation::new(0, 1).is_err());
        assert!(Triangulation::new(3, 2).is_err());
        assert!(Triangulation::new(1, 3).is_err());
        assert!(Triangulation::new(2, 3).is_ok());
    }

    #[test]
    fn empty_triangulation_counts() {
        let tria = Triangulation::new(2, 2).unwrap();
        assert!(tria.is_empty());
        assert_eq!(tria.n_active_cells(), 0);
        assert_eq!(tria.n_levels(), 0);
        assert!(tria.manifold(crate::types::FLAT_MANIFOLD_ID).is_flat());
    }

    #[test]
    fn out_of_range_queries_are_errors() {
        use crate::topology::create::{CellData, SubCellData};
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        let mut tria = Triangulation::new(2, 2).unwrap();
        tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default())
            .unwrap();
        assert_eq!(tria.vertex(3).unwrap(), [1.0, 1.0, 0.0]);
        assert!(matches!(
            tria.vertex(4),
            Err(MeshError::InvalidObjectIndex { structdim: 0, index: 4 })
        ));
        assert!(matches!(
            tria.refine_flag(CellId::new(1, 0)),
            Err(MeshError::InvalidLevel { level: 1, n_levels: 1 })
        ));
        assert!(matches!(
            tria.coarsen_flag(CellId::new(0, 5)),
            Err(MeshError::InvalidObjectIndex { .. })
        ));
        assert_eq!(tria.refine_flag(CellId::new(0, 0)).unwrap(), RefinementCase::NONE);
        assert!(!tria.coarsen_flag(CellId::new(0, 0)).unwrap());
    }
}
