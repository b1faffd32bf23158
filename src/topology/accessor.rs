//! Typed views over the store.
//!
//! Accessors are small `Copy` handles pairing a triangulation borrow with an
//! index. [`CellAccessor`] addresses a cell by `(level, index)`;
//! [`FaceAccessor`] and [`LineAccessor`] address level-less objects (faces
//! are vertices in 1D). [`CellMut`] is the only handle that writes: it edits
//! flags and ids of one cell and never changes the mesh structure.

use crate::geometry::quality;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ReferenceCell;
use crate::topology::orientation::FaceOrientation;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::triangulation::Triangulation;
use crate::types::{
    BoundaryId, CellId, INTERNAL_FACE_BOUNDARY_ID, INVALID_DOF_INDEX, INVALID_UNSIGNED_INT,
    ManifoldId, MaterialId, Point, SubdomainId,
};
use itertools::Itertools;

/// Read-only view of one cell.
#[derive(Clone, Copy)]
pub struct CellAccessor<'a> {
    tria: &'a Triangulation,
    id: CellId,
}

impl std::fmt::Debug for CellAccessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cell({})", self.id)
    }
}

impl PartialEq for CellAccessor<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tria, other.tria) && self.id == other.id
    }
}

impl<'a> CellAccessor<'a> {
    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.id.level()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.id.index()
    }

    pub fn reference_cell(&self) -> ReferenceCell {
        self.tria.cell_kind(self.id)
    }

    pub fn is_used(&self) -> bool {
        self.tria.is_used(self.id)
    }

    pub fn is_active(&self) -> bool {
        self.tria.is_active(self.id)
    }

    pub fn has_children(&self) -> bool {
        self.tria.has_children(self.id)
    }

    pub fn n_children(&self) -> usize {
        self.tria.n_children(self.id)
    }

    pub fn child(&self, k: usize) -> Result<CellAccessor<'a>, MeshError> {
        let n = self.n_children();
        if k >= n {
            return Err(MeshError::InvalidChildIndex {
                index: k,
                n_children: n,
            });
        }
        Ok(self.tria.accessor(self.tria.child(self.id, k)))
    }

    pub fn children(&self) -> impl Iterator<Item = CellAccessor<'a>> + use<'a> {
        let tria = self.tria;
        tria.children(self.id).map(move |c| tria.accessor(c))
    }

    pub fn parent(&self) -> Option<CellAccessor<'a>> {
        self.tria.parent(self.id).map(|p| self.tria.accessor(p))
    }

    pub fn refinement_case(&self) -> RefinementCase {
        self.tria.refinement_case(self.id)
    }

    pub fn refine_flag(&self) -> RefinementCase {
        self.tria.refine_flag_of(self.id)
    }

    pub fn coarsen_flag(&self) -> bool {
        self.tria.coarsen_flag_of(self.id)
    }

    fn level_store(&self) -> &'a crate::topology::store::TriaLevel {
        &self.tria.levels[self.level()]
    }

    pub fn user_flag(&self) -> bool {
        self.level_store().cells.user_flags[self.index()]
    }

    pub fn user_data(&self) -> u64 {
        self.level_store().cells.user_data[self.index()]
    }

    pub fn material_id(&self) -> MaterialId {
        self.level_store().cells.boundary_or_material_id[self.index()]
    }

    pub fn manifold_id(&self) -> ManifoldId {
        self.level_store().cells.manifold_id[self.index()]
    }

    pub fn subdomain_id(&self) -> SubdomainId {
        self.level_store().subdomain_ids[self.index()]
    }

    pub fn level_subdomain_id(&self) -> SubdomainId {
        self.level_store().level_subdomain_ids[self.index()]
    }

    /// Codim-1 meshes: `false` if the cell's normal is flipped relative to
    /// its vertex order.
    pub fn direction_flag(&self) -> bool {
        self.level_store().direction_flags[self.index()]
    }

    /// Position among the active cells, `None` for inactive cells.
    pub fn active_cell_index(&self) -> Option<usize> {
        match self.level_store().active_cell_indices[self.index()] {
            INVALID_UNSIGNED_INT => None,
            i => Some(i as usize),
        }
    }

    pub fn global_active_cell_index(&self) -> Option<u64> {
        match self.level_store().global_active_cell_indices[self.index()] {
            INVALID_DOF_INDEX => None,
            i => Some(i),
        }
    }

    pub fn global_level_cell_index(&self) -> Option<u64> {
        match self.level_store().global_level_cell_indices[self.index()] {
            INVALID_DOF_INDEX => None,
            i => Some(i),
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.reference_cell().n_vertices()
    }

    pub fn vertex_indices(&self) -> &'a [u32] {
        self.tria.cell_vertex_indices(self.id)
    }

    pub fn vertex_index(&self, v: usize) -> usize {
        self.vertex_indices()[v] as usize
    }

    pub fn vertex(&self, v: usize) -> Point {
        self.tria.vertices()[self.vertex_index(v)]
    }

    pub fn n_faces(&self) -> usize {
        self.reference_cell().n_faces()
    }

    /// Index of the face object (vertex index in 1D).
    pub fn face_index(&self, f: usize) -> usize {
        self.tria.cell_face_index(self.id, f)
    }

    pub fn face(&self, f: usize) -> FaceAccessor<'a> {
        FaceAccessor {
            tria: self.tria,
            index: self.face_index(f),
        }
    }

    pub fn faces(&self) -> impl Iterator<Item = FaceAccessor<'a>> + use<'a> {
        let this = *self;
        (0..self.n_faces()).map(move |f| this.face(f))
    }

    /// Orientation under which the cell sees its face `f`.
    pub fn face_orientation(&self, f: usize) -> FaceOrientation {
        self.level_store().face_orientation(self.index(), f)
    }

    /// Index of line `l` (in the cell's local line numbering) in the line
    /// store. In 2D the lines are the faces; 1D cells have no line objects.
    pub fn line_index(&self, l: usize) -> Option<usize> {
        let kind = self.reference_cell();
        match self.tria.dim {
            1 => None,
            2 => Some(self.face_index(l)),
            _ => {
                let [a, b] = kind.line_vertices(l);
                let (ga, gb) = (self.vertex_indices()[a], self.vertex_indices()[b]);
                let lines = &self.tria.faces.lines;
                self.tria
                    .cell_face_indices(self.id)
                    .iter()
                    .flat_map(|&q| self.tria.faces.quads.bounds_of(q as usize).iter().copied())
                    .map(|l| l as usize)
                    .find(|&l| {
                        let v = lines.vertices_of(l);
                        (v[0] == ga && v[1] == gb) || (v[0] == gb && v[1] == ga)
                    })
            }
        }
    }

    pub fn line(&self, l: usize) -> Option<LineAccessor<'a>> {
        self.line_index(l).map(|index| LineAccessor {
            tria: self.tria,
            index,
        })
    }

    /// Neighbor across face `f`: same level or coarser, `None` at the
    /// boundary.
    pub fn neighbor(&self, f: usize) -> Option<CellAccessor<'a>> {
        self.tria
            .neighbor_of(self.id, f)
            .map(|n| self.tria.accessor(n))
    }

    pub fn at_boundary_face(&self, f: usize) -> bool {
        self.neighbor(f).is_none() && !self.tria.has_periodic_neighbor(self.id, f)
    }

    /// `true` if any face lies on the domain boundary.
    pub fn at_boundary(&self) -> bool {
        (0..self.n_faces()).any(|f| self.neighbor(f).is_none())
    }

    /// `true` if the neighbor across `f` sees a face strictly containing
    /// this cell's face.
    pub fn neighbor_is_coarser(&self, f: usize) -> Result<bool, MeshError> {
        self.tria.neighbor_is_coarser(self.id, f)
    }

    pub fn neighbor_of_neighbor(&self, f: usize) -> Result<usize, MeshError> {
        self.tria.neighbor_of_neighbor(self.id, f)
    }

    pub fn neighbor_of_coarser_neighbor(&self, f: usize) -> Result<(usize, usize), MeshError> {
        self.tria.neighbor_of_coarser_neighbor(self.id, f)
    }

    pub fn neighbor_child_on_subface(
        &self,
        f: usize,
        subface: usize,
    ) -> Result<CellAccessor<'a>, MeshError> {
        self.tria
            .neighbor_child_on_subface(self.id, f, subface)
            .map(|c| self.tria.accessor(c))
    }

    pub fn has_periodic_neighbor(&self, f: usize) -> bool {
        self.tria.has_periodic_neighbor(self.id, f)
    }

    pub fn periodic_neighbor(&self, f: usize) -> Option<(CellAccessor<'a>, usize)> {
        self.tria
            .periodic_partner(self.id, f)
            .map(|(c, g, _)| (self.tria.accessor(c), g as usize))
    }

    pub fn points(&self) -> Vec<Point> {
        self.tria.points_of(self.vertex_indices())
    }

    /// Center as placed by the cell's manifold.
    pub fn center(&self) -> Point {
        let points = self.points();
        let w = 1.0 / points.len() as f64;
        let weights = vec![w; points.len()];
        self.tria
            .manifold(self.manifold_id())
            .get_new_point(&points, &weights)
    }

    pub fn measure(&self) -> f64 {
        quality::measure(self.reference_cell(), &self.points(), self.tria.spacedim)
    }

    pub fn diameter(&self) -> f64 {
        quality::diameter(&self.points())
    }
}

/// Read-only view of a face: a vertex in 1D, a line in 2D, a quad or
/// triangle in 3D.
#[derive(Clone, Copy)]
pub struct FaceAccessor<'a> {
    tria: &'a Triangulation,
    index: usize,
}

impl std::fmt::Debug for FaceAccessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Face({})", self.index)
    }
}

impl<'a> FaceAccessor<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reference_cell(&self) -> ReferenceCell {
        match self.tria.dim {
            1 => ReferenceCell::Vertex,
            _ => self.tria.face_objects().kind(self.index),
        }
    }

    pub fn is_used(&self) -> bool {
        match self.tria.dim {
            1 => self.tria.vertex_used(self.index),
            _ => self.tria.face_objects().is_used(self.index),
        }
    }

    pub fn vertex_indices(&self) -> Vec<u32> {
        self.tria.face_vertex_indices(self.index)
    }

    pub fn vertex(&self, v: usize) -> Point {
        self.tria.vertices()[self.vertex_indices()[v] as usize]
    }

    pub fn boundary_id(&self) -> BoundaryId {
        self.tria.face_boundary_id(self.index)
    }

    pub fn at_boundary(&self) -> bool {
        self.boundary_id() != INTERNAL_FACE_BOUNDARY_ID
    }

    pub fn manifold_id(&self) -> ManifoldId {
        match self.tria.dim {
            1 => crate::types::FLAT_MANIFOLD_ID,
            _ => self.tria.face_objects().manifold_id[self.index],
        }
    }

    pub fn user_flag(&self) -> bool {
        self.tria.dim > 1 && self.tria.face_objects().user_flags[self.index]
    }

    pub fn has_children(&self) -> bool {
        self.tria.face_has_children(self.index)
    }

    pub fn n_children(&self) -> usize {
        match self.tria.dim {
            1 => 0,
            _ => self.tria.face_objects().n_children(self.index),
        }
    }

    pub fn child(&self, k: usize) -> Result<FaceAccessor<'a>, MeshError> {
        let n = self.n_children();
        if k >= n {
            return Err(MeshError::InvalidChildIndex {
                index: k,
                n_children: n,
            });
        }
        Ok(FaceAccessor {
            tria: self.tria,
            index: self.tria.face_objects().child(self.index, k),
        })
    }

    pub fn parent(&self) -> Option<FaceAccessor<'a>> {
        self.tria.face_parent(self.index).map(|index| FaceAccessor {
            tria: self.tria,
            index,
        })
    }

    pub fn refinement_case(&self) -> RefinementCase {
        self.tria.refinement_case_of_face(self.index)
    }

    /// Number of subfaces as seen from a coarser neighbor.
    pub fn n_subfaces(&self) -> usize {
        self.tria.n_subfaces(self.index)
    }

    /// Bounding line `l` of a 3D face.
    pub fn line(&self, l: usize) -> Option<LineAccessor<'a>> {
        if self.tria.dim != 3 {
            return None;
        }
        let index = *self.tria.faces.quads.bounds_of(self.index).get(l)? as usize;
        Some(LineAccessor {
            tria: self.tria,
            index,
        })
    }

    /// Whether bounding line `l` of a 3D face is stored in the direction the
    /// face's own vertex order expects.
    pub fn line_orientation(&self, l: usize) -> bool {
        let Some(line) = self.line(l) else {
            return true;
        };
        let kind = self.reference_cell();
        let [a, _] = kind.line_vertices(l);
        line.vertex_indices()[0] == self.vertex_indices()[a]
    }

    pub fn center(&self) -> Point {
        let vs = self.vertex_indices();
        let points = self.tria.points_of(&vs);
        let w = 1.0 / points.len() as f64;
        self.tria
            .manifold(self.manifold_id())
            .get_new_point(&points, &vec![w; points.len()])
    }
}

/// Read-only view of an object of the line store (2D and 3D meshes).
#[derive(Clone, Copy)]
pub struct LineAccessor<'a> {
    tria: &'a Triangulation,
    index: usize,
}

impl std::fmt::Debug for LineAccessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line({})", self.index)
    }
}

impl<'a> LineAccessor<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_used(&self) -> bool {
        self.tria.faces.lines.is_used(self.index)
    }

    pub fn vertex_indices(&self) -> &'a [u32] {
        self.tria.faces.lines.vertices_of(self.index)
    }

    pub fn vertex(&self, v: usize) -> Point {
        self.tria.vertices()[self.vertex_indices()[v] as usize]
    }

    pub fn boundary_id(&self) -> BoundaryId {
        self.tria.faces.lines.boundary_or_material_id[self.index]
    }

    pub fn at_boundary(&self) -> bool {
        self.boundary_id() != INTERNAL_FACE_BOUNDARY_ID
    }

    pub fn manifold_id(&self) -> ManifoldId {
        self.tria.faces.lines.manifold_id[self.index]
    }

    pub fn user_flag(&self) -> bool {
        self.tria.faces.lines.user_flags[self.index]
    }

    pub fn has_children(&self) -> bool {
        self.tria.faces.lines.has_children(self.index)
    }

    pub fn child(&self, k: usize) -> Result<LineAccessor<'a>, MeshError> {
        let n = self.tria.faces.lines.n_children(self.index);
        if k >= n {
            return Err(MeshError::InvalidChildIndex {
                index: k,
                n_children: n,
            });
        }
        Ok(LineAccessor {
            tria: self.tria,
            index: self.tria.faces.lines.child(self.index, k),
        })
    }

    pub fn parent(&self) -> Option<LineAccessor<'a>> {
        self.tria
            .faces
            .lines
            .parent(self.index)
            .map(|index| LineAccessor {
                tria: self.tria,
                index,
            })
    }

    pub fn center(&self) -> Point {
        let points = self.tria.points_of(self.vertex_indices());
        self.tria
            .manifold(self.manifold_id())
            .get_new_point(&points, &[0.5, 0.5])
    }

    pub fn length(&self) -> f64 {
        quality::diameter(&self.tria.points_of(self.vertex_indices()))
    }
}

/// Write access to the flags and ids of one cell.
pub struct CellMut<'a> {
    tria: &'a mut Triangulation,
    id: CellId,
}

impl CellMut<'_> {
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Read-only view of the same cell.
    pub fn as_accessor(&self) -> CellAccessor<'_> {
        self.tria.accessor(self.id)
    }

    pub fn set_refine_flag(&mut self, case: RefinementCase) -> Result<(), MeshError> {
        self.tria.set_refine_flag(self.id, case)
    }

    pub fn set_isotropic_refine_flag(&mut self) -> Result<(), MeshError> {
        self.tria.set_isotropic_refine_flag(self.id)
    }

    pub fn clear_refine_flag(&mut self) -> Result<(), MeshError> {
        self.tria.clear_refine_flag(self.id)
    }

    pub fn set_coarsen_flag(&mut self) -> Result<(), MeshError> {
        self.tria.set_coarsen_flag(self.id)
    }

    pub fn clear_coarsen_flag(&mut self) -> Result<(), MeshError> {
        self.tria.clear_coarsen_flag(self.id)
    }

    fn slot(&mut self) -> (&mut crate::topology::store::TriaLevel, usize) {
        (&mut self.tria.levels[self.id.level()], self.id.index())
    }

    pub fn set_user_flag(&mut self, flag: bool) {
        let (level, i) = self.slot();
        level.cells.user_flags[i] = flag;
    }

    pub fn set_user_data(&mut self, data: u64) {
        let (level, i) = self.slot();
        level.cells.user_data[i] = data;
    }

    pub fn set_material_id(&mut self, id: MaterialId) {
        let (level, i) = self.slot();
        level.cells.boundary_or_material_id[i] = id;
    }

    pub fn set_manifold_id(&mut self, id: ManifoldId) {
        let (level, i) = self.slot();
        level.cells.manifold_id[i] = id;
    }

    pub fn set_subdomain_id(&mut self, id: SubdomainId) {
        let (level, i) = self.slot();
        level.subdomain_ids[i] = id;
    }

    pub fn set_level_subdomain_id(&mut self, id: SubdomainId) {
        let (level, i) = self.slot();
        level.level_subdomain_ids[i] = id;
    }
}

impl Triangulation {
    #[inline]
    pub(crate) fn accessor(&self, id: CellId) -> CellAccessor<'_> {
        CellAccessor { tria: self, id }
    }

    /// View of a used cell.
    pub fn cell(&self, id: CellId) -> Result<CellAccessor<'_>, MeshError> {
        self.check_cell(id)?;
        Ok(self.accessor(id))
    }

    pub fn cell_mut(&mut self, id: CellId) -> Result<CellMut<'_>, MeshError> {
        self.check_cell(id)?;
        Ok(CellMut { tria: self, id })
    }

    fn check_level(&self, level: usize) -> Result<(), MeshError> {
        if level >= self.levels.len() {
            return Err(MeshError::InvalidLevel {
                level,
                n_levels: self.levels.len(),
            });
        }
        Ok(())
    }

    /// Every used cell, coarsest level first.
    pub fn cell_iter(&self) -> impl Iterator<Item = CellAccessor<'_>> + '_ {
        (0..self.levels.len()).flat_map(move |l| self.level_cells(l).filter(|c| c.is_used()))
    }

    /// Every active cell, in active-index order.
    pub fn active_cell_iter(&self) -> impl Iterator<Item = CellAccessor<'_>> + '_ {
        self.cell_iter().filter(|c| c.is_active())
    }

    fn level_cells(&self, level: usize) -> impl Iterator<Item = CellAccessor<'_>> + '_ {
        (0..self.levels[level].len()).map(move |i| self.accessor(CellId::new(level, i)))
    }

    /// Every cell slot on `level`, used or not.
    pub fn raw_cell_iter_on_level(
        &self,
        level: usize,
    ) -> Result<impl Iterator<Item = CellAccessor<'_>> + '_, MeshError> {
        self.check_level(level)?;
        Ok(self.level_cells(level))
    }

    pub fn cell_iter_on_level(
        &self,
        level: usize,
    ) -> Result<impl Iterator<Item = CellAccessor<'_>> + '_, MeshError> {
        Ok(self.raw_cell_iter_on_level(level)?.filter(|c| c.is_used()))
    }

    pub fn active_cell_iter_on_level(
        &self,
        level: usize,
    ) -> Result<impl Iterator<Item = CellAccessor<'_>> + '_, MeshError> {
        Ok(self.raw_cell_iter_on_level(level)?.filter(|c| c.is_active()))
    }

    /// Every used face (used vertex in 1D), including refined ones.
    pub fn face_iter(&self) -> impl Iterator<Item = FaceAccessor<'_>> + '_ {
        let n = match self.dim {
            1 => self.vertices.len(),
            _ => self.face_objects().len(),
        };
        (0..n)
            .map(move |index| FaceAccessor { tria: self, index })
            .filter(|f| f.is_used())
    }

    /// Faces of active cells, each once.
    pub fn active_face_iter(&self) -> impl Iterator<Item = FaceAccessor<'_>> + '_ {
        self.active_cell_iter()
            .flat_map(|c| (0..c.n_faces()).map(move |f| c.face_index(f)))
            .sorted_unstable()
            .dedup()
            .map(move |index| FaceAccessor { tria: self, index })
    }

    pub fn raw_line_iter(&self) -> impl Iterator<Item = LineAccessor<'_>> + '_ {
        (0..self.faces.lines.len()).map(move |index| LineAccessor { tria: self, index })
    }

    pub fn line_iter(&self) -> impl Iterator<Item = LineAccessor<'_>> + '_ {
        self.raw_line_iter().filter(|l| l.is_used())
    }

    pub fn active_line_iter(&self) -> impl Iterator<Item = LineAccessor<'_>> + '_ {
        self.line_iter().filter(|l| !l.has_children())
    }

    /// Face object `index` (vertex in 1D).
    pub fn face(&self, index: usize) -> Result<FaceAccessor<'_>, MeshError> {
        let face = FaceAccessor { tria: self, index };
        let n = match self.dim {
            1 => self.vertices.len(),
            _ => self.face_objects().len(),
        };
        if index >= n || !face.is_used() {
            return Err(MeshError::InvalidObjectIndex {
                structdim: self.dim - 1,
                index,
            });
        }
        Ok(face)
    }

    pub fn line(&self, index: usize) -> Result<LineAccessor<'_>, MeshError> {
        if !self.faces.lines.is_used(index) {
            return Err(MeshError::InvalidObjectIndex { structdim: 1, index });
        }
        Ok(LineAccessor { tria: self, index })
    }

    /// Set the boundary id of a boundary face (and, in 3D, of its lines).
    pub fn set_face_boundary_id(&mut self, face: usize, id: BoundaryId) -> Result<(), MeshError> {
        let at_boundary = self.face(face)?.at_boundary();
        if self.dim == 1 {
            return Err(MeshError::InvalidInput(
                "1D boundary ids are derived from the vertex position".into(),
            ));
        }
        if !at_boundary || id == INTERNAL_FACE_BOUNDARY_ID {
            return Err(MeshError::InvalidInput(format!(
                "face {face} is interior or id {id} is reserved"
            )));
        }
        self.face_objects_mut().boundary_or_material_id[face] = id;
        Ok(())
    }

    pub fn set_face_manifold_id(&mut self, face: usize, id: ManifoldId) -> Result<(), MeshError> {
        self.face(face)?;
        if self.dim == 1 {
            return Ok(());
        }
        self.face_objects_mut().manifold_id[face] = id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::create::{CellData, SubCellData};

    fn two_quads() -> Triangulation {
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
        ];
        let cells = vec![CellData::new([0, 1, 3, 4]), CellData::new([1, 2, 4, 5])];
        let mut tria = Triangulation::new(2, 2).unwrap();
        tria.create_triangulation(&vertices, &cells, &SubCellData::default())
            .unwrap();
        tria
    }

    #[test]
    fn neighbors_and_boundary_faces() {
        let tria = two_quads();
        let c0 = tria.cell(CellId::new(0, 0)).unwrap();
        assert_eq!(c0.neighbor(1).map(|c| c.index()), Some(1));
        assert!(c0.neighbor(0).is_none());
        assert!(c0.face(0).at_boundary());
        assert!(!c0.face(1).at_boundary());
        assert_eq!(c0.neighbor_of_neighbor(1).unwrap(), 0);
        assert!((c0.measure() - 1.0).abs() < 1e-12);
        assert_eq!(c0.center(), [0.5, 0.5, 0.0]);
    }

    #[test]
    fn iterators_count_used_and_active_objects() {
        let tria = two_quads();
        assert_eq!(tria.cell_iter().count(), 2);
        assert_eq!(tria.active_cell_iter().count(), 2);
        assert_eq!(tria.line_iter().count(), 7);
        assert_eq!(tria.active_face_iter().count(), 7);
        assert!(tria.cell_iter_on_level(1).is_err());
        let indices: Vec<_> = tria
            .active_cell_iter()
            .map(|c| c.active_cell_index())
            .collect();
        assert_eq!(indices, vec![Some(0), Some(1)]);
    }

    #[test]
    fn cell_mut_edits_flags_and_ids() {
        let mut tria = two_quads();
        let mut c = tria.cell_mut(CellId::new(0, 1)).unwrap();
        c.set_material_id(3);
        c.set_user_flag(true);
        c.set_isotropic_refine_flag().unwrap();
        let view = c.as_accessor();
        assert_eq!(view.material_id(), 3);
        assert!(view.user_flag());
        assert_eq!(view.refine_flag(), RefinementCase::CUT_XY);
        assert!(matches!(
            view.child(0),
            Err(MeshError::InvalidChildIndex { index: 0, n_children: 0 })
        ));
    }
}
