//! Building the coarse mesh from a list of cells.
//!
//! Input cells list their vertices in the standard local order of their
//! reference cell (lexicographic for tensor-product cells).
//! [`Triangulation::create_triangulation_compatibility`] accepts the legacy
//! counter-clockwise order instead and permutes it.
//!
//! Creation dedupes shared lines and faces by their sorted vertex tuple.
//! Faces referenced by a single cell get boundary id 0, and so do their lines
//! in 3D. Subcell data then overrides boundary and manifold ids of individual
//! lines and faces.

use crate::geometry::quality::{is_distorted, measure};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ReferenceCell;
use crate::topology::connectivity::{Connectivity, FaceKey, face_key, line_key};
use crate::topology::orientation::FaceOrientation;
use crate::topology::signals::Signal;
use crate::topology::store::{TriaFaces, TriaLevel};
use crate::topology::triangulation::Triangulation;
use crate::types::{
    BoundaryId, CellId, FLAT_MANIFOLD_ID, INTERNAL_FACE_BOUNDARY_ID, ManifoldId, MaterialId, Point,
};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One coarse cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellData {
    pub vertices: Vec<u32>,
    #[serde(default)]
    pub material_id: MaterialId,
    #[serde(default = "flat_manifold")]
    pub manifold_id: ManifoldId,
}

impl CellData {
    /// Cell with material 0 on the flat manifold.
    pub fn new(vertices: impl Into<Vec<u32>>) -> Self {
        CellData {
            vertices: vertices.into(),
            material_id: 0,
            manifold_id: FLAT_MANIFOLD_ID,
        }
    }

    pub fn with_material(mut self, material_id: MaterialId) -> Self {
        self.material_id = material_id;
        self
    }

    pub fn with_manifold(mut self, manifold_id: ManifoldId) -> Self {
        self.manifold_id = manifold_id;
        self
    }
}

/// Boundary and manifold ids for one line or face, named by its vertices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCellEntry {
    pub vertices: Vec<u32>,
    #[serde(default)]
    pub boundary_id: BoundaryId,
    #[serde(default = "flat_manifold")]
    pub manifold_id: ManifoldId,
    /// Allow a boundary id on an interior object (an internal interface).
    #[serde(default)]
    pub interior: bool,
}

impl SubCellEntry {
    pub fn new(vertices: impl Into<Vec<u32>>, boundary_id: BoundaryId) -> Self {
        SubCellEntry {
            vertices: vertices.into(),
            boundary_id,
            manifold_id: FLAT_MANIFOLD_ID,
            interior: false,
        }
    }

    /// Entry that only assigns a manifold id.
    pub fn manifold_only(vertices: impl Into<Vec<u32>>, manifold_id: ManifoldId) -> Self {
        SubCellEntry {
            vertices: vertices.into(),
            boundary_id: INTERNAL_FACE_BOUNDARY_ID,
            manifold_id,
            interior: false,
        }
    }
}

/// Ids for lines (2D faces, 3D edges) and quads (3D faces).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCellData {
    #[serde(default)]
    pub boundary_lines: Vec<SubCellEntry>,
    #[serde(default)]
    pub boundary_quads: Vec<SubCellEntry>,
}

impl SubCellData {
    pub fn is_empty(&self) -> bool {
        self.boundary_lines.is_empty() && self.boundary_quads.is_empty()
    }
}

fn flat_manifold() -> ManifoldId {
    FLAT_MANIFOLD_ID
}

impl Triangulation {
    /// Build the coarse mesh. The triangulation must be empty.
    ///
    /// On failure the triangulation is left empty, except for
    /// [`MeshError::DistortedCells`], which is reported after the mesh has
    /// been built completely.
    pub fn create_triangulation(
        &mut self,
        vertices: &[Point],
        cells: &[CellData],
        subcell_data: &SubCellData,
    ) -> Result<(), MeshError> {
        if !self.is_empty() {
            return Err(MeshError::InvalidInput(
                "create_triangulation requires an empty triangulation".into(),
            ));
        }
        if let Err(e) = self.build_coarse_mesh(vertices, cells, subcell_data) {
            log::warn!("creation failed: {e}");
            self.clear_despite_subscriptions();
            return Err(e);
        }
        log::debug!(
            "created coarse mesh: {} cells, {} vertices, {} lines, {} quads",
            self.n_active_cells(),
            self.n_used_vertices(),
            self.n_lines(),
            self.n_quads()
        );
        self.signals.fire(Signal::Create);

        if self.settings.check_for_distorted_cells && self.dim == self.spacedim {
            let distorted: Vec<CellId> = (0..cells.len())
                .map(|i| CellId::new(0, i))
                .filter(|&c| {
                    let kind = self.cell_kind(c);
                    is_distorted(kind, &self.points_of(self.cell_vertex_indices(c)))
                })
                .collect();
            if !distorted.is_empty() {
                return Err(MeshError::DistortedCells(distorted));
            }
        }
        Ok(())
    }

    /// Like [`Self::create_triangulation`], with cell vertices given in the
    /// legacy counter-clockwise order.
    pub fn create_triangulation_compatibility(
        &mut self,
        vertices: &[Point],
        cells: &[CellData],
        subcell_data: &SubCellData,
    ) -> Result<(), MeshError> {
        let mut permuted = cells.to_vec();
        for cell in &mut permuted {
            let Some(kind) = ReferenceCell::from_vertex_count(self.dim, cell.vertices.len()) else {
                continue;
            };
            let legacy = cell.vertices.clone();
            for (i, &p) in kind.legacy_to_standard().iter().enumerate() {
                cell.vertices[i] = legacy[p];
            }
        }
        self.create_triangulation(vertices, &permuted, subcell_data)
    }

    fn build_coarse_mesh(
        &mut self,
        vertices: &[Point],
        cells: &[CellData],
        subcell_data: &SubCellData,
    ) -> Result<(), MeshError> {
        if vertices.is_empty() || cells.is_empty() {
            return Err(MeshError::EmptyInput);
        }
        let kinds = self.check_cells(vertices, cells)?;
        self.vertices = vertices.to_vec();
        self.vertices_used = vec![false; vertices.len()];

        let mut level = TriaLevel::new(self.dim);
        level.reserve_for_cells(cells.len(), self.dim >= 2);
        let mut faces = TriaFaces::new();
        match self.dim {
            1 => {
                for (i, (cell, &kind)) in cells.iter().zip(&kinds).enumerate() {
                    level.cells.init_slot(
                        i,
                        kind,
                        &cell.vertices,
                        &[],
                        None,
                        cell.material_id,
                        cell.manifold_id,
                    );
                }
            }
            2 => build_2d(&mut level, &mut faces, cells, &kinds)?,
            _ => build_3d(&mut level, &mut faces, cells, &kinds)?,
        }
        self.levels = vec![level];
        self.faces = faces;

        self.mark_boundary()?;
        self.apply_subcell_data(subcell_data)?;
        if self.dim < self.spacedim {
            self.orient_codim_one()?;
        }

        let mut reference_cells = kinds;
        reference_cells.sort_unstable();
        reference_cells.dedup();
        self.reference_cells = reference_cells;
        self.recompute_used_vertices();
        self.update_after_change()
    }

    /// Reference cell of every input cell; rejects bad vertex lists and
    /// inverted cells.
    fn check_cells(
        &self,
        vertices: &[Point],
        cells: &[CellData],
    ) -> Result<Vec<ReferenceCell>, MeshError> {
        let mut kinds = Vec::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            let kind = ReferenceCell::from_vertex_count(self.dim, cell.vertices.len())
                .ok_or_else(|| {
                    MeshError::InvalidInput(format!(
                        "cell {i} has {} vertices, which names no {}-dimensional reference cell",
                        cell.vertices.len(),
                        self.dim
                    ))
                })?;
            if let Some(&v) = cell.vertices.iter().find(|&&v| v as usize >= vertices.len()) {
                return Err(MeshError::VertexIndexOutOfRange {
                    cell: i,
                    vertex: v,
                    n_vertices: vertices.len(),
                });
            }
            for (k, v) in cell.vertices.iter().enumerate() {
                if cell.vertices[k + 1..].contains(v) {
                    return Err(MeshError::InvalidInput(format!(
                        "cell {i} uses vertex {v} twice"
                    )));
                }
            }
            if self.dim == self.spacedim {
                let points: Vec<Point> =
                    cell.vertices.iter().map(|&v| vertices[v as usize]).collect();
                let m = measure(kind, &points, self.spacedim);
                if m <= 0.0 {
                    return Err(MeshError::NegativeMeasure { cell: i, measure: m });
                }
            }
            kinds.push(kind);
        }
        Ok(kinds)
    }

    /// Faces seen by exactly one coarse cell become boundary faces with id 0.
    fn mark_boundary(&mut self) -> Result<(), MeshError> {
        if self.dim == 1 {
            return Ok(());
        }
        let refs = self.face_references();
        if let Some(f) = refs.iter().position(|r| r.len() > 2) {
            return Err(MeshError::InvalidInput(format!(
                "face with vertices {:?} is shared by {} cells",
                self.face_vertex_indices(f),
                refs[f].len()
            )));
        }
        for (f, r) in refs.iter().enumerate() {
            if r.len() != 1 {
                continue;
            }
            self.face_objects_mut().boundary_or_material_id[f] = 0;
            if self.dim == 3 {
                let TriaFaces { lines, quads } = &mut self.faces;
                for &l in quads.bounds_of(f) {
                    lines.boundary_or_material_id[l as usize] = 0;
                }
            }
        }
        Ok(())
    }

    fn apply_subcell_data(&mut self, data: &SubCellData) -> Result<(), MeshError> {
        let conn = Connectivity::build(&self.faces);
        let mut unmatched = 0;
        match self.dim {
            1 => unmatched += data.boundary_lines.len() + data.boundary_quads.len(),
            2 => {
                unmatched += self.apply_entries(&data.boundary_lines, 1, &conn)?;
                unmatched += data.boundary_quads.len();
            }
            _ => {
                unmatched += self.apply_entries(&data.boundary_quads, 2, &conn)?;
                unmatched += self.apply_entries(&data.boundary_lines, 1, &conn)?;
            }
        }
        if unmatched > 0 {
            log::warn!("{unmatched} subcell entries match no line or face and were ignored");
        }
        self.n_unmatched_subcell_entries = unmatched;
        Ok(())
    }

    /// Apply entries to lines (`structdim == 1`) or quads. Returns the number
    /// of entries naming no existing object.
    fn apply_entries(
        &mut self,
        entries: &[SubCellEntry],
        structdim: usize,
        conn: &Connectivity,
    ) -> Result<usize, MeshError> {
        let mut seen: HashMap<FaceKey, (BoundaryId, ManifoldId)> = HashMap::new();
        let mut unmatched = 0;
        for entry in entries {
            let index = match (structdim, entry.vertices.as_slice()) {
                (1, &[a, b]) => conn.line(a, b),
                (2, vs) if vs.len() == 3 || vs.len() == 4 => conn.quad(vs),
                _ => {
                    return Err(MeshError::InvalidInput(format!(
                        "subcell entry {:?} has the wrong number of vertices",
                        entry.vertices
                    )));
                }
            };
            let key = match entry.vertices.as_slice() {
                &[a, b] => {
                    let [x, y] = line_key(a, b);
                    [x, y, u32::MAX, u32::MAX]
                }
                vs => face_key(vs),
            };
            let ids = (entry.boundary_id, entry.manifold_id);
            if let Some(previous) = seen.insert(key, ids) {
                if previous != ids {
                    return Err(MeshError::InvalidInput(format!(
                        "contradictory subcell entries for {:?}",
                        entry.vertices
                    )));
                }
                continue;
            }
            let Some(i) = index else {
                unmatched += 1;
                continue;
            };
            let objects = if structdim == 1 {
                &mut self.faces.lines
            } else {
                &mut self.faces.quads
            };
            let on_boundary = objects.boundary_or_material_id[i] != INTERNAL_FACE_BOUNDARY_ID;
            if entry.boundary_id != INTERNAL_FACE_BOUNDARY_ID {
                if !on_boundary && !entry.interior {
                    return Err(MeshError::BoundaryIdOnInternalFace {
                        vertices: entry.vertices.clone(),
                    });
                }
                objects.boundary_or_material_id[i] = entry.boundary_id;
            } else if on_boundary && entry.interior {
                return Err(MeshError::InvalidInput(format!(
                    "boundary object {:?} cannot be marked interior",
                    entry.vertices
                )));
            }
            objects.manifold_id[i] = entry.manifold_id;
        }
        Ok(unmatched)
    }

    /// Give every cell of a surface mesh a direction flag so that adjacent
    /// cells induce opposite directions on their shared face.
    fn orient_codim_one(&mut self) -> Result<(), MeshError> {
        let n = self.levels[0].len();
        let mut by_face: HashMap<u32, Vec<(usize, usize)>> = HashMap::new();
        for i in 0..n {
            for (f, &face) in self.levels[0].cells.bounds_of(i).iter().enumerate() {
                by_face.entry(face).or_default().push((i, f));
            }
        }
        let mut flag: Vec<Option<bool>> = vec![None; n];
        let mut queue = VecDeque::new();
        for start in 0..n {
            if flag[start].is_some() {
                continue;
            }
            flag[start] = Some(true);
            queue.push_back(start);
            while let Some(i) = queue.pop_front() {
                let own = flag[i].unwrap_or(true);
                for f in 0..self.levels[0].cells.kind(i).n_faces() {
                    let face = self.levels[0].cells.bounds_of(i)[f];
                    let Some(sharing) = by_face.get(&face) else {
                        continue;
                    };
                    for &(j, g) in sharing.iter().filter(|&&(j, _)| j != i) {
                        let same = self.walk_direction(i, f) == self.walk_direction(j, g);
                        let wanted = own ^ same;
                        match flag[j] {
                            None => {
                                flag[j] = Some(wanted);
                                queue.push_back(j);
                            }
                            Some(existing) if existing != wanted => {
                                return Err(MeshError::NonOrientableSurface {
                                    cell: CellId::new(0, j),
                                });
                            }
                            Some(_) => {}
                        }
                    }
                }
            }
        }
        let level = &mut self.levels[0];
        for (i, f) in flag.into_iter().enumerate() {
            level.direction_flags[i] = f.unwrap_or(true);
        }
        let n_flipped = level.direction_flags.iter().filter(|&&d| !d).count();
        log::debug!("oriented surface mesh, {n_flipped} cells flipped");
        Ok(())
    }

    /// Direction in which the boundary walk of coarse cell `i` crosses its
    /// face `f`: `true` for a line run from the walk's predecessor to its
    /// successor by increasing global vertex index (2D), or for the end
    /// vertex of a segment (1D).
    fn walk_direction(&self, i: usize, f: usize) -> bool {
        let cells = &self.levels[0].cells;
        let kind = cells.kind(i);
        if kind.dim() == 1 {
            return f == 1;
        }
        let n = kind.n_vertices();
        let [a, b] = kind.line_vertices(f);
        let forward = kind.ring_position(b) == (kind.ring_position(a) + 1) % n;
        let v = cells.vertices_of(i);
        let (from, to) = if forward { (v[a], v[b]) } else { (v[b], v[a]) };
        from < to
    }
}

/// Lines of a 2D coarse mesh, deduped; cells see them in stored or
/// reversed direction.
fn build_2d(
    level: &mut TriaLevel,
    faces: &mut TriaFaces,
    cells: &[CellData],
    kinds: &[ReferenceCell],
) -> Result<(), MeshError> {
    let mut conn = Connectivity::default();
    let mut lines: Vec<[u32; 2]> = Vec::new();
    for (cell, &kind) in cells.iter().zip(kinds) {
        for l in 0..kind.n_lines() {
            let [a, b] = kind.line_vertices(l);
            let (ga, gb) = (cell.vertices[a], cell.vertices[b]);
            if conn.line(ga, gb).is_none() {
                conn.insert_line(ga, gb, lines.len());
                lines.push([ga, gb]);
            }
        }
    }
    faces.lines.grow_to(lines.len());
    for (i, v) in lines.iter().enumerate() {
        faces.lines.init_slot(
            i,
            ReferenceCell::Line,
            v,
            &[],
            None,
            INTERNAL_FACE_BOUNDARY_ID,
            FLAT_MANIFOLD_ID,
        );
    }
    for (i, (cell, &kind)) in cells.iter().zip(kinds).enumerate() {
        let mut bounds = Vec::with_capacity(kind.n_faces());
        let mut orientations = Vec::with_capacity(kind.n_faces());
        for f in 0..kind.n_faces() {
            let [a, b] = kind.line_vertices(f);
            let (ga, gb) = (cell.vertices[a], cell.vertices[b]);
            let line = conn
                .line(ga, gb)
                .ok_or_else(|| MeshError::internal(format!("line ({ga}, {gb}) was not created")))?;
            orientations.push(if lines[line][0] == ga {
                FaceOrientation::STANDARD
            } else {
                FaceOrientation::REVERSED
            });
            bounds.push(line as u32);
        }
        level.cells.init_slot(
            i,
            kind,
            &cell.vertices,
            &bounds,
            None,
            cell.material_id,
            cell.manifold_id,
        );
        for (f, o) in orientations.into_iter().enumerate() {
            level.set_face_orientation(i, f, o);
        }
    }
    Ok(())
}

/// Lines and faces of a 3D coarse mesh. A face is stored with the vertex
/// order of the first cell that mentions it; later cells see it through
/// some orientation.
fn build_3d(
    level: &mut TriaLevel,
    faces: &mut TriaFaces,
    cells: &[CellData],
    kinds: &[ReferenceCell],
) -> Result<(), MeshError> {
    let mut conn = Connectivity::default();
    let mut lines: Vec<[u32; 2]> = Vec::new();
    let mut quads: Vec<(ReferenceCell, Vec<u32>)> = Vec::new();
    for (cell, &kind) in cells.iter().zip(kinds) {
        for l in 0..kind.n_lines() {
            let [a, b] = kind.line_vertices(l);
            let (ga, gb) = (cell.vertices[a], cell.vertices[b]);
            if conn.line(ga, gb).is_none() {
                conn.insert_line(ga, gb, lines.len());
                lines.push([ga, gb]);
            }
        }
        for f in 0..kind.n_faces() {
            let gv: Vec<u32> = kind
                .face_vertices(f)
                .iter()
                .map(|&v| cell.vertices[v])
                .collect();
            if conn.quad(&gv).is_none() {
                conn.insert_quad(&gv, quads.len());
                quads.push((kind.face_reference_cell(f), gv));
            }
        }
    }
    faces.lines.grow_to(lines.len());
    for (i, v) in lines.iter().enumerate() {
        faces.lines.init_slot(
            i,
            ReferenceCell::Line,
            v,
            &[],
            None,
            INTERNAL_FACE_BOUNDARY_ID,
            FLAT_MANIFOLD_ID,
        );
    }
    faces.quads.grow_to(quads.len());
    for (i, (kind, gv)) in quads.iter().enumerate() {
        let bounds = (0..kind.n_lines())
            .map(|l| {
                let [a, b] = kind.line_vertices(l);
                conn.line(gv[a], gv[b]).map(|x| x as u32).ok_or_else(|| {
                    MeshError::internal(format!("face {gv:?} has no line {l}"))
                })
            })
            .collect::<Result<Vec<u32>, MeshError>>()?;
        faces.quads.init_slot(
            i,
            *kind,
            gv,
            &bounds,
            None,
            INTERNAL_FACE_BOUNDARY_ID,
            FLAT_MANIFOLD_ID,
        );
    }
    for (i, (cell, &kind)) in cells.iter().zip(kinds).enumerate() {
        let mut bounds = Vec::with_capacity(kind.n_faces());
        let mut orientations = Vec::with_capacity(kind.n_faces());
        for f in 0..kind.n_faces() {
            let gv: Vec<u32> = kind
                .face_vertices(f)
                .iter()
                .map(|&v| cell.vertices[v])
                .collect();
            let face_kind = kind.face_reference_cell(f);
            let q = conn
                .quad(&gv)
                .ok_or_else(|| MeshError::internal(format!("face {gv:?} was not created")))?;
            let o = face_kind.compute_orientation(&gv, &quads[q].1).ok_or_else(|| {
                MeshError::InvalidInput(format!(
                    "cell {i} sees face {gv:?} with incompatible vertex order"
                ))
            })?;
            orientations.push(FaceOrientation(o));
            bounds.push(q as u32);
        }
        level.cells.init_slot(
            i,
            kind,
            &cell.vertices,
            &bounds,
            None,
            cell.material_id,
            cell.manifold_id,
        );
        for (f, o) in orientations.into_iter().enumerate() {
            level.set_face_orientation(i, f, o);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]
    }

    #[test]
    fn single_quad_has_four_boundary_lines() {
        let mut tria = Triangulation::new(2, 2).unwrap();
        tria.create_triangulation(&unit_square(), &[CellData::new([0, 1, 2, 3])], &SubCellData::default())
            .unwrap();
        assert_eq!(tria.n_active_cells(), 1);
        assert_eq!(tria.n_lines(), 4);
        assert_eq!(tria.n_used_vertices(), 4);
        for l in 0..4 {
            assert_eq!(tria.faces.lines.boundary_or_material_id[l], 0);
        }
    }

    #[test]
    fn legacy_order_is_permuted() {
        let mut tria = Triangulation::new(2, 2).unwrap();
        tria.create_triangulation_compatibility(
            &unit_square(),
            &[CellData::new([0, 1, 3, 2])],
            &SubCellData::default(),
        )
        .unwrap();
        assert_eq!(tria.cell_vertex_indices(CellId::new(0, 0)), &[0, 1, 2, 3]);
    }

    #[test]
    fn inverted_cell_is_rejected_and_mesh_stays_empty() {
        let mut tria = Triangulation::new(2, 2).unwrap();
        let err = tria
            .create_triangulation(&unit_square(), &[CellData::new([0, 2, 1, 3])], &SubCellData::default())
            .unwrap_err();
        assert!(matches!(err, MeshError::NegativeMeasure { cell: 0, .. }));
        assert!(tria.is_empty());
    }

    #[test]
    fn empty_and_out_of_range_input() {
        let mut tria = Triangulation::new(2, 2).unwrap();
        assert_eq!(
            tria.create_triangulation(&unit_square(), &[], &SubCellData::default()),
            Err(MeshError::EmptyInput)
        );
        let err = tria
            .create_triangulation(&unit_square(), &[CellData::new([0, 1, 2, 9])], &SubCellData::default())
            .unwrap_err();
        assert!(matches!(err, MeshError::VertexIndexOutOfRange { vertex: 9, .. }));
    }

    #[test]
    fn subcell_entries_set_ids_and_count_misses() {
        let mut tria = Triangulation::new(2, 2).unwrap();
        let sub = SubCellData {
            boundary_lines: vec![SubCellEntry::new([1, 3], 7), SubCellEntry::new([0, 3], 2)],
            boundary_quads: vec![],
        };
        tria.create_triangulation(&unit_square(), &[CellData::new([0, 1, 2, 3])], &sub)
            .unwrap();
        let conn = Connectivity::build(&tria.faces);
        let l = conn.line(3, 1).unwrap();
        assert_eq!(tria.faces.lines.boundary_or_material_id[l], 7);
        assert_eq!(tria.n_unmatched_subcell_entries(), 1);
    }

    #[test]
    fn contradictory_subcell_entries_are_rejected() {
        let mut tria = Triangulation::new(2, 2).unwrap();
        let sub = SubCellData {
            boundary_lines: vec![SubCellEntry::new([1, 3], 7), SubCellEntry::new([3, 1], 8)],
            boundary_quads: vec![],
        };
        let err = tria
            .create_triangulation(&unit_square(), &[CellData::new([0, 1, 2, 3])], &sub)
            .unwrap_err();
        assert!(matches!(err, MeshError::InvalidInput(_)));
    }

    #[test]
    fn cell_data_reads_from_json_with_defaults() {
        let cell: CellData = serde_json::from_str(r#"{"vertices":[0,1,2,3]}"#).unwrap();
        assert_eq!(cell, CellData::new([0, 1, 2, 3]));
        let entry: SubCellEntry =
            serde_json::from_str(r#"{"vertices":[0,1],"boundary_id":4}"#).unwrap();
        assert_eq!(entry, SubCellEntry::new([0, 1], 4));
    }
}
