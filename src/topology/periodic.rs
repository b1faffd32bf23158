//! Periodic face identification across refinement levels.
//!
//! The user registers pairs of coarse boundary faces. After every
//! structural change the pairs are descended through the cell hierarchy:
//! children of both sides whose faces coincide under the pair's orientation
//! are matched with each other (in both directions); a child face without a
//! counterpart on the other side is mapped to the coarser face containing
//! its image (one direction only).
//!
//! Face-local vertex `j` of the first face corresponds to face-local vertex
//! `standard_to_real_face_vertex(j, orientation)` of the second face.

use crate::mesh_error::MeshError;
use crate::topology::orientation::FaceOrientation;
use crate::topology::templates::template;
use crate::topology::triangulation::Triangulation;
use crate::types::{CellId, INTERNAL_FACE_BOUNDARY_ID};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Two coarse boundary faces identified with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicFacePair {
    pub cell: [CellId; 2],
    pub face_no: [u32; 2],
    /// How the second face is seen from the first.
    pub orientation: FaceOrientation,
}

type PeriodicEntry = (CellId, u32, FaceOrientation);

/// `(cell, face) -> (other cell, other face, orientation)` for every level.
#[derive(Clone, Debug, Default)]
pub struct PeriodicFaceMap {
    pairs: Vec<PeriodicFacePair>,
    map: HashMap<(CellId, u32), PeriodicEntry>,
}

impl PeriodicFaceMap {
    /// Registered coarse pairs.
    pub fn pairs(&self) -> &[PeriodicFacePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, cell: CellId, face_no: usize) -> Option<PeriodicEntry> {
        self.map.get(&(cell, face_no as u32)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((CellId, u32), PeriodicEntry)> + '_ {
        self.map.iter().map(|(&k, &v)| (k, v))
    }
}

impl Triangulation {
    /// Register periodic pairs of coarse boundary faces and rebuild the map.
    pub fn add_periodicity(&mut self, pairs: &[PeriodicFacePair]) -> Result<(), MeshError> {
        for pair in pairs {
            self.check_periodic_pair(pair)?;
        }
        self.periodic.pairs.extend_from_slice(pairs);
        self.update_periodic_face_map()?;
        log::debug!(
            "registered {} periodic pairs, {} map entries",
            pairs.len(),
            self.periodic.len()
        );
        Ok(())
    }

    fn check_periodic_pair(&self, pair: &PeriodicFacePair) -> Result<(), MeshError> {
        let mut face_kinds = Vec::with_capacity(2);
        for side in 0..2 {
            let cell = pair.cell[side];
            let face_no = pair.face_no[side] as usize;
            self.check_cell(cell)?;
            if cell.level() != 0 {
                return Err(MeshError::InvalidInput(format!(
                    "periodic faces must belong to coarse cells, got {cell}"
                )));
            }
            let kind = self.cell_kind(cell);
            if face_no >= kind.n_faces() {
                return Err(MeshError::InvalidInput(format!(
                    "cell {cell} has no face {face_no}"
                )));
            }
            let face = self.cell_face_index(cell, face_no);
            if self.face_boundary_id(face) == INTERNAL_FACE_BOUNDARY_ID {
                return Err(MeshError::InvalidInput(format!(
                    "face {face_no} of cell {cell} is not a boundary face"
                )));
            }
            face_kinds.push(kind.face_reference_cell(face_no));
        }
        if face_kinds[0] != face_kinds[1] {
            return Err(MeshError::InvalidInput(format!(
                "periodic faces have different kinds {:?} and {:?}",
                face_kinds[0], face_kinds[1]
            )));
        }
        if pair.orientation.raw() >= face_kinds[0].n_face_orientations() {
            return Err(MeshError::InvalidInput(format!(
                "orientation {:?} is invalid for {:?} faces",
                pair.orientation, face_kinds[0]
            )));
        }
        Ok(())
    }

    /// Recompute the map from the registered pairs.
    pub(crate) fn update_periodic_face_map(&mut self) -> Result<(), MeshError> {
        let mut map = HashMap::new();
        for pair in self.periodic.pairs.clone() {
            let [a, b] = pair.cell;
            let [fa, fb] = pair.face_no;
            if !self.is_used(a) || !self.is_used(b) {
                return Err(MeshError::internal("periodic pair refers to a removed cell"));
            }
            self.descend_periodic(a, fa as usize, b, fb as usize, pair.orientation, &mut map)?;
            self.descend_periodic(
                b,
                fb as usize,
                a,
                fa as usize,
                pair.orientation.reversed_pair(),
                &mut map,
            )?;
        }
        self.periodic.map = map;
        Ok(())
    }

    /// Support masks (over the cell's parent vertices) of the vertices of
    /// child face `child_face` of child `child`, translated to face-local
    /// bit masks of the parent face `face_no`.
    fn child_face_supports(
        &self,
        parent: CellId,
        face_no: usize,
        child: usize,
        child_face: usize,
    ) -> Option<Vec<u16>> {
        let kind = self.cell_kind(parent);
        let t = template(kind, self.refinement_case(parent))?;
        let parent_face = kind.face_vertices(face_no);
        kind.face_vertices(child_face)
            .iter()
            .map(|&v| {
                let mask = t.children[child][v];
                let mut local = 0u16;
                for (j, &pv) in parent_face.iter().enumerate() {
                    if mask & (1 << pv) != 0 {
                        local |= 1 << j;
                    }
                }
                // a set bit outside the face means the point is not on it
                (mask & !kind.face_vertex_mask(face_no) == 0).then_some(local)
            })
            .collect()
    }

    fn descend_periodic(
        &self,
        a: CellId,
        fa: usize,
        b: CellId,
        fb: usize,
        o: FaceOrientation,
        map: &mut HashMap<(CellId, u32), PeriodicEntry>,
    ) -> Result<(), MeshError> {
        map.insert((a, fa as u32), (b, fb as u32, o));
        if !self.has_children(a) {
            return Ok(());
        }
        let kind_a = self.cell_kind(a);
        let face_kind = kind_a.face_reference_cell(fa);
        let t_a = template(kind_a, self.refinement_case(a))
            .ok_or_else(|| MeshError::internal(format!("refined cell {a} has no template")))?;
        let map_mask = |m: u16, orientation: u8| -> u16 {
            let mut out = 0u16;
            for j in 0..face_kind.n_vertices() {
                if m & (1 << j) != 0 {
                    out |= 1 << face_kind.standard_to_real_face_vertex(j, orientation);
                }
            }
            out
        };

        // children of b touching fb, with their face-local supports
        let mut b_children: Vec<(CellId, usize, Vec<u16>)> = Vec::new();
        if self.has_children(b) {
            let kind_b = self.cell_kind(b);
            if let Some(t_b) = template(kind_b, self.refinement_case(b)) {
                for k in t_b.children_on_face(fb) {
                    let Some(cf) = t_b.child_face_on_parent_face(k, fb) else {
                        continue;
                    };
                    if let Some(s) = self.child_face_supports(b, fb, k, cf) {
                        b_children.push((self.child(b, k), cf, s));
                    }
                }
            }
        }

        for k in t_a.children_on_face(fa) {
            let Some(cf) = t_a.child_face_on_parent_face(k, fa) else {
                continue;
            };
            let child = self.child(a, k);
            let Some(supports) = self.child_face_supports(a, fa, k, cf) else {
                continue;
            };
            let image: Vec<u16> = supports.iter().map(|&m| map_mask(m, o.raw())).collect();
            let mut sorted_image = image.clone();
            sorted_image.sort_unstable();
            let matched = b_children.iter().find(|(_, _, s)| {
                let mut s = s.clone();
                s.sort_unstable();
                s == sorted_image
            });
            match matched {
                Some((other, other_face, other_supports)) => {
                    let o_child = (0..face_kind.n_face_orientations())
                        .find(|&oc| {
                            (0..face_kind.n_vertices()).all(|j| {
                                other_supports[face_kind.standard_to_real_face_vertex(j, oc)]
                                    == image[j]
                            })
                        })
                        .ok_or_else(|| {
                            MeshError::internal(format!(
                                "no orientation matches periodic children {child} and {other}"
                            ))
                        })?;
                    self.descend_periodic(
                        child,
                        cf,
                        *other,
                        *other_face,
                        FaceOrientation(o_child),
                        map,
                    )?;
                }
                None => self.descend_periodic(child, cf, b, fb, o, map)?,
            }
        }
        Ok(())
    }

    pub(crate) fn periodic_partner(&self, cell: CellId, face_no: usize) -> Option<PeriodicEntry> {
        self.periodic.get(cell, face_no)
    }

    /// Whether face `face_no` of `cell` is identified with another face.
    pub fn has_periodic_neighbor(&self, cell: CellId, face_no: usize) -> bool {
        self.periodic_partner(cell, face_no).is_some()
    }

    /// Cell across a periodic face, with its face number and the
    /// orientation of that face as seen from `cell`.
    pub fn periodic_neighbor(
        &self,
        cell: CellId,
        face_no: usize,
    ) -> Result<Option<(CellId, usize, FaceOrientation)>, MeshError> {
        self.check_cell(cell)?;
        Ok(self
            .periodic_partner(cell, face_no)
            .map(|(c, f, o)| (c, f as usize, o)))
    }

    /// The periodic face map.
    pub fn periodic_face_map(&self) -> &PeriodicFaceMap {
        &self.periodic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_has_no_entries() {
        let map = PeriodicFaceMap::default();
        assert!(map.is_empty());
        assert!(map.get(CellId::new(0, 0), 0).is_none());
        assert!(map.pairs().is_empty());
    }
}
