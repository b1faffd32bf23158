//! Face refinement for 3D meshes.
//!
//! Faces needed by flagged cells are refined before any cell, coarsest face
//! first. A face that must be cut along one axis but is already cut along
//! both is *promoted*: its four quarters are regrouped under two new halves,
//! so both the anisotropic and the isotropic child faces exist in the tree.
//! Quarters of a promoted face sit in one aligned run of four in the order
//! `[lower half: 2 quarters | upper half: 2 quarters]`.

use super::{Refiner, line_with_mask};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ReferenceCell;
use crate::topology::connectivity::{Connectivity, FaceKey, face_key};
use crate::topology::refinement_case::RefinementCase;
use crate::topology::templates::{Template, template};
use crate::topology::triangulation::Triangulation;
use crate::types::{CellId, ManifoldId};
use hashbrown::HashMap;

#[inline]
fn swap_ref(x: &mut u32, a: usize, b: usize) {
    if *x == a as u32 {
        *x = b as u32;
    } else if *x == b as u32 {
        *x = a as u32;
    }
}

impl Triangulation {
    /// Exchange line slots `a` and `b` and rewrite every reference to them.
    /// Neither slot may start a child run of another line.
    pub(crate) fn swap_line_slots(&mut self, a: usize, b: usize, conn: &mut Connectivity) {
        if a == b {
            return;
        }
        let lines = &mut self.faces.lines;
        lines.swap_slots(a, b);
        for p in lines.parents.iter_mut() {
            swap_ref(p, a, b);
        }
        for x in self.faces.quads.bounds.iter_mut() {
            swap_ref(x, a, b);
        }
        if self.dim == 2 {
            for level in &mut self.levels {
                for x in level.cells.bounds.iter_mut() {
                    swap_ref(x, a, b);
                }
            }
        }
        let lines = &self.faces.lines;
        for i in [a, b] {
            if lines.used[i] {
                let v = lines.vertices_of(i);
                conn.insert_line(v[0], v[1], i);
            }
        }
    }

    /// Exchange quad slots `a` and `b` and rewrite every reference to them.
    /// Neither slot may start a child run of another quad.
    pub(crate) fn swap_quad_slots(&mut self, a: usize, b: usize, conn: &mut Connectivity) {
        if a == b {
            return;
        }
        let quads = &mut self.faces.quads;
        quads.swap_slots(a, b);
        for p in quads.parents.iter_mut() {
            swap_ref(p, a, b);
        }
        if self.dim == 3 {
            for level in &mut self.levels {
                for x in level.cells.bounds.iter_mut() {
                    swap_ref(x, a, b);
                }
            }
        }
        let quads = &self.faces.quads;
        for i in [a, b] {
            if quads.used[i] {
                conn.insert_quad(quads.vertices_of(i), i);
            }
        }
    }
}

impl Refiner<'_> {
    /// Refine every face a flagged cell needs, coarsest face first.
    pub(super) fn refine_faces(
        &mut self,
        flagged: &[(CellId, RefinementCase)],
    ) -> Result<(), MeshError> {
        let mut needs: HashMap<FaceKey, Vec<RefinementCase>> = HashMap::new();
        let mut order: Vec<(usize, usize, FaceKey)> = Vec::new();
        for &(cell, case) in flagged {
            let kind = self.tria.cell_kind(cell);
            for f in 0..kind.n_faces() {
                let need = self.tria.face_need(cell, f, case);
                if need.is_empty() {
                    continue;
                }
                let face = self.tria.cell_face_index(cell, f);
                // keyed by vertices: promotion relocates quads
                let key = face_key(self.tria.faces.quads.vertices_of(face));
                let entry = needs.entry(key).or_default();
                if entry.is_empty() {
                    order.push((self.tria.face_depth(face), face, key));
                }
                if !entry.contains(&need) {
                    entry.push(need);
                }
            }
        }
        order.sort_unstable();
        for (_, _, key) in order {
            let mut list = needs.remove(&key).unwrap_or_default();
            list.sort_by_key(|n| n.bits().count_ones());
            for need in list {
                let face = self
                    .conn
                    .quad(&key)
                    .ok_or_else(|| MeshError::internal(format!("face {key:?} disappeared")))?;
                self.ensure_face(face, need)?;
            }
        }
        Ok(())
    }

    /// Make sure `face` has children matching `need`.
    fn ensure_face(&mut self, face: usize, need: RefinementCase) -> Result<(), MeshError> {
        let quads = &self.tria.faces.quads;
        let kind = quads.kind(face);
        let current = quads.refinement_cases[face];
        let refined = quads.has_children(face);
        if kind == ReferenceCell::Triangle {
            if !refined {
                self.refine_face(face, RefinementCase::CUT_XY)?;
            }
            return Ok(());
        }
        if !refined {
            return self.refine_face(face, need);
        }
        if current == need {
            return Ok(());
        }
        if current == RefinementCase::CUT_XY {
            return self.promote(face, need);
        }
        if need == RefinementCase::CUT_XY {
            let rest = need & !current;
            let children: Vec<usize> = self.tria.faces.quads.child_range(face).collect();
            for child in children {
                self.ensure_face(child, rest)?;
            }
            return Ok(());
        }
        Err(MeshError::internal(format!(
            "face {face} is cut {:#04b} but a neighbor needs {:#04b}",
            current.bits(),
            need.bits()
        )))
    }

    fn refine_face(&mut self, face: usize, case: RefinementCase) -> Result<(), MeshError> {
        let (kind, id, manifold, parent) = {
            let q = &self.tria.faces.quads;
            (q.kind(face), q.boundary_or_material_id[face], q.manifold_id[face], q.parent(face))
        };
        if kind == ReferenceCell::Quadrilateral && case != RefinementCase::CUT_XY {
            if let Some(p) = parent {
                if self.tria.faces.quads.refinement_cases[p] == case {
                    return Err(MeshError::internal(format!(
                        "face {face} would become a strip of its parent {p}"
                    )));
                }
            }
        }
        let t = face_template(kind, case)?;
        let points = self.resolve_face_points(face, t)?;
        let n = t.n_children();
        let first = if n == 4 {
            self.tria.faces.quads.next_free_run(4, 4)
        } else {
            self.tria.faces.quads.next_free_pair()
        };
        for k in 0..n {
            let vs: Vec<u32> = t.children[k].iter().map(|m| points[m]).collect();
            self.init_face(first + k, kind, &vs, Some(face), id, manifold);
        }
        let quads = &mut self.tria.faces.quads;
        quads.children[face] = first as u32;
        quads.refinement_cases[face] = case;
        self.stats.faces += 1;
        log::trace!("refined face {face} with case {:#04b}", case.bits());
        Ok(())
    }

    fn resolve_face_points(
        &mut self,
        face: usize,
        t: &Template,
    ) -> Result<HashMap<u16, u32>, MeshError> {
        let kind = t.kind;
        let (fv, manifold) = {
            let q = &self.tria.faces.quads;
            (q.vertices_of(face).to_vec(), q.manifold_id[face])
        };
        let full = kind.all_vertices_mask();
        let mut masks = t.points.clone();
        masks.sort_by_key(|m| m.count_ones());
        let mut points = HashMap::with_capacity(masks.len());
        for m in masks {
            let v = if m.count_ones() == 1 {
                fv[m.trailing_zeros() as usize]
            } else if let Some(l) = line_with_mask(kind, m) {
                let [a, b] = kind.line_vertices(l);
                self.line_midpoint(fv[a], fv[b])?
            } else if m == full && kind == ReferenceCell::Quadrilateral {
                self.cell_center(kind, &fv, manifold, &points)?
            } else {
                return Err(MeshError::internal(format!(
                    "support mask {m:#b} of face {face} has no point"
                )));
            };
            points.insert(m, v);
        }
        Ok(points)
    }

    /// Fill `slot` with a face, creating its lines as needed.
    pub(super) fn init_face(
        &mut self,
        slot: usize,
        kind: ReferenceCell,
        vertices: &[u32],
        parent: Option<usize>,
        id: u32,
        manifold: ManifoldId,
    ) {
        let bounds: Vec<u32> = (0..kind.n_lines())
            .map(|l| {
                let [a, b] = kind.line_vertices(l);
                self.find_or_create_line(vertices[a], vertices[b], id, manifold) as u32
            })
            .collect();
        self.tria
            .faces
            .quads
            .init_slot(slot, kind, vertices, &bounds, parent, id, manifold);
        self.conn.insert_quad(vertices, slot);
    }

    pub(super) fn find_or_create_face(
        &mut self,
        kind: ReferenceCell,
        vertices: &[u32],
        id: u32,
        manifold: ManifoldId,
    ) -> usize {
        if let Some(f) = self.conn.quad(vertices) {
            return f;
        }
        let slot = self.tria.faces.quads.next_free_single();
        self.init_face(slot, kind, vertices, None, id, manifold);
        slot
    }

    /// Center vertex of an already refined hexahedron face, given in any
    /// lexicographic frame of the face.
    pub(super) fn face_center(&self, gv: &[u32]) -> Result<u32, MeshError> {
        let quads = &self.tria.faces.quads;
        let lines = &self.tria.faces.lines;
        if let Some(face) = self.conn.quad(gv) {
            if quads.has_children(face) && quads.refinement_cases[face] == RefinementCase::CUT_XY {
                return Ok(quads.vertices_of(quads.child(face, 0))[3]);
            }
        }
        for [(a, b), (c, d)] in [[(0, 1), (2, 3)], [(0, 2), (1, 3)]] {
            let (Some(l1), Some(l2)) = (self.conn.line(gv[a], gv[b]), self.conn.line(gv[c], gv[d]))
            else {
                continue;
            };
            if !lines.has_children(l1) || !lines.has_children(l2) {
                continue;
            }
            let (m1, m2) = (self.tria.line_midpoint(l1)?, self.tria.line_midpoint(l2)?);
            if let Some(mid) = self.conn.line(m1, m2) {
                if lines.has_children(mid) {
                    return self.tria.line_midpoint(mid);
                }
            }
        }
        Err(MeshError::internal(format!("face {gv:?} has no center vertex")))
    }

    /// Regroup the quarters of an isotropically refined face under two
    /// halves cut along `axis_case`.
    fn promote(&mut self, face: usize, axis_case: RefinementCase) -> Result<(), MeshError> {
        let complement = axis_case.uncut_in(2);
        let (first, id, manifold, parent) = {
            let q = &self.tria.faces.quads;
            (
                q.child(face, 0),
                q.boundary_or_material_id[face],
                q.manifold_id[face],
                q.parent(face),
            )
        };
        let strip = {
            let q = &self.tria.faces.quads;
            parent.is_some_and(|p| q.refinement_cases[p] == axis_case)
                || (first..first + 4).any(|k| q.refinement_cases[k] == complement)
        };
        if strip {
            return Err(MeshError::internal(format!(
                "promoting face {face} to {:#04b} would create a strip",
                axis_case.bits()
            )));
        }
        let center = self.tria.faces.quads.vertices_of(first)[3];
        if axis_case == RefinementCase::CUT_X {
            self.tria.swap_quad_slots(first + 1, first + 2, &mut self.conn);
        }
        let t = face_template(ReferenceCell::Quadrilateral, axis_case)?;
        let points = self.resolve_face_points(face, t)?;

        let interior = t.interior_faces();
        let (la, lb) = match interior.first().map(|k| k.as_slice()) {
            Some(&[x, y]) => (points[&x], points[&y]),
            _ => return Err(MeshError::internal("anisotropic face template without interior line")),
        };
        let missing = || MeshError::internal(format!("face {face} lacks a half of its middle line"));
        let h0 = self.conn.line(la, center).ok_or_else(missing)?;
        let h1 = self.conn.line(center, lb).ok_or_else(missing)?;
        let full = self.new_single_line(la, lb, id, manifold);
        let kids = if h0 % 2 == 0 && h1 == h0 + 1 {
            h0
        } else if h1 % 2 == 0 && h0 == h1 + 1 {
            self.tria.swap_line_slots(h0, h1, &mut self.conn);
            h1
        } else {
            let pair = self.tria.faces.lines.next_free_pair();
            self.tria.swap_line_slots(h0, pair, &mut self.conn);
            self.tria.swap_line_slots(h1, pair + 1, &mut self.conn);
            pair
        };
        {
            let lines = &mut self.tria.faces.lines;
            lines.children[full] = kids as u32;
            lines.refinement_cases[full] = RefinementCase::CUT_X;
            lines.parents[kids] = full as u32;
            lines.parents[kids + 1] = full as u32;
        }

        let halves = self.tria.faces.quads.next_free_pair();
        for k in 0..2 {
            let vs: Vec<u32> = t.children[k].iter().map(|m| points[m]).collect();
            self.init_face(halves + k, ReferenceCell::Quadrilateral, &vs, Some(face), id, manifold);
            let quads = &mut self.tria.faces.quads;
            let quarters = first + 2 * k;
            quads.children[halves + k] = quarters as u32;
            quads.refinement_cases[halves + k] = complement;
            quads.parents[quarters] = (halves + k) as u32;
            quads.parents[quarters + 1] = (halves + k) as u32;
        }
        let quads = &mut self.tria.faces.quads;
        quads.children[face] = halves as u32;
        quads.refinement_cases[face] = axis_case;
        self.stats.promotions += 1;
        log::debug!("promoted face {face} to case {:#04b}", axis_case.bits());
        Ok(())
    }
}

fn face_template(kind: ReferenceCell, case: RefinementCase) -> Result<&'static Template, MeshError> {
    template(kind, case).ok_or_else(|| {
        MeshError::internal(format!("no face template for {kind:?} with case {:#04b}", case.bits()))
    })
}
