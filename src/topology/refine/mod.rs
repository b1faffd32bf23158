//! Refinement executor.
//!
//! Runs after flag preparation and turns every refine flag into children:
//!
//! 1. Per-level cell slots and line/face slots are reserved up front, so the
//!    allocators rarely have to grow mid-pass.
//! 2. In 3D, faces of flagged cells are refined first, ordered by their depth
//!    in the face tree, using [`faces`]. Lines are refined on demand whenever
//!    a midpoint is requested.
//! 3. Every flagged cell is split according to its template. Exterior child
//!    faces are looked up by vertex key among the children of the parent's
//!    faces; interior lines and faces are created as singles.
//!
//! All structural lookups go through a [`Connectivity`] built at the start of
//! the pass and kept current as objects are created or relocated.

mod faces;

use crate::geometry::quality::is_distorted;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ReferenceCell;
use crate::topology::connectivity::Connectivity;
use crate::topology::orientation::FaceOrientation;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::signals::CellSignal;
use crate::topology::store::TriaLevel;
use crate::topology::templates::{Template, template};
use crate::topology::triangulation::Triangulation;
use crate::types::{CellId, INTERNAL_FACE_BOUNDARY_ID, ManifoldId, Point};
use hashbrown::{HashMap, HashSet};

/// Counters reported at the end of an executor run.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RefineStats {
    pub lines: usize,
    pub faces: usize,
    pub cells: usize,
    pub vertices: usize,
    pub promotions: usize,
}

/// State of one refinement pass.
pub(crate) struct Refiner<'a> {
    tria: &'a mut Triangulation,
    conn: Connectivity,
    vertex_cursor: usize,
    distorted: Vec<CellId>,
    stats: RefineStats,
}

impl<'a> Refiner<'a> {
    pub(crate) fn new(tria: &'a mut Triangulation) -> Self {
        let conn = Connectivity::build(&tria.faces);
        Refiner {
            tria,
            conn,
            vertex_cursor: 0,
            distorted: Vec::new(),
            stats: RefineStats::default(),
        }
    }

    /// Store a new vertex in the first unused slot.
    fn new_vertex(&mut self, p: Point) -> u32 {
        let t = &mut *self.tria;
        while self.vertex_cursor < t.vertices.len() && t.vertices_used[self.vertex_cursor] {
            self.vertex_cursor += 1;
        }
        let i = self.vertex_cursor;
        if i == t.vertices.len() {
            t.vertices.push(p);
            t.vertices_used.push(true);
        } else {
            t.vertices[i] = p;
            t.vertices_used[i] = true;
        }
        self.vertex_cursor += 1;
        self.stats.vertices += 1;
        i as u32
    }

    fn new_point(&self, manifold: ManifoldId, vertices: &[u32], weights: &[f64]) -> Point {
        let points = self.tria.points_of(vertices);
        self.tria.manifolds.get(manifold).get_new_point(&points, weights)
    }

    fn new_single_line(&mut self, a: u32, b: u32, id: u32, manifold: ManifoldId) -> usize {
        let lines = &mut self.tria.faces.lines;
        let i = lines.next_free_single();
        lines.init_slot(i, ReferenceCell::Line, &[a, b], &[], None, id, manifold);
        self.conn.insert_line(a, b, i);
        i
    }

    fn find_or_create_line(&mut self, a: u32, b: u32, id: u32, manifold: ManifoldId) -> usize {
        match self.conn.line(a, b) {
            Some(i) => i,
            None => self.new_single_line(a, b, id, manifold),
        }
    }

    /// Split a line at its manifold midpoint; returns the new vertex.
    fn refine_line(&mut self, line: usize) -> u32 {
        let (a, b, id, manifold) = {
            let lines = &self.tria.faces.lines;
            let v = lines.vertices_of(line);
            (
                v[0],
                v[1],
                lines.boundary_or_material_id[line],
                lines.manifold_id[line],
            )
        };
        let p = self.new_point(manifold, &[a, b], &[0.5, 0.5]);
        let m = self.new_vertex(p);
        let lines = &mut self.tria.faces.lines;
        let first = lines.next_free_pair();
        lines.init_slot(first, ReferenceCell::Line, &[a, m], &[], Some(line), id, manifold);
        lines.init_slot(first + 1, ReferenceCell::Line, &[m, b], &[], Some(line), id, manifold);
        lines.children[line] = first as u32;
        lines.refinement_cases[line] = RefinementCase::CUT_X;
        self.conn.insert_line(a, m, first);
        self.conn.insert_line(m, b, first + 1);
        self.stats.lines += 1;
        log::trace!("refined line {line} into {first}, {}", first + 1);
        m
    }

    /// Midpoint of the line between `a` and `b`, refining the line if needed.
    fn line_midpoint(&mut self, a: u32, b: u32) -> Result<u32, MeshError> {
        let line = self
            .conn
            .line(a, b)
            .ok_or_else(|| MeshError::internal(format!("no line between vertices {a} and {b}")))?;
        if self.tria.faces.lines.has_children(line) {
            self.tria.line_midpoint(line)
        } else {
            Ok(self.refine_line(line))
        }
    }

    /// Grow the cell, line, face and vertex stores for the flagged cells.
    fn reserve(&mut self, flagged: &[(CellId, RefinementCase)]) -> Result<(), MeshError> {
        let dim = self.tria.dim;
        let mut new_cells: Vec<usize> = Vec::new();
        let mut split_lines: HashSet<usize> = HashSet::new();
        let mut line_singles = 0;
        let mut line_pairs = 0;
        let (mut quad_runs, mut quad_pairs, mut quad_singles) = (0, 0, 0);
        let mut centers = 0;
        for &(cell, case) in flagged {
            let kind = self.tria.cell_kind(cell);
            let t = cell_template(kind, case)?;
            let level = cell.level() + 1;
            if new_cells.len() <= level {
                new_cells.resize(level + 1, 0);
            }
            new_cells[level] += t.n_children();
            centers += 1;
            if dim == 1 {
                continue;
            }
            let cv = self.tria.cell_vertex_indices(cell);
            for l in 0..kind.n_lines() {
                if !t.splits_line(l) {
                    continue;
                }
                let [a, b] = kind.line_vertices(l);
                if let Some(line) = self.conn.line(cv[a], cv[b]) {
                    if !self.tria.faces.lines.has_children(line) {
                        split_lines.insert(line);
                    }
                }
            }
            if dim == 2 {
                line_singles += t.interior_faces().len();
                continue;
            }
            line_singles += t.interior_lines().len();
            quad_singles += t.interior_faces().len();
            for f in 0..kind.n_faces() {
                let need = self.tria.face_need(cell, f, case);
                if need == RefinementCase::CUT_XY {
                    quad_runs += 1;
                    line_singles += 4;
                    line_pairs += 2;
                    centers += 1;
                } else if need.is_refined() {
                    quad_pairs += 2;
                    line_singles += 2;
                    line_pairs += 1;
                }
            }
        }
        let orientation_needed = dim >= 2;
        for (level, &n) in new_cells.iter().enumerate() {
            if n == 0 {
                continue;
            }
            while self.tria.levels.len() <= level {
                let mut fresh = TriaLevel::new(dim);
                fresh.sync_len(orientation_needed);
                self.tria.levels.push(fresh);
            }
            self.tria.levels[level].reserve_for_cells(n, orientation_needed);
        }
        if dim >= 2 {
            self.tria
                .faces
                .lines
                .reserve_for_objects(0, split_lines.len() + line_pairs, line_singles);
        }
        if dim == 3 {
            self.tria
                .faces
                .quads
                .reserve_for_objects(quad_runs, quad_pairs, quad_singles);
        }
        self.tria
            .vertices
            .reserve(split_lines.len() + line_pairs + centers);
        Ok(())
    }

    /// Global vertex for every support mask of `t` on `cell`.
    fn resolve_cell_points(
        &mut self,
        cell: CellId,
        t: &Template,
    ) -> Result<HashMap<u16, u32>, MeshError> {
        let kind = t.kind;
        let cv = self.tria.cell_vertex_indices(cell).to_vec();
        let manifold = self.tria.levels[cell.level()].cells.manifold_id[cell.index()];
        let full = kind.all_vertices_mask();
        let mut masks = t.points.clone();
        masks.sort_by_key(|m| m.count_ones());
        let mut points = HashMap::with_capacity(masks.len());
        for m in masks {
            let v = if m.count_ones() == 1 {
                cv[m.trailing_zeros() as usize]
            } else if m == full {
                self.cell_center(kind, &cv, manifold, &points)?
            } else if let Some(l) = line_with_mask(kind, m) {
                let [a, b] = kind.line_vertices(l);
                self.line_midpoint(cv[a], cv[b])?
            } else if let Some(f) = (0..kind.n_faces()).find(|&f| kind.face_vertex_mask(f) == m) {
                let gv: Vec<u32> = kind.face_vertices(f).iter().map(|&v| cv[v]).collect();
                self.face_center(&gv)?
            } else {
                return Err(MeshError::internal(format!(
                    "support mask {m:#b} of {kind:?} has no point"
                )));
            };
            points.insert(m, v);
        }
        Ok(points)
    }

    /// New center vertex of a refined line, quadrilateral or hexahedron.
    fn cell_center(
        &mut self,
        kind: ReferenceCell,
        cv: &[u32],
        manifold: ManifoldId,
        points: &HashMap<u16, u32>,
    ) -> Result<u32, MeshError> {
        let mut vertices: Vec<u32> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let lookup = |m: u16| {
            points
                .get(&m)
                .copied()
                .ok_or_else(|| MeshError::internal(format!("missing point {m:#b} for center")))
        };
        match kind {
            ReferenceCell::Line => {
                vertices.extend_from_slice(cv);
                weights.extend([0.5, 0.5]);
            }
            ReferenceCell::Quadrilateral => {
                vertices.extend_from_slice(cv);
                weights.extend([-0.25; 4]);
                for l in 0..4 {
                    vertices.push(lookup(kind.line_vertex_mask(l))?);
                    weights.push(0.5);
                }
            }
            ReferenceCell::Hexahedron => {
                vertices.extend_from_slice(cv);
                weights.extend([0.125; 8]);
                for l in 0..12 {
                    vertices.push(lookup(kind.line_vertex_mask(l))?);
                    weights.push(-0.25);
                }
                for f in 0..6 {
                    vertices.push(lookup(kind.face_vertex_mask(f))?);
                    weights.push(0.5);
                }
            }
            _ => {
                return Err(MeshError::internal(format!("{kind:?} has no center vertex")));
            }
        }
        let p = self.new_point(manifold, &vertices, &weights);
        Ok(self.new_vertex(p))
    }

    /// Split one active cell.
    fn refine_cell(&mut self, cell: CellId, case: RefinementCase) -> Result<(), MeshError> {
        let kind = self.tria.cell_kind(cell);
        let t = cell_template(kind, case)?;
        let points = self.resolve_cell_points(cell, t)?;
        let dim = self.tria.dim;
        let level = cell.level() + 1;
        let i = cell.index();
        let (material, manifold, subdomain, direction) = {
            let l = &self.tria.levels[cell.level()];
            (
                l.cells.boundary_or_material_id[i],
                l.cells.manifold_id[i],
                l.subdomain_ids[i],
                l.direction_flags[i],
            )
        };
        let n_children = t.n_children();
        let first = self.tria.levels[level].next_free_cells(n_children);
        let mut child_vertices = Vec::with_capacity(n_children);
        for k in 0..n_children {
            let vs: Vec<u32> = t.children[k].iter().map(|m| points[m]).collect();
            let mut bounds = Vec::with_capacity(kind.n_faces());
            let mut orientations = Vec::with_capacity(kind.n_faces());
            if dim == 2 {
                for f in 0..kind.n_faces() {
                    let [a, b] = kind.line_vertices(f);
                    let (ga, gb) = (vs[a], vs[b]);
                    let exterior = t.parent_face_containing(t.support(k, &[a, b])).is_some();
                    let line = if exterior {
                        self.conn.line(ga, gb).ok_or_else(|| {
                            MeshError::internal(format!("missing boundary line ({ga}, {gb})"))
                        })?
                    } else {
                        self.find_or_create_line(ga, gb, INTERNAL_FACE_BOUNDARY_ID, manifold)
                    };
                    let stored = self.tria.faces.lines.vertices_of(line);
                    orientations.push(if stored[0] == ga {
                        FaceOrientation::STANDARD
                    } else {
                        FaceOrientation::REVERSED
                    });
                    bounds.push(line as u32);
                }
            } else if dim == 3 {
                for f in 0..kind.n_faces() {
                    let local = kind.face_vertices(f);
                    let gv: Vec<u32> = local.iter().map(|&v| vs[v]).collect();
                    let face_kind = kind.face_reference_cell(f);
                    let exterior = t.parent_face_containing(t.support(k, local)).is_some();
                    let face = if exterior {
                        self.conn.quad(&gv).ok_or_else(|| {
                            MeshError::internal(format!("missing boundary face {gv:?}"))
                        })?
                    } else {
                        self.find_or_create_face(face_kind, &gv, INTERNAL_FACE_BOUNDARY_ID, manifold)
                    };
                    let stored = self.tria.faces.quads.vertices_of(face);
                    let o = face_kind.compute_orientation(&gv, stored).ok_or_else(|| {
                        MeshError::internal(format!("face {face} does not match {gv:?}"))
                    })?;
                    orientations.push(FaceOrientation(o));
                    bounds.push(face as u32);
                }
            }
            let lvl = &mut self.tria.levels[level];
            let slot = first + k;
            lvl.cells
                .init_slot(slot, kind, &vs, &bounds, Some(i), material, manifold);
            lvl.subdomain_ids[slot] = subdomain;
            lvl.direction_flags[slot] = direction;
            lvl.refine_flags[slot] = RefinementCase::NONE;
            lvl.coarsen_flags[slot] = false;
            for (f, o) in orientations.into_iter().enumerate() {
                lvl.set_face_orientation(slot, f, o);
            }
            child_vertices.push(vs);
        }
        let parent = &mut self.tria.levels[cell.level()];
        parent.cells.children[i] = first as u32;
        parent.cells.refinement_cases[i] = case;
        parent.refine_flags[i] = RefinementCase::NONE;
        parent.coarsen_flags[i] = false;

        if self.tria.settings.check_for_distorted_cells && dim == self.tria.spacedim {
            let distorted = child_vertices
                .iter()
                .any(|vs| is_distorted(kind, &self.tria.points_of(vs)));
            if distorted {
                self.distorted.push(cell);
            }
        }
        self.stats.cells += 1;
        log::trace!("refined cell {cell} with case {:#05b}", case.bits());
        self.tria
            .signals
            .fire_cell(CellSignal::PostRefinementOnCell, cell);
        Ok(())
    }
}

fn line_with_mask(kind: ReferenceCell, mask: u16) -> Option<usize> {
    if kind.dim() < 2 {
        return None;
    }
    (0..kind.n_lines()).find(|&l| kind.line_vertex_mask(l) == mask)
}

fn cell_template(kind: ReferenceCell, case: RefinementCase) -> Result<&'static Template, MeshError> {
    template(kind, case).ok_or_else(|| {
        MeshError::internal(format!("no template for {kind:?} with case {:#05b}", case.bits()))
    })
}

impl Triangulation {
    /// Active cells carrying a refine flag, in (level, index) order.
    pub(crate) fn flagged_for_refinement(&self) -> Vec<(CellId, RefinementCase)> {
        self.active_cells()
            .into_iter()
            .map(|c| (c, self.refine_flag_of(c)))
            .filter(|(_, case)| case.is_refined())
            .collect()
    }

    /// Refine every flagged cell. Returns the parents of distorted children.
    pub(crate) fn execute_refinement(&mut self) -> Result<Vec<CellId>, MeshError> {
        let flagged = self.flagged_for_refinement();
        if flagged.is_empty() {
            return Ok(Vec::new());
        }
        let mut r = Refiner::new(self);
        r.reserve(&flagged)?;
        if r.tria.dim == 3 {
            r.refine_faces(&flagged)?;
        }
        for &(cell, case) in &flagged {
            r.refine_cell(cell, case)?;
        }
        let s = r.stats;
        log::debug!(
            "refinement: {} cells, {} faces, {} lines, {} vertices, {} promotions",
            s.cells,
            s.faces,
            s.lines,
            s.vertices,
            s.promotions
        );
        Ok(r.distorted)
    }

    /// Shared vertex of the two children of a refined line.
    pub(crate) fn line_midpoint(&self, line: usize) -> Result<u32, MeshError> {
        let lines = &self.faces.lines;
        if !lines.has_children(line) {
            return Err(MeshError::internal(format!("line {line} is not refined")));
        }
        let a = lines.vertices_of(lines.child(line, 0));
        let b = lines.vertices_of(lines.child(line, 1));
        a.iter()
            .copied()
            .find(|v| b.contains(v))
            .ok_or_else(|| MeshError::internal(format!("children of line {line} are disjoint")))
    }

    /// Refinement a face must receive, in the face's own frame, when `cell`
    /// is refined with `case`. Lines (2D faces) only know `CUT_X`.
    pub(crate) fn face_need(&self, cell: CellId, face_no: usize, case: RefinementCase) -> RefinementCase {
        if case.is_empty() || self.dim == 1 {
            return RefinementCase::NONE;
        }
        let kind = self.cell_kind(cell);
        let Some(t) = template(kind, case) else {
            return RefinementCase::NONE;
        };
        if self.dim == 2 {
            return if t.splits_line(face_no) {
                RefinementCase::CUT_X
            } else {
                RefinementCase::NONE
            };
        }
        if kind.is_simplex() {
            return RefinementCase::CUT_XY;
        }
        let cv = self.cell_vertex_indices(cell);
        let fv = self.faces.quads.vertices_of(self.cell_face_index(cell, face_no));
        let bit = |g: u32| cv.iter().position(|&v| v == g).map_or(0u16, |p| 1 << p);
        let mut need = RefinementCase::NONE;
        if t.has_point(bit(fv[0]) | bit(fv[1])) {
            need |= RefinementCase::CUT_X;
        }
        if t.has_point(bit(fv[0]) | bit(fv[2])) {
            need |= RefinementCase::CUT_Y;
        }
        need
    }
}
