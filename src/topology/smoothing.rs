//! Mesh-smoothing options and flag preparation.
//!
//! [`Triangulation::prepare_coarsening_and_refinement`] rewrites the user's
//! refine and coarsen flags until one full pass changes nothing. Each pass
//! runs the optional rules selected by [`MeshSmoothing`] followed by the
//! rules every mesh needs:
//!
//! - coarsen flags survive only on complete sibling groups whose removal
//!   keeps the 2:1 balance across faces (and, in 3D, edges);
//! - anisotropic refinement next to curved boundaries is made isotropic
//!   when the new boundary point lies far outside the cell;
//! - coarser neighbors of refined faces are refined (2:1 face balance);
//! - 3D only: face refinement cases are upgraded until the face tree can
//!   represent them, and cells next to twice-split edges are refined.
//!
//! The structure of the mesh does not change during preparation, so all
//! lookup tables are built once up front.

use crate::geometry::mapping::transform_real_to_unit_cell;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ReferenceCell;
use crate::topology::connectivity::Connectivity;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::store::TriaObjects;
use crate::topology::templates::template;
use crate::topology::triangulation::Triangulation;
use crate::types::CellId;
use bitflags::bitflags;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Optional smoothing rules applied by flag preparation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MeshSmoothing: u16 {
        /// Cells sharing a vertex differ by at most one level.
        const LIMIT_LEVEL_DIFFERENCE_AT_VERTICES = 0x1;
        /// Refine active cells most of whose neighbors are refined.
        const ELIMINATE_UNREFINED_ISLANDS = 0x2;
        /// Every refined cell has either only active or only refined children.
        const PATCH_LEVEL_1 = 0x4;
        /// Cells on level 1 are never coarsened back to level 0.
        const COARSEST_LEVEL_1 = 0x8;
        /// Rules that force refinement may pick a minimal anisotropic case.
        const ALLOW_ANISOTROPIC_SMOOTHING = 0x10;
        /// Coarsen refined interior cells surrounded by unrefined cells.
        const ELIMINATE_REFINED_INNER_ISLANDS = 0x100;
        /// Same as the inner rule for cells at the boundary.
        const ELIMINATE_REFINED_BOUNDARY_ISLANDS = 0x200;
        /// Never coarsen a patch into an unrefined island.
        const DO_NOT_PRODUCE_UNREFINED_ISLANDS = 0x400;

        const SMOOTHING_ON_REFINEMENT = Self::LIMIT_LEVEL_DIFFERENCE_AT_VERTICES.bits()
            | Self::ELIMINATE_UNREFINED_ISLANDS.bits();
        const SMOOTHING_ON_COARSENING = Self::ELIMINATE_REFINED_INNER_ISLANDS.bits()
            | Self::ELIMINATE_REFINED_BOUNDARY_ISLANDS.bits()
            | Self::DO_NOT_PRODUCE_UNREFINED_ISLANDS.bits();
        const MAXIMUM_SMOOTHING = Self::SMOOTHING_ON_REFINEMENT.bits()
            | Self::SMOOTHING_ON_COARSENING.bits()
            | Self::PATCH_LEVEL_1.bits()
            | Self::COARSEST_LEVEL_1.bits();
    }
}

impl MeshSmoothing {
    pub const NONE: MeshSmoothing = MeshSmoothing::empty();
}

/// Passes allowed per level before preparation gives up.
const PASSES_PER_LEVEL: usize = 64;

/// Largest tolerated distance (in reference coordinates) between a curved
/// boundary face's new midpoint and the flat face it replaces.
const BOUNDARY_DISTORTION_LIMIT: f64 = 0.25;

type FlagSnapshot = Vec<(Vec<RefinementCase>, Vec<bool>)>;

/// Lookup tables over the (fixed) mesh structure.
struct FlagContext {
    conn: Connectivity,
    /// Used cells referencing each face object (each vertex in 1D).
    face_cells: Vec<Vec<CellId>>,
    /// 3D: used cells having each line as an edge.
    line_cells: Vec<Vec<CellId>>,
}

fn descendants(objects: &TriaObjects, root: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(o) = stack.pop() {
        out.push(o);
        stack.extend(objects.child_range(o));
    }
    out
}

impl Triangulation {
    /// Make the refine and coarsen flags consistent with the configured
    /// smoothing rules and the structural constraints of the mesh.
    ///
    /// Returns `true` iff any flag changed.
    pub fn prepare_coarsening_and_refinement(&mut self) -> Result<bool, MeshError> {
        if self.is_empty() {
            return Ok(false);
        }
        let before = self.flag_snapshot();
        let ctx = self.flag_context();
        let smoothing = self.settings.smoothing;

        self.drop_impossible_flags();
        if smoothing.intersects(
            MeshSmoothing::ELIMINATE_REFINED_INNER_ISLANDS
                | MeshSmoothing::ELIMINATE_REFINED_BOUNDARY_ISLANDS,
        ) {
            self.eliminate_refined_islands(smoothing);
        }

        let max_passes = (self.n_levels() + 2) * PASSES_PER_LEVEL;
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > max_passes {
                return Err(MeshError::NotConverged { passes: max_passes });
            }
            let snapshot = self.flag_snapshot();
            if smoothing.contains(MeshSmoothing::LIMIT_LEVEL_DIFFERENCE_AT_VERTICES) {
                self.limit_level_difference_at_vertices();
            }
            if smoothing.contains(MeshSmoothing::ELIMINATE_UNREFINED_ISLANDS) {
                self.eliminate_unrefined_islands(smoothing);
            }
            if smoothing.contains(MeshSmoothing::DO_NOT_PRODUCE_UNREFINED_ISLANDS) {
                self.do_not_produce_unrefined_islands();
            }
            if smoothing.contains(MeshSmoothing::PATCH_LEVEL_1) {
                self.patch_level_1();
            }
            if smoothing.contains(MeshSmoothing::COARSEST_LEVEL_1) {
                self.keep_level_1();
            }
            self.fix_coarsen_flags(&ctx);
            if self.dim >= 2 {
                self.limit_boundary_distortion();
            }
            self.balance_faces(&ctx, smoothing);
            if self.dim == 3 {
                self.upgrade_infeasible_face_cases()?;
                self.balance_lines(&ctx, smoothing);
            }
            self.enforce_flag_consistency();
            if self.flag_snapshot() == snapshot {
                break;
            }
        }
        let changed = self.flag_snapshot() != before;
        log::debug!("flag preparation: {passes} passes, changed = {changed}");
        Ok(changed)
    }

    fn flag_snapshot(&self) -> FlagSnapshot {
        self.levels
            .iter()
            .map(|l| (l.refine_flags.clone(), l.coarsen_flags.clone()))
            .collect()
    }

    fn flag_context(&self) -> FlagContext {
        let conn = Connectivity::build(&self.faces);
        let face_cells = self.face_references();
        let mut line_cells = Vec::new();
        if self.dim == 3 {
            line_cells = vec![Vec::new(); self.faces.lines.len()];
            for cell in self.used_cells() {
                for line in self.cell_lines(cell, &conn).into_iter().flatten() {
                    line_cells[line].push(cell);
                }
            }
        }
        FlagContext {
            conn,
            face_cells,
            line_cells,
        }
    }

    /// Line objects of the edges of a 2D or 3D cell, by local line number.
    pub(crate) fn cell_lines(&self, cell: CellId, conn: &Connectivity) -> Vec<Option<usize>> {
        let kind = self.cell_kind(cell);
        let cv = self.cell_vertex_indices(cell);
        (0..kind.n_lines())
            .map(|l| {
                let [a, b] = kind.line_vertices(l);
                conn.line(cv[a], cv[b])
            })
            .collect()
    }

    fn will_refine(&self, cell: CellId) -> bool {
        self.is_active(cell) && self.refine_flag_of(cell).is_refined()
    }

    /// Level an active cell will have after execution.
    fn post_level(&self, cell: CellId) -> usize {
        if self.will_refine(cell) {
            cell.level() + 1
        } else if self.coarsen_flag_of(cell) {
            cell.level().saturating_sub(1)
        } else {
            cell.level()
        }
    }

    /// Add `case` to the refine flag of an active cell. Simplices are always
    /// refined isotropically; cells on the highest allowed level are left
    /// alone. Returns `true` if the flag changed.
    fn flag_refine(&mut self, cell: CellId, case: RefinementCase) -> bool {
        if !self.is_active(cell) || case.is_empty() {
            return false;
        }
        if let Some(max) = self.settings.max_refinement_level {
            if cell.level() >= max {
                return false;
            }
        }
        let kind = self.cell_kind(cell);
        let case = if kind.is_simplex() {
            RefinementCase::isotropic(kind.dim())
        } else {
            case
        };
        let level = &mut self.levels[cell.level()];
        let old = level.refine_flags[cell.index()];
        let new = old | case;
        level.coarsen_flags[cell.index()] = false;
        if new != old {
            level.refine_flags[cell.index()] = new;
            log::trace!("smoothing: refine {cell} with {:#05b}", new.bits());
            true
        } else {
            false
        }
    }

    fn unflag_coarsen(&mut self, cell: CellId) -> bool {
        let flag = &mut self.levels[cell.level()].coarsen_flags[cell.index()];
        std::mem::replace(flag, false)
    }

    /// Refinement case a smoothing rule forces on `cell`, given the axes it
    /// would minimally need.
    fn forced_case(&self, cell: CellId, axes: RefinementCase, smoothing: MeshSmoothing) -> RefinementCase {
        let kind = self.cell_kind(cell);
        if smoothing.contains(MeshSmoothing::ALLOW_ANISOTROPIC_SMOOTHING)
            && kind.is_hypercube()
            && axes.is_refined()
        {
            axes
        } else {
            RefinementCase::isotropic(kind.dim())
        }
    }

    /// Drop flags on non-active cells, coarsen flags on level 0 and refine
    /// flags above the refinement limit.
    fn drop_impossible_flags(&mut self) {
        let max = self.settings.max_refinement_level;
        for (l, level) in self.levels.iter_mut().enumerate() {
            for i in 0..level.len() {
                let active = level.cells.used[i] && !level.cells.has_children(i);
                if !active || max.is_some_and(|m| l >= m) {
                    level.refine_flags[i] = RefinementCase::NONE;
                }
                if !active || l == 0 {
                    level.coarsen_flags[i] = false;
                }
            }
        }
    }

    fn eliminate_refined_islands(&mut self, smoothing: MeshSmoothing) {
        for cell in self.used_cells() {
            let refined = self.has_children(cell);
            if !refined && !self.will_refine(cell) {
                continue;
            }
            if refined
                && self
                    .children(cell)
                    .any(|c| !self.is_active(c) || self.will_refine(c))
            {
                continue;
            }
            let n_faces = self.cell_kind(cell).n_faces();
            let mut n_neighbors = 0;
            let mut unrefined = 0;
            let mut periodic = false;
            for f in 0..n_faces {
                match self.neighbor_of(cell, f) {
                    Some(n) => {
                        n_neighbors += 1;
                        if !self.has_children(n) && !self.will_refine(n) {
                            unrefined += 1;
                        }
                    }
                    None => periodic |= self.periodic_partner(cell, f).is_some(),
                }
            }
            if n_neighbors == 0 || unrefined != n_neighbors {
                continue;
            }
            let interior = n_neighbors == n_faces;
            let applies = if interior {
                smoothing.contains(MeshSmoothing::ELIMINATE_REFINED_INNER_ISLANDS)
            } else {
                !periodic && smoothing.contains(MeshSmoothing::ELIMINATE_REFINED_BOUNDARY_ISLANDS)
            };
            if !applies {
                continue;
            }
            if refined {
                let children: Vec<CellId> = self.children(cell).collect();
                for c in children {
                    let level = &mut self.levels[c.level()];
                    level.refine_flags[c.index()] = RefinementCase::NONE;
                    level.coarsen_flags[c.index()] = true;
                }
            } else {
                self.levels[cell.level()].refine_flags[cell.index()] = RefinementCase::NONE;
            }
            log::trace!("smoothing: removed refined island {cell}");
        }
    }

    fn limit_level_difference_at_vertices(&mut self) {
        loop {
            let active = self.active_cells();
            let mut vertex_level = vec![0usize; self.vertices.len()];
            for &c in &active {
                let l = self.post_level(c);
                for &v in self.cell_vertex_indices(c) {
                    let e = &mut vertex_level[v as usize];
                    *e = (*e).max(l);
                }
            }
            let mut changed = false;
            for &c in active.iter().rev() {
                if self.will_refine(c) {
                    continue;
                }
                let l = c.level();
                let vs = self.cell_vertex_indices(c).to_vec();
                let highest = vs.iter().map(|&v| vertex_level[v as usize]).max().unwrap_or(0);
                if highest > l && self.coarsen_flag_of(c) {
                    changed |= self.unflag_coarsen(c);
                }
                if highest > l + 1 {
                    let iso = RefinementCase::isotropic(self.cell_kind(c).dim());
                    if self.flag_refine(c, iso) {
                        changed = true;
                        for &v in &vs {
                            let e = &mut vertex_level[v as usize];
                            *e = (*e).max(l + 1);
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Whether the same-level neighbor `n` is or will be refined.
    fn neighbor_refined(&self, cell: CellId, n: CellId) -> bool {
        n.level == cell.level && (self.has_children(n) || self.will_refine(n))
    }

    fn eliminate_unrefined_islands(&mut self, smoothing: MeshSmoothing) {
        for cell in self.active_cells() {
            if self.will_refine(cell) {
                continue;
            }
            let kind = self.cell_kind(cell);
            let refined: Vec<Option<bool>> = (0..kind.n_faces())
                .map(|f| self.neighbor_of(cell, f).map(|n| self.neighbor_refined(cell, n)))
                .collect();
            let total = refined.iter().flatten().count();
            let n_refined = refined.iter().flatten().filter(|&&r| r).count();
            if total == 0 || 2 * n_refined <= total {
                continue;
            }
            let mut axes = RefinementCase::NONE;
            if kind.is_hypercube() {
                for a in 0..kind.dim() {
                    if refined[2 * a] == Some(true) && refined[2 * a + 1] == Some(true) {
                        axes |= RefinementCase::cut_axis(a);
                    }
                }
            }
            let case = self.forced_case(cell, axes, smoothing);
            self.flag_refine(cell, case);
        }
    }

    /// `true` if all children of `cell` are active and coarsen-flagged.
    fn children_all_coarsened(&self, cell: CellId) -> bool {
        self.has_children(cell)
            && self
                .children(cell)
                .all(|c| self.is_active(c) && self.coarsen_flag_of(c))
    }

    fn do_not_produce_unrefined_islands(&mut self) {
        for cell in self.used_cells() {
            if !self.children_all_coarsened(cell) {
                continue;
            }
            let n_faces = self.cell_kind(cell).n_faces();
            let mut total = 0;
            let mut refined = 0;
            for f in 0..n_faces {
                let Some(n) = self.neighbor_of(cell, f) else {
                    continue;
                };
                total += 1;
                let stays_refined = n.level == cell.level
                    && ((self.has_children(n) && !self.children_all_coarsened(n)) || self.will_refine(n));
                if stays_refined {
                    refined += 1;
                }
            }
            if total > 0 && 2 * refined > total {
                let children: Vec<CellId> = self.children(cell).collect();
                for c in children {
                    self.unflag_coarsen(c);
                }
            }
        }
    }

    /// Whether a child will have children after execution.
    fn refined_after(&self, cell: CellId) -> bool {
        if self.is_active(cell) {
            self.will_refine(cell)
        } else {
            !self.children_all_coarsened(cell)
        }
    }

    fn patch_level_1(&mut self) {
        self.keep_level_1();
        for cell in self.used_cells() {
            if !self.has_children(cell) {
                continue;
            }
            let children: Vec<CellId> = self.children(cell).collect();
            // grandchildren are coarsened as a whole patch or not at all
            let grandchildren: Vec<CellId> = children.iter().flat_map(|&c| self.children(c)).collect();
            let all_refined = children.iter().all(|&c| self.has_children(c));
            let patch_coarsened = all_refined
                && grandchildren
                    .iter()
                    .all(|&g| self.is_active(g) && self.coarsen_flag_of(g));
            if !patch_coarsened {
                for &g in &grandchildren {
                    self.unflag_coarsen(g);
                }
            }
            let n_after = children.iter().filter(|&&c| self.refined_after(c)).count();
            if n_after == 0 || n_after == children.len() {
                continue;
            }
            for &c in &children {
                if self.is_active(c) {
                    let iso = RefinementCase::isotropic(self.cell_kind(c).dim());
                    self.flag_refine(c, iso);
                } else {
                    let gc: Vec<CellId> = self.children(c).collect();
                    for g in gc {
                        self.unflag_coarsen(g);
                    }
                }
            }
        }
    }

    /// Level-1 cells are never coarsened back to level 0.
    fn keep_level_1(&mut self) {
        if let Some(level) = self.levels.get_mut(1) {
            level.coarsen_flags.fill(false);
        }
    }

    /// `true` if removing the children of `parent` keeps the faces balanced
    /// and every cell touching its edges (3D) within one level of it.
    fn coarsening_allowed(&self, parent: CellId, ctx: &FlagContext) -> bool {
        let l = parent.level();
        let too_fine = |c: CellId| {
            c != parent
                && self.parent(c) != Some(parent)
                && (c.level() >= l + 2 || (c.level() == l + 1 && self.will_refine(c)))
        };
        if self.dim == 1 {
            return self
                .cell_face_indices(parent)
                .iter()
                .all(|&v| !ctx.face_cells[v as usize].iter().any(|&c| too_fine(c)));
        }
        // faces: after coarsening, cells outside may touch at most the
        // subfaces of the parent's faces and must not split them further
        let outside = |c: CellId| c != parent && !self.is_ancestor_of(parent, c);
        let faces = self.face_objects();
        for &f in self.cell_face_indices(parent) {
            let f = f as usize;
            for d in descendants(faces, f).into_iter().filter(|&d| d != f) {
                let subface = self.subface_number(f, d).is_some();
                if ctx.face_cells[d]
                    .iter()
                    .any(|&c| outside(c) && (!subface || self.will_refine(c)))
                {
                    return false;
                }
            }
        }
        if self.dim == 3 {
            for line in self.cell_lines(parent, &ctx.conn).into_iter().flatten() {
                for d in descendants(&self.faces.lines, line) {
                    if ctx.line_cells[d].iter().any(|&c| too_fine(c)) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn fix_coarsen_flags(&mut self, ctx: &FlagContext) {
        for cell in self.used_cells() {
            if !self.has_children(cell) {
                continue;
            }
            let flagged = self.children(cell).filter(|&c| self.coarsen_flag_of(c)).count();
            if flagged == 0 {
                continue;
            }
            if !self.children_all_coarsened(cell) || !self.coarsening_allowed(cell, ctx) {
                let children: Vec<CellId> = self.children(cell).collect();
                for c in children {
                    self.unflag_coarsen(c);
                }
            }
        }
    }

    /// Make anisotropic refinement isotropic when a curved boundary face
    /// would receive a new point far away from the flat face.
    fn limit_boundary_distortion(&mut self) {
        if self.dim != self.spacedim {
            return;
        }
        for cell in self.active_cells() {
            let case = self.refine_flag_of(cell);
            let kind = self.cell_kind(cell);
            if !kind.is_hypercube() || !case.is_refined() || case == RefinementCase::isotropic(kind.dim()) {
                continue;
            }
            let cell_points = self.points_of(self.cell_vertex_indices(cell));
            for f in 0..kind.n_faces() {
                if self.neighbor_of(cell, f).is_some() || self.face_need(cell, f, case).is_empty() {
                    continue;
                }
                let face = self.cell_face_index(cell, f);
                let manifold = self.manifolds.get(self.face_objects().manifold_id[face]);
                if manifold.is_flat() {
                    continue;
                }
                let fv = self.face_vertex_indices(face);
                let weights = vec![1.0 / fv.len() as f64; fv.len()];
                let midpoint = manifold.get_new_point(&self.points_of(&fv), &weights);
                let (axis, side) = (f / 2, (f % 2) as f64);
                let far = match transform_real_to_unit_cell(kind, &cell_points, &midpoint) {
                    Some(xi) => (xi[axis] - side).abs() > BOUNDARY_DISTORTION_LIMIT,
                    None => true,
                };
                if far {
                    self.flag_refine(cell, RefinementCase::isotropic(kind.dim()));
                    log::trace!("smoothing: curved boundary face {f} of {cell} forces isotropic refinement");
                    break;
                }
            }
        }
    }

    /// Face index of `n` whose face object contains face object `face`.
    fn face_no_containing(&self, n: CellId, face: usize) -> Option<usize> {
        self.cell_face_indices(n)
            .iter()
            .position(|&g| self.face_contains(g as usize, face))
    }

    /// Whether splitting `face` with `need` turns it into quarters of its
    /// anisotropically cut parent `parent`, which a coarser neighbor on
    /// `parent` can still see as subfaces.
    fn splits_into_quarters(&self, parent: usize, face: usize, need: RefinementCase) -> bool {
        let quads = &self.faces.quads;
        self.dim == 3
            && quads.kind(face) == ReferenceCell::Quadrilateral
            && quads.refinement_cases[parent] != RefinementCase::CUT_XY
            && need == quads.refinement_cases[parent].uncut_in(2)
    }

    /// Active cells whose face strictly contains a face about to be split
    /// are refined along that face (2:1 balance across faces).
    fn balance_faces(&mut self, ctx: &FlagContext, smoothing: MeshSmoothing) {
        let mut changed = true;
        while changed {
            changed = false;
            for cell in self.active_cells().into_iter().rev() {
                let case = self.refine_flag_of(cell);
                if case.is_empty() {
                    continue;
                }
                let n_faces = self.cell_kind(cell).n_faces();
                for f in 0..n_faces {
                    let mut coarser: Vec<(CellId, usize)> = Vec::new();
                    if self.dim == 1 {
                        if let Some(n) = self.neighbor_of(cell, f) {
                            if n.level < cell.level {
                                let vertex = self.cell_face_index(cell, f);
                                coarser.extend(self.face_no_containing(n, vertex).map(|nf| (n, nf)));
                            }
                        }
                    } else {
                        let need = self.face_need(cell, f, case);
                        if need.is_empty() {
                            continue;
                        }
                        let face = self.cell_face_index(cell, f);
                        let mut below = face;
                        while let Some(ancestor) = self.face_parent(below) {
                            let quarters = below == face && self.splits_into_quarters(ancestor, face, need);
                            if !quarters {
                                for &n in &ctx.face_cells[ancestor] {
                                    if n != cell && self.is_active(n) {
                                        let nf = self.face_no_containing(n, ancestor);
                                        coarser.extend(nf.map(|nf| (n, nf)));
                                    }
                                }
                            }
                            below = ancestor;
                        }
                    }
                    if self.neighbor_of(cell, f).is_none() {
                        if let Some((p, pf, _)) = self.periodic_partner(cell, f) {
                            if p.level < cell.level {
                                coarser.push((p, pf as usize));
                            }
                        }
                    }
                    for (n, nf) in coarser {
                        if !self.is_active(n) {
                            continue;
                        }
                        let axes = if self.cell_kind(n).is_hypercube() && self.dim > 1 {
                            RefinementCase::isotropic(self.dim) & !RefinementCase::cut_axis(nf / 2)
                        } else {
                            RefinementCase::NONE
                        };
                        let forced = self.forced_case(n, axes, smoothing);
                        changed |= self.flag_refine(n, forced);
                    }
                }
            }
        }
    }

    /// 3D: upgrade refinement cases whose face needs the face tree cannot
    /// represent, so the executor never has to build a strip.
    fn upgrade_infeasible_face_cases(&mut self) -> Result<(), MeshError> {
        loop {
            let mut needs: HashMap<usize, Vec<(CellId, usize, RefinementCase)>> = HashMap::new();
            for cell in self.active_cells() {
                let case = self.refine_flag_of(cell);
                if case.is_empty() || !self.cell_kind(cell).is_hypercube() {
                    continue;
                }
                for f in 0..6 {
                    let need = self.face_need(cell, f, case);
                    if need.is_refined() {
                        needs
                            .entry(self.cell_face_index(cell, f))
                            .or_default()
                            .push((cell, f, need));
                    }
                }
            }
            let mut upgrades: HashSet<(CellId, usize)> = HashSet::new();
            let quads = &self.faces.quads;
            for (&face, list) in &needs {
                let aniso: HashSet<RefinementCase> = list
                    .iter()
                    .map(|e| e.2)
                    .filter(|&n| n != RefinementCase::CUT_XY)
                    .collect();
                let conflicting = aniso.len() > 1;
                for &(cell, f, need) in list {
                    if need == RefinementCase::CUT_XY {
                        continue;
                    }
                    let other = need.uncut_in(2);
                    let current = quads.refinement_cases[face];
                    let parent_case = quads.parent(face).map(|p| quads.refinement_cases[p]);
                    let blocked = conflicting
                        || (quads.has_children(face) && current == other)
                        || (!quads.has_children(face) && parent_case == Some(need))
                        || (current == RefinementCase::CUT_XY
                            && (parent_case == Some(need)
                                || quads.child_range(face).any(|q| {
                                    quads.refinement_cases[q] == other
                                        || needs.get(&q).is_some_and(|l| l.iter().any(|e| e.2 == other))
                                })));
                    if blocked {
                        upgrades.insert((cell, f));
                    }
                }
            }
            if upgrades.is_empty() {
                return Ok(());
            }
            let mut changed = false;
            for (cell, f) in upgrades {
                let tangential = RefinementCase::isotropic(3) & !RefinementCase::cut_axis(f / 2);
                changed |= self.flag_refine(cell, tangential);
            }
            if !changed {
                return Err(MeshError::internal(
                    "face refinement cases cannot be made consistent",
                ));
            }
        }
    }

    /// 3D: an active cell next to an edge whose children are (or will be)
    /// split again must be refined along that edge.
    fn balance_lines(&mut self, ctx: &FlagContext, smoothing: MeshSmoothing) {
        loop {
            let mut split: HashSet<usize> = HashSet::new();
            for cell in self.active_cells() {
                let case = self.refine_flag_of(cell);
                let Some(t) = template(self.cell_kind(cell), case) else {
                    continue;
                };
                for (l, line) in self.cell_lines(cell, &ctx.conn).into_iter().enumerate() {
                    if let Some(line) = line {
                        if t.splits_line(l) {
                            split.insert(line);
                        }
                    }
                }
            }
            let lines = &self.faces.lines;
            let marked = |i: usize| lines.has_children(i) || split.contains(&i);
            let mut forced: Vec<(CellId, RefinementCase)> = Vec::new();
            for cell in self.active_cells() {
                let kind = self.cell_kind(cell);
                let case = self.refine_flag_of(cell);
                let t = template(kind, case);
                let mut axes = RefinementCase::NONE;
                for (l, line) in self.cell_lines(cell, &ctx.conn).into_iter().enumerate() {
                    let Some(line) = line else { continue };
                    if t.is_some_and(|t| t.splits_line(l)) || !lines.has_children(line) {
                        continue;
                    }
                    if lines.child_range(line).any(marked) {
                        let [a, b] = kind.line_vertices(l);
                        axes |= if kind.is_hypercube() {
                            RefinementCase::cut_axis(ReferenceCell::edge_axis(a, b))
                        } else {
                            RefinementCase::isotropic(3)
                        };
                    }
                }
                if axes.is_refined() {
                    forced.push((cell, self.forced_case(cell, axes, smoothing)));
                }
            }
            let mut changed = false;
            for (cell, case) in forced {
                changed |= self.flag_refine(cell, case);
            }
            if !changed {
                break;
            }
        }
    }

    fn enforce_flag_consistency(&mut self) {
        for level in &mut self.levels {
            for i in 0..level.len() {
                if level.refine_flags[i].is_refined() {
                    level.coarsen_flags[i] = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_combine_options() {
        assert!(MeshSmoothing::MAXIMUM_SMOOTHING.contains(MeshSmoothing::PATCH_LEVEL_1));
        assert!(!MeshSmoothing::MAXIMUM_SMOOTHING.contains(MeshSmoothing::ALLOW_ANISOTROPIC_SMOOTHING));
        assert!(MeshSmoothing::SMOOTHING_ON_REFINEMENT
            .contains(MeshSmoothing::LIMIT_LEVEL_DIFFERENCE_AT_VERTICES));
        assert_eq!(MeshSmoothing::default(), MeshSmoothing::NONE);
    }

    #[test]
    fn smoothing_round_trips_through_json() {
        let s = MeshSmoothing::SMOOTHING_ON_COARSENING | MeshSmoothing::ALLOW_ANISOTROPIC_SMOOTHING;
        let json = serde_json::to_string(&s).unwrap();
        let back: MeshSmoothing = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
