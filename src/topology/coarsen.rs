//! Coarsening and the combined adaptation entry point.
//!
//! A parent is coarsened when all of its children are active and carry a
//! coarsen flag after flag preparation. Children are removed deepest level
//! first; afterwards a garbage-collection fixpoint drops face and line
//! children nobody references any more, frees unreferenced interior objects
//! and recomputes vertex usage.

use crate::mesh_error::MeshError;
use crate::topology::connectivity::Connectivity;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::signals::{CellSignal, Signal};
use crate::topology::store::TriaObjects;
use crate::topology::triangulation::Triangulation;
use crate::types::{CellId, INVALID_UNSIGNED_INT};

impl Triangulation {
    /// Apply the current refine and coarsen flags.
    ///
    /// Flags are first made consistent by
    /// [`prepare_coarsening_and_refinement`](Self::prepare_coarsening_and_refinement).
    /// On an internal failure the triangulation is cleared and the error is
    /// returned. If refinement produced distorted children the (complete)
    /// new mesh is kept and [`MeshError::DistortedCells`] lists their parents.
    pub fn execute_coarsening_and_refinement(&mut self) -> Result<(), MeshError> {
        if self.is_empty() {
            return Ok(());
        }
        self.prepare_coarsening_and_refinement()?;
        self.signals.fire(Signal::PreRefinement);
        let distorted = match self.adapt() {
            Ok(d) => d,
            Err(e) => {
                log::error!("adaptation failed, clearing triangulation: {e}");
                self.clear_despite_subscriptions();
                return Err(e);
            }
        };
        self.signals.fire(Signal::PostRefinement);
        self.signals.fire(Signal::AnyChange);
        if distorted.is_empty() {
            Ok(())
        } else {
            log::warn!("{} refined cells have distorted children", distorted.len());
            Err(MeshError::DistortedCells(distorted))
        }
    }

    fn adapt(&mut self) -> Result<Vec<CellId>, MeshError> {
        let coarsened = self.execute_coarsening()?;
        let distorted = self.execute_refinement()?;
        self.clear_flags();
        self.update_after_change()?;
        log::info!(
            "adapted mesh: {coarsened} parents coarsened, {} active cells on {} levels",
            self.n_active_cells(),
            self.n_levels()
        );
        Ok(distorted)
    }

    /// Parents whose children are all active and flagged for coarsening,
    /// finest level first.
    fn coarsening_targets(&self) -> Vec<CellId> {
        let mut targets = Vec::new();
        for level in (0..self.levels.len().saturating_sub(1)).rev() {
            for i in 0..self.levels[level].len() {
                let cell = CellId::new(level, i);
                if self.is_used(cell)
                    && self.has_children(cell)
                    && self
                        .children(cell)
                        .all(|c| self.is_active(c) && self.coarsen_flag_of(c))
                {
                    targets.push(cell);
                }
            }
        }
        targets
    }

    /// Remove the children of every coarsening target. Returns the number
    /// of coarsened parents.
    pub(crate) fn execute_coarsening(&mut self) -> Result<usize, MeshError> {
        let targets = self.coarsening_targets();
        if targets.is_empty() {
            return Ok(0);
        }
        for &cell in &targets {
            self.signals
                .fire_cell(CellSignal::PreCoarseningOnCell, cell);
            let children: Vec<CellId> = self.children(cell).collect();
            for c in children {
                self.levels[c.level()].clear_cell(c.index());
            }
            let level = &mut self.levels[cell.level()];
            let i = cell.index();
            level.cells.children[i] = INVALID_UNSIGNED_INT;
            level.cells.refinement_cases[i] = RefinementCase::NONE;
            level.refine_flags[i] = RefinementCase::NONE;
            level.coarsen_flags[i] = false;
        }
        self.collect_garbage()?;
        while self.levels.len() > 1 && self.levels.last().is_some_and(|l| l.cells.n_used() == 0) {
            self.levels.pop();
        }
        log::debug!("coarsened {} parents", targets.len());
        Ok(targets.len())
    }

    /// Reference counts of quads (by used cells, 3D) and lines (by used
    /// quads in 3D, used cells in 2D).
    fn object_references(&self) -> (Vec<u32>, Vec<u32>) {
        let mut quad_refs = vec![0u32; self.faces.quads.len()];
        let mut line_refs = vec![0u32; self.faces.lines.len()];
        match self.dim {
            2 => {
                for cell in self.used_cells() {
                    for &l in self.cell_face_indices(cell) {
                        line_refs[l as usize] += 1;
                    }
                }
            }
            3 => {
                for cell in self.used_cells() {
                    for &q in self.cell_face_indices(cell) {
                        quad_refs[q as usize] += 1;
                    }
                }
                let quads = &self.faces.quads;
                for q in (0..quads.len()).filter(|&q| quads.used[q]) {
                    for &l in quads.bounds_of(q) {
                        line_refs[l as usize] += 1;
                    }
                }
            }
            _ => {}
        }
        (quad_refs, line_refs)
    }

    /// Drop unreferenced face and line objects until nothing changes, then
    /// recompute vertex usage.
    pub(crate) fn collect_garbage(&mut self) -> Result<(), MeshError> {
        let mut passes = 0usize;
        loop {
            passes += 1;
            let (quad_refs, line_refs) = self.object_references();
            let mut changed = false;
            if self.dim == 3 {
                changed |= self.revert_promotions(&quad_refs)?;
                changed |= release_unreferenced(&mut self.faces.quads, &quad_refs);
            }
            if self.dim >= 2 {
                changed |= release_unreferenced(&mut self.faces.lines, &line_refs);
            }
            if !changed {
                break;
            }
        }
        self.recompute_used_vertices();
        log::trace!("garbage collection converged after {passes} passes");
        Ok(())
    }

    /// Turn promoted faces whose halves nobody references back into plain
    /// isotropically refined faces.
    fn revert_promotions(&mut self, quad_refs: &[u32]) -> Result<bool, MeshError> {
        let mut candidates = Vec::new();
        {
            let quads = &self.faces.quads;
            for f in 0..quads.len() {
                if !quads.used[f] || !quads.has_children(f) || quads.n_children(f) != 2 {
                    continue;
                }
                let case = quads.refinement_cases[f];
                let (a, b) = (quads.child(f, 0), quads.child(f, 1));
                let complement = case.uncut_in(2);
                let halves_ok = [a, b].iter().all(|&h| {
                    quad_refs[h] == 0
                        && quads.has_children(h)
                        && quads.refinement_cases[h] == complement
                });
                if !halves_ok {
                    continue;
                }
                let run = quads.children[a] as usize;
                if run % 4 == 0 && quads.children[b] as usize == run + 2 {
                    candidates.push(f);
                }
            }
        }
        if candidates.is_empty() {
            return Ok(false);
        }
        let mut conn = Connectivity::build(&self.faces);
        for f in candidates {
            let quads = &self.faces.quads;
            let case = quads.refinement_cases[f];
            let (a, b) = (quads.child(f, 0), quads.child(f, 1));
            let run = quads.children[a] as usize;
            let middle = quads
                .bounds_of(a)
                .iter()
                .copied()
                .find(|l| quads.bounds_of(b).contains(l))
                .ok_or_else(|| MeshError::internal(format!("halves of face {f} share no line")))?
                as usize;
            if case == RefinementCase::CUT_X {
                self.swap_quad_slots(run + 1, run + 2, &mut conn);
            }
            let quads = &mut self.faces.quads;
            for k in run..run + 4 {
                quads.parents[k] = f as u32;
            }
            quads.clear_slot(a);
            quads.clear_slot(b);
            quads.children[f] = run as u32;
            quads.refinement_cases[f] = RefinementCase::CUT_XY;
            let lines = &mut self.faces.lines;
            for h in lines.child_range(middle) {
                lines.parents[h] = INVALID_UNSIGNED_INT;
            }
            lines.clear_slot(middle);
            log::debug!("reverted promotion of face {f}");
        }
        Ok(true)
    }

    /// Mark exactly the vertices of used cells and used lines as used.
    pub(crate) fn recompute_used_vertices(&mut self) {
        let mut used = vec![false; self.vertices.len()];
        for cell in self.used_cells() {
            for &v in self.cell_vertex_indices(cell) {
                used[v as usize] = true;
            }
        }
        let lines = &self.faces.lines;
        for l in (0..lines.len()).filter(|&l| lines.used[l]) {
            for &v in lines.vertices_of(l) {
                used[v as usize] = true;
            }
        }
        self.vertices_used = used;
    }
}

/// One garbage-collection sweep over a face or line store: un-refine objects
/// whose children are unreferenced leaves, then free parentless objects
/// nobody references.
fn release_unreferenced(objects: &mut TriaObjects, refs: &[u32]) -> bool {
    let mut changed = false;
    for i in 0..objects.len() {
        if !objects.used[i] || !objects.has_children(i) {
            continue;
        }
        let children = objects.child_range(i);
        if children
            .clone()
            .all(|c| refs[c] == 0 && !objects.has_children(c))
        {
            for c in children {
                objects.clear_slot(c);
            }
            objects.children[i] = INVALID_UNSIGNED_INT;
            objects.refinement_cases[i] = RefinementCase::NONE;
            changed = true;
        }
    }
    for i in 0..objects.len() {
        if objects.used[i] && refs[i] == 0 && objects.parent(i).is_none() && !objects.has_children(i) {
            objects.clear_slot(i);
            changed = true;
        }
    }
    changed
}
