//! Observer lists fired by mutating operations.
//!
//! Within one `execute_coarsening_and_refinement` call the order is fixed:
//! `pre_refinement`, then `pre_coarsening_on_cell` for every coarsened
//! parent, then `post_refinement_on_cell` for every refined parent, then
//! `post_refinement`, then `any_change`. All observers run synchronously.

use crate::types::CellId;

/// Observer without arguments.
pub type Callback = Box<dyn FnMut() + Send>;

/// Observer receiving the affected cell.
pub type CellCallback = Box<dyn FnMut(CellId) + Send>;

/// All observer lists of a triangulation.
#[derive(Default)]
pub struct Signals {
    pub(crate) pre_refinement: Vec<Callback>,
    pub(crate) post_refinement: Vec<Callback>,
    pub(crate) pre_coarsening_on_cell: Vec<CellCallback>,
    pub(crate) post_refinement_on_cell: Vec<CellCallback>,
    pub(crate) create: Vec<Callback>,
    pub(crate) clear: Vec<Callback>,
    pub(crate) copy: Vec<Callback>,
    pub(crate) any_change: Vec<Callback>,
}

impl std::fmt::Debug for Signals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signals")
            .field("pre_refinement", &self.pre_refinement.len())
            .field("post_refinement", &self.post_refinement.len())
            .field("pre_coarsening_on_cell", &self.pre_coarsening_on_cell.len())
            .field("post_refinement_on_cell", &self.post_refinement_on_cell.len())
            .field("create", &self.create.len())
            .field("clear", &self.clear.len())
            .field("copy", &self.copy.len())
            .field("any_change", &self.any_change.len())
            .finish()
    }
}

/// Which argument-free list to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    PreRefinement,
    PostRefinement,
    Create,
    Clear,
    Copy,
    AnyChange,
}

/// Which per-cell list to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellSignal {
    PreCoarseningOnCell,
    PostRefinementOnCell,
}

impl Signals {
    pub fn connect(&mut self, signal: Signal, f: impl FnMut() + Send + 'static) {
        self.list_mut(signal).push(Box::new(f));
    }

    pub fn connect_cell(&mut self, signal: CellSignal, f: impl FnMut(CellId) + Send + 'static) {
        self.cell_list_mut(signal).push(Box::new(f));
    }

    pub fn n_connected(&self, signal: Signal) -> usize {
        match signal {
            Signal::PreRefinement => self.pre_refinement.len(),
            Signal::PostRefinement => self.post_refinement.len(),
            Signal::Create => self.create.len(),
            Signal::Clear => self.clear.len(),
            Signal::Copy => self.copy.len(),
            Signal::AnyChange => self.any_change.len(),
        }
    }

    /// Drop every observer.
    pub fn disconnect_all(&mut self) {
        *self = Signals::default();
    }

    fn list_mut(&mut self, signal: Signal) -> &mut Vec<Callback> {
        match signal {
            Signal::PreRefinement => &mut self.pre_refinement,
            Signal::PostRefinement => &mut self.post_refinement,
            Signal::Create => &mut self.create,
            Signal::Clear => &mut self.clear,
            Signal::Copy => &mut self.copy,
            Signal::AnyChange => &mut self.any_change,
        }
    }

    fn cell_list_mut(&mut self, signal: CellSignal) -> &mut Vec<CellCallback> {
        match signal {
            CellSignal::PreCoarseningOnCell => &mut self.pre_coarsening_on_cell,
            CellSignal::PostRefinementOnCell => &mut self.post_refinement_on_cell,
        }
    }

    pub(crate) fn fire(&mut self, signal: Signal) {
        for f in self.list_mut(signal).iter_mut() {
            f();
        }
    }

    pub(crate) fn fire_cell(&mut self, signal: CellSignal, cell: CellId) {
        for f in self.cell_list_mut(signal).iter_mut() {
            f(cell);
        }
    }
}
