//! Top-level module for the hierarchical triangulation.
//!
//! This module provides the topology store and everything that edits it:
//! - Reference cells, refinement cases and refinement templates
//! - The object stores ([`store`]) and the [`Triangulation`] that owns them
//! - Creation from cell lists, refinement and coarsening executors
//! - Flag preparation (mesh smoothing), neighbors and periodic faces
//!
//! Most users will build a [`Triangulation`], flag cells through
//! [`accessor::CellMut`] and call
//! [`Triangulation::execute_coarsening_and_refinement`].

pub mod accessor;
pub mod cell_type;
pub mod coarsen;
pub mod connectivity;
pub mod create;
pub mod neighbors;
pub mod number_cache;
pub mod orientation;
pub mod periodic;
pub mod refine;
pub mod refinement_case;
pub mod signals;
pub mod smoothing;
pub mod store;
pub mod templates;
pub mod triangulation;
pub mod validation;

pub use accessor::{CellAccessor, CellMut, FaceAccessor, LineAccessor};
pub use cell_type::ReferenceCell;
pub use create::{CellData, SubCellData, SubCellEntry};
pub use number_cache::NumberCache;
pub use orientation::{FaceOrientation, Orientation};
pub use periodic::{PeriodicFaceMap, PeriodicFacePair};
pub use refinement_case::RefinementCase;
pub use signals::Signal;
pub use smoothing::MeshSmoothing;
pub use triangulation::{Triangulation, TriangulationSettings};
