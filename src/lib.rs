#![cfg_attr(docsrs, feature(doc_cfg))]
//! # tria-sieve
//!
//! tria-sieve is the topology core of an adaptive hierarchical mesh: a forest
//! of line, quadrilateral, triangle, hexahedron and tetrahedron cells whose
//! leaves form the active mesh. It stores cells, faces and lines in flat
//! per-kind arrays addressed by `(level, index)` pairs, and edits them
//! through refinement and coarsening executors driven by per-cell flags.
//!
//! ## Features
//! - Creation from cell lists with boundary/manifold sub-cell data and
//!   codimension-one orientation repair
//! - Isotropic and anisotropic refinement, including anisotropic face
//!   promotion in 3D
//! - Coarsening with face and line reclamation
//! - Mesh-smoothing flag preparation (2:1 balance at faces, lines and
//!   vertices, island elimination, patch-level-1)
//! - Periodic face identification maintained across levels
//! - Observer signals around every structural change
//!
//! ## Determinism
//!
//! All slot allocation, traversal and flag preparation is serial and
//! ordered by `(level, index)`, so the same input and flag sequence always
//! produces the same store. Randomized tests fix their `SmallRng` seeds.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! tria-sieve = "0.1"
//! # Optional features:
//! # features = ["rayon", "check-invariants"]
//! ```
//!
//! ```
//! use tria_sieve::prelude::*;
//!
//! let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
//! let mut tria = Triangulation::new(2, 2)?;
//! tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default())?;
//! tria.refine_global(1)?;
//! assert_eq!(tria.n_active_cells(), 4);
//! # Ok::<(), MeshError>(())
//! ```

pub mod debug_invariants;
pub mod geometry;
pub mod io;
pub mod mesh_error;
pub mod topology;
pub mod types;

pub use debug_invariants::DebugInvariants;
pub use mesh_error::MeshError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::{FlatManifold, Manifold, SphericalManifold};
    pub use crate::mesh_error::MeshError;
    pub use crate::topology::accessor::{CellAccessor, CellMut, FaceAccessor, LineAccessor};
    pub use crate::topology::cell_type::ReferenceCell;
    pub use crate::topology::create::{CellData, SubCellData, SubCellEntry};
    pub use crate::topology::orientation::FaceOrientation;
    pub use crate::topology::periodic::PeriodicFacePair;
    pub use crate::topology::refinement_case::RefinementCase;
    pub use crate::topology::smoothing::MeshSmoothing;
    pub use crate::topology::triangulation::{Triangulation, TriangulationSettings};
    pub use crate::types::{CellId, Point};
}
