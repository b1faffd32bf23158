//! MeshError: Unified error type for tria-sieve public APIs
//!
//! This error type is used throughout the library to provide
//! non-panicking error handling for creation, refinement, coarsening,
//! flag preparation and flag persistence.

use crate::types::CellId;
use thiserror::Error;

/// Unified error type for triangulation operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Creation was attempted with no vertices or no cells.
    #[error("Invalid input: vertex and cell lists must both be non-empty")]
    EmptyInput,
    /// Generic malformed input (bad vertex counts, contradictory subcell data, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A cell refers to a vertex that does not exist.
    #[error("Invalid input: cell {cell} references vertex {vertex} but only {n_vertices} vertices exist")]
    VertexIndexOutOfRange {
        cell: usize,
        vertex: u32,
        n_vertices: usize,
    },
    /// A coarse cell has non-positive signed measure.
    #[error("Cell {cell} has non-positive measure {measure}")]
    NegativeMeasure { cell: usize, measure: f64 },
    /// Subcell data assigns a boundary id to an interior face without asking for it.
    #[error("Boundary id assigned to an internal face with vertices {vertices:?}")]
    BoundaryIdOnInternalFace { vertices: Vec<u32> },
    /// Cells whose (children's) Jacobian degenerates at a vertex.
    #[error("{} distorted cell(s) detected", .0.len())]
    DistortedCells(Vec<CellId>),
    /// A codim-1 mesh cannot be consistently oriented.
    #[error("Surface is not orientable (inconsistency found at cell {cell})")]
    NonOrientableSurface { cell: CellId },
    /// A structural invariant was found violated. Indicates a bug.
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
    /// Level index outside `0..n_levels`.
    #[error("Invalid level {level}; triangulation has {n_levels} levels")]
    InvalidLevel { level: usize, n_levels: usize },
    /// Child index outside `0..n_children`.
    #[error("Invalid child index {index}; object has {n_children} children")]
    InvalidChildIndex { index: usize, n_children: usize },
    /// Object index does not name a slot of the given dimension.
    #[error("Invalid index {index} for object of structural dimension {structdim}")]
    InvalidObjectIndex { structdim: usize, index: usize },
    /// Flag preparation failed to reach a fixpoint.
    #[error("Flag preparation did not converge after {passes} passes")]
    NotConverged { passes: usize },
    /// Malformed persisted flag stream.
    #[error("Flag stream error: {0}")]
    FlagStream(String),
}

impl MeshError {
    /// Returns `true` for errors caused by bad input or bad geometry, which
    /// callers are expected to handle. All of them except
    /// [`MeshError::DistortedCells`] leave the triangulation empty.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MeshError::EmptyInput
                | MeshError::InvalidInput(_)
                | MeshError::VertexIndexOutOfRange { .. }
                | MeshError::NegativeMeasure { .. }
                | MeshError::BoundaryIdOnInternalFace { .. }
                | MeshError::DistortedCells(_)
                | MeshError::NonOrientableSurface { .. }
        )
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        MeshError::InternalInvariant(msg.into())
    }
}
