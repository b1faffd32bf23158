//! Identifier types and reserved sentinel values.
//!
//! Everything in the topology store is addressed by plain integer indices.
//! Cells are addressed by `(level, index)` pairs ([`CellId`]); faces, lines
//! and vertices by a single level-less index.

use std::fmt;

/// Generic "no such index" marker for `u32` slots.
pub const INVALID_UNSIGNED_INT: u32 = u32::MAX;
/// Marker for an unset degree-of-freedom index.
pub const INVALID_DOF_INDEX: u64 = u64::MAX;

/// Label attached to boundary faces.
pub type BoundaryId = u32;
/// Label attached to cells.
pub type MaterialId = u32;
/// Key into the manifold registry.
pub type ManifoldId = u32;
/// Owning subdomain of a cell.
pub type SubdomainId = u32;

/// Manifold id selecting the built-in flat (straight-sided) geometry.
pub const FLAT_MANIFOLD_ID: ManifoldId = u32::MAX;
/// Boundary id carried by every face in the interior of the domain.
pub const INTERNAL_FACE_BOUNDARY_ID: BoundaryId = u32::MAX;
/// Subdomain id of cells not assigned to any subdomain.
pub const INVALID_SUBDOMAIN_ID: SubdomainId = u32::MAX;

/// Vertex coordinates. Components beyond `spacedim` are zero.
pub type Point = [f64; 3];

/// Handle of a cell: refinement level plus slot index on that level.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct CellId {
    pub level: u32,
    pub index: u32,
}

impl CellId {
    #[inline]
    pub const fn new(level: usize, index: usize) -> Self {
        CellId {
            level: level as u32,
            index: index as u32,
        }
    }

    #[inline]
    pub const fn level(self) -> usize {
        self.level as usize
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({}.{})", self.level, self.index)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.level, self.index)
    }
}
