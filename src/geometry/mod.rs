//! Geometry collaborators of the topology store.
//!
//! The store only consults geometry through manifolds (placing new vertices
//! during refinement) and through the default linear mapping (measures,
//! distortion checks and the boundary-distortion guard of flag
//! preparation).

pub mod manifold;
pub mod mapping;
pub mod quality;

pub use manifold::{FlatManifold, Manifold, ManifoldRegistry, SphericalManifold};
