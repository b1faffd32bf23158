//! Measures, diameters and distortion checks for single cells.
//!
//! Vertices are passed in the standard (lexicographic for tensor-product
//! cells) order of [`ReferenceCell`].

use crate::geometry::manifold::distance;
use crate::geometry::mapping::jacobian_determinant;
use crate::topology::cell_type::ReferenceCell;
use crate::types::Point;

/// Relative threshold below which the Jacobian at a vertex counts as
/// degenerate.
pub const DISTORTION_TOLERANCE: f64 = 1e-9;

const GAUSS_2: [f64; 2] = [0.211_324_865_405_187_1, 0.788_675_134_594_812_9];

/// Signed measure (length, area, volume) of a cell. Codimension-one cells
/// have non-negative measure.
pub fn measure(kind: ReferenceCell, vertices: &[Point], spacedim: usize) -> f64 {
    let dim = kind.dim();
    if dim == 0 {
        return 1.0;
    }
    if !kind.is_hypercube() {
        let scale = if dim == 2 { 0.5 } else { 1.0 / 6.0 };
        return scale * jacobian_determinant(kind, vertices, &[0.25, 0.25, 0.25], spacedim);
    }
    let n = 1usize << dim;
    let weight = 1.0 / n as f64;
    (0..n)
        .map(|q| {
            let mut xi = [0.0; 3];
            for d in 0..dim {
                xi[d] = GAUSS_2[(q >> d) & 1];
            }
            weight * jacobian_determinant(kind, vertices, &xi, spacedim)
        })
        .sum()
}

/// Largest distance between two vertices of the cell.
pub fn diameter(vertices: &[Point]) -> f64 {
    let mut d: f64 = 0.0;
    for (i, a) in vertices.iter().enumerate() {
        for b in &vertices[i + 1..] {
            d = d.max(distance(a, b));
        }
    }
    d
}

/// Arithmetic mean of the vertices.
pub fn vertex_average(vertices: &[Point]) -> Point {
    let mut c = [0.0; 3];
    for v in vertices {
        for k in 0..3 {
            c[k] += v[k];
        }
    }
    let n = vertices.len().max(1) as f64;
    c.map(|x| x / n)
}

/// `true` if the Jacobian of the default mapping, evaluated at any vertex,
/// is at most `DISTORTION_TOLERANCE · diameter^dim`. Only meaningful when
/// `dim == spacedim`.
pub fn is_distorted(kind: ReferenceCell, vertices: &[Point]) -> bool {
    let dim = kind.dim();
    let threshold = DISTORTION_TOLERANCE * diameter(vertices).powi(dim as i32);
    (0..kind.n_vertices()).any(|v| {
        let unit = kind.unit_vertex(v);
        jacobian_determinant(kind, vertices, &unit, dim) <= threshold
    })
}
