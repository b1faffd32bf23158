//! Default (multi)linear mapping from a reference cell to real space.

use crate::topology::cell_type::ReferenceCell;
use crate::types::Point;

const NEWTON_MAX_ITERS: usize = 30;
const NEWTON_TOL: f64 = 1e-12;

/// Values of the linear shape functions of `kind` at `unit`.
pub fn shape_values(kind: ReferenceCell, unit: &[f64; 3]) -> Vec<f64> {
    let n = kind.n_vertices();
    if kind.is_hypercube() {
        (0..n)
            .map(|v| {
                (0..kind.dim())
                    .map(|d| if (v >> d) & 1 == 1 { unit[d] } else { 1.0 - unit[d] })
                    .product()
            })
            .collect()
    } else {
        let mut out = vec![0.0; n];
        out[0] = 1.0 - (0..kind.dim()).map(|d| unit[d]).sum::<f64>();
        for d in 0..kind.dim() {
            out[d + 1] = unit[d];
        }
        out
    }
}

/// Gradients `∂φ_v / ∂ξ_d` of the linear shape functions at `unit`.
pub fn shape_gradients(kind: ReferenceCell, unit: &[f64; 3]) -> Vec<[f64; 3]> {
    let n = kind.n_vertices();
    let dim = kind.dim();
    if kind.is_hypercube() {
        (0..n)
            .map(|v| {
                let mut g = [0.0; 3];
                for d in 0..dim {
                    g[d] = (0..dim)
                        .map(|e| {
                            let bit = (v >> e) & 1 == 1;
                            match (e == d, bit) {
                                (true, true) => 1.0,
                                (true, false) => -1.0,
                                (false, true) => unit[e],
                                (false, false) => 1.0 - unit[e],
                            }
                        })
                        .product();
                }
                g
            })
            .collect()
    } else {
        let mut out = vec![[0.0; 3]; n];
        for d in 0..dim {
            out[0][d] = -1.0;
            out[d + 1][d] = 1.0;
        }
        out
    }
}

/// Image of the reference point `unit` in real space.
pub fn map_unit_to_real(kind: ReferenceCell, vertices: &[Point], unit: &[f64; 3]) -> Point {
    let phi = shape_values(kind, unit);
    let mut p = [0.0; 3];
    for (v, &w) in vertices.iter().zip(&phi) {
        for k in 0..3 {
            p[k] += w * v[k];
        }
    }
    p
}

/// Jacobian columns `∂x / ∂ξ_d`, `d < dim`.
pub fn jacobian(kind: ReferenceCell, vertices: &[Point], unit: &[f64; 3]) -> [[f64; 3]; 3] {
    let grads = shape_gradients(kind, unit);
    let mut cols = [[0.0; 3]; 3];
    for (v, g) in vertices.iter().zip(&grads) {
        for d in 0..kind.dim() {
            for k in 0..3 {
                cols[d][k] += g[d] * v[k];
            }
        }
    }
    cols
}

/// Determinant of the `dim × dim` Jacobian (the alternating form evaluated
/// on the coordinate directions). For codimension-one cells the volume
/// element `sqrt(det(JᵀJ))` is returned.
pub fn jacobian_determinant(
    kind: ReferenceCell,
    vertices: &[Point],
    unit: &[f64; 3],
    spacedim: usize,
) -> f64 {
    let j = jacobian(kind, vertices, unit);
    let dim = kind.dim();
    if dim == spacedim {
        match dim {
            1 => j[0][0],
            2 => j[0][0] * j[1][1] - j[0][1] * j[1][0],
            3 => det3(&j),
            _ => 1.0,
        }
    } else {
        let mut g = [[0.0; 3]; 3];
        for a in 0..dim {
            for b in 0..dim {
                g[a][b] = (0..3).map(|k| j[a][k] * j[b][k]).sum();
            }
        }
        match dim {
            1 => g[0][0].sqrt(),
            2 => (g[0][0] * g[1][1] - g[0][1] * g[1][0]).max(0.0).sqrt(),
            _ => 0.0,
        }
    }
}

fn det3(c: &[[f64; 3]; 3]) -> f64 {
    c[0][0] * (c[1][1] * c[2][2] - c[1][2] * c[2][1])
        - c[1][0] * (c[0][1] * c[2][2] - c[0][2] * c[2][1])
        + c[2][0] * (c[0][1] * c[1][2] - c[0][2] * c[1][1])
}

/// Reference coordinates of the real point `p`, found by Gauss-Newton
/// iteration on the default mapping. Returns `None` if the iteration does
/// not converge (degenerate cells).
pub fn transform_real_to_unit_cell(
    kind: ReferenceCell,
    vertices: &[Point],
    p: &Point,
) -> Option<[f64; 3]> {
    let dim = kind.dim();
    let mut xi = [0.0; 3];
    let center = if kind.is_hypercube() { 0.5 } else { 0.25 };
    for d in 0..dim {
        xi[d] = center;
    }
    for _ in 0..NEWTON_MAX_ITERS {
        let x = map_unit_to_real(kind, vertices, &xi);
        let r = [p[0] - x[0], p[1] - x[1], p[2] - x[2]];
        let j = jacobian(kind, vertices, &xi);
        // normal equations JᵀJ Δ = Jᵀr
        let mut a = [[0.0; 3]; 3];
        let mut b = [0.0; 3];
        for s in 0..dim {
            b[s] = (0..3).map(|k| j[s][k] * r[k]).sum();
            for t in 0..dim {
                a[s][t] = (0..3).map(|k| j[s][k] * j[t][k]).sum();
            }
        }
        let delta = solve(&a, &b, dim)?;
        let mut step = 0.0;
        for d in 0..dim {
            xi[d] += delta[d];
            step += delta[d] * delta[d];
        }
        if step.sqrt() < NEWTON_TOL {
            return Some(xi);
        }
    }
    log::trace!("transform_real_to_unit_cell did not converge for {kind:?}");
    None
}

fn solve(a: &[[f64; 3]; 3], b: &[f64; 3], n: usize) -> Option<[f64; 3]> {
    let mut m = *a;
    let mut rhs = *b;
    for col in 0..n {
        let pivot = (col..n).max_by(|&x, &y| m[x][col].abs().total_cmp(&m[y][col].abs()))?;
        if m[pivot][col].abs() < 1e-300 {
            return None;
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);
        for row in col + 1..n {
            let f = m[row][col] / m[col][col];
            for k in col..n {
                m[row][k] -= f * m[col][k];
            }
            rhs[row] -= f * rhs[col];
        }
    }
    let mut x = [0.0; 3];
    for row in (0..n).rev() {
        let s: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (rhs[row] - s) / m[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]
    }

    #[test]
    fn shape_functions_partition_unity() {
        for kind in [ReferenceCell::Quadrilateral, ReferenceCell::Tetrahedron, ReferenceCell::Hexahedron] {
            let s: f64 = shape_values(kind, &[0.3, 0.2, 0.1]).iter().sum();
            assert!((s - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn inverse_mapping_on_skewed_quad() {
        let mut v = unit_square();
        v[3] = [1.5, 1.2, 0.0];
        let unit = [0.25, 0.75, 0.0];
        let p = map_unit_to_real(ReferenceCell::Quadrilateral, &v, &unit);
        let back = transform_real_to_unit_cell(ReferenceCell::Quadrilateral, &v, &p).unwrap();
        assert!((back[0] - 0.25).abs() < 1e-10);
        assert!((back[1] - 0.75).abs() < 1e-10);
    }

    #[test]
    fn determinant_of_scaled_hex() {
        let v: Vec<Point> = (0..8)
            .map(|i| [2.0 * (i & 1) as f64, ((i >> 1) & 1) as f64, 3.0 * ((i >> 2) & 1) as f64])
            .collect();
        let d = jacobian_determinant(ReferenceCell::Hexahedron, &v, &[0.5, 0.5, 0.5], 3);
        assert!((d - 6.0).abs() < 1e-12);
    }

    #[test]
    fn surface_element_of_embedded_triangle() {
        let v = vec![[0.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]];
        let d = jacobian_determinant(ReferenceCell::Triangle, &v, &[0.2, 0.2, 0.0], 3);
        assert!((d - 4.0).abs() < 1e-12);
    }
}
