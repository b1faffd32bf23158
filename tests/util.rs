#![allow(dead_code)]
use tria_sieve::prelude::*;

pub fn settings(smoothing: MeshSmoothing) -> TriangulationSettings {
    TriangulationSettings::with_smoothing(smoothing)
}

/// `[0,1]^2` as one quad.
pub fn unit_square(settings: TriangulationSettings) -> Triangulation {
    square_grid(1, settings)
}

/// `[0,n]^2` split into `n x n` unit quads, numbered x fastest.
pub fn square_grid(n: usize, settings: TriangulationSettings) -> Triangulation {
    let idx = |i: usize, j: usize| (j * (n + 1) + i) as u32;
    let mut vertices = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            vertices.push([i as f64, j as f64, 0.0]);
        }
    }
    let mut cells = Vec::new();
    for j in 0..n {
        for i in 0..n {
            cells.push(CellData::new([
                idx(i, j),
                idx(i + 1, j),
                idx(i, j + 1),
                idx(i + 1, j + 1),
            ]));
        }
    }
    let mut tria = Triangulation::with_settings(2, 2, settings).unwrap();
    tria.create_triangulation(&vertices, &cells, &SubCellData::default())
        .unwrap();
    tria
}

/// `[0,n]^3` split into `n x n x n` unit hexes, numbered x fastest.
pub fn cube_grid(n: usize, settings: TriangulationSettings) -> Triangulation {
    let idx = |i: usize, j: usize, k: usize| ((k * (n + 1) + j) * (n + 1) + i) as u32;
    let mut vertices = Vec::new();
    for k in 0..=n {
        for j in 0..=n {
            for i in 0..=n {
                vertices.push([i as f64, j as f64, k as f64]);
            }
        }
    }
    let mut cells = Vec::new();
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                cells.push(CellData::new([
                    idx(i, j, k),
                    idx(i + 1, j, k),
                    idx(i, j + 1, k),
                    idx(i + 1, j + 1, k),
                    idx(i, j, k + 1),
                    idx(i + 1, j, k + 1),
                    idx(i, j + 1, k + 1),
                    idx(i + 1, j + 1, k + 1),
                ]));
            }
        }
    }
    let mut tria = Triangulation::with_settings(3, 3, settings).unwrap();
    tria.create_triangulation(&vertices, &cells, &SubCellData::default())
        .unwrap();
    tria
}

/// Sum of the measures of the active cells.
pub fn active_volume(tria: &Triangulation) -> f64 {
    tria.active_cell_iter().map(|c| c.measure()).sum()
}

/// No two used vertices sit at the same position.
pub fn assert_used_vertices_distinct(tria: &Triangulation) {
    let mut pts: Vec<[i64; 3]> = tria
        .vertices()
        .iter()
        .zip(tria.used_vertices())
        .filter(|(_, used)| **used)
        .map(|(p, _)| p.map(|x| (x * 1e9).round() as i64))
        .collect();
    let n = pts.len();
    pts.sort_unstable();
    pts.dedup();
    assert_eq!(pts.len(), n, "duplicate vertex positions");
}

/// Active cell whose closure contains `p`, finest first.
pub fn active_cell_at(tria: &Triangulation, p: [f64; 3]) -> CellId {
    let dim = tria.dim();
    tria.active_cell_iter()
        .filter(|c| {
            let pts = c.points();
            (0..dim).all(|d| {
                let lo = pts.iter().map(|x| x[d]).fold(f64::INFINITY, f64::min);
                let hi = pts.iter().map(|x| x[d]).fold(f64::NEG_INFINITY, f64::max);
                lo - 1e-12 <= p[d] && p[d] <= hi + 1e-12
            })
        })
        .max_by_key(|c| c.level())
        .map(|c| c.id())
        .unwrap()
}

/// Sorted multiset of active cell levels.
pub fn active_levels(tria: &Triangulation) -> Vec<usize> {
    let mut levels: Vec<usize> = tria.active_cell_iter().map(|c| c.level()).collect();
    levels.sort_unstable();
    levels
}
