//! Closed-form refinement templates.
//!
//! A template lists, for every child of a refined cell, the child's vertices
//! as *support masks* over the parent's vertices: bit `i` is set iff parent
//! vertex `i` contributes to the point. A single bit is a parent vertex, two
//! bits forming an edge are that edge's midpoint, four bits forming a hex
//! face are the face center and a full mask is the cell center.
//!
//! Tensor-product children are numbered lexicographically over the cut axes
//! (x fastest); each child lists its vertices in the standard lexicographic
//! order. Simplex templates are the usual red refinement (corner children
//! first), with the interior tetrahedra split along the `m01 - m23` diagonal.
//! Every child is positively oriented on the reference cell.

use crate::topology::cell_type::ReferenceCell;
use crate::topology::refinement_case::RefinementCase;
use hashbrown::HashMap;
use once_cell::sync::Lazy;

/// Children of one reference cell refined with one refinement case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub kind: ReferenceCell,
    pub case: RefinementCase,
    /// Per child, the support mask of each of its vertices.
    pub children: Vec<Vec<u16>>,
    /// Distinct support masks used by any child.
    pub points: Vec<u16>,
}

impl Template {
    #[inline]
    pub fn n_children(&self) -> usize {
        self.children.len()
    }

    /// Whether the refined cell has a vertex with exactly this support.
    #[inline]
    pub fn has_point(&self, mask: u16) -> bool {
        self.points.contains(&mask)
    }

    /// Whether edge `line_no` of the parent is split by this refinement.
    pub fn splits_line(&self, line_no: usize) -> bool {
        self.has_point(self.kind.line_vertex_mask(line_no))
    }

    /// Support of the union of the given child vertices.
    pub fn support(&self, child: usize, local_vertices: &[usize]) -> u16 {
        local_vertices
            .iter()
            .fold(0, |acc, &v| acc | self.children[child][v])
    }

    /// Parent face containing the given support, if any.
    pub fn parent_face_containing(&self, support: u16) -> Option<usize> {
        (0..self.kind.n_faces()).find(|&f| support & !self.kind.face_vertex_mask(f) == 0)
    }

    /// Local face of `child` that lies inside parent face `face_no`.
    pub fn child_face_on_parent_face(&self, child: usize, face_no: usize) -> Option<usize> {
        let mask = self.kind.face_vertex_mask(face_no);
        (0..self.kind.n_faces())
            .find(|&f| self.support(child, self.kind.face_vertices(f)) & !mask == 0)
    }

    /// Distinct child faces that do not lie on the parent's boundary, as
    /// sorted support tuples.
    pub fn interior_faces(&self) -> Vec<Vec<u16>> {
        let mut out: Vec<Vec<u16>> = Vec::new();
        for c in 0..self.n_children() {
            for f in 0..self.kind.n_faces() {
                let local = self.kind.face_vertices(f);
                if self.parent_face_containing(self.support(c, local)).is_some() {
                    continue;
                }
                let mut key: Vec<u16> = local.iter().map(|&v| self.children[c][v]).collect();
                key.sort_unstable();
                if !out.contains(&key) {
                    out.push(key);
                }
            }
        }
        out
    }

    /// Distinct child lines that do not lie on the parent's boundary.
    pub fn interior_lines(&self) -> Vec<[u16; 2]> {
        let mut out: Vec<[u16; 2]> = Vec::new();
        for c in 0..self.n_children() {
            for l in 0..self.kind.n_lines() {
                let [a, b] = self.kind.line_vertices(l);
                if self.parent_face_containing(self.support(c, &[a, b])).is_some() {
                    continue;
                }
                let (x, y) = (self.children[c][a], self.children[c][b]);
                let key = if x <= y { [x, y] } else { [y, x] };
                if !out.contains(&key) {
                    out.push(key);
                }
            }
        }
        out
    }

    /// Children touching parent face `face_no` with one of their faces.
    pub fn children_on_face(&self, face_no: usize) -> Vec<usize> {
        (0..self.n_children())
            .filter(|&c| self.child_face_on_parent_face(c, face_no).is_some())
            .collect()
    }
}

static TEMPLATES: Lazy<HashMap<(ReferenceCell, u8), Template>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for kind in [
        ReferenceCell::Line,
        ReferenceCell::Quadrilateral,
        ReferenceCell::Hexahedron,
    ] {
        let dim = kind.dim();
        for raw in 1..(1u8 << dim) {
            let case = RefinementCase::from_u8(raw);
            map.insert((kind, raw), tensor_template(kind, case));
        }
    }
    map.insert(
        (ReferenceCell::Triangle, RefinementCase::CUT_XY.bits()),
        simplex_template(ReferenceCell::Triangle, &TRIANGLE_CHILDREN),
    );
    map.insert(
        (ReferenceCell::Tetrahedron, RefinementCase::CUT_XYZ.bits()),
        simplex_template(ReferenceCell::Tetrahedron, &TETRAHEDRON_CHILDREN),
    );
    map
});

/// Template for `kind` refined with `case`, or `None` if the case does not
/// apply to the kind (including the empty case).
pub fn template(kind: ReferenceCell, case: RefinementCase) -> Option<&'static Template> {
    TEMPLATES.get(&(kind, case.bits()))
}

/// Position of a support mask on the unit reference cell.
pub fn point_coordinates(kind: ReferenceCell, mask: u16) -> [f64; 3] {
    let mut p = [0.0; 3];
    let n = mask.count_ones().max(1) as f64;
    for v in 0..kind.n_vertices() {
        if mask & (1 << v) != 0 {
            let u = kind.unit_vertex(v);
            for d in 0..3 {
                p[d] += u[d] / n;
            }
        }
    }
    p
}

fn tensor_template(kind: ReferenceCell, case: RefinementCase) -> Template {
    let dim = kind.dim();
    let cut: Vec<usize> = case.axes().filter(|&a| a < dim).collect();
    let n_children = 1usize << cut.len();
    let n_vertices = kind.n_vertices();
    let mut children = Vec::with_capacity(n_children);
    for k in 0..n_children {
        let mut pos = [0usize; 3];
        for (bit, &axis) in cut.iter().enumerate() {
            pos[axis] = (k >> bit) & 1;
        }
        let child: Vec<u16> = (0..n_vertices)
            .map(|v| {
                let mut grid = [0usize; 3];
                for a in 0..dim {
                    let b = (v >> a) & 1;
                    grid[a] = if case.cuts_axis(a) { pos[a] + b } else { 2 * b };
                }
                grid_support(dim, &grid)
            })
            .collect();
        children.push(child);
    }
    finish(kind, case, children)
}

/// Support of a grid point with coordinates in `{0, 1, 2}` per axis.
fn grid_support(dim: usize, grid: &[usize; 3]) -> u16 {
    let mut mask = 0u16;
    for u in 0..(1usize << dim) {
        if (0..dim).all(|a| grid[a] == 1 || grid[a] == 2 * ((u >> a) & 1)) {
            mask |= 1 << u;
        }
    }
    mask
}

const V0: u16 = 0b0001;
const V1: u16 = 0b0010;
const V2: u16 = 0b0100;
const V3: u16 = 0b1000;
const M01: u16 = V0 | V1;
const M12: u16 = V1 | V2;
const M20: u16 = V2 | V0;
const M03: u16 = V0 | V3;
const M13: u16 = V1 | V3;
const M23: u16 = V2 | V3;

const TRIANGLE_CHILDREN: [[u16; 3]; 4] = [
    [V0, M01, M20],
    [M01, V1, M12],
    [M20, M12, V2],
    [M01, M12, M20],
];

const TETRAHEDRON_CHILDREN: [[u16; 4]; 8] = [
    [V0, M01, M20, M03],
    [V1, M12, M01, M13],
    [V2, M20, M12, M23],
    [V3, M03, M13, M23],
    [M01, M12, M13, M23],
    [M01, M13, M03, M23],
    [M01, M03, M20, M23],
    [M01, M20, M12, M23],
];

fn simplex_template<const N: usize>(kind: ReferenceCell, raw: &[[u16; N]]) -> Template {
    let children = raw
        .iter()
        .map(|child| {
            let mut c = child.to_vec();
            if simplex_measure(kind, &c) < 0.0 {
                c.swap(1, 2);
            }
            c
        })
        .collect();
    finish(kind, RefinementCase::isotropic(kind.dim()), children)
}

fn simplex_measure(kind: ReferenceCell, child: &[u16]) -> f64 {
    let p: Vec<[f64; 3]> = child.iter().map(|&m| point_coordinates(kind, m)).collect();
    let d = |i: usize, k: usize| p[i][k] - p[0][k];
    match kind {
        ReferenceCell::Triangle => d(1, 0) * d(2, 1) - d(1, 1) * d(2, 0),
        _ => {
            d(1, 0) * (d(2, 1) * d(3, 2) - d(2, 2) * d(3, 1))
                - d(1, 1) * (d(2, 0) * d(3, 2) - d(2, 2) * d(3, 0))
                + d(1, 2) * (d(2, 0) * d(3, 1) - d(2, 1) * d(3, 0))
        }
    }
}

fn finish(kind: ReferenceCell, case: RefinementCase, children: Vec<Vec<u16>>) -> Template {
    let mut points: Vec<u16> = children.iter().flatten().copied().collect();
    points.sort_unstable();
    points.dedup();
    Template {
        kind,
        case,
        children,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor_measure(kind: ReferenceCell, child: &[u16]) -> f64 {
        // extent along each axis between lexicographic vertex 0 and the far corner
        let a = point_coordinates(kind, child[0]);
        let b = point_coordinates(kind, child[child.len() - 1]);
        (0..kind.dim()).map(|d| b[d] - a[d]).product()
    }

    #[test]
    fn quad_cut_xy_matches_lexicographic_quarters() {
        let t = template(ReferenceCell::Quadrilateral, RefinementCase::CUT_XY).unwrap();
        assert_eq!(t.n_children(), 4);
        // child 0 is the lower left quarter: v0, m(v0,v1), m(v0,v2), center
        assert_eq!(t.children[0], vec![0b0001, 0b0011, 0b0101, 0b1111]);
        // child 3 is the upper right quarter
        assert_eq!(t.children[3], vec![0b1111, 0b1010, 0b1100, 0b1000]);
        assert_eq!(t.points.len(), 9);
    }

    #[test]
    fn anisotropic_quad_keeps_uncut_edges() {
        let t = template(ReferenceCell::Quadrilateral, RefinementCase::CUT_X).unwrap();
        // cut_x splits the edges running in x (lines 2 and 3) only
        assert!(!t.splits_line(0));
        assert!(!t.splits_line(1));
        assert!(t.splits_line(2));
        assert!(t.splits_line(3));
        assert_eq!(t.children_on_face(0), vec![0]);
        assert_eq!(t.children_on_face(2), vec![0, 1]);
    }

    #[test]
    fn every_tensor_case_partitions_the_cell() {
        for kind in [ReferenceCell::Quadrilateral, ReferenceCell::Hexahedron] {
            for raw in 1..(1u8 << kind.dim()) {
                let t = template(kind, RefinementCase::from_u8(raw)).unwrap();
                let total: f64 = t.children.iter().map(|c| tensor_measure(kind, c)).sum();
                assert!((total - 1.0).abs() < 1e-12, "{kind:?} case {raw}");
                assert!(t.children.iter().all(|c| tensor_measure(kind, c) > 0.0));
            }
        }
    }

    #[test]
    fn simplex_children_are_positively_oriented() {
        for kind in [ReferenceCell::Triangle, ReferenceCell::Tetrahedron] {
            let t = template(kind, RefinementCase::isotropic(kind.dim())).unwrap();
            let total: f64 = t.children.iter().map(|c| simplex_measure(kind, c)).sum();
            let parent: Vec<u16> = (0..kind.n_vertices()).map(|v| 1 << v).collect();
            assert!((total - simplex_measure(kind, &parent)).abs() < 1e-12);
            assert!(t.children.iter().all(|c| simplex_measure(kind, c) > 0.0));
        }
    }

    #[test]
    fn hex_iso_has_face_and_cell_centers() {
        let t = template(ReferenceCell::Hexahedron, RefinementCase::CUT_XYZ).unwrap();
        assert_eq!(t.points.len(), 27);
        for f in 0..6 {
            assert!(t.has_point(ReferenceCell::Hexahedron.face_vertex_mask(f)));
        }
        assert!(t.has_point(0xff));
        assert_eq!(t.children_on_face(4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn interior_object_counts() {
        let quad = template(ReferenceCell::Quadrilateral, RefinementCase::CUT_XY).unwrap();
        assert_eq!(quad.interior_faces().len(), 4);
        let hex = template(ReferenceCell::Hexahedron, RefinementCase::CUT_XYZ).unwrap();
        assert_eq!(hex.interior_faces().len(), 12);
        assert_eq!(hex.interior_lines().len(), 6);
        let hex_x = template(ReferenceCell::Hexahedron, RefinementCase::CUT_X).unwrap();
        assert_eq!(hex_x.interior_faces().len(), 1);
        assert!(hex_x.interior_lines().is_empty());
        let tet = template(ReferenceCell::Tetrahedron, RefinementCase::CUT_XYZ).unwrap();
        assert_eq!(tet.interior_faces().len(), 8);
        assert_eq!(tet.interior_lines().len(), 1);
    }

    #[test]
    fn simplex_cases_other_than_isotropic_are_absent() {
        assert!(template(ReferenceCell::Triangle, RefinementCase::CUT_X).is_none());
        assert!(template(ReferenceCell::Quadrilateral, RefinementCase::NONE).is_none());
    }
}
