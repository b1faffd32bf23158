//! Reference-cell registry: per-kind counts and local numbering tables.
//!
//! # Local numbering
//! Tensor-product cells number their vertices lexicographically (x fastest):
//! a quadrilateral has `(0,0), (1,0), (0,1), (1,1)` and a hexahedron the
//! eight corners of the unit cube in the same manner. Face `2a` of a
//! tensor-product cell is the face `x_a = 0`, face `2a + 1` is `x_a = 1`.
//!
//! Simplices use the usual corner numbering `0, e_1, e_2(, e_3)`.
//!
//! # Face orientation
//! A face is seen by an adjacent cell through a symmetry of the face's
//! reference cell, encoded as a small integer (see
//! [`crate::topology::orientation::FaceOrientation`]): bit 0 is a reflection
//! that fixes vertex 0, the remaining bits count rotations along the face's
//! vertex ring. Lines only know "as stored" (0) and "reversed" (1).

use serde::{Deserialize, Serialize};

/// The reference-cell kinds supported by the topology store.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceCell {
    /// 0D vertex.
    Vertex,
    /// 1D segment.
    Line,
    /// 2D simplex.
    Triangle,
    /// 2D tensor-product cell.
    Quadrilateral,
    /// 3D simplex.
    Tetrahedron,
    /// 3D tensor-product cell.
    Hexahedron,
}

impl Default for ReferenceCell {
    fn default() -> Self {
        ReferenceCell::Vertex
    }
}

const LINE_FACES: [&[usize]; 2] = [&[0], &[1]];
const TRI_LINES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
const TRI_FACES: [&[usize]; 3] = [&[0, 1], &[1, 2], &[2, 0]];
const QUAD_LINES: [[usize; 2]; 4] = [[0, 2], [1, 3], [0, 1], [2, 3]];
const QUAD_FACES: [&[usize]; 4] = [&[0, 2], &[1, 3], &[0, 1], &[2, 3]];
const TET_LINES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
const TET_FACES: [&[usize]; 4] = [&[0, 1, 2], &[1, 0, 3], &[0, 2, 3], &[1, 3, 2]];
const HEX_LINES: [[usize; 2]; 12] = [
    [0, 2],
    [1, 3],
    [0, 1],
    [2, 3],
    [4, 6],
    [5, 7],
    [4, 5],
    [6, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];
const HEX_FACES: [&[usize]; 6] = [
    &[0, 2, 4, 6],
    &[1, 3, 5, 7],
    &[0, 4, 1, 5],
    &[2, 6, 3, 7],
    &[0, 1, 2, 3],
    &[4, 5, 6, 7],
];

/// Vertex ring (counter-clockwise boundary walk) of a 2D reference cell.
const TRI_RING: [usize; 3] = [0, 1, 2];
const QUAD_RING: [usize; 4] = [0, 1, 3, 2];

impl ReferenceCell {
    /// Topological dimension.
    pub fn dim(self) -> usize {
        match self {
            ReferenceCell::Vertex => 0,
            ReferenceCell::Line => 1,
            ReferenceCell::Triangle | ReferenceCell::Quadrilateral => 2,
            ReferenceCell::Tetrahedron | ReferenceCell::Hexahedron => 3,
        }
    }

    /// Tensor-product kinds (line, quadrilateral, hexahedron).
    pub fn is_hypercube(self) -> bool {
        matches!(
            self,
            ReferenceCell::Line | ReferenceCell::Quadrilateral | ReferenceCell::Hexahedron
        )
    }

    pub fn is_simplex(self) -> bool {
        matches!(
            self,
            ReferenceCell::Line | ReferenceCell::Triangle | ReferenceCell::Tetrahedron
        )
    }

    pub fn n_vertices(self) -> usize {
        match self {
            ReferenceCell::Vertex => 1,
            ReferenceCell::Line => 2,
            ReferenceCell::Triangle => 3,
            ReferenceCell::Quadrilateral | ReferenceCell::Tetrahedron => 4,
            ReferenceCell::Hexahedron => 8,
        }
    }

    pub fn n_lines(self) -> usize {
        match self {
            ReferenceCell::Vertex => 0,
            ReferenceCell::Line => 1,
            ReferenceCell::Triangle => 3,
            ReferenceCell::Quadrilateral => 4,
            ReferenceCell::Tetrahedron => 6,
            ReferenceCell::Hexahedron => 12,
        }
    }

    pub fn n_faces(self) -> usize {
        match self {
            ReferenceCell::Vertex => 0,
            ReferenceCell::Line => 2,
            ReferenceCell::Triangle => 3,
            ReferenceCell::Quadrilateral | ReferenceCell::Tetrahedron => 4,
            ReferenceCell::Hexahedron => 6,
        }
    }

    /// Number of children produced by isotropic refinement.
    pub fn n_isotropic_children(self) -> usize {
        match self {
            ReferenceCell::Vertex => 0,
            ReferenceCell::Line => 2,
            ReferenceCell::Triangle | ReferenceCell::Quadrilateral => 4,
            ReferenceCell::Tetrahedron | ReferenceCell::Hexahedron => 8,
        }
    }

    /// Reference cell of face `face_no`.
    pub fn face_reference_cell(self, _face_no: usize) -> ReferenceCell {
        match self {
            ReferenceCell::Vertex | ReferenceCell::Line => ReferenceCell::Vertex,
            ReferenceCell::Triangle | ReferenceCell::Quadrilateral => ReferenceCell::Line,
            ReferenceCell::Tetrahedron => ReferenceCell::Triangle,
            ReferenceCell::Hexahedron => ReferenceCell::Quadrilateral,
        }
    }

    /// Local vertex indices of face `face_no`, in the face's standard order.
    pub fn face_vertices(self, face_no: usize) -> &'static [usize] {
        match self {
            ReferenceCell::Vertex => &[],
            ReferenceCell::Line => LINE_FACES[face_no],
            ReferenceCell::Triangle => TRI_FACES[face_no],
            ReferenceCell::Quadrilateral => QUAD_FACES[face_no],
            ReferenceCell::Tetrahedron => TET_FACES[face_no],
            ReferenceCell::Hexahedron => HEX_FACES[face_no],
        }
    }

    /// Local vertex indices of line `line_no` (start, end).
    pub fn line_vertices(self, line_no: usize) -> [usize; 2] {
        match self {
            ReferenceCell::Vertex => [0, 0],
            ReferenceCell::Line => [0, 1],
            ReferenceCell::Triangle => TRI_LINES[line_no],
            ReferenceCell::Quadrilateral => QUAD_LINES[line_no],
            ReferenceCell::Tetrahedron => TET_LINES[line_no],
            ReferenceCell::Hexahedron => HEX_LINES[line_no],
        }
    }

    /// Bitmask (over local vertices) of the vertices of face `face_no`.
    pub fn face_vertex_mask(self, face_no: usize) -> u16 {
        self.face_vertices(face_no)
            .iter()
            .fold(0u16, |acc, &v| acc | (1 << v))
    }

    /// Bitmask (over local vertices) of the vertices of line `line_no`.
    pub fn line_vertex_mask(self, line_no: usize) -> u16 {
        let [a, b] = self.line_vertices(line_no);
        (1 << a) | (1 << b)
    }

    /// Mask with one bit per vertex.
    pub fn all_vertices_mask(self) -> u16 {
        ((1u32 << self.n_vertices()) - 1) as u16
    }

    /// Coordinates of vertex `v` on the unit reference cell.
    pub fn unit_vertex(self, v: usize) -> [f64; 3] {
        match self {
            ReferenceCell::Vertex => [0.0; 3],
            ReferenceCell::Line | ReferenceCell::Quadrilateral | ReferenceCell::Hexahedron => [
                (v & 1) as f64,
                ((v >> 1) & 1) as f64,
                ((v >> 2) & 1) as f64,
            ],
            ReferenceCell::Triangle | ReferenceCell::Tetrahedron => {
                let mut p = [0.0; 3];
                if v > 0 {
                    p[v - 1] = 1.0;
                }
                p
            }
        }
    }

    /// Number of distinct orientations a face of this kind can be seen with.
    pub fn n_face_orientations(self) -> u8 {
        match self {
            ReferenceCell::Vertex => 1,
            ReferenceCell::Line => 2,
            ReferenceCell::Triangle => 6,
            ReferenceCell::Quadrilateral => 8,
            _ => 1,
        }
    }

    fn ring(self) -> &'static [usize] {
        match self {
            ReferenceCell::Triangle => &TRI_RING,
            ReferenceCell::Quadrilateral => &QUAD_RING,
            _ => &[],
        }
    }

    /// Position of vertex `v` in this 2D cell's counter-clockwise ring.
    pub fn ring_position(self, v: usize) -> usize {
        self.ring().iter().position(|&r| r == v).unwrap_or(0)
    }

    /// Translate the standard face-local vertex `vertex` into the vertex index
    /// of the stored face object, for a face seen with `orientation`.
    ///
    /// `self` is the reference cell of the face.
    pub fn standard_to_real_face_vertex(self, vertex: usize, orientation: u8) -> usize {
        match self {
            ReferenceCell::Vertex => 0,
            ReferenceCell::Line => {
                if orientation & 1 == 0 {
                    vertex
                } else {
                    1 - vertex
                }
            }
            ReferenceCell::Triangle | ReferenceCell::Quadrilateral => {
                let ring = self.ring();
                let n = ring.len();
                let mut p = self.ring_position(vertex);
                if orientation & 1 == 1 {
                    p = (n - p) % n;
                }
                p = (p + (orientation >> 1) as usize) % n;
                ring[p]
            }
            _ => vertex,
        }
    }

    /// Inverse of [`Self::standard_to_real_face_vertex`].
    pub fn real_to_standard_face_vertex(self, vertex: usize, orientation: u8) -> usize {
        (0..self.n_vertices())
            .find(|&j| self.standard_to_real_face_vertex(j, orientation) == vertex)
            .unwrap_or(vertex)
    }

    /// Translate the standard face-local line `line` into the line index of
    /// the stored face object, together with whether the stored line runs
    /// against the standard direction.
    ///
    /// `self` is the reference cell of the face.
    pub fn standard_to_real_face_line(self, line: usize, orientation: u8) -> (usize, bool) {
        let [a, b] = self.line_vertices(line);
        let ra = self.standard_to_real_face_vertex(a, orientation);
        let rb = self.standard_to_real_face_vertex(b, orientation);
        for l in 0..self.n_lines() {
            let [x, y] = self.line_vertices(l);
            if x == ra && y == rb {
                return (l, false);
            }
            if x == rb && y == ra {
                return (l, true);
            }
        }
        (line, false)
    }

    /// Find the orientation under which a face object with vertex tuple
    /// `stored` is seen by a cell whose standard face vertex tuple is
    /// `expected`. `self` is the reference cell of the face.
    pub fn compute_orientation(self, expected: &[u32], stored: &[u32]) -> Option<u8> {
        let n = self.n_vertices();
        if expected.len() < n || stored.len() < n {
            return None;
        }
        (0..self.n_face_orientations()).find(|&o| {
            (0..n).all(|j| stored[self.standard_to_real_face_vertex(j, o)] == expected[j])
        })
    }

    /// Permutation taking the legacy (VTK, counter-clockwise) vertex order
    /// to the standard order: `standard[i] = legacy[perm[i]]`.
    pub fn legacy_to_standard(self) -> &'static [usize] {
        match self {
            ReferenceCell::Quadrilateral => &[0, 1, 3, 2],
            ReferenceCell::Hexahedron => &[0, 1, 3, 2, 4, 5, 7, 6],
            ReferenceCell::Vertex => &[0],
            ReferenceCell::Line => &[0, 1],
            ReferenceCell::Triangle => &[0, 1, 2],
            ReferenceCell::Tetrahedron => &[0, 1, 2, 3],
        }
    }

    /// Placeholder kind for unused slots of the given dimension.
    pub fn default_for(structdim: usize) -> ReferenceCell {
        match structdim {
            0 => ReferenceCell::Vertex,
            1 => ReferenceCell::Line,
            2 => ReferenceCell::Quadrilateral,
            _ => ReferenceCell::Hexahedron,
        }
    }

    /// Infer the kind of a `dim`-dimensional cell from its vertex count.
    pub fn from_vertex_count(dim: usize, n_vertices: usize) -> Option<ReferenceCell> {
        match (dim, n_vertices) {
            (0, 1) => Some(ReferenceCell::Vertex),
            (1, 2) => Some(ReferenceCell::Line),
            (2, 3) => Some(ReferenceCell::Triangle),
            (2, 4) => Some(ReferenceCell::Quadrilateral),
            (3, 4) => Some(ReferenceCell::Tetrahedron),
            (3, 8) => Some(ReferenceCell::Hexahedron),
            _ => None,
        }
    }

    /// Axis along which the edge between local vertices `a` and `b` of a
    /// tensor-product cell runs.
    pub fn edge_axis(a: usize, b: usize) -> usize {
        (a ^ b).trailing_zeros() as usize
    }
}
