//! Vertex-keyed lookup of lines and faces.
//!
//! Two objects of the same dimension never share their vertex set, so the
//! sorted vertex tuple is a unique key. Creation uses the maps to dedupe
//! shared lines and faces; refinement uses them to find the already-refined
//! pieces of a parent's boundary and to find-or-create interior objects.

use crate::topology::store::TriaFaces;
use crate::types::INVALID_UNSIGNED_INT;
use hashbrown::HashMap;

pub type LineKey = [u32; 2];
pub type FaceKey = [u32; 4];

#[inline]
pub fn line_key(a: u32, b: u32) -> LineKey {
    if a <= b { [a, b] } else { [b, a] }
}

/// Sorted key for a triangle or quadrilateral; triangles are padded with
/// `INVALID_UNSIGNED_INT`.
pub fn face_key(vertices: &[u32]) -> FaceKey {
    let mut k = [INVALID_UNSIGNED_INT; 4];
    k[..vertices.len()].copy_from_slice(vertices);
    k.sort_unstable();
    k
}

/// Lookup tables over the used lines and (3D) quads.
#[derive(Clone, Debug, Default)]
pub struct Connectivity {
    lines: HashMap<LineKey, u32>,
    quads: HashMap<FaceKey, u32>,
}

impl Connectivity {
    /// Index every used line and quad of `faces`.
    pub fn build(faces: &TriaFaces) -> Self {
        let mut c = Connectivity::default();
        for i in 0..faces.lines.len() {
            if faces.lines.used[i] {
                let v = faces.lines.vertices_of(i);
                c.lines.insert(line_key(v[0], v[1]), i as u32);
            }
        }
        for i in 0..faces.quads.len() {
            if faces.quads.used[i] {
                c.quads.insert(face_key(faces.quads.vertices_of(i)), i as u32);
            }
        }
        c
    }

    #[inline]
    pub fn line(&self, a: u32, b: u32) -> Option<usize> {
        self.lines.get(&line_key(a, b)).map(|&i| i as usize)
    }

    #[inline]
    pub fn quad(&self, vertices: &[u32]) -> Option<usize> {
        self.quads.get(&face_key(vertices)).map(|&i| i as usize)
    }

    pub fn insert_line(&mut self, a: u32, b: u32, index: usize) {
        self.lines.insert(line_key(a, b), index as u32);
    }

    pub fn insert_quad(&mut self, vertices: &[u32], index: usize) {
        self.quads.insert(face_key(vertices), index as u32);
    }

    pub fn remove_line(&mut self, a: u32, b: u32) {
        self.lines.remove(&line_key(a, b));
    }

    pub fn remove_quad(&mut self, vertices: &[u32]) {
        self.quads.remove(&face_key(vertices));
    }

    pub fn n_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn n_quads(&self) -> usize {
        self.quads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_vertex_order() {
        assert_eq!(line_key(5, 2), line_key(2, 5));
        assert_eq!(face_key(&[4, 1, 3, 2]), face_key(&[1, 2, 3, 4]));
        assert_eq!(face_key(&[9, 3, 7])[3], INVALID_UNSIGNED_INT);
    }

    #[test]
    fn lookup_after_insert_and_remove() {
        let mut c = Connectivity::default();
        c.insert_line(3, 1, 7);
        c.insert_quad(&[0, 1, 2, 3], 2);
        assert_eq!(c.line(1, 3), Some(7));
        assert_eq!(c.quad(&[3, 2, 1, 0]), Some(2));
        c.remove_line(1, 3);
        assert_eq!(c.line(3, 1), None);
        assert_eq!(c.n_quads(), 1);
    }
}
