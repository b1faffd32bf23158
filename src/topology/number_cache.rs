//! Cached object counts.
//!
//! Cells are counted per level; lines (in 2D and 3D) and quads (in 3D) are
//! level-less and only have global counts. The cache is rebuilt by a linear
//! scan after every mutation. With the `rayon` feature the face counts are
//! computed on a background task while the cell levels are scanned.

use crate::topology::store::{TriaLevel, TriaObjects};

/// Used/active counts of one object kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectCounts {
    pub n_used: usize,
    pub n_active: usize,
    /// Per-level counts; empty for level-less objects.
    pub n_used_per_level: Vec<usize>,
    pub n_active_per_level: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NumberCache {
    pub n_levels: usize,
    pub n_used_vertices: usize,
    pub lines: ObjectCounts,
    pub quads: ObjectCounts,
    pub hexes: ObjectCounts,
}

impl NumberCache {
    /// Counts of the cells of a `dim`-dimensional mesh.
    pub fn cells(&self, dim: usize) -> &ObjectCounts {
        match dim {
            1 => &self.lines,
            2 => &self.quads,
            _ => &self.hexes,
        }
    }
}

fn count_objects(objects: &TriaObjects) -> ObjectCounts {
    let mut c = ObjectCounts::default();
    for i in 0..objects.len() {
        if objects.used[i] {
            c.n_used += 1;
            if !objects.has_children(i) {
                c.n_active += 1;
            }
        }
    }
    c
}

fn count_levels(levels: &[TriaLevel]) -> ObjectCounts {
    let mut c = ObjectCounts::default();
    for level in levels {
        let l = count_objects(&level.cells);
        c.n_used += l.n_used;
        c.n_active += l.n_active;
        c.n_used_per_level.push(l.n_used);
        c.n_active_per_level.push(l.n_active);
    }
    c
}

/// Rebuild the cache from the stores.
pub fn compute_number_cache(
    dim: usize,
    levels: &[TriaLevel],
    lines: &TriaObjects,
    quads: &TriaObjects,
    vertices_used: &[bool],
) -> NumberCache {
    let faces = || {
        let l = if dim >= 2 { count_objects(lines) } else { ObjectCounts::default() };
        let q = if dim == 3 { count_objects(quads) } else { ObjectCounts::default() };
        (l, q)
    };
    #[cfg(feature = "rayon")]
    let (cells, (face_lines, face_quads)) = rayon::join(|| count_levels(levels), faces);
    #[cfg(not(feature = "rayon"))]
    let (cells, (face_lines, face_quads)) = (count_levels(levels), faces());

    let mut cache = NumberCache {
        n_levels: levels.len(),
        n_used_vertices: vertices_used.iter().filter(|&&u| u).count(),
        ..Default::default()
    };
    match dim {
        1 => cache.lines = cells,
        2 => {
            cache.lines = face_lines;
            cache.quads = cells;
        }
        _ => {
            cache.lines = face_lines;
            cache.quads = face_quads;
            cache.hexes = cells;
        }
    }
    log::trace!(
        "number cache: {} levels, {} active cells, {} used vertices",
        cache.n_levels,
        cache.cells(dim).n_active,
        cache.n_used_vertices
    );
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_used_and_active_per_level() {
        let mut l0 = TriaLevel::new(2);
        l0.reserve_for_cells(2, false);
        l0.cells.used[0] = true;
        l0.cells.used[1] = true;
        l0.cells.children[0] = 0;
        l0.cells.refinement_cases[0] = crate::topology::refinement_case::RefinementCase::CUT_X;
        let mut l1 = TriaLevel::new(2);
        l1.reserve_for_cells(2, false);
        l1.cells.used[0] = true;
        l1.cells.used[1] = true;
        let lines = TriaObjects::new(1);
        let quads = TriaObjects::new(2);
        let cache = compute_number_cache(2, &[l0, l1], &lines, &quads, &[true, false, true]);
        assert_eq!(cache.n_levels, 2);
        assert_eq!(cache.quads.n_used, 4);
        assert_eq!(cache.quads.n_active, 3);
        assert_eq!(cache.quads.n_active_per_level, vec![1, 2]);
        assert_eq!(cache.n_used_vertices, 2);
    }
}
