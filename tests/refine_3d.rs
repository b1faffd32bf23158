mod util;

use tria_sieve::prelude::*;
use util::*;

fn two_hexes_along_x() -> Triangulation {
    let mut vertices = Vec::new();
    for k in 0..2 {
        for j in 0..2 {
            for i in 0..3 {
                vertices.push([i as f64, j as f64, k as f64]);
            }
        }
    }
    let v = |i: u32, j: u32, k: u32| (k * 2 + j) * 3 + i;
    let hex = |i: u32| {
        CellData::new([
            v(i, 0, 0),
            v(i + 1, 0, 0),
            v(i, 1, 0),
            v(i + 1, 1, 0),
            v(i, 0, 1),
            v(i + 1, 0, 1),
            v(i, 1, 1),
            v(i + 1, 1, 1),
        ])
    };
    let mut tria = Triangulation::new(3, 3).unwrap();
    tria.create_triangulation(&vertices, &[hex(0), hex(1)], &SubCellData::default())
        .unwrap();
    tria
}

#[test]
fn uniform_refinement_of_one_hex() {
    let mut tria = cube_grid(1, TriangulationSettings::default());
    tria.refine_global(1).unwrap();
    assert_eq!(tria.n_active_cells(), 8);
    assert_eq!(tria.n_used_vertices(), 27);
    assert_eq!(tria.n_active_quads(), 36);
    assert_eq!(tria.n_active_lines(), 54);
    assert!((active_volume(&tria) - 1.0).abs() < 1e-12);
    assert!(tria.validate_invariants().is_ok());

    tria.refine_global(1).unwrap();
    assert_eq!(tria.n_active_cells(), 64);
    assert_eq!(tria.n_used_vertices(), 125);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn edge_shared_by_diagonal_hexes_pulls_in_its_ring() {
    let mut tria = cube_grid(2, settings(MeshSmoothing::SMOOTHING_ON_REFINEMENT));
    tria.set_isotropic_refine_flag(CellId::new(0, 0)).unwrap();
    tria.set_isotropic_refine_flag(CellId::new(0, 3)).unwrap();
    assert!(tria.prepare_coarsening_and_refinement().unwrap());
    for i in 0..4 {
        assert!(tria.refine_flag(CellId::new(0, i)).unwrap().is_refined(), "hex {i}");
    }
    for i in 4..8 {
        assert!(!tria.refine_flag(CellId::new(0, i)).unwrap().is_refined(), "hex {i}");
    }

    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 8 - 4 + 4 * 8);
    assert_eq!(tria.max_line_refinement_depth(), 1);
    assert!(tria.max_vertex_level_difference() <= 1);
    assert!((active_volume(&tria) - 8.0).abs() < 1e-9);
    assert_used_vertices_distinct(&tria);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn anisotropic_hex_then_isotropic_children() {
    let mut tria = cube_grid(1, TriangulationSettings::default());
    tria.set_refine_flag(CellId::new(0, 0), RefinementCase::CUT_X)
        .unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 2);
    assert_eq!(tria.n_used_vertices(), 12);

    tria.set_all_refine_flags();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 16);
    assert_eq!(tria.n_used_vertices(), 45);
    assert_eq!(tria.max_line_refinement_depth(), 0);
    assert!(tria.active_cell_iter().all(|c| (c.measure() - 1.0 / 16.0).abs() < 1e-12));
    assert_used_vertices_distinct(&tria);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn crossing_anisotropic_cuts_on_a_shared_face() {
    let mut tria = two_hexes_along_x();
    tria.set_refine_flag(CellId::new(0, 0), RefinementCase::CUT_Y)
        .unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    let half = tria.cell(CellId::new(0, 0)).unwrap().child(0).unwrap();
    assert_eq!(half.neighbor(1).unwrap().id(), CellId::new(0, 1));
    assert!(half.neighbor_is_coarser(1).unwrap());
    assert_eq!(half.neighbor_of_coarser_neighbor(1).unwrap().0, 0);
    assert!(tria.validate_invariants().is_ok());

    // the crossing cut is upgraded so the shared face splits into quarters
    tria.set_refine_flag(CellId::new(0, 1), RefinementCase::CUT_Z)
        .unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 6);
    let right = tria.cell(CellId::new(0, 1)).unwrap();
    assert_eq!(right.refinement_case(), RefinementCase::CUT_YZ);
    for child in right.children() {
        assert!(child.neighbor_is_coarser(0).unwrap());
        let (face, _) = child.neighbor_of_coarser_neighbor(0).unwrap();
        assert_eq!(face, 1);
        assert_eq!(child.neighbor(0).unwrap().level(), 1);
    }

    assert!((active_volume(&tria) - 2.0).abs() < 1e-12);
    assert_used_vertices_distinct(&tria);
    assert!(tria.validate_invariants().is_ok());

    tria.set_all_refine_flags();
    tria.execute_coarsening_and_refinement().unwrap();
    assert!((active_volume(&tria) - 2.0).abs() < 1e-12);
    assert_used_vertices_distinct(&tria);
    assert!(tria.validate_invariants().is_ok());
}

/// Two hexes along x; the right one is numbered with its local y axis
/// along global z, so it sees the shared face rotated.
fn rotated_pair_of_hexes() -> Triangulation {
    let mut vertices = Vec::new();
    for k in 0..2 {
        for j in 0..2 {
            for i in 0..3 {
                vertices.push([i as f64, j as f64, k as f64]);
            }
        }
    }
    let v = |i: u32, j: u32, k: u32| (k * 2 + j) * 3 + i;
    let left = CellData::new([
        v(0, 0, 0),
        v(1, 0, 0),
        v(0, 1, 0),
        v(1, 1, 0),
        v(0, 0, 1),
        v(1, 0, 1),
        v(0, 1, 1),
        v(1, 1, 1),
    ]);
    let right: Vec<u32> = (0..8u32)
        .map(|n| v(1 + (n & 1), 1 - (n >> 2), (n >> 1) & 1))
        .collect();
    let mut tria = Triangulation::new(3, 3).unwrap();
    tria.create_triangulation(&vertices, &[left, CellData::new(right)], &SubCellData::default())
        .unwrap();
    tria
}

/// Each cell's face orientation maps its face vertices onto the stored
/// face, and going through one neighbor's orientation and back through the
/// other's lands on the same vertex.
fn assert_faces_seen_consistently(tria: &Triangulation) {
    let hex = ReferenceCell::Hexahedron;
    let quad = ReferenceCell::Quadrilateral;
    for cell in tria.cell_iter() {
        for f in 0..6 {
            let o = cell.face_orientation(f).raw();
            let stored = cell.face(f).vertex_indices();
            let own = |j: usize| cell.vertex_index(hex.face_vertices(f)[j]) as u32;
            for j in 0..4 {
                assert_eq!(stored[quad.standard_to_real_face_vertex(j, o)], own(j));
                let back = quad.real_to_standard_face_vertex(quad.standard_to_real_face_vertex(j, o), o);
                assert_eq!(back, j);
            }
            let Some(n) = cell.neighbor(f) else { continue };
            if cell.neighbor_is_coarser(f).unwrap() {
                continue;
            }
            let g = cell.neighbor_of_neighbor(f).unwrap();
            assert_eq!(n.face_index(g), cell.face_index(f));
            let on = n.face_orientation(g).raw();
            for j in 0..4 {
                let k = quad.real_to_standard_face_vertex(quad.standard_to_real_face_vertex(j, o), on);
                assert_eq!(n.vertex_index(hex.face_vertices(g)[k]) as u32, own(j));
            }
        }
    }
}

#[test]
fn rotated_coarse_face_keeps_orientations_consistent() {
    let mut tria = rotated_pair_of_hexes();
    let left = tria.cell(CellId::new(0, 0)).unwrap();
    let right = tria.cell(CellId::new(0, 1)).unwrap();
    assert_eq!(left.neighbor(1).unwrap().id(), right.id());
    assert_eq!(right.neighbor(0).unwrap().id(), left.id());
    assert_eq!(right.neighbor_of_neighbor(0).unwrap(), 1);
    assert!(!(left.face_orientation(1).is_standard() && right.face_orientation(0).is_standard()));
    assert_faces_seen_consistently(&tria);

    // local y of the right hex is global z, so the two cuts cross on the
    // shared face and both cells split it into quarters
    tria.set_refine_flag(CellId::new(0, 0), RefinementCase::CUT_Y)
        .unwrap();
    tria.set_refine_flag(CellId::new(0, 1), RefinementCase::CUT_Y)
        .unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 8);
    assert!((active_volume(&tria) - 2.0).abs() < 1e-12);
    assert_used_vertices_distinct(&tria);
    assert_faces_seen_consistently(&tria);
    assert!(tria.validate_invariants().is_ok());

    tria.refine_global(1).unwrap();
    assert!((active_volume(&tria) - 2.0).abs() < 1e-12);
    assert_used_vertices_distinct(&tria);
    assert_faces_seen_consistently(&tria);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn tetrahedron_refines_into_eight() {
    let vertices = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    let mut tria = Triangulation::new(3, 3).unwrap();
    tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default())
        .unwrap();
    assert_eq!(tria.reference_cells(), &[ReferenceCell::Tetrahedron]);
    tria.refine_global(1).unwrap();
    assert_eq!(tria.n_active_cells(), 8);
    assert_eq!(tria.n_used_vertices(), 10);
    assert!((active_volume(&tria) - 1.0 / 6.0).abs() < 1e-12);
    assert!(tria.active_cell_iter().all(|c| c.measure() > 0.0));
    assert!(tria.validate_invariants().is_ok());
}
