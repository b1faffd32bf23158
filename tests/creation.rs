mod util;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tria_sieve::prelude::*;
use tria_sieve::topology::signals::Signal;
use tria_sieve::types::INTERNAL_FACE_BOUNDARY_ID;
use util::*;

#[test]
fn hex_grid_shares_faces_and_lines() {
    let tria = cube_grid(2, TriangulationSettings::default());
    assert_eq!(tria.n_active_cells(), 8);
    assert_eq!(tria.n_used_vertices(), 27);
    assert_eq!(tria.n_quads(), 36);
    assert_eq!(tria.n_lines(), 54);
    assert!(tria.validate_invariants().is_ok());

    let boundary = tria.face_iter().filter(|f| f.at_boundary()).count();
    assert_eq!(boundary, 24);
    let interior = tria
        .face_iter()
        .filter(|f| f.boundary_id() == INTERNAL_FACE_BOUNDARY_ID)
        .count();
    assert_eq!(interior, 12);
}

#[test]
fn neighbors_of_a_square_grid() {
    let tria = square_grid(2, TriangulationSettings::default());
    let c0 = tria.cell(CellId::new(0, 0)).unwrap();
    assert!(c0.at_boundary_face(0));
    assert!(c0.at_boundary_face(2));
    assert_eq!(c0.neighbor(1).unwrap().index(), 1);
    assert_eq!(c0.neighbor(3).unwrap().index(), 2);
    assert_eq!(c0.neighbor_of_neighbor(1).unwrap(), 0);
    assert_eq!(c0.neighbor_of_neighbor(3).unwrap(), 2);
    assert!((active_volume(&tria) - 4.0).abs() < 1e-12);
}

#[test]
fn one_dimensional_mesh_refines() {
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
    let cells = [CellData::new([0, 1]), CellData::new([1, 2])];
    let mut tria = Triangulation::new(1, 1).unwrap();
    tria.create_triangulation(&vertices, &cells, &SubCellData::default())
        .unwrap();
    assert_eq!(
        tria.cell(CellId::new(0, 0)).unwrap().neighbor(1).unwrap().id(),
        CellId::new(0, 1)
    );
    tria.refine_global(2).unwrap();
    assert_eq!(tria.n_active_cells(), 8);
    assert_eq!(tria.n_used_vertices(), 9);
    assert!((active_volume(&tria) - 2.0).abs() < 1e-12);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn triangles_share_their_diagonal() {
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
    let cells = [CellData::new([0, 1, 2]), CellData::new([1, 3, 2])];
    let mut tria = Triangulation::new(2, 2).unwrap();
    tria.create_triangulation(&vertices, &cells, &SubCellData::default())
        .unwrap();
    assert_eq!(tria.n_lines(), 5);
    assert_eq!(tria.reference_cells(), &[ReferenceCell::Triangle]);
    tria.refine_global(1).unwrap();
    assert_eq!(tria.n_active_cells(), 8);
    assert_eq!(tria.n_used_vertices(), 9);
    assert!((active_volume(&tria) - 1.0).abs() < 1e-12);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn boundary_ids_from_subcell_data_reach_children() {
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
    let sub = SubCellData {
        boundary_lines: vec![SubCellEntry::new([0, 1], 4)],
        boundary_quads: vec![],
    };
    let mut tria = Triangulation::new(2, 2).unwrap();
    tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &sub)
        .unwrap();
    tria.refine_global(1).unwrap();
    let on_bottom: Vec<_> = tria
        .active_line_iter()
        .filter(|l| l.vertex(0)[1] == 0.0 && l.vertex(1)[1] == 0.0)
        .map(|l| l.boundary_id())
        .collect();
    assert_eq!(on_bottom, vec![4, 4]);
}

#[test]
fn boundary_id_on_interior_face_is_rejected() {
    let vertices = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [2.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [2.0, 1.0, 0.0],
    ];
    let cells = [CellData::new([0, 1, 3, 4]), CellData::new([1, 2, 4, 5])];
    let sub = SubCellData {
        boundary_lines: vec![SubCellEntry::new([1, 4], 3)],
        boundary_quads: vec![],
    };
    let mut tria = Triangulation::new(2, 2).unwrap();
    let err = tria.create_triangulation(&vertices, &cells, &sub).unwrap_err();
    assert!(matches!(err, MeshError::BoundaryIdOnInternalFace { .. }));
    assert!(tria.is_empty());
}

#[test]
fn create_signal_fires_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut tria = Triangulation::new(2, 2).unwrap();
    let seen = Arc::clone(&count);
    tria.signals_mut().connect(Signal::Create, move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
    tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default())
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn second_creation_requires_clear() {
    let mut tria = unit_square(TriangulationSettings::default());
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
    let again =
        tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default());
    assert!(matches!(again, Err(MeshError::InvalidInput(_))));
    tria.clear();
    assert!(tria.is_empty());
    tria.create_triangulation(&vertices, &[CellData::new([0, 1, 2, 3])], &SubCellData::default())
        .unwrap();
    assert_eq!(tria.n_active_cells(), 1);
}

#[test]
fn cell_list_reads_from_json() {
    let json = r#"[{"vertices":[0,1,2,3],"material_id":5}]"#;
    let cells: Vec<CellData> = serde_json::from_str(json).unwrap();
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
    let mut tria = Triangulation::new(2, 2).unwrap();
    tria.create_triangulation(&vertices, &cells, &SubCellData::default())
        .unwrap();
    tria.refine_global(1).unwrap();
    assert!(tria.active_cell_iter().all(|c| c.material_id() == 5));
}
