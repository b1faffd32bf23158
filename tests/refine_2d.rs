mod util;

use std::sync::{Arc, Mutex};
use tria_sieve::prelude::*;
use tria_sieve::topology::signals::{CellSignal, Signal};
use tria_sieve::types::INTERNAL_FACE_BOUNDARY_ID;
use util::*;

#[test]
fn uniform_refinement_of_one_quad() {
    let mut tria = unit_square(TriangulationSettings::default());
    tria.refine_global(1).unwrap();

    assert_eq!(tria.n_active_cells(), 4);
    assert_eq!(tria.n_levels(), 2);
    assert_eq!(tria.n_used_vertices(), 9);
    assert_eq!(tria.n_active_lines(), 12);

    let (outer, inner): (Vec<_>, Vec<_>) = tria.active_line_iter().partition(|l| l.at_boundary());
    assert_eq!(outer.len(), 8);
    assert!(outer.iter().all(|l| l.boundary_id() == 0));
    assert_eq!(inner.len(), 4);
    assert!(inner.iter().all(|l| l.boundary_id() == INTERNAL_FACE_BOUNDARY_ID));

    let parent = tria.cell(CellId::new(0, 0)).unwrap();
    assert_eq!(parent.refinement_case(), RefinementCase::CUT_XY);
    let centers: Vec<_> = parent.children().map(|c| c.center()).collect();
    assert_eq!(
        centers,
        vec![
            [0.25, 0.25, 0.0],
            [0.75, 0.25, 0.0],
            [0.25, 0.75, 0.0],
            [0.75, 0.75, 0.0]
        ]
    );
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn anisotropic_then_complementary_cut_matches_isotropic_topology() {
    let mut tria = unit_square(TriangulationSettings::default());
    tria.set_refine_flag(CellId::new(0, 0), RefinementCase::CUT_X)
        .unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 2);
    assert_eq!(tria.n_used_vertices(), 6);

    let children: Vec<_> = tria.active_cell_iter().map(|c| c.id()).collect();
    for c in children {
        tria.set_refine_flag(c, RefinementCase::CUT_Y).unwrap();
    }
    tria.execute_coarsening_and_refinement().unwrap();

    assert_eq!(tria.n_active_cells(), 4);
    assert_eq!(tria.n_used_vertices(), 9);
    assert_eq!(tria.n_active_lines(), 12);
    assert!(tria.active_cell_iter().all(|c| (c.measure() - 0.25).abs() < 1e-12));
    assert_used_vertices_distinct(&tria);
    assert!(tria.validate_invariants().is_ok());

    for cell in tria.active_cell_iter() {
        for f in 0..cell.n_faces() {
            if let Some(n) = cell.neighbor(f) {
                if n.level() == cell.level() {
                    let g = cell.neighbor_of_neighbor(f).unwrap();
                    assert_eq!(n.neighbor(g).unwrap().id(), cell.id());
                }
            }
        }
    }
}

#[test]
fn hanging_faces_resolve_between_levels() {
    let mut tria = square_grid(2, TriangulationSettings::default());
    tria.set_isotropic_refine_flag(CellId::new(0, 0)).unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 7);

    let coarse = tria.cell(CellId::new(0, 1)).unwrap();
    let fine = coarse.neighbor(0).unwrap();
    assert_eq!(fine.id(), CellId::new(0, 0));
    assert!(fine.has_children());

    let mut adjacent: Vec<_> = (0..2)
        .map(|s| coarse.neighbor_child_on_subface(0, s).unwrap())
        .collect();
    for child in &adjacent {
        assert_eq!(child.neighbor(1).unwrap().id(), coarse.id());
        let (face, sub) = child.neighbor_of_coarser_neighbor(1).unwrap();
        assert_eq!(face, 0);
        assert_eq!(coarse.neighbor_child_on_subface(0, sub).unwrap().id(), child.id());
    }
    adjacent.sort_by_key(|c| c.index());
    let parent = tria.cell(CellId::new(0, 0)).unwrap();
    let expected = [parent.child(1).unwrap().id(), parent.child(3).unwrap().id()];
    let mut expected = expected.to_vec();
    expected.sort();
    assert_eq!(adjacent.iter().map(|c| c.id()).collect::<Vec<_>>(), expected);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn refinement_signals_fire_in_order() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut tria = unit_square(TriangulationSettings::default());
    for (signal, name) in [
        (Signal::PreRefinement, "pre"),
        (Signal::PostRefinement, "post"),
        (Signal::AnyChange, "any"),
    ] {
        let log = Arc::clone(&log);
        tria.signals_mut().connect(signal, move || {
            log.lock().unwrap().push(name.to_string());
        });
    }
    let cell_log = Arc::clone(&log);
    tria.signals_mut()
        .connect_cell(CellSignal::PostRefinementOnCell, move |c| {
            cell_log.lock().unwrap().push(format!("cell {c}"));
        });

    tria.refine_global(1).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["pre", "cell 0.0", "post", "any"]
    );
}

#[test]
fn max_refinement_level_caps_global_refinement() {
    let settings = TriangulationSettings {
        max_refinement_level: Some(1),
        ..Default::default()
    };
    let mut tria = unit_square(settings);
    tria.refine_global(3).unwrap();
    assert_eq!(tria.n_levels(), 2);
    assert_eq!(tria.n_active_cells(), 4);
}

#[test]
fn flags_on_inactive_cells_are_rejected() {
    let mut tria = unit_square(TriangulationSettings::default());
    tria.refine_global(1).unwrap();
    let parent = CellId::new(0, 0);
    assert!(tria.set_isotropic_refine_flag(parent).is_err());
    assert!(tria.set_coarsen_flag(parent).is_err());
    assert!(matches!(
        tria.cell(CellId::new(4, 0)),
        Err(MeshError::InvalidLevel { level: 4, n_levels: 2 })
    ));
}

#[test]
fn crossing_anisotropic_cuts_see_coarser_faces() {
    let mut tria = square_grid(2, TriangulationSettings::default());
    let cases = [
        RefinementCase::CUT_X,
        RefinementCase::CUT_Y,
        RefinementCase::CUT_X,
        RefinementCase::CUT_Y,
    ];
    for (i, case) in cases.into_iter().enumerate() {
        tria.set_refine_flag(CellId::new(0, i), case).unwrap();
    }
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 8);
    assert!(tria.validate_invariants().is_ok());

    // lower half of the right bottom cell looks at the whole face x = 1
    let lower = tria.cell(active_cell_at(&tria, [1.5, 0.25, 0.0])).unwrap();
    assert_eq!(lower.level(), 1);
    let across = lower.neighbor(0).unwrap();
    assert_eq!(across.level(), 1);
    assert!(lower.neighbor_is_coarser(0).unwrap());
    assert!(lower.neighbor_of_neighbor(0).is_err());
    let (face, sub) = lower.neighbor_of_coarser_neighbor(0).unwrap();
    assert_eq!(face, 1);
    let right = tria.cell(CellId::new(0, 1)).unwrap();
    assert_eq!(right.neighbor_child_on_subface(0, sub).unwrap().id(), across.id());

    // the coarse side sees the face whole and points at the level-0 owner
    assert!(!across.neighbor_is_coarser(1).unwrap());
    assert_eq!(across.neighbor(1).unwrap().id(), CellId::new(0, 1));
    assert_eq!(across.neighbor_of_neighbor(1).unwrap(), 0);

    // splitting the half again forces the coarser side to follow
    let (lower_id, across_id) = (lower.id(), across.id());
    tria.set_refine_flag(lower_id, RefinementCase::CUT_Y).unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert!(tria.cell(across_id).unwrap().has_children());
    assert_eq!(tria.n_active_cells(), 12);
    assert!((active_volume(&tria) - 4.0).abs() < 1e-12);
    assert!(tria.validate_invariants().is_ok());
}
