mod util;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tria_sieve::prelude::*;
use util::*;

fn refine_at(tria: &mut Triangulation, p: [f64; 3]) {
    let cell = active_cell_at(tria, p);
    tria.set_isotropic_refine_flag(cell).unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
}

#[test]
fn without_vertex_rule_corner_neighbors_drift_two_levels() {
    let mut tria = square_grid(2, TriangulationSettings::default());
    refine_at(&mut tria, [1.0, 1.0, 0.0]);
    refine_at(&mut tria, [1.0, 1.0, 0.0]);
    assert_eq!(tria.max_vertex_level_difference(), 2);
    assert!(tria.validate_invariants().is_ok());
}

#[test]
fn vertex_rule_keeps_levels_balanced() {
    let mut tria = square_grid(
        2,
        settings(MeshSmoothing::LIMIT_LEVEL_DIFFERENCE_AT_VERTICES),
    );
    for _ in 0..4 {
        refine_at(&mut tria, [1.0, 1.0, 0.0]);
        assert!(tria.max_vertex_level_difference() <= 1);
        assert!(tria.validate_invariants().is_ok());
    }
    assert_eq!(tria.n_levels(), 5);
}

#[test]
fn unrefined_island_is_filled() {
    let mut tria = square_grid(3, settings(MeshSmoothing::ELIMINATE_UNREFINED_ISLANDS));
    for i in [1, 3] {
        tria.set_isotropic_refine_flag(CellId::new(0, i)).unwrap();
    }
    tria.prepare_coarsening_and_refinement().unwrap();
    // the corner cell has no other neighbors, the center cell two more
    assert!(tria.refine_flag(CellId::new(0, 0)).unwrap().is_refined());
    assert!(!tria.refine_flag(CellId::new(0, 4)).unwrap().is_refined());
}

#[test]
fn patch_level_one_refines_whole_patches() {
    let mut tria = unit_square(settings(MeshSmoothing::PATCH_LEVEL_1));
    tria.refine_global(1).unwrap();
    tria.set_isotropic_refine_flag(CellId::new(1, 0)).unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 16);
}

#[test]
fn patch_level_one_never_coarsens_to_level_zero() {
    let mut tria = unit_square(settings(MeshSmoothing::PATCH_LEVEL_1));
    tria.refine_global(1).unwrap();
    let children: Vec<CellId> = tria.active_cell_iter().map(|c| c.id()).collect();
    for c in children {
        tria.set_coarsen_flag(c).unwrap();
    }
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_levels(), 2);
    assert_eq!(tria.n_active_cells(), 4);
}

#[test]
fn coarsest_level_one_does_not_refine_untouched_cells() {
    let mut tria = square_grid(2, settings(MeshSmoothing::COARSEST_LEVEL_1));
    tria.set_isotropic_refine_flag(CellId::new(0, 0)).unwrap();
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 7);
    tria.execute_coarsening_and_refinement().unwrap();
    assert_eq!(tria.n_active_cells(), 7);
}

#[test]
fn coarsest_level_one_keeps_first_refinement() {
    let mut tria = square_grid(2, settings(MeshSmoothing::COARSEST_LEVEL_1));
    tria.refine_global(1).unwrap();
    tria.coarsen_global().unwrap();
    assert_eq!(tria.n_active_cells(), 16);
    assert_eq!(tria.n_levels(), 2);
}

#[test]
fn preparation_reaches_a_fixpoint() {
    for smoothing in [MeshSmoothing::NONE, MeshSmoothing::SMOOTHING_ON_REFINEMENT] {
        for seed in 0..8u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut tria = square_grid(4, settings(smoothing));
            tria.refine_global(1).unwrap();
            for _ in 0..3 {
                let active: Vec<CellId> = tria.active_cell_iter().map(|c| c.id()).collect();
                for c in active {
                    let roll: f64 = rng.r#gen();
                    if roll < 0.15 {
                        tria.set_isotropic_refine_flag(c).unwrap();
                    } else if roll < 0.45 && c.level() > 0 {
                        tria.set_coarsen_flag(c).unwrap();
                    }
                }
                tria.prepare_coarsening_and_refinement().unwrap();
                assert!(
                    !tria.prepare_coarsening_and_refinement().unwrap(),
                    "seed {seed}, {smoothing:?}"
                );
                tria.execute_coarsening_and_refinement().unwrap();
                assert!((active_volume(&tria) - 16.0).abs() < 1e-9);
                assert!(tria.validate_invariants().is_ok(), "seed {seed}, {smoothing:?}");
            }
        }
    }
}

#[test]
fn maximum_smoothing_keeps_the_mesh_valid() {
    let mut rng = SmallRng::seed_from_u64(17);
    let mut tria = cube_grid(2, settings(MeshSmoothing::MAXIMUM_SMOOTHING));
    tria.refine_global(1).unwrap();
    for _ in 0..2 {
        let active: Vec<CellId> = tria.active_cell_iter().map(|c| c.id()).collect();
        for c in active {
            let roll: f64 = rng.r#gen();
            if roll < 0.1 {
                tria.set_isotropic_refine_flag(c).unwrap();
            } else if roll < 0.4 {
                tria.set_coarsen_flag(c).unwrap();
            }
        }
        tria.execute_coarsening_and_refinement().unwrap();
        assert!((active_volume(&tria) - 8.0).abs() < 1e-9);
        assert!(tria.validate_invariants().is_ok());
    }
}
