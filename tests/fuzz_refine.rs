mod util;

use proptest::prelude::*;
use tria_sieve::prelude::*;
use util::*;

/// Apply one refinement step: active cell `k` gets case `cases[k % len]`
/// (zero means no flag), then execute.
fn step(tria: &mut Triangulation, cases: &[u8]) {
    let active: Vec<CellId> = tria.active_cell_iter().map(|c| c.id()).collect();
    for (c, &raw) in active.iter().zip(cases.iter().cycle()) {
        if raw != 0 {
            tria.set_refine_flag(*c, RefinementCase::from_u8(raw)).unwrap();
        }
    }
    tria.execute_coarsening_and_refinement().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_hex_cases_keep_the_store_consistent(
        steps in prop::collection::vec(prop::collection::vec(0u8..8, 1..6), 1..4)
    ) {
        let mut tria = cube_grid(1, TriangulationSettings::default());
        for cases in &steps {
            step(&mut tria, cases);
            prop_assert!(tria.validate_invariants().is_ok());
            prop_assert!((active_volume(&tria) - 1.0).abs() < 1e-9);
            assert_used_vertices_distinct(&tria);
        }
    }

    #[test]
    fn random_quad_cases_with_coarsening(
        steps in prop::collection::vec(prop::collection::vec(0u8..4, 1..8), 1..5),
        coarsen_every in 2usize..5,
    ) {
        let mut tria = square_grid(2, TriangulationSettings::default());
        for (n, cases) in steps.iter().enumerate() {
            step(&mut tria, cases);
            if n % coarsen_every == 1 {
                let active: Vec<CellId> = tria.active_cell_iter().map(|c| c.id()).collect();
                for c in active.into_iter().filter(|c| c.level() > 0) {
                    tria.set_coarsen_flag(c).unwrap();
                }
                tria.execute_coarsening_and_refinement().unwrap();
            }
            prop_assert!(tria.validate_invariants().is_ok());
            prop_assert!((active_volume(&tria) - 4.0).abs() < 1e-9);
            assert_used_vertices_distinct(&tria);
        }
    }

    #[test]
    fn anisotropic_smoothing_keeps_hexes_consistent(
        cases in prop::collection::vec(0u8..8, 1..9)
    ) {
        let mut tria = cube_grid(2, settings(
            MeshSmoothing::SMOOTHING_ON_REFINEMENT | MeshSmoothing::ALLOW_ANISOTROPIC_SMOOTHING,
        ));
        step(&mut tria, &cases);
        step(&mut tria, &cases);
        prop_assert!(tria.validate_invariants().is_ok());
        prop_assert!((active_volume(&tria) - 8.0).abs() < 1e-9);
        prop_assert!(tria.max_line_refinement_depth() <= 1);
        assert_used_vertices_distinct(&tria);
    }
}
