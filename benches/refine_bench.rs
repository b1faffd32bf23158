use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tria_sieve::prelude::*;

fn grid(dim: usize, n: usize) -> Triangulation {
    let nodes = n + 1;
    let count = nodes.pow(dim as u32);
    let vertices: Vec<Point> = (0..count)
        .map(|k| {
            let mut p = [0.0; 3];
            let mut rest = k;
            for x in p.iter_mut().take(dim) {
                *x = (rest % nodes) as f64;
                rest /= nodes;
            }
            p
        })
        .collect();
    let corners_of = |origin: usize| -> Vec<u32> {
        (0..1usize << dim)
            .map(|c| {
                let mut v = origin;
                let mut stride = 1;
                for d in 0..dim {
                    if c & (1 << d) != 0 {
                        v += stride;
                    }
                    stride *= nodes;
                }
                v as u32
            })
            .collect()
    };
    let cells: Vec<CellData> = (0..n.pow(dim as u32))
        .map(|k| {
            let mut origin = 0;
            let mut rest = k;
            let mut stride = 1;
            for _ in 0..dim {
                origin += (rest % n) * stride;
                rest /= n;
                stride *= nodes;
            }
            CellData::new(corners_of(origin))
        })
        .collect();
    let mut tria = Triangulation::new(dim, dim).unwrap();
    tria.create_triangulation(&vertices, &cells, &SubCellData::default())
        .unwrap();
    tria
}

fn bench_refine_global(c: &mut Criterion) {
    let mut group = c.benchmark_group("refine_global");
    for &(dim, n, times) in &[(2usize, 8usize, 3usize), (2, 16, 2), (3, 4, 2)] {
        group.bench_with_input(
            BenchmarkId::new(format!("{dim}d_{n}"), times),
            &times,
            |b, &times| {
                b.iter_with_setup(
                    || grid(dim, n),
                    |mut tria| {
                        tria.refine_global(times).unwrap();
                        tria
                    },
                )
            },
        );
    }
    group.finish();
}

fn bench_adapt_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapt_cycle");
    for smoothing in [MeshSmoothing::NONE, MeshSmoothing::MAXIMUM_SMOOTHING] {
        group.bench_function(format!("{smoothing:?}"), |b| {
            b.iter_with_setup(
                || {
                    let mut tria = grid(2, 16);
                    tria.set_settings(TriangulationSettings::with_smoothing(smoothing));
                    tria.refine_global(1).unwrap();
                    tria
                },
                |mut tria| {
                    let mut rng = SmallRng::seed_from_u64(7);
                    for _ in 0..3 {
                        let active: Vec<CellId> =
                            tria.active_cell_iter().map(|c| c.id()).collect();
                        for id in active {
                            let roll: f64 = rng.r#gen();
                            if roll < 0.1 {
                                tria.set_isotropic_refine_flag(id).unwrap();
                            } else if roll < 0.3 && id.level() > 0 {
                                tria.set_coarsen_flag(id).unwrap();
                            }
                        }
                        tria.execute_coarsening_and_refinement().unwrap();
                    }
                    tria
                },
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_refine_global, bench_adapt_cycle);
criterion_main!(benches);
