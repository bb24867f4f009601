//! Criterion benchmarks for the site searcher.

use criterion::{Criterion, criterion_group, criterion_main};
use industria_core::catalog::SiteKind;
use industria_core::coord::{Coord, Footprint};
use industria_core::rng::SimRng;
use industria_spatial::{ExclusionMap, SiteQuery, TileMap, find_site};
use std::hint::black_box;

fn bench_site_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("site_search");
    group.sample_size(50);

    // Empty map: the first candidate usually fits.
    group.bench_function("empty_map_radius_40", |b| {
        let terrain = TileMap::new(256, 256);
        let excl = ExclusionMap::new(256, 256);
        let mut rng = SimRng::new(1);
        let query = SiteQuery::new(Coord::new(128, 128), 40, Footprint::new(3, 3), SiteKind::Land);
        b.iter(|| black_box(find_site(&terrain, &excl, &query, &mut rng)));
    });

    // Crowded map: a grid of factories leaves a few gaps.
    group.bench_function("crowded_map_radius_40", |b| {
        let terrain = TileMap::new(256, 256);
        let mut excl = ExclusionMap::new(256, 256);
        for y in (0..256).step_by(9) {
            for x in (0..256).step_by(9) {
                excl.mark(Coord::new(x, y), Footprint::new(3, 3), 2);
            }
        }
        let mut rng = SimRng::new(2);
        let query = SiteQuery::new(Coord::new(128, 128), 40, Footprint::new(2, 2), SiteKind::Land);
        b.iter(|| black_box(find_site(&terrain, &excl, &query, &mut rng)));
    });

    // Exhaustive miss: every cell is visited once.
    group.bench_function("exhausted_radius_40", |b| {
        let terrain = TileMap::new(256, 256);
        let mut excl = ExclusionMap::new(256, 256);
        excl.mark(Coord::new(0, 0), Footprint::new(256, 256), 0);
        let mut rng = SimRng::new(3);
        let query = SiteQuery::new(Coord::new(128, 128), 40, Footprint::new(3, 3), SiteKind::Land);
        b.iter(|| black_box(find_site(&terrain, &excl, &query, &mut rng)));
    });

    group.finish();
}

criterion_group!(benches, bench_site_search);
criterion_main!(benches);
