//! Property-based tests for placement: permutation exhaustiveness,
//! exclusion-map consistency and non-overlap of searched sites.

use industria_core::catalog::SiteKind;
use industria_core::coord::{Coord, Footprint};
use industria_core::rng::SimRng;
use industria_spatial::*;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn permutation_is_full_period(radius in 0..60u32, start in any::<u64>()) {
        let perm = Permutation::new(radius, start);
        let area = perm.area();
        let mut seen = HashSet::new();
        for index in perm {
            prop_assert!(index < area);
            prop_assert!(seen.insert(index), "index {} visited twice", index);
        }
        prop_assert_eq!(seen.len() as u64, area);
    }

    #[test]
    fn exclusion_marks_exactly_the_margin(
        x in -5..70i32,
        y in -5..70i32,
        w in 1..6u32,
        h in 1..6u32,
        spacing in 0..8u32,
    ) {
        let mut map = ExclusionMap::new(64, 48);
        map.mark(Coord::new(x, y), Footprint::new(w, h), spacing);
        let s = spacing as i32;
        for ty in -2..50 {
            for tx in -2..66 {
                let inside = tx >= x - s && tx < x + w as i32 + s && ty >= y - s && ty < y + h as i32 + s;
                let on_map = tx >= 0 && ty >= 0 && tx < 64 && ty < 48;
                prop_assert_eq!(map.is_excluded(Coord::new(tx, ty)), inside && on_map);
            }
        }
    }

    #[test]
    fn searched_sites_never_overlap_marked_factories(seed in any::<u64>(), spacing in 0..4u32) {
        let terrain = TileMap::new(40, 40);
        let mut excl = ExclusionMap::new(40, 40);
        let fp = Footprint::new(3, 3);
        excl.mark(Coord::new(10, 10), fp, spacing);

        let mut rng = SimRng::new(seed);
        let query = SiteQuery::new(Coord::new(10, 10), 5, fp, SiteKind::Land);
        if let Some(pos) = find_site(&terrain, &excl, &query, &mut rng) {
            let s = spacing as i32;
            let lo = 10 - s;
            let hi = 10 + 3 + s; // exclusive
            for t in fp.tiles(pos.to_2d()) {
                let overlaps = t.x >= lo && t.x < hi && t.y >= lo && t.y < hi;
                prop_assert!(!overlaps, "{:?} overlaps the reserved block", t);
            }
        }
    }
}

/// A 3x3 factory with spacing 2 at (10, 10): a second 3x3 searched around
/// (10, 10) must stay outside [8,8]-[15,15]. Within radius 5 the halo rule
/// leaves no room at all; radius 8 has room beyond the block.
#[test]
fn second_site_avoids_spacing_block() {
    let terrain = TileMap::new(40, 40);
    let mut excl = ExclusionMap::new(40, 40);
    let fp = Footprint::new(3, 3);
    excl.mark(Coord::new(10, 10), fp, 2);

    for seed in 0..200 {
        for radius in [5, 8] {
            let mut rng = SimRng::new(seed);
            let query = SiteQuery::new(Coord::new(10, 10), radius, fp, SiteKind::Land);
            let found = find_site(&terrain, &excl, &query, &mut rng);
            if radius == 8 {
                assert!(found.is_some(), "seed {seed}: nothing found in radius 8");
            }
            for t in found.iter().flat_map(|pos| fp.tiles(pos.to_2d())) {
                assert!(
                    !(t.x >= 8 && t.x <= 15 && t.y >= 8 && t.y <= 15),
                    "seed {seed}: {t:?} inside the reserved block"
                );
            }
        }
    }
}
