//! Site searcher: finds a legal spot for a factory footprint.

use crate::exclusion::ExclusionMap;
use crate::permutation::Permutation;
use crate::terrain::Terrain;
use industria_core::catalog::SiteKind;
use industria_core::climate::ClimateBits;
use industria_core::coord::{Coord, Coord3d, Footprint};
use industria_core::rng::SimRng;

/// Open water kept around a water-sited factory on every side.
pub const WATER_HALO: u32 = 3;

/// A placement request.
#[derive(Debug, Clone, Copy)]
pub struct SiteQuery {
    pub origin: Coord,
    pub radius: u32,
    pub footprint: Footprint,
    pub site: SiteKind,
    pub climates: ClimateBits,
    pub ignore_climates: bool,
    /// Candidate cells tried before giving up.
    pub max_iterations: u32,
}

impl SiteQuery {
    pub fn new(origin: Coord, radius: u32, footprint: Footprint, site: SiteKind) -> Self {
        Self {
            origin,
            radius,
            footprint,
            site,
            climates: ClimateBits::ALL,
            ignore_climates: false,
            max_iterations: u32::MAX,
        }
    }
}

/// Search the square of `2 * radius + 1` cells around `query.origin` in
/// scattered order and return the first origin where the footprint fits.
pub fn find_site(
    terrain: &dyn Terrain,
    exclusion: &ExclusionMap,
    query: &SiteQuery,
    rng: &mut SimRng,
) -> Option<Coord3d> {
    let (footprint, shift) = if query.site == SiteKind::Water {
        (query.footprint.inflated(WATER_HALO), WATER_HALO as i32)
    } else {
        (query.footprint, 0)
    };

    let diam = 2 * u64::from(query.radius) + 1;
    let area = diam * diam;
    let start = rng.next_u64() % area;
    let perm = Permutation::new(query.radius, start);

    for index in perm.clone().take(query.max_iterations as usize) {
        let (dx, dy) = perm.offset_of(index);
        let candidate = query.origin.offset(dx, dy);
        if !is_area_ok(terrain, exclusion, candidate, footprint, query) {
            continue;
        }
        let pos = candidate.offset(shift, shift);
        let z = terrain.lookup_ground(pos).map(|g| g.height).unwrap_or(0);
        return Some(Coord3d::new(pos.x, pos.y, z));
    }

    tracing::debug!(
        origin = ?query.origin,
        radius = query.radius,
        site = ?query.site,
        "site search exhausted"
    );
    None
}

/// Whether `footprint` may be placed at `origin`, checking a one-tile halo
/// around it as well.
pub fn is_area_ok(
    terrain: &dyn Terrain,
    exclusion: &ExclusionMap,
    origin: Coord,
    footprint: Footprint,
    query: &SiteQuery,
) -> bool {
    let Some(anchor) = terrain.lookup_ground(origin) else {
        return false;
    };
    let height = anchor.height;
    let halo_origin = origin.offset(-1, -1);
    let halo = footprint.inflated(1);

    let mut border_ok = !matches!(query.site, SiteKind::Shore | SiteKind::River | SiteKind::City);
    let mut trees: u32 = 0;

    for tile in halo.tiles(halo_origin) {
        let Some(ground) = terrain.lookup_ground(tile) else {
            return false;
        };
        if exclusion.is_excluded(tile) || ground.elevated {
            return false;
        }

        if !footprint.contains(origin, tile) {
            border_ok |= match query.site {
                SiteKind::Shore => ground.is_water(),
                SiteKind::River => ground.river,
                SiteKind::City => ground.road,
                _ => false,
            };
            continue;
        }

        if ground.occupied || ground.road || ground.river || !ground.flat || ground.height != height {
            return false;
        }
        if query.site == SiteKind::Water {
            if !ground.is_water() {
                return false;
            }
            continue;
        }
        if ground.is_water() {
            return false;
        }
        if !query.ignore_climates && !query.climates.contains(ground.climate) {
            return false;
        }
        trees += u32::from(ground.trees);
    }

    if query.site == SiteKind::Forest {
        let w = footprint.width;
        let h = footprint.height;
        if trees < w * h + w + h {
            return false;
        }
    }
    border_ok
}

/// Ring search outward from `query.origin` for a spot next to a road, used
/// for factories that belong inside a city. Rings run from `min_radius` to
/// `query.radius` (Chebyshev distance); the query's site kind is ignored.
pub fn find_place_near(
    terrain: &dyn Terrain,
    exclusion: &ExclusionMap,
    query: &SiteQuery,
    min_radius: u32,
) -> Option<Coord3d> {
    let query = SiteQuery {
        site: SiteKind::City,
        ..*query
    };
    for r in min_radius..=query.radius {
        for candidate in ring(query.origin, r as i32) {
            if is_area_ok(terrain, exclusion, candidate, query.footprint, &query) {
                let z = terrain.lookup_ground(candidate).map(|g| g.height).unwrap_or(0);
                return Some(Coord3d::new(candidate.x, candidate.y, z));
            }
        }
    }
    None
}

/// Tiles at Chebyshev distance exactly `r` from `center`.
fn ring(center: Coord, r: i32) -> impl Iterator<Item = Coord> {
    let top_bottom = (-r..=r).flat_map(move |dx| {
        let bottom = (r > 0).then(|| center.offset(dx, r));
        std::iter::once(center.offset(dx, -r)).chain(bottom)
    });
    let sides = (-r + 1..r).flat_map(move |dy| [center.offset(-r, dy), center.offset(r, dy)]);
    top_bottom.chain(sides)
}
