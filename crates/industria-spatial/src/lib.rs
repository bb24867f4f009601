//! Map-side placement support for the industria simulation.
//!
//! - [`terrain`] -- the terrain boundary trait and an in-memory tile map.
//! - [`exclusion`] -- the factory exclusion bitmap enforcing minimum spacing.
//! - [`permutation`] -- full-period scattered visiting order of a square.
//! - [`search`] -- the site searcher and the city ring search.
//! - [`index`] -- tile to factory lookup for link resolution.

pub mod exclusion;
pub mod index;
pub mod permutation;
pub mod search;
pub mod terrain;

pub use exclusion::ExclusionMap;
pub use index::{SpatialError, SpatialIndex};
pub use permutation::Permutation;
pub use search::{SiteQuery, WATER_HALO, find_place_near, find_site, is_area_ok};
pub use terrain::{GroundTile, Terrain, TileMap};
