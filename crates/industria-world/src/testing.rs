//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use industria_core::coord::{Coord3d, Rotation};
use industria_core::id::{FactoryId, PlayerId};
use industria_core::test_utils::{descriptor, sample_catalog};
use industria_spatial::TileMap;

use crate::halt::SimpleHalts;
use crate::settings::IndustrySettings;
use crate::world::World;

/// Flat temperate square map with the sample catalog.
pub fn test_world(size: u32) -> World {
    World::new(
        Arc::new(sample_catalog()),
        IndustrySettings::default(),
        Box::new(TileMap::new(size, size)),
        Box::new(SimpleHalts::new()),
        42,
    )
}

/// Build a sample-catalog factory at prodbase 16, unrotated.
pub fn place(world: &mut World, name: &str, x: i32, y: i32) -> FactoryId {
    let (id, _) = descriptor(world.catalog(), name);
    world
        .builder()
        .build_factory(None, id, Some(16), Rotation::None, Coord3d::new(x, y, 0), PlayerId(0))
        .unwrap_or_else(|e| panic!("cannot place {name} at ({x}, {y}): {e}"))
}
