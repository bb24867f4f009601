//! Save a running world, load it back and keep going.
//!
//! A world that is saved and reloaded must continue exactly like the
//! original: same factories, same stock, same random stream.

use std::sync::Arc;

use industria_core::coord::Coord;
use industria_core::id::PlayerId;
use industria_core::test_utils::sample_catalog;
use industria_spatial::TileMap;
use industria_world::{IndustrySettings, LoadError, SimpleHalts, World, check_consistency};

const MAP_SIZE: u32 = 96;
const STEP: u64 = 1024;

fn grown_world(seed: u64) -> World {
    let mut world = World::new(
        Arc::new(sample_catalog()),
        IndustrySettings::default(),
        Box::new(TileMap::new(MAP_SIZE, MAP_SIZE)),
        Box::new(SimpleHalts::new()),
        seed,
    );
    for _ in 0..3 {
        world.builder().increase_industry_density(false);
    }
    world
}

fn load(data: &[u8]) -> Result<World, LoadError> {
    World::load(
        data,
        Arc::new(sample_catalog()),
        Box::new(TileMap::new(MAP_SIZE, MAP_SIZE)),
        Box::new(SimpleHalts::new()),
    )
}

fn run(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.advance(STEP);
    }
}

#[test]
fn reloaded_world_matches_original() {
    let mut world = grown_world(21);
    run(&mut world, 300);

    let data = world.save().unwrap();
    let loaded = load(&data).unwrap();
    assert_eq!(loaded.factories().len(), world.factories().len());
    assert!(check_consistency(&loaded).is_empty());
    // Nothing is lost or invented on the way through.
    assert_eq!(loaded.save().unwrap(), data);
}

#[test]
fn reloaded_world_continues_identically() {
    let mut original = grown_world(8);
    run(&mut original, 100);
    let mut resumed = load(&original.save().unwrap()).unwrap();

    run(&mut original, 200);
    run(&mut resumed, 200);
    original.builder().increase_industry_density(false);
    resumed.builder().increase_industry_density(false);

    assert_eq!(original.calendar(), resumed.calendar());
    assert_eq!(original.save().unwrap(), resumed.save().unwrap());
}

#[test]
fn removed_partner_is_not_resurrected() {
    let mut world = grown_world(3);
    let Some(victim) = world
        .factories()
        .iter()
        .find(|(_, f)| !f.consumers().is_empty())
        .map(|(id, _)| id)
    else {
        return;
    };
    let victim_pos = world.factory(victim).unwrap().anchor();
    world.remove_factory(victim);

    let loaded = load(&world.save().unwrap()).unwrap();
    assert!(loaded.get_fab(victim_pos).is_none());
    for (_, f) in loaded.factories().iter() {
        assert!(!f.suppliers().contains(&victim_pos));
    }
    assert!(check_consistency(&loaded).is_empty());
}

#[test]
fn halts_survive_with_the_transport_layer() {
    let mut world = grown_world(4);
    let first = world.factories().iter().next().map(|(_, f)| f.anchor());
    let Some(anchor) = first else {
        return;
    };
    let tiles = [Coord::new(anchor.x, anchor.y)];
    world.add_halt(&tiles, PlayerId(0));
    let data = world.save().unwrap();

    let mut halts = SimpleHalts::new();
    industria_world::HaltNetwork::create_halt(&mut halts, &tiles, PlayerId(0));
    let loaded = World::load(
        &data,
        Arc::new(sample_catalog()),
        Box::new(TileMap::new(MAP_SIZE, MAP_SIZE)),
        Box::new(halts),
    )
    .unwrap();
    assert!(!loaded.get_fab(anchor).unwrap().halts().is_empty());
}
