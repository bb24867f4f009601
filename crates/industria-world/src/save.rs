//! Saving and loading a whole world.
//!
//! The snapshot holds the factories, cities, calendar, settings and the
//! random stream. Terrain and the halt network belong to other layers and
//! are handed back in on load. Exclusion marks, terrain occupancy, power
//! membership and halt registration are all rebuilt from the factories.

use std::sync::Arc;

use industria_core::catalog::{Catalog, FactoryKind};
use industria_core::coord::Coord;
use industria_core::factory::Factory;
use industria_core::id::FactoryId;
use industria_core::rng::SimRng;
use industria_core::serialize::{DeserializeError, FactoryRecord, SerializeError, SnapshotHeader};
use industria_spatial::Terrain;
use serde::{Deserialize, Serialize};

use crate::city::City;
use crate::halt::HaltNetwork;
use crate::settings::IndustrySettings;
use crate::world::{Calendar, World};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Deserialize(#[from] DeserializeError),
    #[error("saved factory at {pos:?} overlaps another factory")]
    Overlap { pos: Coord },
    #[error("saved factory at {pos:?} lies outside the map")]
    OutOfBounds { pos: Coord },
}

#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    calendar: Calendar,
    rng: SimRng,
    settings: IndustrySettings,
    cities: Vec<City>,
    /// In construction order.
    factories: Vec<FactoryRecord>,
}

impl World {
    /// Serialize the world into a header-tagged bitcode blob.
    pub fn save(&self) -> Result<Vec<u8>, SerializeError> {
        let factories = self
            .registry
            .iter()
            .map(|(_, f)| f.to_record(&self.catalog))
            .collect::<Result<Vec<_>, _>>()?;
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.calendar.tick),
            calendar: self.calendar,
            rng: self.rng.clone(),
            settings: self.settings.clone(),
            cities: self.cities.clone(),
            factories,
        };
        let data =
            bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))?;
        tracing::debug!(
            factories = snapshot.factories.len(),
            bytes = data.len(),
            "world saved"
        );
        Ok(data)
    }

    /// Inverse of [`World::save`].
    ///
    /// Descriptors are looked up by name in `catalog`. Supplier and consumer
    /// coordinates that no longer resolve to a factory are dropped.
    pub fn load(
        data: &[u8],
        catalog: Arc<Catalog>,
        terrain: Box<dyn Terrain>,
        halts: Box<dyn HaltNetwork>,
    ) -> Result<World, LoadError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let mut world = World::new(catalog, snapshot.settings, terrain, halts, 0);
        world.rng = snapshot.rng;
        world.calendar = snapshot.calendar;
        world.cities = snapshot.cities;

        for record in snapshot.factories {
            let factory = Factory::from_record(record, &world.catalog)?;
            let pos = factory.anchor();
            if !factory
                .footprint()
                .tiles(pos)
                .all(|t| world.terrain.is_within_limits(t))
            {
                return Err(LoadError::OutOfBounds { pos });
            }
            world
                .registry
                .insert(factory)
                .map_err(|_| LoadError::Overlap { pos })?;
        }

        world.resolve_links();
        world.restore_placement();
        world.restore_power();
        world.restore_halts();

        tracing::info!(
            factories = world.registry.len(),
            cities = world.cities.len(),
            year = world.calendar.year(),
            "world loaded"
        );
        Ok(world)
    }

    fn resolve_links(&mut self) {
        for id in self.registry.ids().to_vec() {
            let Some(f) = self.registry.get(id) else {
                continue;
            };
            let anchor = f.anchor();
            let dangling_suppliers: Vec<Coord> = f
                .suppliers()
                .iter()
                .copied()
                .filter(|p| self.registry.resolve(*p).is_none())
                .collect();
            let dangling_consumers: Vec<Coord> = f
                .consumers()
                .iter()
                .copied()
                .filter(|p| self.registry.resolve(*p).is_none())
                .collect();
            if dangling_suppliers.is_empty() && dangling_consumers.is_empty() {
                continue;
            }
            let Some(f) = self.registry.get_mut(id) else {
                continue;
            };
            for pos in dangling_suppliers {
                tracing::warn!(factory = ?anchor, supplier = ?pos, "dropping unknown supplier");
                f.remove_supplier(pos);
            }
            for pos in dangling_consumers {
                tracing::warn!(factory = ?anchor, consumer = ?pos, "dropping unknown consumer");
                f.remove_consumer(pos);
            }
        }
    }

    fn restore_placement(&mut self) {
        let spacing = self.settings.min_factory_spacing;
        let placed: Vec<(Coord, _)> = self
            .registry
            .iter()
            .map(|(_, f)| (f.anchor(), f.footprint()))
            .collect();
        for (anchor, footprint) in &placed {
            for tile in footprint.tiles(*anchor) {
                self.terrain.set_occupied(tile, true);
            }
        }
        self.exclusion.rebuild(placed, spacing);
    }

    fn restore_power(&mut self) {
        let members: Vec<(FactoryId, _, FactoryKind)> = self
            .registry
            .iter()
            .filter_map(|(id, f)| f.power_network().map(|n| (id, n, f.kind())))
            .collect();
        for (id, network, kind) in members {
            self.power.ensure_network(network);
            if kind == FactoryKind::PowerPlant {
                self.power.add_producer(network, id);
            } else {
                self.power.add_consumer(network, id);
            }
        }
    }

    fn restore_halts(&mut self) {
        for id in self.registry.ids().to_vec() {
            let Some(f) = self.registry.get_mut(id) else {
                continue;
            };
            let anchor = f.anchor();
            for halt in f.halts().to_vec() {
                if !self.halts.connect_factory(halt, anchor) {
                    tracing::debug!(factory = ?anchor, ?halt, "halt gone, unlinking");
                    f.unlink_halt(halt);
                }
            }
        }
    }
}
