//! The world context: everything factory building and production touch,
//! owned in one place and passed explicitly instead of living in globals.

use std::sync::Arc;

use industria_core::catalog::{Catalog, FactoryKind, YearMonth};
use industria_core::coord::Coord;
use industria_core::factory::Factory;
use industria_core::fixed::Ticks;
use industria_core::id::{CityId, FactoryId, HaltId, PlayerId, PowerNetworkId};
use industria_core::rng::SimRng;
use industria_power::PowerModule;
use industria_spatial::{ExclusionMap, Terrain};
use serde::{Deserialize, Serialize};

use crate::city::City;
use crate::halt::HaltNetwork;
use crate::registry::FactoryRegistry;
use crate::settings::IndustrySettings;

/// Simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Ticks since the world started.
    pub tick: Ticks,
    /// Ticks elapsed in the running month.
    pub month_ticks: Ticks,
    pub year_month: YearMonth,
}

impl Calendar {
    pub fn new(year_month: YearMonth) -> Self {
        Self {
            tick: 0,
            month_ticks: 0,
            year_month,
        }
    }

    pub fn year(&self) -> u32 {
        self.year_month / 12
    }

    pub fn month(&self) -> u32 {
        self.year_month % 12
    }
}

pub struct World {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) settings: IndustrySettings,
    pub(crate) terrain: Box<dyn Terrain>,
    pub(crate) exclusion: ExclusionMap,
    pub(crate) registry: FactoryRegistry,
    pub(crate) cities: Vec<City>,
    pub(crate) halts: Box<dyn HaltNetwork>,
    pub(crate) power: PowerModule,
    pub(crate) rng: SimRng,
    pub(crate) calendar: Calendar,
}

impl World {
    pub fn new(
        catalog: Arc<Catalog>,
        settings: IndustrySettings,
        terrain: Box<dyn Terrain>,
        halts: Box<dyn HaltNetwork>,
        seed: u64,
    ) -> Self {
        let (width, height) = terrain.size();
        let calendar = Calendar::new(settings.start_year_month);
        Self {
            catalog,
            settings,
            terrain,
            exclusion: ExclusionMap::new(width, height),
            registry: FactoryRegistry::new(),
            cities: Vec::new(),
            halts,
            power: PowerModule::new(),
            rng: SimRng::new(seed),
            calendar,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &IndustrySettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut IndustrySettings {
        &mut self.settings
    }

    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    pub fn terrain_mut(&mut self) -> &mut dyn Terrain {
        self.terrain.as_mut()
    }

    pub fn exclusion(&self) -> &ExclusionMap {
        &self.exclusion
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.registry
    }

    pub fn factory(&self, id: FactoryId) -> Option<&Factory> {
        self.registry.get(id)
    }

    pub fn factory_mut(&mut self, id: FactoryId) -> Option<&mut Factory> {
        self.registry.get_mut(id)
    }

    /// The factory covering `tile`.
    pub fn get_fab(&self, tile: Coord) -> Option<&Factory> {
        self.registry.get_fab(tile)
    }

    pub fn halts(&self) -> &dyn HaltNetwork {
        self.halts.as_ref()
    }

    pub fn halts_mut(&mut self) -> &mut dyn HaltNetwork {
        self.halts.as_mut()
    }

    pub fn power(&self) -> &PowerModule {
        &self.power
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Date descriptors are checked against, if the timeline is enabled.
    pub fn timeline(&self) -> Option<YearMonth> {
        self.settings
            .use_timeline
            .then_some(self.calendar.year_month)
    }

    // -----------------------------------------------------------------------
    // Cities
    // -----------------------------------------------------------------------

    pub fn add_city(
        &mut self,
        name: &str,
        pos: Coord,
        top_left: Coord,
        bottom_right: Coord,
        population: u32,
    ) -> CityId {
        let id = CityId(self.cities.len() as u32);
        let mut city = City::new(id, name, pos, top_left, bottom_right);
        city.population = population;
        self.cities.push(city);
        id
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.iter().find(|c| c.id == id)
    }

    pub fn find_nearest_city(&self, pos: Coord) -> Option<&City> {
        self.cities.iter().min_by_key(|c| c.pos.distance(&pos))
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Make `supplier` deliver to `consumer`. Both sides record the link.
    /// Returns false if either id is stale or they are the same factory.
    pub fn connect(&mut self, supplier: FactoryId, consumer: FactoryId) -> bool {
        let Some((s, c)) = self.registry.get_pair_mut(supplier, consumer) else {
            return false;
        };
        let supplier_pos = s.anchor();
        let consumer_pos = c.anchor();
        let added = s.add_consumer(consumer_pos);
        c.add_supplier(supplier_pos);
        if added {
            tracing::debug!(?supplier_pos, ?consumer_pos, "factories linked");
        }
        true
    }

    // -----------------------------------------------------------------------
    // Halts
    // -----------------------------------------------------------------------

    /// Create a halt and attach every factory its catchment reaches.
    pub fn add_halt(&mut self, tiles: &[Coord], owner: PlayerId) -> HaltId {
        let halt = self.halts.create_halt(tiles, owner);
        let covered: Vec<FactoryId> = self
            .registry
            .iter()
            .filter(|(_, f)| {
                f.footprint()
                    .tiles(f.anchor())
                    .any(|t| self.halts.halts_at(t).contains(&halt))
            })
            .map(|(id, _)| id)
            .collect();
        for id in covered {
            self.attach_halt(id, halt);
        }
        halt
    }

    pub(crate) fn attach_halt(&mut self, id: FactoryId, halt: HaltId) {
        let Some(factory) = self.registry.get_mut(id) else {
            return;
        };
        if self.halts.connect_factory(halt, factory.anchor()) {
            factory.link_halt(halt);
        }
    }

    // -----------------------------------------------------------------------
    // Power
    // -----------------------------------------------------------------------

    pub fn create_power_network(&mut self) -> PowerNetworkId {
        self.power.create_network()
    }

    /// Hook a factory up to a power network: power plants feed it, factories
    /// with an electricity demand draw from it.
    pub fn connect_power(&mut self, id: FactoryId, network: PowerNetworkId) -> bool {
        let Some(factory) = self.registry.get_mut(id) else {
            return false;
        };
        if self.power.network(network).is_none() {
            return false;
        }
        if let Some(old) = factory.power_network() {
            if old == network {
                return true;
            }
            self.power.remove_factory(id);
        }
        if factory.kind() == FactoryKind::PowerPlant {
            self.power.add_producer(network, id);
        } else {
            self.power.add_consumer(network, id);
        }
        factory.set_power_network(Some(network));
        true
    }

    /// Nominal electricity output of all power plants and demand of all
    /// other factories, whether or not they are on a network.
    pub fn electricity_totals(&self) -> (u64, u64) {
        self.registry
            .iter()
            .fold((0, 0), |(supply, demand), (_, f)| {
                let amount = u64::from(f.scaled_electric_amount());
                if f.kind() == FactoryKind::PowerPlant {
                    (supply + amount, demand)
                } else {
                    (supply, demand + amount)
                }
            })
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Tear a factory down. Links, halts, power and city targets are
    /// detached first. Exclusion marks stay.
    pub fn remove_factory(&mut self, id: FactoryId) -> Option<Factory> {
        let factory = self.registry.get(id)?;
        let anchor = factory.anchor();
        let suppliers = factory.suppliers().to_vec();
        let consumers = factory.consumers().to_vec();

        for pos in suppliers {
            if let Some(sup) = self.registry.resolve(pos).and_then(|s| self.registry.get_mut(s)) {
                sup.remove_consumer(anchor);
            }
        }
        for pos in consumers {
            if let Some(con) = self.registry.resolve(pos).and_then(|c| self.registry.get_mut(c)) {
                con.remove_supplier(anchor);
            }
        }
        self.halts.remove_factory(anchor);
        self.power.remove_factory(id);
        for city in &mut self.cities {
            city.remove_factory(anchor);
        }

        let factory = self.registry.remove(id)?;
        for tile in factory.footprint().tiles(anchor) {
            self.terrain.set_occupied(tile, false);
        }
        tracing::debug!(pos = ?anchor, "factory removed");
        Some(factory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{place, test_world};
    use industria_core::coord::Footprint;

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let mut world = test_world(64);
        let forest = place(&mut world, "forest", 5, 5);
        let saw = place(&mut world, "sawmill", 20, 5);
        assert!(world.connect(forest, saw));
        assert!(world.connect(forest, saw));
        assert_eq!(world.factory(forest).unwrap().consumers(), &[Coord::new(20, 5)]);
        assert_eq!(world.factory(saw).unwrap().suppliers(), &[Coord::new(5, 5)]);
        assert!(!world.connect(forest, forest));
    }

    #[test]
    fn removal_detaches_everything() {
        let mut world = test_world(64);
        let forest = place(&mut world, "forest", 5, 5);
        let saw = place(&mut world, "sawmill", 20, 5);
        world.connect(forest, saw);
        let net = world.create_power_network();
        assert!(world.connect_power(saw, net));

        assert!(world.remove_factory(saw).is_some());
        assert!(world.factory(forest).unwrap().consumers().is_empty());
        assert!(world.power().network(net).unwrap().consumers.is_empty());
        assert!(world.terrain().square_is_free(Coord::new(20, 5), Footprint::new(3, 2)));
        // Spacing marks are kept for the session.
        assert!(world.exclusion().is_excluded(Coord::new(20, 5)));
    }

    #[test]
    fn new_halt_attaches_covered_factories() {
        let mut world = test_world(64);
        let forest = place(&mut world, "forest", 5, 5);
        let far = place(&mut world, "forest", 40, 40);
        let halt = world.add_halt(&[Coord::new(8, 5)], PlayerId(0));
        assert_eq!(world.factory(forest).unwrap().halts(), &[halt]);
        assert!(world.factory(far).unwrap().halts().is_empty());
    }

    #[test]
    fn electricity_totals_split_by_kind() {
        let mut world = test_world(64);
        place(&mut world, "windmill", 5, 5);
        place(&mut world, "electric_sawmill", 20, 5);
        assert_eq!(world.electricity_totals(), (100, 50));
    }

    #[test]
    fn nearest_city() {
        let mut world = test_world(64);
        world.add_city("North", Coord::new(10, 5), Coord::new(6, 1), Coord::new(14, 9), 500);
        let south = world.add_city("South", Coord::new(10, 50), Coord::new(6, 46), Coord::new(14, 54), 500);
        assert_eq!(world.find_nearest_city(Coord::new(12, 40)).map(|c| c.id), Some(south));
        assert_eq!(world.timeline(), None);
    }
}
