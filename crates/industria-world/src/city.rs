//! Cities as a demand source for passenger and mail boosts.
//!
//! A city keeps one [`FactorySet`] per traffic kind. Each month the set is
//! refilled from the factories' demand and the city sends its travellers
//! to targets drawn by remaining demand.

use industria_core::coord::Coord;
use industria_core::id::CityId;
use industria_core::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Largest group of passengers or mail sent to one target in one draw.
pub const TRAFFIC_BATCH: u32 = 10;

/// Share of the population travelling to factories each month.
const PAX_POPULATION_DIVISOR: u32 = 8;
const MAIL_POPULATION_DIVISOR: u32 = 16;

/// Per-factory bookkeeping inside a [`FactorySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryEntry {
    pub factory: Coord,
    pub demand: u32,
    pub supply_this_month: u32,
    /// Never larger than `supply_this_month`.
    pub remaining: u32,
}

/// The factories a city sends passengers or mail to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySet {
    entries: Vec<FactoryEntry>,
}

impl FactorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FactoryEntry] {
        &self.entries
    }

    pub fn get(&self, factory: Coord) -> Option<&FactoryEntry> {
        self.entries.iter().find(|e| e.factory == factory)
    }

    pub fn contains(&self, factory: Coord) -> bool {
        self.get(factory).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a factory or change its monthly demand. The running month is
    /// not touched.
    pub fn update_factory(&mut self, factory: Coord, demand: u32) {
        match self.entries.iter_mut().find(|e| e.factory == factory) {
            Some(entry) => entry.demand = demand,
            None => self.entries.push(FactoryEntry {
                factory,
                demand,
                supply_this_month: 0,
                remaining: 0,
            }),
        }
    }

    pub fn remove_factory(&mut self, factory: Coord) {
        self.entries.retain(|e| e.factory != factory);
    }

    pub fn total_remaining(&self) -> u32 {
        self.entries.iter().map(|e| e.remaining).sum()
    }

    /// Start a month: every target may receive its full demand again.
    pub fn new_month(&mut self) {
        for e in &mut self.entries {
            e.supply_this_month = e.demand;
            e.remaining = e.demand;
        }
    }

    /// Book up to `amount` for `factory`. Returns the amount booked.
    pub fn take(&mut self, factory: Coord, amount: u32) -> u32 {
        let Some(e) = self.entries.iter_mut().find(|e| e.factory == factory) else {
            return 0;
        };
        let booked = amount.min(e.remaining);
        e.remaining -= booked;
        booked
    }

    /// Draw a target weighted by its remaining demand.
    pub fn random_target(&self, rng: &mut SimRng) -> Option<Coord> {
        let weights: Vec<u32> = self.entries.iter().map(|e| e.remaining).collect();
        rng.pick_weighted(&weights).map(|i| self.entries[i].factory)
    }
}

/// A city, reduced to what industry cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    /// Town hall tile.
    pub pos: Coord,
    pub top_left: Coord,
    pub bottom_right: Coord,
    pub population: u32,
    pub pax_targets: FactorySet,
    pub mail_targets: FactorySet,
}

impl City {
    pub fn new(id: CityId, name: &str, pos: Coord, top_left: Coord, bottom_right: Coord) -> Self {
        Self {
            id,
            name: name.to_string(),
            pos,
            top_left,
            bottom_right,
            population: 0,
            pax_targets: FactorySet::new(),
            mail_targets: FactorySet::new(),
        }
    }

    pub fn pos(&self) -> Coord {
        self.pos
    }

    pub fn top_left(&self) -> Coord {
        self.top_left
    }

    pub fn bottom_right(&self) -> Coord {
        self.bottom_right
    }

    /// Half the longer side of the city area, at least one tile.
    pub fn half_extent(&self) -> u32 {
        let w = self.bottom_right.x.abs_diff(self.top_left.x);
        let h = self.bottom_right.y.abs_diff(self.top_left.y);
        (w.max(h) / 2).max(1)
    }

    pub fn monthly_passengers(&self) -> u32 {
        self.population / PAX_POPULATION_DIVISOR
    }

    pub fn monthly_mail(&self) -> u32 {
        self.population / MAIL_POPULATION_DIVISOR
    }

    pub fn remove_factory(&mut self, factory: Coord) {
        self.pax_targets.remove_factory(factory);
        self.mail_targets.remove_factory(factory);
    }
}

/// Spread `budget` over `set` in batches. Calls `deliver` for every batch
/// and returns the total sent.
pub fn dispatch_traffic<F>(set: &mut FactorySet, budget: u32, rng: &mut SimRng, mut deliver: F) -> u32
where
    F: FnMut(Coord, u32),
{
    let mut left = budget;
    while left > 0 {
        let Some(target) = set.random_target(rng) else {
            break;
        };
        let booked = set.take(target, left.min(TRAFFIC_BATCH));
        if booked == 0 {
            break;
        }
        deliver(target, booked);
        left -= booked;
    }
    budget - left
}
