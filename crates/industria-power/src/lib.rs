//! Electricity networks for the industria simulation.
//!
//! Power plants and electricity-consuming factories are assigned to
//! networks. Each tick the module balances supply and demand per network
//! and computes a satisfaction ratio (0..1 as [`Fixed64`]) that drives the
//! consumers' electric production boost.
//!
//! # Design
//!
//! - Factories are assigned to networks via [`FactoryId`].
//! - Supply and demand are refreshed from the factories before every tick;
//!   the module only does the balancing.
//! - Events fire only on *transitions*, not every tick.

use std::collections::{BTreeMap, HashMap};

use industria_core::fixed::{FIXED_ONE, Fixed64, Ticks};
use industria_core::id::{FactoryId, PowerNetworkId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Power network
// ---------------------------------------------------------------------------

/// A single network of power plants and consumers.
///
/// The satisfaction ratio indicates how well demand is met:
/// - 1.0: all consumers fully powered
/// - 0.0: no power available
/// - Between: partial power (consumers get a reduced electric boost)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerNetwork {
    pub id: PowerNetworkId,
    pub producers: Vec<FactoryId>,
    pub consumers: Vec<FactoryId>,
    /// Supply and demand summed over the last tick.
    pub supply: u64,
    pub demand: u64,
    pub satisfaction: Fixed64,
    /// Whether this network was in brownout state last tick.
    pub was_brownout: bool,
}

impl PowerNetwork {
    pub fn new(id: PowerNetworkId) -> Self {
        Self {
            id,
            producers: Vec::new(),
            consumers: Vec::new(),
            supply: 0,
            demand: 0,
            satisfaction: FIXED_ONE,
            was_brownout: false,
        }
    }

    pub fn add_producer(&mut self, factory: FactoryId) {
        if !self.producers.contains(&factory) {
            self.producers.push(factory);
        }
    }

    pub fn add_consumer(&mut self, factory: FactoryId) {
        if !self.consumers.contains(&factory) {
            self.consumers.push(factory);
        }
    }

    /// Remove a factory from any role in this network.
    pub fn remove_factory(&mut self, factory: FactoryId) {
        self.producers.retain(|f| *f != factory);
        self.consumers.retain(|f| *f != factory);
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty() && self.consumers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Power events
// ---------------------------------------------------------------------------

/// Events emitted by the power module on state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerEvent {
    /// A network went from satisfied to brownout.
    Brownout {
        network_id: PowerNetworkId,
        /// Demand not covered by supply.
        deficit: u64,
        tick: Ticks,
    },
    /// A network went from brownout back to fully satisfied.
    Restored {
        network_id: PowerNetworkId,
        tick: Ticks,
    },
}

// ---------------------------------------------------------------------------
// Power module
// ---------------------------------------------------------------------------

/// Owns the network topology and the per-factory supply/demand figures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerModule {
    pub networks: BTreeMap<PowerNetworkId, PowerNetwork>,
    /// Current output of each power plant.
    pub supply: HashMap<FactoryId, u32>,
    /// Current demand of each consumer.
    pub demand: HashMap<FactoryId, u32>,
    next_network_id: u32,
}

impl PowerModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new network and return its id.
    pub fn create_network(&mut self) -> PowerNetworkId {
        let id = PowerNetworkId(self.next_network_id);
        self.next_network_id += 1;
        self.networks.insert(id, PowerNetwork::new(id));
        id
    }

    /// Make sure a network with `id` exists, e.g. when restoring a save.
    pub fn ensure_network(&mut self, id: PowerNetworkId) {
        self.networks
            .entry(id)
            .or_insert_with(|| PowerNetwork::new(id));
        self.next_network_id = self.next_network_id.max(id.0 + 1);
    }

    pub fn network(&self, id: PowerNetworkId) -> Option<&PowerNetwork> {
        self.networks.get(&id)
    }

    pub fn remove_network(&mut self, id: PowerNetworkId) {
        if let Some(network) = self.networks.remove(&id) {
            for f in network.producers.iter().chain(&network.consumers) {
                self.supply.remove(f);
                self.demand.remove(f);
            }
        }
    }

    /// Attach a power plant to a network.
    pub fn add_producer(&mut self, network_id: PowerNetworkId, factory: FactoryId) {
        if let Some(network) = self.networks.get_mut(&network_id) {
            network.add_producer(factory);
            self.supply.entry(factory).or_insert(0);
        }
    }

    /// Attach an electricity consumer to a network.
    pub fn add_consumer(&mut self, network_id: PowerNetworkId, factory: FactoryId) {
        if let Some(network) = self.networks.get_mut(&network_id) {
            network.add_consumer(factory);
            self.demand.entry(factory).or_insert(0);
        }
    }

    pub fn set_supply(&mut self, factory: FactoryId, amount: u32) {
        if let Some(s) = self.supply.get_mut(&factory) {
            *s = amount;
        }
    }

    pub fn set_demand(&mut self, factory: FactoryId, amount: u32) {
        if let Some(d) = self.demand.get_mut(&factory) {
            *d = amount;
        }
    }

    /// Remove a factory from the power system entirely.
    pub fn remove_factory(&mut self, factory: FactoryId) {
        self.supply.remove(&factory);
        self.demand.remove(&factory);
        for network in self.networks.values_mut() {
            network.remove_factory(factory);
        }
    }

    pub fn satisfaction(&self, network_id: PowerNetworkId) -> Option<Fixed64> {
        self.networks.get(&network_id).map(|n| n.satisfaction)
    }

    /// Balance every network once: satisfaction = min(1, supply / demand).
    /// A network without demand is fully satisfied.
    pub fn tick(&mut self, current_tick: Ticks) -> Vec<PowerEvent> {
        let mut events = Vec::new();

        for (id, network) in self.networks.iter_mut() {
            let supply: u64 = network
                .producers
                .iter()
                .filter_map(|f| self.supply.get(f))
                .map(|&s| u64::from(s))
                .sum();
            let demand: u64 = network
                .consumers
                .iter()
                .filter_map(|f| self.demand.get(f))
                .map(|&d| u64::from(d))
                .sum();

            network.supply = supply;
            network.demand = demand;
            network.satisfaction = if demand == 0 || supply >= demand {
                FIXED_ONE
            } else {
                // supply < demand, so the quotient is below one and fits.
                Fixed64::from_bits(((u128::from(supply) << 32) / u128::from(demand)) as i64)
            };

            let is_brownout = network.satisfaction < FIXED_ONE;
            if is_brownout && !network.was_brownout {
                events.push(PowerEvent::Brownout {
                    network_id: *id,
                    deficit: demand - supply,
                    tick: current_tick,
                });
            } else if !is_brownout && network.was_brownout {
                events.push(PowerEvent::Restored {
                    network_id: *id,
                    tick: current_tick,
                });
            }
            network.was_brownout = is_brownout;
        }

        events
    }
}

// ===========================================================================
// Tests
// ===========================================================================
