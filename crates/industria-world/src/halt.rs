//! Boundary to the transport layer.
//!
//! Factories only know halts by [`HaltId`]. Moving goods between halts is
//! the transport layer's business; the world hands shipments over with
//! [`HaltNetwork::offer_goods`] and collects them again through
//! [`HaltNetwork::drain_arrivals`].

use std::collections::BTreeMap;

use industria_core::coord::Coord;
use industria_core::id::{GoodId, HaltId, PlayerId};
use serde::{Deserialize, Serialize};

/// A batch of goods travelling from one factory to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub good: GoodId,
    pub amount: u32,
    /// Anchor of the shipping factory.
    pub origin: Coord,
    /// Anchor of the receiving factory.
    pub destination: Coord,
}

/// What the world needs from the transport layer.
pub trait HaltNetwork {
    /// Halts whose catchment covers `tile`.
    fn halts_at(&self, tile: Coord) -> Vec<HaltId>;

    /// Register the factory anchored at `factory` with `halt`. Returns false
    /// if the halt does not exist.
    fn connect_factory(&mut self, halt: HaltId, factory: Coord) -> bool;

    /// Create a halt covering `tiles`.
    fn create_halt(&mut self, tiles: &[Coord], owner: PlayerId) -> HaltId;

    fn add_tile(&mut self, halt: HaltId, tile: Coord);

    /// Offer a shipment at `halt`. Returns how many units were accepted.
    fn offer_goods(&mut self, halt: HaltId, shipment: Shipment) -> u32;

    /// Shipments that reached their destination since the last call.
    fn drain_arrivals(&mut self) -> Vec<Shipment>;

    /// Forget a factory that was removed from the world.
    fn remove_factory(&mut self, factory: Coord);
}

/// Catchment radius of a [`SimpleHalts`] halt tile (Chebyshev distance).
pub const HALT_CATCHMENT: u32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Halt {
    pub owner: Option<PlayerId>,
    pub tiles: Vec<Coord>,
    pub factories: Vec<Coord>,
}

impl Halt {
    fn covers(&self, tile: Coord) -> bool {
        self.tiles
            .iter()
            .any(|t| t.chebyshev_distance(&tile) <= HALT_CATCHMENT)
    }

    fn serves(&self, factory: Coord) -> bool {
        self.factories.contains(&factory)
    }
}

/// In-memory halt network with instant transport: a shipment accepted at a
/// halt serving its origin arrives on the next drain if any halt serves its
/// destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleHalts {
    halts: BTreeMap<HaltId, Halt>,
    next_id: u32,
    in_flight: Vec<Shipment>,
}

impl SimpleHalts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt(&self, id: HaltId) -> Option<&Halt> {
        self.halts.get(&id)
    }

    pub fn halt_count(&self) -> usize {
        self.halts.len()
    }

    pub fn in_flight(&self) -> &[Shipment] {
        &self.in_flight
    }
}

impl HaltNetwork for SimpleHalts {
    fn halts_at(&self, tile: Coord) -> Vec<HaltId> {
        self.halts
            .iter()
            .filter(|(_, h)| h.covers(tile))
            .map(|(id, _)| *id)
            .collect()
    }

    fn connect_factory(&mut self, halt: HaltId, factory: Coord) -> bool {
        let Some(h) = self.halts.get_mut(&halt) else {
            return false;
        };
        if !h.factories.contains(&factory) {
            h.factories.push(factory);
        }
        true
    }

    fn create_halt(&mut self, tiles: &[Coord], owner: PlayerId) -> HaltId {
        let id = HaltId(self.next_id);
        self.next_id += 1;
        self.halts.insert(
            id,
            Halt {
                owner: Some(owner),
                tiles: tiles.to_vec(),
                factories: Vec::new(),
            },
        );
        id
    }

    fn add_tile(&mut self, halt: HaltId, tile: Coord) {
        if let Some(h) = self.halts.get_mut(&halt)
            && !h.tiles.contains(&tile)
        {
            h.tiles.push(tile);
        }
    }

    fn offer_goods(&mut self, halt: HaltId, shipment: Shipment) -> u32 {
        let Some(h) = self.halts.get(&halt) else {
            return 0;
        };
        if !h.serves(shipment.origin) {
            return 0;
        }
        let reachable = self.halts.values().any(|h| h.serves(shipment.destination));
        if !reachable || shipment.amount == 0 {
            return 0;
        }
        self.in_flight.push(shipment);
        shipment.amount
    }

    fn drain_arrivals(&mut self) -> Vec<Shipment> {
        std::mem::take(&mut self.in_flight)
    }

    fn remove_factory(&mut self, factory: Coord) {
        for h in self.halts.values_mut() {
            h.factories.retain(|f| *f != factory);
        }
        self.in_flight
            .retain(|s| s.origin != factory && s.destination != factory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use industria_core::id::PlayerId;

    fn shipment(origin: Coord, destination: Coord) -> Shipment {
        Shipment {
            good: GoodId(0),
            amount: 5,
            origin,
            destination,
        }
    }

    #[test]
    fn catchment_covers_nearby_tiles() {
        let mut halts = SimpleHalts::new();
        let h = halts.create_halt(&[Coord::new(10, 10)], PlayerId(0));
        assert_eq!(halts.halts_at(Coord::new(12, 8)), vec![h]);
        assert!(halts.halts_at(Coord::new(13, 10)).is_empty());
    }

    #[test]
    fn offer_needs_both_ends_served() {
        let mut halts = SimpleHalts::new();
        let a = Coord::new(0, 0);
        let b = Coord::new(20, 0);
        let h1 = halts.create_halt(&[a], PlayerId(0));
        let h2 = halts.create_halt(&[b], PlayerId(0));
        assert!(halts.connect_factory(h1, a));
        assert_eq!(halts.offer_goods(h1, shipment(a, b)), 0);

        assert!(halts.connect_factory(h2, b));
        assert_eq!(halts.offer_goods(h2, shipment(a, b)), 0, "h2 does not serve a");
        assert_eq!(halts.offer_goods(h1, shipment(a, b)), 5);
        assert_eq!(halts.drain_arrivals(), vec![shipment(a, b)]);
        assert!(halts.drain_arrivals().is_empty());
    }

    #[test]
    fn connect_to_missing_halt_fails() {
        let mut halts = SimpleHalts::new();
        assert!(!halts.connect_factory(HaltId(7), Coord::new(0, 0)));
    }

    #[test]
    fn removing_factory_drops_its_shipments() {
        let mut halts = SimpleHalts::new();
        let a = Coord::new(0, 0);
        let b = Coord::new(1, 0);
        let h = halts.create_halt(&[a], PlayerId(0));
        halts.connect_factory(h, a);
        halts.connect_factory(h, b);
        halts.offer_goods(h, shipment(a, b));
        halts.remove_factory(b);
        assert!(halts.in_flight().is_empty());
        assert_eq!(halts.halt(h).map(|h| h.factories.len()), Some(1));
    }

    #[test]
    fn add_tile_is_idempotent() {
        let mut halts = SimpleHalts::new();
        let h = halts.create_halt(&[Coord::new(0, 0)], PlayerId(0));
        halts.add_tile(h, Coord::new(1, 0));
        halts.add_tile(h, Coord::new(1, 0));
        assert_eq!(halts.halt(h).map(|h| h.tiles.len()), Some(2));
    }
}
