//! Authoritative list of built factories.
//!
//! Factories live in a slotmap arena. Links between factories are stored as
//! anchor coordinates and resolved here, so a removed factory never leaves
//! a dangling reference behind, only a coordinate that no longer resolves.

use industria_core::coord::{Coord, Footprint};
use industria_core::factory::Factory;
use industria_core::id::FactoryId;
use industria_spatial::{SpatialError, SpatialIndex};
use slotmap::SlotMap;

#[derive(Debug, Default)]
pub struct FactoryRegistry {
    factories: SlotMap<FactoryId, Factory>,
    index: SpatialIndex,
    /// Construction order; growth and distribution walk it.
    order: Vec<FactoryId>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory, claiming its footprint tiles.
    pub fn insert(&mut self, factory: Factory) -> Result<FactoryId, SpatialError> {
        let anchor = factory.anchor();
        let footprint = factory.footprint();
        if let Some(tile) = footprint.tiles(anchor).find(|t| self.index.is_occupied(*t)) {
            return Err(SpatialError::Occupied(tile));
        }
        let id = self.factories.insert(factory);
        if let Err(e) = self.index.place(id, anchor, footprint) {
            self.factories.remove(id);
            return Err(e);
        }
        self.order.push(id);
        Ok(id)
    }

    pub fn remove(&mut self, id: FactoryId) -> Option<Factory> {
        let factory = self.factories.remove(id)?;
        if let Err(e) = self.index.remove(id) {
            tracing::warn!(anchor = ?factory.anchor(), error = %e, "factory was not in the tile index");
        }
        self.order.retain(|f| *f != id);
        Some(factory)
    }

    pub fn clear(&mut self) {
        self.factories.clear();
        self.index.clear();
        self.order.clear();
    }

    pub fn get(&self, id: FactoryId) -> Option<&Factory> {
        self.factories.get(id)
    }

    pub fn get_mut(&mut self, id: FactoryId) -> Option<&mut Factory> {
        self.factories.get_mut(id)
    }

    /// Two distinct factories at once.
    pub fn get_pair_mut(&mut self, a: FactoryId, b: FactoryId) -> Option<(&mut Factory, &mut Factory)> {
        let [fa, fb] = self.factories.get_disjoint_mut([a, b])?;
        Some((fa, fb))
    }

    pub fn contains(&self, id: FactoryId) -> bool {
        self.factories.contains_key(id)
    }

    /// The factory covering `tile`, anchor or not.
    pub fn id_at(&self, tile: Coord) -> Option<FactoryId> {
        self.index.factory_at(tile)
    }

    /// Resolve a link coordinate. Only the anchor tile resolves.
    pub fn resolve(&self, anchor: Coord) -> Option<FactoryId> {
        self.id_at(anchor)
            .filter(|id| self.index.anchor(*id) == Some(anchor))
    }

    pub fn get_fab(&self, tile: Coord) -> Option<&Factory> {
        self.id_at(tile).and_then(|id| self.factories.get(id))
    }

    pub fn can_place(&self, anchor: Coord, footprint: Footprint) -> bool {
        self.index.can_place(anchor, footprint)
    }

    /// Factories with their anchor within `radius`, nearest first.
    pub fn in_radius(&self, center: Coord, radius: u32) -> Vec<FactoryId> {
        self.index.factories_in_radius(center, radius)
    }

    /// Ids in construction order.
    pub fn ids(&self) -> &[FactoryId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactoryId, &Factory)> {
        self.order
            .iter()
            .filter_map(|id| self.factories.get(*id).map(|f| (*id, f)))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
