//! Tile -> factory index: resolves any tile of a factory's footprint (in
//! particular its anchor coordinate) back to the factory.

use industria_core::coord::{Coord, Footprint};
use industria_core::id::FactoryId;
use slotmap::SecondaryMap;
use std::collections::BTreeMap;

/// Errors from spatial operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpatialError {
    #[error("tile {0:?} is occupied by another factory")]
    Occupied(Coord),
    #[error("factory is not placed on the grid")]
    NotPlaced,
    #[error("factory is already placed on the grid")]
    AlreadyPlaced,
}

/// Maintains a bidirectional mapping:
/// - `tiles`: tile -> factory covering it
/// - `positions`: factory -> anchor (top-left) tile
/// - `footprints`: factory -> rotated footprint
#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    tiles: BTreeMap<Coord, FactoryId>,
    positions: SecondaryMap<FactoryId, Coord>,
    footprints: SecondaryMap<FactoryId, Footprint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Placement --

    pub fn place(
        &mut self,
        factory: FactoryId,
        anchor: Coord,
        footprint: Footprint,
    ) -> Result<(), SpatialError> {
        if self.positions.contains_key(factory) {
            return Err(SpatialError::AlreadyPlaced);
        }
        if let Some(tile) = footprint.tiles(anchor).find(|t| self.tiles.contains_key(t)) {
            return Err(SpatialError::Occupied(tile));
        }
        for tile in footprint.tiles(anchor) {
            self.tiles.insert(tile, factory);
        }
        self.positions.insert(factory, anchor);
        self.footprints.insert(factory, footprint);
        Ok(())
    }

    /// Remove a factory. Returns its anchor.
    pub fn remove(&mut self, factory: FactoryId) -> Result<Coord, SpatialError> {
        let anchor = self.positions.remove(factory).ok_or(SpatialError::NotPlaced)?;
        let footprint = self.footprints.remove(factory).ok_or(SpatialError::NotPlaced)?;
        for tile in footprint.tiles(anchor) {
            self.tiles.remove(&tile);
        }
        Ok(anchor)
    }

    pub fn can_place(&self, anchor: Coord, footprint: Footprint) -> bool {
        footprint.tiles(anchor).all(|t| !self.tiles.contains_key(&t))
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.positions.clear();
        self.footprints.clear();
    }

    // -- Point queries --

    /// The factory covering `tile`.
    pub fn factory_at(&self, tile: Coord) -> Option<FactoryId> {
        self.tiles.get(&tile).copied()
    }

    pub fn anchor(&self, factory: FactoryId) -> Option<Coord> {
        self.positions.get(factory).copied()
    }

    pub fn footprint(&self, factory: FactoryId) -> Option<Footprint> {
        self.footprints.get(factory).copied()
    }

    pub fn is_occupied(&self, tile: Coord) -> bool {
        self.tiles.contains_key(&tile)
    }

    // -- Area queries --

    /// Factories whose anchor lies within Manhattan `radius` of `center`,
    /// nearest first.
    pub fn factories_in_radius(&self, center: Coord, radius: u32) -> Vec<FactoryId> {
        let mut found: Vec<(u32, Coord, FactoryId)> = self
            .positions
            .iter()
            .filter_map(|(id, anchor)| {
                let d = center.distance(anchor);
                (d <= radius).then_some((d, *anchor, id))
            })
            .collect();
        found.sort_by_key(|(d, anchor, _)| (*d, *anchor));
        found.into_iter().map(|(_, _, id)| id).collect()
    }

    // -- Stats --

    pub fn factory_count(&self) -> usize {
        self.positions.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn make_ids(count: usize) -> (SlotMap<FactoryId, ()>, Vec<FactoryId>) {
        let mut sm = SlotMap::with_key();
        let ids = (0..count).map(|_| sm.insert(())).collect();
        (sm, ids)
    }

    #[test]
    fn place_and_lookup_every_tile() {
        let (_sm, ids) = make_ids(1);
        let mut index = SpatialIndex::new();
        index.place(ids[0], Coord::new(5, 5), Footprint::new(2, 3)).unwrap();
        assert_eq!(index.factory_at(Coord::new(5, 5)), Some(ids[0]));
        assert_eq!(index.factory_at(Coord::new(6, 7)), Some(ids[0]));
        assert_eq!(index.factory_at(Coord::new(7, 5)), None);
        assert_eq!(index.tile_count(), 6);
    }

    #[test]
    fn overlapping_place_fails() {
        let (_sm, ids) = make_ids(2);
        let mut index = SpatialIndex::new();
        index.place(ids[0], Coord::new(0, 0), Footprint::new(2, 2)).unwrap();
        assert_eq!(
            index.place(ids[1], Coord::new(1, 1), Footprint::new(2, 2)),
            Err(SpatialError::Occupied(Coord::new(1, 1)))
        );
        assert_eq!(
            index.place(ids[0], Coord::new(9, 9), Footprint::single()),
            Err(SpatialError::AlreadyPlaced)
        );
        assert!(index.can_place(Coord::new(2, 0), Footprint::new(2, 2)));
    }

    #[test]
    fn remove_frees_tiles() {
        let (_sm, ids) = make_ids(1);
        let mut index = SpatialIndex::new();
        index.place(ids[0], Coord::new(3, 3), Footprint::new(2, 2)).unwrap();
        assert_eq!(index.remove(ids[0]), Ok(Coord::new(3, 3)));
        assert_eq!(index.tile_count(), 0);
        assert_eq!(index.remove(ids[0]), Err(SpatialError::NotPlaced));
    }

    #[test]
    fn radius_query_sorted_by_distance() {
        let (_sm, ids) = make_ids(3);
        let mut index = SpatialIndex::new();
        index.place(ids[0], Coord::new(10, 0), Footprint::single()).unwrap();
        index.place(ids[1], Coord::new(2, 0), Footprint::single()).unwrap();
        index.place(ids[2], Coord::new(50, 0), Footprint::single()).unwrap();
        assert_eq!(index.factories_in_radius(Coord::new(0, 0), 20), vec![ids[1], ids[0]]);
    }
}
