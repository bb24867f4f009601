//! Terrain boundary: what the placement code needs to know about the map.

use industria_core::climate::Climate;
use industria_core::coord::{Coord, Footprint};
use serde::{Deserialize, Serialize};

/// One ground tile as seen by the site searcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroundTile {
    pub height: i8,
    pub climate: Climate,
    /// No slope; buildings need flat ground.
    pub flat: bool,
    /// A building (factory or city house) stands here.
    pub occupied: bool,
    pub road: bool,
    /// A river navigable by ships.
    pub river: bool,
    /// Number of trees on the tile.
    pub trees: u8,
    /// A bridge, elevated way or powerline passes above ground.
    pub elevated: bool,
}

impl GroundTile {
    /// Flat, empty temperate land.
    pub fn land() -> Self {
        Self {
            flat: true,
            ..Self::default()
        }
    }

    pub fn water() -> Self {
        Self {
            climate: Climate::Water,
            flat: true,
            ..Self::default()
        }
    }

    pub fn is_water(&self) -> bool {
        self.climate == Climate::Water
    }
}

/// Map queries and the occupancy updates the builder performs.
pub trait Terrain {
    /// Map size in tiles (width, height).
    fn size(&self) -> (u32, u32);

    fn lookup_ground(&self, pos: Coord) -> Option<&GroundTile>;

    /// Mark or clear a building on one tile.
    fn set_occupied(&mut self, pos: Coord, occupied: bool);

    fn is_within_limits(&self, pos: Coord) -> bool {
        let (w, h) = self.size();
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < w && (pos.y as u32) < h
    }

    fn climate(&self, pos: Coord) -> Climate {
        self.lookup_ground(pos)
            .map(|g| g.climate)
            .unwrap_or_default()
    }

    /// Every tile of the footprint exists, is flat land at one height, and
    /// carries no building.
    fn square_is_free(&self, origin: Coord, footprint: Footprint) -> bool {
        let Some(first) = self.lookup_ground(origin) else {
            return false;
        };
        let height = first.height;
        footprint.tiles(origin).all(|tile| {
            self.lookup_ground(tile).is_some_and(|g| {
                g.flat && !g.occupied && !g.is_water() && g.height == height
            })
        })
    }
}

/// In-memory rectangular map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<GroundTile>,
}

impl TileMap {
    /// A map of flat temperate land.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![GroundTile::land(); width as usize * height as usize],
        }
    }

    fn index(&self, pos: Coord) -> Option<usize> {
        if self.is_within_limits(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn tile_mut(&mut self, pos: Coord) -> Option<&mut GroundTile> {
        let i = self.index(pos)?;
        self.tiles.get_mut(i)
    }

    /// Apply `f` to every tile of a rectangle; tiles off the map are skipped.
    pub fn fill<F>(&mut self, origin: Coord, area: Footprint, mut f: F)
    where
        F: FnMut(&mut GroundTile),
    {
        for pos in area.tiles(origin) {
            if let Some(tile) = self.tile_mut(pos) {
                f(tile);
            }
        }
    }

    pub fn set_climate(&mut self, origin: Coord, area: Footprint, climate: Climate) {
        self.fill(origin, area, |t| t.climate = climate);
    }

    pub fn flood(&mut self, origin: Coord, area: Footprint) {
        self.fill(origin, area, |t| *t = GroundTile::water());
    }
}

impl Terrain for TileMap {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn lookup_ground(&self, pos: Coord) -> Option<&GroundTile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    fn set_occupied(&mut self, pos: Coord, occupied: bool) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.occupied = occupied;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_outside_is_none() {
        let map = TileMap::new(8, 4);
        assert!(map.lookup_ground(Coord::new(7, 3)).is_some());
        assert!(map.lookup_ground(Coord::new(8, 0)).is_none());
        assert!(map.lookup_ground(Coord::new(0, -1)).is_none());
        assert!(!map.is_within_limits(Coord::new(0, 4)));
    }

    #[test]
    fn square_is_free_checks_every_tile() {
        let mut map = TileMap::new(10, 10);
        let fp = Footprint::new(3, 2);
        assert!(map.square_is_free(Coord::new(2, 2), fp));

        map.set_occupied(Coord::new(4, 3), true);
        assert!(!map.square_is_free(Coord::new(2, 2), fp));
        assert!(map.square_is_free(Coord::new(5, 2), fp));

        // Running off the map edge.
        assert!(!map.square_is_free(Coord::new(8, 8), fp));
    }

    #[test]
    fn water_is_not_free_land() {
        let mut map = TileMap::new(10, 10);
        map.flood(Coord::new(0, 0), Footprint::new(2, 2));
        assert_eq!(map.climate(Coord::new(1, 1)), Climate::Water);
        assert!(!map.square_is_free(Coord::new(0, 0), Footprint::single()));
    }

    #[test]
    fn uneven_ground_is_not_free() {
        let mut map = TileMap::new(10, 10);
        map.fill(Coord::new(1, 0), Footprint::single(), |t| t.height = 2);
        assert!(!map.square_is_free(Coord::new(0, 0), Footprint::new(2, 1)));
    }
}
