//! Tile coordinates, rotations and building footprints.

use serde::{Deserialize, Serialize};

/// A position on the 2D tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance, the distance metric used for factory spacing and
    /// supplier reach.
    pub fn distance(&self, other: &Coord) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Chebyshev (chessboard) distance to another position.
    pub fn chebyshev_distance(&self, other: &Coord) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Coord {
        Coord::new(self.x + dx, self.y + dy)
    }
}

/// A ground position: tile plus terrain height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord3d {
    pub x: i32,
    pub y: i32,
    pub z: i8,
}

impl Coord3d {
    pub const fn new(x: i32, y: i32, z: i8) -> Self {
        Self { x, y, z }
    }

    pub fn to_2d(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// The footprint (size) of a building on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 building.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    /// Return a new footprint rotated by the given rotation.
    /// For 90/270 degrees, width and height are swapped.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::None | Rotation::Cw180 => *self,
            Rotation::Cw90 | Rotation::Cw270 => Self {
                width: self.height,
                height: self.width,
            },
        }
    }

    /// Grow the footprint by `margin` tiles on every side.
    pub fn inflated(&self, margin: u32) -> Self {
        Self::new(self.width + 2 * margin, self.height + 2 * margin)
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Iterate over all tiles occupied by this footprint at the given origin.
    /// Origin is the top-left corner.
    pub fn tiles(&self, origin: Coord) -> impl Iterator<Item = Coord> + use<> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ox = origin.x;
        let oy = origin.y;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| Coord::new(ox + dx, oy + dy)))
    }

    /// Whether `tile` lies inside this footprint placed at `origin`.
    pub fn contains(&self, origin: Coord, tile: Coord) -> bool {
        tile.x >= origin.x
            && tile.y >= origin.y
            && tile.x < origin.x + self.width as i32
            && tile.y < origin.y + self.height as i32
    }
}

/// Rotation applied to a building layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Layout index to rotation; indices wrap modulo 4.
    pub fn from_index(index: u32) -> Self {
        Self::all()[(index % 4) as usize]
    }

    pub fn index(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    /// Quarter turns swap the footprint axes.
    pub fn is_quarter_turn(self) -> bool {
        self.index() % 2 == 1
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}
