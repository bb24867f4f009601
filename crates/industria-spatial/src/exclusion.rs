//! Factory exclusion map: one bit per tile, set when the tile lies within
//! the spacing margin of a built factory.
//!
//! Marks are only ever added. Removing a factory leaves its margin marked
//! until the map is rebuilt from the remaining factories.

use industria_core::coord::{Coord, Footprint};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionMap {
    width: u32,
    height: u32,
    row_bytes: usize,
    bits: Vec<u8>,
}

impl ExclusionMap {
    /// An empty map of `ceil(width / 8) * height` bytes.
    pub fn new(width: u32, height: u32) -> Self {
        let row_bytes = width.div_ceil(8) as usize;
        Self {
            width,
            height,
            row_bytes,
            bits: vec![0; row_bytes * height as usize],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn byte_len(&self) -> usize {
        self.bits.len()
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Mark `[origin - spacing, origin + footprint + spacing)` on both axes,
    /// clamped to the map.
    pub fn mark(&mut self, origin: Coord, footprint: Footprint, spacing: u32) {
        let spacing = spacing as i64;
        let x0 = (origin.x as i64 - spacing).max(0);
        let y0 = (origin.y as i64 - spacing).max(0);
        let x1 = (origin.x as i64 + footprint.width as i64 + spacing).min(self.width as i64);
        let y1 = (origin.y as i64 + footprint.height as i64 + spacing).min(self.height as i64);

        for y in y0..y1 {
            let row = y as usize * self.row_bytes;
            for x in x0..x1 {
                self.bits[row + x as usize / 8] |= 1 << (x % 8);
            }
        }
    }

    /// Whether `pos` is too close to a factory. Positions off the map are
    /// never excluded.
    pub fn is_excluded(&self, pos: Coord) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return false;
        }
        let byte = pos.y as usize * self.row_bytes + pos.x as usize / 8;
        self.bits
            .get(byte)
            .is_some_and(|b| b & (1 << (pos.x % 8)) != 0)
    }

    /// No tile of the footprint is excluded.
    pub fn is_area_free(&self, origin: Coord, footprint: Footprint) -> bool {
        footprint.tiles(origin).all(|t| !self.is_excluded(t))
    }

    /// Throw away every mark and re-mark the given factories.
    pub fn rebuild<I>(&mut self, factories: I, spacing: u32)
    where
        I: IntoIterator<Item = (Coord, Footprint)>,
    {
        self.clear();
        for (origin, footprint) in factories {
            self.mark(origin, footprint, spacing);
        }
    }
}
