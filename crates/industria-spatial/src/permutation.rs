//! Scattered but exhaustive visiting order over a square search region.
//!
//! A linear congruential step `index = (a * index + c) mod area` with
//! `area = diam^2`, `a = diam + 1` and `c` coprime to `area` has full period,
//! so every cell is visited exactly once.

/// Default LCG increment.
pub const PERMUTATION_INCREMENT: u64 = 37;

/// Cells of a `(2 * radius + 1)^2` square in LCG order.
#[derive(Debug, Clone)]
pub struct Permutation {
    radius: u32,
    diam: u64,
    area: u64,
    a: u64,
    c: u64,
    index: u64,
    remaining: u64,
}

impl Permutation {
    /// Start at cell `start` (taken modulo the area).
    pub fn new(radius: u32, start: u64) -> Self {
        let diam = 2 * u64::from(radius) + 1;
        let area = diam * diam;
        Self {
            radius,
            diam,
            area,
            a: diam + 1,
            c: increment_for(area),
            index: start % area,
            remaining: area,
        }
    }

    pub fn area(&self) -> u64 {
        self.area
    }

    pub fn increment(&self) -> u64 {
        self.c
    }

    /// Offset of cell `index` relative to the region centre.
    pub fn offset_of(&self, index: u64) -> (i32, i32) {
        let r = self.radius as i64;
        (
            ((index % self.diam) as i64 - r) as i32,
            ((index / self.diam) as i64 - r) as i32,
        )
    }
}

impl Iterator for Permutation {
    /// Raw cell index in `0..area`.
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.index;
        self.index = (self.a * self.index + self.c) % self.area;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

/// Smallest odd increment from 37 upward that is coprime to `area`.
pub fn increment_for(area: u64) -> u64 {
    let mut c = PERMUTATION_INCREMENT;
    while gcd(c, area) != 1 {
        c += 2;
    }
    c
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn visits_every_cell_once() {
        for radius in [0, 1, 2, 5, 18, 40] {
            let perm = Permutation::new(radius, 7);
            let area = perm.area();
            let seen: HashSet<u64> = perm.collect();
            assert_eq!(seen.len() as u64, area, "radius {radius}");
        }
    }

    #[test]
    fn increment_skips_shared_factors() {
        // diam 37 -> area 1369 = 37^2.
        assert_eq!(increment_for(37 * 37), 39);
        assert_eq!(increment_for(81), 37);
    }

    #[test]
    fn offsets_span_the_square() {
        let perm = Permutation::new(2, 0);
        assert_eq!(perm.offset_of(0), (-2, -2));
        assert_eq!(perm.offset_of(24), (2, 2));
        assert_eq!(perm.offset_of(12), (0, 0));
    }

    #[test]
    fn order_is_scattered() {
        let first: Vec<u64> = Permutation::new(10, 0).take(4).collect();
        assert_ne!(first, vec![0, 1, 2, 3]);
    }
}
