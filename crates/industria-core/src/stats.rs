//! Monthly and yearly statistics tables.
//!
//! Row 0 is the running period; closing a period shifts every row down by
//! one (the oldest row falls off) and starts a fresh row 0.

use serde::{Deserialize, Serialize};

/// Months of history kept per table.
pub const MAX_MONTH: usize = 12;
/// Years of history kept per table.
pub const MAX_YEAR: usize = 12;

/// Factory-level statistic columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryStat {
    /// Average production rate in percent of prodbase.
    Production = 0,
    /// Electricity supplied (power plants) or received (consumers).
    Power,
    BoostElectric,
    BoostPax,
    BoostMail,
    PaxArrived,
    MailArrived,
}

pub const FACTORY_STAT_COUNT: usize = 7;

/// Per goods-slot statistic columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoodsStat {
    Storage = 0,
    Received,
    Consumed,
    InTransit,
    Produced,
    Delivered,
}

pub const GOODS_STAT_COUNT: usize = 6;

/// A table of integer statistics with a monthly and a yearly ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatHistory {
    columns: usize,
    months: Vec<Vec<i64>>,
    years: Vec<Vec<i64>>,
}

impl StatHistory {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            months: vec![vec![0; columns]; MAX_MONTH],
            years: vec![vec![0; columns]; MAX_YEAR],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Add to the running month and year.
    pub fn add(&mut self, column: usize, value: i64) {
        debug_assert!(column < self.columns, "stat column {column} out of range");
        if column >= self.columns {
            return;
        }
        self.months[0][column] += value;
        self.years[0][column] += value;
    }

    /// Overwrite a level-type column (storage, averages) in the running
    /// month and year.
    pub fn set(&mut self, column: usize, value: i64) {
        debug_assert!(column < self.columns, "stat column {column} out of range");
        if column >= self.columns {
            return;
        }
        self.months[0][column] = value;
        self.years[0][column] = value;
    }

    /// Value `months_ago` months back (0 = running month).
    pub fn month(&self, months_ago: usize, column: usize) -> i64 {
        self.months
            .get(months_ago)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(0)
    }

    /// Value `years_ago` years back (0 = running year).
    pub fn year(&self, years_ago: usize, column: usize) -> i64 {
        self.years
            .get(years_ago)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(0)
    }

    /// Close the running month.
    pub fn roll_month(&mut self) {
        roll(&mut self.months, self.columns);
    }

    /// Close the running year.
    pub fn roll_year(&mut self) {
        roll(&mut self.years, self.columns);
    }
}

fn roll(rows: &mut [Vec<i64>], columns: usize) {
    rows.rotate_right(1);
    if let Some(first) = rows.first_mut() {
        *first = vec![0; columns];
    }
}

/// Tick-weighted accumulator, averaged when the month closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedSum {
    sum: i64,
    ticks: u64,
}

impl WeightedSum {
    pub fn add(&mut self, value: i64, ticks: u64) {
        self.sum += value * ticks as i64;
        self.ticks += ticks;
    }

    /// Average over the accumulated ticks, resetting the accumulator.
    pub fn take_average(&mut self) -> i64 {
        let avg = if self.ticks == 0 {
            0
        } else {
            self.sum / self.ticks as i64
        };
        *self = Self::default();
        avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_hits_month_and_year() {
        let mut h = StatHistory::new(GOODS_STAT_COUNT);
        h.add(GoodsStat::Produced as usize, 5);
        h.add(GoodsStat::Produced as usize, 3);
        assert_eq!(h.month(0, GoodsStat::Produced as usize), 8);
        assert_eq!(h.year(0, GoodsStat::Produced as usize), 8);
    }

    #[test]
    fn roll_month_shifts_rows() {
        let mut h = StatHistory::new(FACTORY_STAT_COUNT);
        h.add(FactoryStat::PaxArrived as usize, 10);
        h.roll_month();
        h.add(FactoryStat::PaxArrived as usize, 4);
        assert_eq!(h.month(0, FactoryStat::PaxArrived as usize), 4);
        assert_eq!(h.month(1, FactoryStat::PaxArrived as usize), 10);
        // The yearly ring keeps accumulating.
        assert_eq!(h.year(0, FactoryStat::PaxArrived as usize), 14);
    }

    #[test]
    fn oldest_month_falls_off() {
        let mut h = StatHistory::new(1);
        h.add(0, 1);
        for _ in 0..MAX_MONTH {
            h.roll_month();
        }
        assert!((0..MAX_MONTH).all(|m| h.month(m, 0) == 0));
    }

    #[test]
    fn out_of_range_reads_are_zero() {
        let h = StatHistory::new(2);
        assert_eq!(h.month(MAX_MONTH + 3, 0), 0);
        assert_eq!(h.year(0, 9), 0);
    }

    #[test]
    fn weighted_average() {
        let mut w = WeightedSum::default();
        w.add(100, 3);
        w.add(0, 1);
        assert_eq!(w.take_average(), 75);
        assert_eq!(w.take_average(), 0);
    }
}
