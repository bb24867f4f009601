//! World-wide tuning knobs for industry placement and production.

use industria_core::catalog::YearMonth;
use industria_core::production::{DEFAULT_TICKS_PER_MONTH, InputMode, ProductionParams};
use serde::{Deserialize, Serialize};

/// Industry settings. Every field has a default so data files only need to
/// list what they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustrySettings {
    /// Tiles kept free around every factory footprint.
    pub min_factory_spacing: u32,
    /// Farthest existing producer a new consumer cross-connects to.
    pub max_factory_spacing: u32,
    /// Search radius for new suppliers around their consumer.
    pub chain_search_radius: u32,
    /// Candidate cells a single site search may try.
    pub site_search_iterations: u32,
    /// Search radius around the random seed tile used by industry growth.
    pub density_search_radius: u32,
    /// Percent chance to cross-connect to a producer without spare output.
    pub crossconnect_factor: u32,
    /// Target electricity supply per mille of demand.
    pub electric_promille: u32,
    pub factory_worker_minimum_towns: u32,
    pub factory_worker_maximum_towns: u32,
    /// Farthest city (Manhattan distance) beyond the minimum town count.
    pub factory_worker_radius: u32,
    pub ticks_per_month: u64,
    pub input_mode: InputMode,
    /// Restrict descriptors to their introduction/retirement dates.
    pub use_timeline: bool,
    /// Calendar month the world starts in (`year * 12 + month`).
    pub start_year_month: YearMonth,
}

impl Default for IndustrySettings {
    fn default() -> Self {
        Self {
            min_factory_spacing: 6,
            max_factory_spacing: 40,
            chain_search_radius: 40,
            site_search_iterations: 20_000,
            density_search_radius: 20,
            crossconnect_factor: 33,
            electric_promille: 330,
            factory_worker_minimum_towns: 1,
            factory_worker_maximum_towns: 4,
            factory_worker_radius: 77,
            ticks_per_month: DEFAULT_TICKS_PER_MONTH,
            input_mode: InputMode::default(),
            use_timeline: false,
            start_year_month: 1930 * 12,
        }
    }
}

impl IndustrySettings {
    pub fn production_params(&self) -> ProductionParams {
        ProductionParams {
            ticks_per_month: self.ticks_per_month.max(1),
            input_mode: self.input_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = IndustrySettings::default();
        assert_eq!(s.min_factory_spacing, 6);
        assert_eq!(s.crossconnect_factor, 33);
        assert_eq!(s.input_mode, InputMode::Many);
        assert!(!s.use_timeline);
    }

    #[test]
    fn production_params_never_divide_by_zero() {
        let s = IndustrySettings {
            ticks_per_month: 0,
            ..IndustrySettings::default()
        };
        assert_eq!(s.production_params().ticks_per_month, 1);
    }
}
