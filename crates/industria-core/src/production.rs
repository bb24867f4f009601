//! Per-factory production engine.
//!
//! Elapsed ticks accumulate in `delta_sum`; every full [`PRODUCTION_DELTA_T`]
//! runs one production step. A step:
//!
//! 1. moves each boost (electric, pax, mail) towards its target by at most
//!    [`BOOST_POWER_CHANGE_RATE`],
//! 2. derives the work fraction from input availability and output room
//!    (minimum in [`InputMode::Classic`], average in [`InputMode::Many`]),
//!    with outputs ramping down once they fill up,
//! 3. debits inputs and credits outputs through per-slot fixed-point
//!    accumulators, dropping whatever does not fit.

use serde::{Deserialize, Serialize};

use crate::catalog::{FactoryDescriptor, FactoryKind};
use crate::factory::{Factory, FactoryStatus};
use crate::fixed::{FIXED_ONE, Fixed64, Ticks, fixed_from_int, to_percent, unit_ratio, whole_units};
use crate::stats::GoodsStat;

/// Simulation ticks per production step.
pub const PRODUCTION_DELTA_T: Ticks = 1024;
/// `prodfactor` of an unboosted factory, as reported in statistics.
pub const PRODFACTOR_BASE: u32 = 256;
/// Largest change of a boost term per production step (0.05 of base).
pub const BOOST_POWER_CHANGE_RATE: Fixed64 = Fixed64::from_bits(214_748_365);
/// Output ramp-down starts above this many minimum shipments in storage.
pub const OUTPUT_SCALE_RAMPDOWN_MULTIPLYER: u32 = 4;
/// Floor of the output ramp-down (0.05).
pub const WORK_SCALE_MINIMUM_FRACTION: Fixed64 = Fixed64::from_bits(214_748_365);
/// Default month length in ticks.
pub const DEFAULT_TICKS_PER_MONTH: Ticks = 1 << 18;

/// How several inputs combine into one work fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Every input is required; the scarcest one limits production.
    Classic,
    /// Inputs partially substitute each other; their ratios are averaged.
    #[default]
    Many,
}

/// World-wide production parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionParams {
    pub ticks_per_month: Ticks,
    pub input_mode: InputMode,
}

impl Default for ProductionParams {
    fn default() -> Self {
        Self {
            ticks_per_month: DEFAULT_TICKS_PER_MONTH,
            input_mode: InputMode::default(),
        }
    }
}

/// What happened during one call to [`Factory::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Production steps executed.
    pub steps: u32,
    /// Whole units produced over all outputs.
    pub produced: u32,
    /// Whole units consumed over all inputs.
    pub consumed: u32,
}

/// Move `current` towards `target` by at most [`BOOST_POWER_CHANGE_RATE`].
pub fn track_boost(current: Fixed64, target: Fixed64) -> Fixed64 {
    current + (target - current).clamp(-BOOST_POWER_CHANGE_RATE, BOOST_POWER_CHANGE_RATE)
}

/// Production multiplier of an output holding `stored` units: full rate up
/// to `OUTPUT_SCALE_RAMPDOWN_MULTIPLYER * min_shipment`, then linear down to
/// [`WORK_SCALE_MINIMUM_FRACTION`] at full capacity.
pub fn output_rampdown(stored: u32, capacity: u32, min_shipment: u32) -> Fixed64 {
    let threshold = min_shipment.saturating_mul(OUTPUT_SCALE_RAMPDOWN_MULTIPLYER);
    if stored <= threshold || capacity <= threshold {
        return FIXED_ONE;
    }
    if stored >= capacity {
        return WORK_SCALE_MINIMUM_FRACTION;
    }
    let span = Fixed64::from_num(capacity - threshold);
    let left = Fixed64::from_num(capacity - stored);
    WORK_SCALE_MINIMUM_FRACTION + (FIXED_ONE - WORK_SCALE_MINIMUM_FRACTION) * (left / span)
}

impl Factory {
    /// Advance the factory by `delta_t` ticks.
    pub fn step(
        &mut self,
        desc: &FactoryDescriptor,
        delta_t: Ticks,
        params: &ProductionParams,
    ) -> StepReport {
        let mut report = StepReport::default();
        self.delta_sum += delta_t;
        while self.delta_sum >= PRODUCTION_DELTA_T {
            self.delta_sum -= PRODUCTION_DELTA_T;
            self.production_step(desc, params, &mut report);
            report.steps += 1;
        }
        report
    }

    /// Ticks carried towards the next production step.
    pub fn delta_sum(&self) -> Ticks {
        self.delta_sum
    }

    fn track_boosts(&mut self, desc: &FactoryDescriptor) {
        let electric_target = if self.kind != FactoryKind::PowerPlant && self.scaled_electric > 0 {
            desc.electric_boost * self.power_satisfaction
        } else {
            Fixed64::ZERO
        };
        let pax_target = arrival_boost(
            desc.pax_boost,
            self.pax_arrived.max(self.pax_arrived_last_month),
            self.scaled_pax_demand,
        );
        let mail_target = arrival_boost(
            desc.mail_boost,
            self.mail_arrived.max(self.mail_arrived_last_month),
            self.scaled_mail_demand,
        );

        self.boosts.electric = track_boost(self.boosts.electric, electric_target);
        self.boosts.pax = track_boost(self.boosts.pax, pax_target);
        self.boosts.mail = track_boost(self.boosts.mail, mail_target);
    }

    fn production_step(
        &mut self,
        desc: &FactoryDescriptor,
        params: &ProductionParams,
        report: &mut StepReport,
    ) {
        self.track_boosts(desc);

        let prodfactor = self.prodfactor();
        let step_share =
            Fixed64::from_num(PRODUCTION_DELTA_T) / Fixed64::from_num(params.ticks_per_month.max(1));
        let scale = prodfactor * step_share;

        let needs: Vec<Fixed64> = self.inputs.iter().map(|s| s.rate.saturating_mul(scale)).collect();
        let input_ratios: Vec<Fixed64> = self
            .inputs
            .iter()
            .zip(&needs)
            .map(|(s, need)| unit_ratio(s.available(), *need))
            .collect();

        let amounts: Vec<Fixed64> = self.outputs.iter().map(|s| s.rate.saturating_mul(scale)).collect();
        let output_ratios: Vec<Fixed64> = self
            .outputs
            .iter()
            .zip(&amounts)
            .map(|(s, amount)| {
                let room = unit_ratio(s.free_space(), *amount);
                room.min(output_rampdown(s.stored, s.capacity, s.min_shipment))
            })
            .collect();

        let input_work = combine(&input_ratios, params.input_mode, Combine::Inputs);
        let output_work = combine(&output_ratios, params.input_mode, Combine::Outputs);
        let work = input_work.min(output_work);

        for ((slot, need), ratio) in self.inputs.iter_mut().zip(&needs).zip(&input_ratios) {
            let used = match params.input_mode {
                InputMode::Classic => *need * work,
                // A short input cannot be consumed beyond what it holds.
                InputMode::Many => (*need * work).min(*need * *ratio),
            };
            slot.accumulated = slot.accumulated.saturating_add(used);
            let whole = whole_units(slot.accumulated).min(slot.stored);
            slot.stored -= whole;
            slot.accumulated -= Fixed64::from_num(whole);
            slot.stats.add(GoodsStat::Consumed as usize, i64::from(whole));
            report.consumed += whole;
        }

        for ((slot, amount), ratio) in self.outputs.iter_mut().zip(&amounts).zip(&output_ratios) {
            let made = match params.input_mode {
                InputMode::Classic => *amount * work,
                InputMode::Many => *amount * input_work.min(*ratio),
            };
            slot.accumulated = slot.accumulated.saturating_add(made);
            let whole = whole_units(slot.accumulated);
            slot.accumulated -= Fixed64::from_num(whole);
            let stored = whole.min(slot.capacity.saturating_sub(slot.stored));
            slot.stored += stored;
            slot.stats.add(GoodsStat::Produced as usize, i64::from(stored));
            report.produced += stored;
        }

        self.power = match self.kind {
            FactoryKind::PowerPlant => whole_units(fixed_from_int(self.scaled_electric) * work),
            _ => whole_units(fixed_from_int(self.scaled_electric) * self.power_satisfaction),
        };

        self.status = if work == Fixed64::ZERO {
            if input_work > Fixed64::ZERO {
                FactoryStatus::OutputSaturated
            } else {
                FactoryStatus::Idle
            }
        } else if output_work < input_work {
            FactoryStatus::OutputSaturated
        } else if self.kind != FactoryKind::PowerPlant
            && self.scaled_electric > 0
            && self.power_satisfaction < FIXED_ONE
        {
            FactoryStatus::PowerStarved
        } else {
            FactoryStatus::Producing
        };

        self.production_sum
            .add(to_percent(work * prodfactor), PRODUCTION_DELTA_T);
        self.power_sum
            .add(i64::from(self.power), PRODUCTION_DELTA_T);
        self.electric_sum
            .add(to_percent(self.boosts.electric), PRODUCTION_DELTA_T);
        self.pax_sum
            .add(to_percent(self.boosts.pax), PRODUCTION_DELTA_T);
        self.mail_sum
            .add(to_percent(self.boosts.mail), PRODUCTION_DELTA_T);
    }
}

fn arrival_boost(boost: Fixed64, arrived: u32, demand: u32) -> Fixed64 {
    if demand == 0 {
        return Fixed64::ZERO;
    }
    boost * unit_ratio(fixed_from_int(arrived), fixed_from_int(demand))
}

enum Combine {
    Inputs,
    Outputs,
}

/// Fold per-slot ratios into a work fraction. No slots means no limit.
fn combine(ratios: &[Fixed64], mode: InputMode, side: Combine) -> Fixed64 {
    if ratios.is_empty() {
        return FIXED_ONE;
    }
    match (mode, side) {
        (InputMode::Classic, _) => ratios.iter().copied().fold(FIXED_ONE, Fixed64::min),
        (InputMode::Many, Combine::Inputs) => {
            let sum: Fixed64 = ratios.iter().copied().sum();
            sum / Fixed64::from_num(ratios.len())
        }
        // Any output with room keeps the factory running.
        (InputMode::Many, Combine::Outputs) => {
            ratios.iter().copied().fold(Fixed64::ZERO, Fixed64::max)
        }
    }
}
