//! The simulation loop.
//!
//! One call to [`World::advance`] runs the phases in a fixed order:
//!
//! 1. **Power**: report plant output and consumer demand, balance every
//!    network, hand the satisfaction back to the consumers.
//! 2. **Arrivals**: shipments delivered by the halts since the last call
//!    move from `in_transit` into storage.
//! 3. **Production**: every factory runs its production steps.
//! 4. **Distribution**: full output slots ship to consumers round-robin.
//! 5. **Calendar**: month and year roll-over, city traffic for the new
//!    month.

use industria_core::catalog::FactoryKind;
use industria_core::factory::SHIPMENT_MAX_SIZE;
use industria_core::fixed::Ticks;
use industria_core::id::{FactoryId, GoodId};
use industria_power::PowerEvent;

use crate::city::dispatch_traffic;
use crate::halt::Shipment;
use crate::world::World;

/// Summary of one [`World::advance`] call.
#[derive(Debug, Clone, Default)]
pub struct AdvanceResult {
    /// Production steps run, summed over factories.
    pub production_steps: u64,
    /// Shipments handed to halts.
    pub shipments: u32,
    pub months_closed: u32,
    pub power_events: Vec<PowerEvent>,
}

impl World {
    /// Advance the world by `delta_t` ticks.
    pub fn advance(&mut self, delta_t: Ticks) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        self.phase_power(&mut result);
        self.phase_arrivals();
        self.phase_production(delta_t, &mut result);
        self.phase_distribution(&mut result);
        self.phase_calendar(delta_t, &mut result);
        result
    }

    // -----------------------------------------------------------------------
    // Phase 1: Power
    // -----------------------------------------------------------------------

    fn phase_power(&mut self, result: &mut AdvanceResult) {
        for (id, f) in self.registry.iter() {
            if f.power_network().is_none() {
                continue;
            }
            if f.kind() == FactoryKind::PowerPlant {
                self.power.set_supply(id, f.power());
            } else {
                self.power.set_demand(id, f.scaled_electric_amount());
            }
        }

        let events = self.power.tick(self.calendar.tick);
        for event in &events {
            match event {
                PowerEvent::Brownout {
                    network_id,
                    deficit,
                    ..
                } => tracing::info!(?network_id, deficit, "power network browned out"),
                PowerEvent::Restored { network_id, .. } => {
                    tracing::info!(?network_id, "power network restored")
                }
            }
        }

        for id in self.registry.ids().to_vec() {
            let Some(f) = self.registry.get_mut(id) else {
                continue;
            };
            if f.kind() == FactoryKind::PowerPlant {
                continue;
            }
            if let Some(satisfaction) = f.power_network().and_then(|n| self.power.satisfaction(n)) {
                f.set_power_satisfaction(satisfaction);
            }
        }
        result.power_events = events;
    }

    // -----------------------------------------------------------------------
    // Phase 2: Arrivals
    // -----------------------------------------------------------------------

    fn phase_arrivals(&mut self) {
        for shipment in self.halts.drain_arrivals() {
            let target = self
                .registry
                .resolve(shipment.destination)
                .and_then(|id| self.registry.get_mut(id));
            let Some(factory) = target else {
                tracing::debug!(destination = ?shipment.destination, "shipment for missing factory dropped");
                continue;
            };
            let accepted = factory.receive_goods(shipment.good, shipment.amount);
            if accepted < shipment.amount {
                tracing::debug!(
                    destination = ?shipment.destination,
                    dropped = shipment.amount - accepted,
                    "input storage full"
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Production
    // -----------------------------------------------------------------------

    fn phase_production(&mut self, delta_t: Ticks, result: &mut AdvanceResult) {
        let params = self.settings.production_params();
        for id in self.registry.ids().to_vec() {
            let Some(f) = self.registry.get_mut(id) else {
                continue;
            };
            let Some(desc) = self.catalog.descriptor(f.descriptor()) else {
                continue;
            };
            let report = f.step(desc, delta_t, &params);
            result.production_steps += u64::from(report.steps);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Distribution
    // -----------------------------------------------------------------------

    fn phase_distribution(&mut self, result: &mut AdvanceResult) {
        for id in self.registry.ids().to_vec() {
            let Some(f) = self.registry.get(id) else {
                continue;
            };
            if f.halts().is_empty() || f.consumers().is_empty() {
                continue;
            }
            let ready: Vec<(usize, GoodId)> = f
                .outputs()
                .iter()
                .enumerate()
                .filter(|(_, o)| o.is_ready_to_ship())
                .map(|(slot, o)| (slot, o.good))
                .collect();
            for (slot, good) in ready {
                result.shipments += self.distribute(id, slot, good);
            }
        }
    }

    /// Ship output `slot` of `source` to its consumers, starting at the
    /// slot's round-robin offset. Each consumer with free input room gets
    /// at most one shipment. Returns the number of shipments sent.
    fn distribute(&mut self, source: FactoryId, slot: usize, good: GoodId) -> u32 {
        let Some(f) = self.registry.get(source) else {
            return 0;
        };
        let origin = f.anchor();
        let halts = f.halts().to_vec();
        let consumers = f.consumers().to_vec();
        let offset = f.outputs().get(slot).map_or(0, |o| o.index_offset);

        let mut sent = 0;
        for k in 0..consumers.len() {
            let index = (offset + k) % consumers.len();
            let destination = consumers[index];
            let Some(dest_id) = self.registry.resolve(destination) else {
                continue;
            };
            let room = self
                .registry
                .get(dest_id)
                .and_then(|d| d.input_demand(good))
                .unwrap_or(0);
            if room == 0 {
                continue;
            }

            let Some(src) = self.registry.get_mut(source) else {
                return sent;
            };
            if !src.outputs().get(slot).is_some_and(|o| o.is_ready_to_ship()) {
                break;
            }
            let amount = src.take_output(slot, room.min(SHIPMENT_MAX_SIZE));
            if amount == 0 {
                break;
            }

            let mut accepted = 0;
            for &halt in &halts {
                let shipment = Shipment {
                    good,
                    amount: amount - accepted,
                    origin,
                    destination,
                };
                accepted += self.halts.offer_goods(halt, shipment).min(amount - accepted);
                if accepted == amount {
                    break;
                }
            }
            if accepted < amount {
                src.return_output(slot, amount - accepted);
            }
            if accepted == 0 {
                continue;
            }
            src.advance_index_offset(slot, index);
            if let Some(dest) = self.registry.get_mut(dest_id) {
                dest.note_in_transit(good, accepted);
            }
            sent += 1;
        }
        sent
    }

    // -----------------------------------------------------------------------
    // Phase 5: Calendar
    // -----------------------------------------------------------------------

    fn phase_calendar(&mut self, delta_t: Ticks, result: &mut AdvanceResult) {
        let month = self.settings.ticks_per_month.max(1);
        self.calendar.tick += delta_t;
        self.calendar.month_ticks += delta_t;
        while self.calendar.month_ticks >= month {
            self.calendar.month_ticks -= month;
            self.new_month();
            result.months_closed += 1;
        }
    }

    /// Close the running month for every factory, roll the year when it is
    /// over and send the new month's city traffic.
    pub fn new_month(&mut self) {
        for id in self.registry.ids().to_vec() {
            if let Some(f) = self.registry.get_mut(id) {
                f.new_month();
            }
        }

        self.calendar.year_month += 1;
        if self.calendar.year_month % 12 == 0 {
            for id in self.registry.ids().to_vec() {
                if let Some(f) = self.registry.get_mut(id) {
                    f.new_year();
                }
            }
            tracing::debug!(year = self.calendar.year(), "new year");
        }

        self.city_traffic();
    }

    /// Refresh every city's target demand and send passengers and mail.
    fn city_traffic(&mut self) {
        let registry = &mut self.registry;
        let rng = &mut self.rng;
        for city in &mut self.cities {
            for entry in city.pax_targets.entries().to_vec() {
                if let Some(f) = registry.resolve(entry.factory).and_then(|id| registry.get(id)) {
                    city.pax_targets.update_factory(entry.factory, f.scaled_pax_demand());
                }
            }
            for entry in city.mail_targets.entries().to_vec() {
                if let Some(f) = registry.resolve(entry.factory).and_then(|id| registry.get(id)) {
                    city.mail_targets.update_factory(entry.factory, f.scaled_mail_demand());
                }
            }
            city.pax_targets.new_month();
            city.mail_targets.new_month();

            let pax = city.monthly_passengers();
            dispatch_traffic(&mut city.pax_targets, pax, rng, |pos, n| {
                if let Some(f) = registry.resolve(pos).and_then(|id| registry.get_mut(id)) {
                    f.deliver_passengers(n);
                }
            });
            let mail = city.monthly_mail();
            dispatch_traffic(&mut city.mail_targets, mail, rng, |pos, n| {
                if let Some(f) = registry.resolve(pos).and_then(|id| registry.get_mut(id)) {
                    f.deliver_mail(n);
                }
            });
        }
    }
}
