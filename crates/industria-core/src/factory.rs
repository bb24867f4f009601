//! The per-instance factory model: goods slots, supplier/consumer links,
//! halt and city attachments, and monthly bookkeeping.
//!
//! Slot `i` of `inputs`/`outputs` always corresponds to supplier/product `i`
//! of the descriptor. Every amount derived from `prodbase` is recomputed in
//! [`Factory::set_prodbase`]; nothing derived from it is cached elsewhere.

use crate::catalog::{FactoryDescriptor, FactoryKind};
use crate::coord::{Coord, Coord3d, Footprint, Rotation};
use crate::fixed::{FIXED_ONE, Fixed64, Ticks, fixed_from_int};
use crate::id::{CityId, DescriptorId, GoodId, HaltId, PlayerId, PowerNetworkId};
use crate::stats::{
    FACTORY_STAT_COUNT, FactoryStat, GOODS_STAT_COUNT, GoodsStat, StatHistory, WeightedSum,
};

/// Smallest batch a factory ships.
pub const SHIPMENT_MIN_SIZE: u32 = 1;
/// Largest batch a factory ships in one go.
pub const SHIPMENT_MAX_SIZE: u32 = 10;
/// Output storage divided by this gives the minimum shipment size.
const SHIPMENT_STORAGE_DIVISOR: u32 = 8;

/// Runtime status, recomputed every production step and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactoryStatus {
    #[default]
    Idle,
    Producing,
    PowerStarved,
    OutputSaturated,
}

/// An input goods slot.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub good: GoodId,
    pub stored: u32,
    pub capacity: u32,
    /// Units shipped to us but not yet arrived.
    pub in_transit: u32,
    /// Fractional consumption not yet debited from `stored`.
    pub accumulated: Fixed64,
    /// Units consumed per month at the current prodbase.
    pub(crate) rate: Fixed64,
    pub stats: StatHistory,
}

impl InputSlot {
    fn new(good: GoodId) -> Self {
        Self {
            good,
            stored: 0,
            capacity: 0,
            in_transit: 0,
            accumulated: Fixed64::ZERO,
            rate: Fixed64::ZERO,
            stats: StatHistory::new(GOODS_STAT_COUNT),
        }
    }

    /// Units still wanted to fill storage, counting goods on the way.
    pub fn demand(&self) -> u32 {
        self.capacity
            .saturating_sub(self.stored.saturating_add(self.in_transit))
    }

    pub fn rate(&self) -> Fixed64 {
        self.rate
    }

    /// Stock that can still be consumed this step.
    pub(crate) fn available(&self) -> Fixed64 {
        (Fixed64::from_num(self.stored) - self.accumulated).max(Fixed64::ZERO)
    }
}

/// An output goods slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSlot {
    pub good: GoodId,
    pub stored: u32,
    pub capacity: u32,
    /// Stock needed before a shipment is sent.
    pub min_shipment: u32,
    /// Fractional production not yet added to `stored`.
    pub accumulated: Fixed64,
    /// Consumer index the next distribution round starts from.
    pub index_offset: usize,
    /// Units produced per month at the current prodbase.
    pub(crate) rate: Fixed64,
    pub stats: StatHistory,
}

impl OutputSlot {
    fn new(good: GoodId) -> Self {
        Self {
            good,
            stored: 0,
            capacity: 0,
            min_shipment: SHIPMENT_MIN_SIZE,
            accumulated: Fixed64::ZERO,
            index_offset: 0,
            rate: Fixed64::ZERO,
            stats: StatHistory::new(GOODS_STAT_COUNT),
        }
    }

    pub fn rate(&self) -> Fixed64 {
        self.rate
    }

    /// Whether enough stock piled up to send a shipment.
    pub fn is_ready_to_ship(&self) -> bool {
        self.stored >= self.min_shipment
    }

    pub(crate) fn free_space(&self) -> Fixed64 {
        (Fixed64::from_num(self.capacity) - Fixed64::from_num(self.stored) - self.accumulated)
            .max(Fixed64::ZERO)
    }
}

/// Current values of the three damped production boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Boosts {
    pub electric: Fixed64,
    pub pax: Fixed64,
    pub mail: Fixed64,
}

impl Boosts {
    pub fn total(&self) -> Fixed64 {
        self.electric + self.pax + self.mail
    }
}

/// A built factory.
#[derive(Debug, Clone, PartialEq)]
pub struct Factory {
    pub(crate) pos: Coord3d,
    pub(crate) rotation: Rotation,
    pub(crate) footprint: Footprint,
    pub(crate) owner: PlayerId,
    pub(crate) descriptor: DescriptorId,
    pub(crate) kind: FactoryKind,
    pub(crate) prodbase: u32,
    pub(crate) boosts: Boosts,
    pub(crate) inputs: Vec<InputSlot>,
    pub(crate) outputs: Vec<OutputSlot>,
    pub(crate) suppliers: Vec<Coord>,
    pub(crate) consumers: Vec<Coord>,
    pub(crate) halts: Vec<HaltId>,
    pub(crate) target_cities: Vec<CityId>,
    pub(crate) power_network: Option<PowerNetworkId>,
    pub(crate) delta_sum: Ticks,
    pub(crate) scaled_electric: u32,
    pub(crate) scaled_pax_demand: u32,
    pub(crate) scaled_mail_demand: u32,
    /// Share of our electricity demand the grid covered last tick.
    pub(crate) power_satisfaction: Fixed64,
    /// Electricity supplied (power plant) or received (consumer) last step.
    pub(crate) power: u32,
    pub(crate) pax_arrived: u32,
    pub(crate) pax_arrived_last_month: u32,
    pub(crate) mail_arrived: u32,
    pub(crate) mail_arrived_last_month: u32,
    pub(crate) production_sum: WeightedSum,
    pub(crate) power_sum: WeightedSum,
    pub(crate) electric_sum: WeightedSum,
    pub(crate) pax_sum: WeightedSum,
    pub(crate) mail_sum: WeightedSum,
    pub(crate) stats: StatHistory,
    pub(crate) status: FactoryStatus,
}

impl Factory {
    /// Instantiate a factory for `desc`. Slots mirror the descriptor.
    pub fn new(
        pos: Coord3d,
        rotation: Rotation,
        owner: PlayerId,
        descriptor: DescriptorId,
        desc: &FactoryDescriptor,
        prodbase: u32,
    ) -> Self {
        let mut factory = Self {
            pos,
            rotation,
            footprint: desc.footprint(rotation),
            owner,
            descriptor,
            kind: desc.kind(),
            prodbase: 0,
            boosts: Boosts::default(),
            inputs: desc.suppliers.iter().map(|s| InputSlot::new(s.good)).collect(),
            outputs: desc.products.iter().map(|p| OutputSlot::new(p.good)).collect(),
            suppliers: Vec::new(),
            consumers: Vec::new(),
            halts: Vec::new(),
            target_cities: Vec::new(),
            power_network: None,
            delta_sum: 0,
            scaled_electric: 0,
            scaled_pax_demand: 0,
            scaled_mail_demand: 0,
            power_satisfaction: Fixed64::ZERO,
            power: 0,
            pax_arrived: 0,
            pax_arrived_last_month: 0,
            mail_arrived: 0,
            mail_arrived_last_month: 0,
            production_sum: WeightedSum::default(),
            power_sum: WeightedSum::default(),
            electric_sum: WeightedSum::default(),
            pax_sum: WeightedSum::default(),
            mail_sum: WeightedSum::default(),
            stats: StatHistory::new(FACTORY_STAT_COUNT),
            status: FactoryStatus::Idle,
        };
        factory.set_prodbase(desc, prodbase);
        factory
    }

    /// Change the base production and re-derive every dependent amount.
    pub fn set_prodbase(&mut self, desc: &FactoryDescriptor, prodbase: u32) {
        self.prodbase = prodbase.max(1);
        let base = fixed_from_int(self.prodbase);

        for (slot, def) in self.inputs.iter_mut().zip(&desc.suppliers) {
            slot.capacity = desc.scale_to_prodbase(def.capacity, self.prodbase).max(1);
            slot.rate = def.consumption_rate.saturating_mul(base);
        }
        for (slot, def) in self.outputs.iter_mut().zip(&desc.products) {
            slot.capacity = desc.scale_to_prodbase(def.capacity, self.prodbase).max(1);
            slot.rate = def.factor.saturating_mul(base);
            slot.min_shipment = (slot.capacity / SHIPMENT_STORAGE_DIVISOR)
                .clamp(SHIPMENT_MIN_SIZE, SHIPMENT_MAX_SIZE);
            slot.stored = slot.stored.min(slot.capacity);
        }

        self.scaled_electric = desc.scale_to_prodbase(desc.electric_demand, self.prodbase);
        self.scaled_pax_demand = desc.scale_to_prodbase(desc.pax_level, self.prodbase);
        self.scaled_mail_demand = desc.scale_to_prodbase(desc.mail_level, self.prodbase);
    }

    // -- Identity --

    pub fn pos(&self) -> Coord3d {
        self.pos
    }

    /// Anchor tile; other factories refer to us by this coordinate.
    pub fn anchor(&self) -> Coord {
        self.pos.to_2d()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn descriptor(&self) -> DescriptorId {
        self.descriptor
    }

    pub fn kind(&self) -> FactoryKind {
        self.kind
    }

    pub fn prodbase(&self) -> u32 {
        self.prodbase
    }

    pub fn status(&self) -> FactoryStatus {
        self.status
    }

    pub fn boosts(&self) -> Boosts {
        self.boosts
    }

    /// `1 + electric + pax + mail`.
    pub fn prodfactor(&self) -> Fixed64 {
        FIXED_ONE + self.boosts.total()
    }

    // -- Slots --

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    pub fn input_slot(&self, good: GoodId) -> Option<usize> {
        self.inputs.iter().position(|s| s.good == good)
    }

    pub fn output_slot(&self, good: GoodId) -> Option<usize> {
        self.outputs.iter().position(|s| s.good == good)
    }

    /// Whether this factory makes `good`.
    pub fn produces(&self, good: GoodId) -> bool {
        self.output_slot(good).is_some()
    }

    pub fn total_input(&self) -> u32 {
        self.inputs.iter().map(|s| s.stored).sum()
    }

    pub fn total_transit(&self) -> u32 {
        self.inputs.iter().map(|s| s.in_transit).sum()
    }

    pub fn total_output(&self) -> u32 {
        self.outputs.iter().map(|s| s.stored).sum()
    }

    // -- Links --

    pub fn suppliers(&self) -> &[Coord] {
        &self.suppliers
    }

    /// Downstream destinations this factory ships to.
    pub fn consumers(&self) -> &[Coord] {
        &self.consumers
    }

    /// Returns `false` if `pos` was already a supplier.
    pub fn add_supplier(&mut self, pos: Coord) -> bool {
        if self.suppliers.contains(&pos) {
            return false;
        }
        self.suppliers.push(pos);
        true
    }

    pub fn remove_supplier(&mut self, pos: Coord) {
        self.suppliers.retain(|p| *p != pos);
    }

    /// Returns `false` if `pos` was already a consumer.
    pub fn add_consumer(&mut self, pos: Coord) -> bool {
        if self.consumers.contains(&pos) {
            return false;
        }
        self.consumers.push(pos);
        true
    }

    pub fn remove_consumer(&mut self, pos: Coord) {
        self.consumers.retain(|p| *p != pos);
        for slot in &mut self.outputs {
            if slot.index_offset >= self.consumers.len() {
                slot.index_offset = 0;
            }
        }
    }

    pub fn halts(&self) -> &[HaltId] {
        &self.halts
    }

    pub fn link_halt(&mut self, halt: HaltId) {
        if !self.halts.contains(&halt) {
            self.halts.push(halt);
        }
    }

    pub fn unlink_halt(&mut self, halt: HaltId) {
        self.halts.retain(|h| *h != halt);
    }

    pub fn target_cities(&self) -> &[CityId] {
        &self.target_cities
    }

    pub fn add_target_city(&mut self, city: CityId) {
        if !self.target_cities.contains(&city) {
            self.target_cities.push(city);
        }
    }

    pub fn remove_target_city(&mut self, city: CityId) {
        self.target_cities.retain(|c| *c != city);
    }

    // -- Electricity, passengers, mail --

    pub fn power_network(&self) -> Option<PowerNetworkId> {
        self.power_network
    }

    pub fn set_power_network(&mut self, network: Option<PowerNetworkId>) {
        self.power_network = network;
        if network.is_none() {
            self.power_satisfaction = Fixed64::ZERO;
        }
    }

    /// Electricity demanded, or for power plants the nominal output.
    pub fn scaled_electric_amount(&self) -> u32 {
        self.scaled_electric
    }

    /// Electricity supplied (power plant) or received (consumer) last step.
    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn power_satisfaction(&self) -> Fixed64 {
        self.power_satisfaction
    }

    /// Record how much of our demand the grid covered.
    pub fn set_power_satisfaction(&mut self, satisfaction: Fixed64) {
        self.power_satisfaction = satisfaction.clamp(Fixed64::ZERO, FIXED_ONE);
    }

    pub fn scaled_pax_demand(&self) -> u32 {
        self.scaled_pax_demand
    }

    pub fn scaled_mail_demand(&self) -> u32 {
        self.scaled_mail_demand
    }

    pub fn deliver_passengers(&mut self, amount: u32) {
        self.pax_arrived = self.pax_arrived.saturating_add(amount);
        self.stats.add(FactoryStat::PaxArrived as usize, i64::from(amount));
    }

    pub fn deliver_mail(&mut self, amount: u32) {
        self.mail_arrived = self.mail_arrived.saturating_add(amount);
        self.stats.add(FactoryStat::MailArrived as usize, i64::from(amount));
    }

    // -- Goods movement --

    /// Goods arrived at this factory. Returns the amount accepted into
    /// storage; anything beyond capacity is dropped.
    pub fn receive_goods(&mut self, good: GoodId, amount: u32) -> u32 {
        let Some(slot) = self.inputs.iter_mut().find(|s| s.good == good) else {
            return 0;
        };
        slot.in_transit = slot.in_transit.saturating_sub(amount);
        let accepted = amount.min(slot.capacity.saturating_sub(slot.stored));
        slot.stored += accepted;
        slot.stats.add(GoodsStat::Received as usize, i64::from(accepted));
        accepted
    }

    /// Goods dispatched towards this factory.
    pub fn note_in_transit(&mut self, good: GoodId, amount: u32) {
        if let Some(slot) = self.inputs.iter_mut().find(|s| s.good == good) {
            slot.in_transit = slot.in_transit.saturating_add(amount);
        }
    }

    /// Goods that were on their way to us but got lost.
    pub fn cancel_in_transit(&mut self, good: GoodId, amount: u32) {
        if let Some(slot) = self.inputs.iter_mut().find(|s| s.good == good) {
            slot.in_transit = slot.in_transit.saturating_sub(amount);
        }
    }

    /// Free input room for `good`, or `None` if we do not consume it.
    pub fn input_demand(&self, good: GoodId) -> Option<u32> {
        self.inputs.iter().find(|s| s.good == good).map(InputSlot::demand)
    }

    /// Remove up to `amount` from output slot `slot` for shipping.
    pub fn take_output(&mut self, slot: usize, amount: u32) -> u32 {
        let Some(out) = self.outputs.get_mut(slot) else {
            return 0;
        };
        let taken = amount.min(out.stored);
        out.stored -= taken;
        out.stats.add(GoodsStat::Delivered as usize, i64::from(taken));
        taken
    }

    /// Put back goods a halt refused after they were taken.
    pub fn return_output(&mut self, slot: usize, amount: u32) {
        if let Some(out) = self.outputs.get_mut(slot) {
            out.stored = (out.stored + amount).min(out.capacity);
            out.stats.add(GoodsStat::Delivered as usize, -i64::from(amount));
        }
    }

    /// Move the round-robin start of output `slot` past `consumer_index`.
    pub fn advance_index_offset(&mut self, slot: usize, consumer_index: usize) {
        let len = self.consumers.len().max(1);
        if let Some(out) = self.outputs.get_mut(slot) {
            out.index_offset = (consumer_index + 1) % len;
        }
    }

    // -- Statistics --

    pub fn stats(&self) -> &StatHistory {
        &self.stats
    }

    /// Close the running month: book averages, shift the rings.
    pub fn new_month(&mut self) {
        self.stats
            .set(FactoryStat::Production as usize, self.production_sum.take_average());
        self.stats
            .set(FactoryStat::Power as usize, self.power_sum.take_average());
        self.stats
            .set(FactoryStat::BoostElectric as usize, self.electric_sum.take_average());
        self.stats
            .set(FactoryStat::BoostPax as usize, self.pax_sum.take_average());
        self.stats
            .set(FactoryStat::BoostMail as usize, self.mail_sum.take_average());
        self.stats.roll_month();

        self.pax_arrived_last_month = self.pax_arrived;
        self.pax_arrived = 0;
        self.mail_arrived_last_month = self.mail_arrived;
        self.mail_arrived = 0;

        for slot in &mut self.inputs {
            slot.stats.set(GoodsStat::Storage as usize, i64::from(slot.stored));
            slot.stats
                .set(GoodsStat::InTransit as usize, i64::from(slot.in_transit));
            slot.stats.roll_month();
        }
        for slot in &mut self.outputs {
            slot.stats.set(GoodsStat::Storage as usize, i64::from(slot.stored));
            slot.stats.roll_month();
        }
    }

    /// Close the running year.
    pub fn new_year(&mut self) {
        self.stats.roll_year();
        for slot in &mut self.inputs {
            slot.stats.roll_year();
        }
        for slot in &mut self.outputs {
            slot.stats.roll_year();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn slots_mirror_descriptor() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "sawmill");
        let fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        assert_eq!(fab.inputs().len(), desc.suppliers.len());
        assert_eq!(fab.outputs().len(), desc.products.len());
        for (slot, def) in fab.inputs().iter().zip(&desc.suppliers) {
            assert_eq!(slot.good, def.good);
        }
        assert_eq!(fab.kind(), FactoryKind::Processor);
    }

    #[test]
    fn set_prodbase_rederives_amounts() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "sawmill");
        let mut fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        let cap16 = fab.inputs()[0].capacity;
        let rate16 = fab.outputs()[0].rate();

        fab.set_prodbase(desc, 32);
        assert_eq!(fab.inputs()[0].capacity, cap16 * 2);
        assert_eq!(fab.outputs()[0].rate(), rate16 * Fixed64::from_num(2));
    }

    #[test]
    fn rotation_swaps_footprint() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "sawmill");
        let fab = Factory::new(origin(), Rotation::Cw90, PlayerId::PUBLIC, id, desc, 16);
        assert_eq!(fab.footprint(), desc.footprint.rotated(Rotation::Cw90));
    }

    #[test]
    fn links_are_sets() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "forest");
        let mut fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        assert!(fab.add_consumer(Coord::new(1, 1)));
        assert!(!fab.add_consumer(Coord::new(1, 1)));
        assert_eq!(fab.consumers().len(), 1);
        fab.remove_consumer(Coord::new(1, 1));
        assert!(fab.consumers().is_empty());

        fab.link_halt(HaltId(3));
        fab.link_halt(HaltId(3));
        assert_eq!(fab.halts(), &[HaltId(3)]);
    }

    #[test]
    fn receive_goods_caps_at_capacity() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "sawmill");
        let mut fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        let logs = catalog.good_id("logs").unwrap();
        let cap = fab.inputs()[0].capacity;

        fab.note_in_transit(logs, 5);
        assert_eq!(fab.total_transit(), 5);
        assert_eq!(fab.receive_goods(logs, 5), 5);
        assert_eq!(fab.total_transit(), 0);
        assert_eq!(fab.receive_goods(logs, cap + 10), cap - 5);
        assert_eq!(fab.inputs()[0].stored, cap);
        assert_eq!(fab.input_demand(logs), Some(0));
    }

    #[test]
    fn receive_unknown_good_is_refused() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "sawmill");
        let mut fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        let planks = catalog.good_id("planks").unwrap();
        assert_eq!(fab.receive_goods(planks, 4), 0);
        assert_eq!(fab.input_demand(planks), None);
    }

    #[test]
    fn take_and_return_output() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "forest");
        let mut fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        fab.outputs[0].stored = 7;
        assert_eq!(fab.take_output(0, 10), 7);
        fab.return_output(0, 3);
        assert_eq!(fab.outputs()[0].stored, 3);
        assert_eq!(fab.take_output(5, 1), 0);
    }

    #[test]
    fn new_month_moves_arrivals() {
        let catalog = sample_catalog();
        let (id, desc) = descriptor(&catalog, "forest");
        let mut fab = Factory::new(origin(), Rotation::None, PlayerId::PUBLIC, id, desc, 16);
        fab.deliver_passengers(12);
        fab.new_month();
        assert_eq!(fab.pax_arrived, 0);
        assert_eq!(fab.pax_arrived_last_month, 12);
        assert_eq!(fab.stats().month(1, FactoryStat::PaxArrived as usize), 12);
    }
}
