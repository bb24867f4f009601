//! Immutable goods and factory-descriptor catalog.
//!
//! Three-phase lifecycle, like any registry frozen at startup:
//! registration -> mutation -> finalization. [`CatalogBuilder::build`] runs
//! the data-integrity checks (unknown goods, self-supply, degenerate
//! descriptors). A catalog that builds never fails those checks at runtime.

use crate::climate::{Climate, ClimateBits};
use crate::coord::{Footprint, Rotation};
use crate::fixed::Fixed64;
use crate::id::{DescriptorId, GoodId};
use crate::rng::SimRng;
use std::collections::HashMap;

/// Year-month in months since year 0 (`year * 12 + month`).
pub type YearMonth = u32;

/// Ceiling for any amount scaled by prodbase: the integer range of [`Fixed64`].
pub const MAX_SCALED_AMOUNT: u32 = i32::MAX as u32;

/// Where a factory type may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    #[default]
    Land,
    Water,
    Shore,
    River,
    City,
    Forest,
}

/// What a factory does, selected once from its descriptor when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FactoryKind {
    /// No inputs, produces goods (mines, farms, forests).
    Producer,
    /// Consumes inputs and produces outputs.
    Processor,
    /// End of a chain: consumes inputs (or nothing) and produces no goods.
    Consumer,
    /// Produces electricity from its inputs instead of goods.
    PowerPlant,
}

/// A goods type definition.
#[derive(Debug, Clone)]
pub struct GoodDef {
    pub name: String,
}

/// An input slot of a factory recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierSpec {
    pub good: GoodId,
    /// Storage at the descriptor's reference productivity.
    pub capacity: u32,
    /// How many distinct suppliers the chain builder aims for.
    pub supplier_count_wanted: u32,
    /// Units consumed per month for each unit of prodbase.
    pub consumption_rate: Fixed64,
}

/// An output slot of a factory recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSpec {
    pub good: GoodId,
    /// Storage at the descriptor's reference productivity.
    pub capacity: u32,
    /// Units produced per month for each unit of prodbase.
    pub factor: Fixed64,
}

/// Static description of a factory type: recipe and placement rules.
#[derive(Debug, Clone)]
pub struct FactoryDescriptor {
    pub name: String,
    pub site: SiteKind,
    /// Footprint of the unrotated layout.
    pub footprint: Footprint,
    /// Number of distinct layouts (1, 2 or 4 rotations).
    pub layouts: u8,
    pub climates: ClimateBits,
    pub suppliers: Vec<SupplierSpec>,
    pub products: Vec<ProductSpec>,
    /// Reference prodbase. A new factory starts at `productivity + random(range)`.
    pub productivity: u32,
    pub range: u32,
    pub distribution_weight: u32,
    /// Passengers per month wanted at reference productivity.
    pub pax_level: u32,
    /// Mail per month wanted at reference productivity.
    pub mail_level: u32,
    /// Electricity demanded (or, for power plants, supplied) at reference
    /// productivity.
    pub electric_demand: u32,
    pub is_electricity_producer: bool,
    /// Maximum production boost from full electricity supply (1.0 = +100%).
    pub electric_boost: Fixed64,
    pub pax_boost: Fixed64,
    pub mail_boost: Fixed64,
    pub intro_year_month: Option<YearMonth>,
    pub retire_year_month: Option<YearMonth>,
}

impl FactoryDescriptor {
    /// A land factory with the given recipe and neutral defaults elsewhere.
    pub fn new(name: &str, footprint: Footprint) -> Self {
        Self {
            name: name.to_string(),
            site: SiteKind::Land,
            footprint,
            layouts: 1,
            climates: ClimateBits::ALL_LAND,
            suppliers: Vec::new(),
            products: Vec::new(),
            productivity: 16,
            range: 0,
            distribution_weight: 1,
            pax_level: 0,
            mail_level: 0,
            electric_demand: 0,
            is_electricity_producer: false,
            electric_boost: Fixed64::ZERO,
            pax_boost: Fixed64::ZERO,
            mail_boost: Fixed64::ZERO,
            intro_year_month: None,
            retire_year_month: None,
        }
    }

    pub fn kind(&self) -> FactoryKind {
        if self.is_electricity_producer {
            FactoryKind::PowerPlant
        } else if self.products.is_empty() {
            FactoryKind::Consumer
        } else if self.suppliers.is_empty() {
            FactoryKind::Producer
        } else {
            FactoryKind::Processor
        }
    }

    /// End-of-chain factories are the seeds industry growth starts from.
    pub fn is_consumer_only(&self) -> bool {
        self.kind() == FactoryKind::Consumer
    }

    /// Product slot index for `good`, if this factory makes it.
    pub fn product_slot(&self, good: GoodId) -> Option<usize> {
        self.products.iter().position(|p| p.good == good)
    }

    /// Supplier slot index for `good`, if this factory consumes it.
    pub fn supplier_slot(&self, good: GoodId) -> Option<usize> {
        self.suppliers.iter().position(|s| s.good == good)
    }

    pub fn footprint(&self, rotation: Rotation) -> Footprint {
        self.footprint.rotated(rotation)
    }

    /// Whether the layout can be turned into a different shape.
    pub fn can_rotate(&self) -> bool {
        self.layouts > 1 && !self.footprint.is_square()
    }

    pub fn allows_climate(&self, climate: Climate) -> bool {
        self.climates.contains(climate)
    }

    /// Whether the descriptor can be built at `timeline`. `None` disables
    /// the timeline.
    pub fn is_available(&self, timeline: Option<YearMonth>) -> bool {
        let Some(now) = timeline else {
            return true;
        };
        let introduced = self.intro_year_month.is_none_or(|intro| intro <= now);
        let retired = self.retire_year_month.is_some_and(|retire| retire <= now);
        introduced && !retired
    }

    /// Draw an initial prodbase.
    pub fn random_prodbase(&self, rng: &mut SimRng) -> u32 {
        self.productivity + rng.random(self.range)
    }

    /// Scale an amount given at reference productivity to `prodbase`.
    /// The result stays within `MAX_SCALED_AMOUNT` so it converts to
    /// [`Fixed64`] exactly.
    pub fn scale_to_prodbase(&self, amount: u32, prodbase: u32) -> u32 {
        let productivity = u64::from(self.productivity.max(1));
        (u64::from(amount) * u64::from(prodbase) / productivity).min(u64::from(MAX_SCALED_AMOUNT)) as u32
    }
}

/// Builder for constructing an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    goods: Vec<GoodDef>,
    good_name_to_id: HashMap<String, GoodId>,
    factories: Vec<FactoryDescriptor>,
    factory_name_to_id: HashMap<String, DescriptorId>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a goods type. Re-registering a name returns the
    /// existing id.
    pub fn register_good(&mut self, name: &str) -> GoodId {
        if let Some(&id) = self.good_name_to_id.get(name) {
            return id;
        }
        let id = GoodId(self.goods.len() as u32);
        self.goods.push(GoodDef {
            name: name.to_string(),
        });
        self.good_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a factory descriptor.
    pub fn register_factory(
        &mut self,
        descriptor: FactoryDescriptor,
    ) -> Result<DescriptorId, CatalogError> {
        if self.factory_name_to_id.contains_key(&descriptor.name) {
            return Err(CatalogError::DuplicateName(descriptor.name));
        }
        let id = DescriptorId(self.factories.len() as u32);
        self.factory_name_to_id.insert(descriptor.name.clone(), id);
        self.factories.push(descriptor);
        Ok(id)
    }

    /// Phase 2: Mutate an existing descriptor by name.
    pub fn mutate_factory<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut FactoryDescriptor),
    {
        let id = self
            .factory_name_to_id
            .get(name)
            .ok_or(CatalogError::NotFound(name.to_string()))?;
        f(&mut self.factories[id.0 as usize]);
        Ok(())
    }

    pub fn good_id(&self, name: &str) -> Option<GoodId> {
        self.good_name_to_id.get(name).copied()
    }

    /// Phase 3: Validate and freeze.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        for desc in &self.factories {
            let goods = desc
                .suppliers
                .iter()
                .map(|s| s.good)
                .chain(desc.products.iter().map(|p| p.good));
            for good in goods {
                if good.0 as usize >= self.goods.len() {
                    return Err(CatalogError::UnknownGood {
                        factory: desc.name.clone(),
                        good,
                    });
                }
            }
            if let Some(s) = desc
                .suppliers
                .iter()
                .find(|s| desc.product_slot(s.good).is_some())
            {
                return Err(CatalogError::SelfSupply {
                    factory: desc.name.clone(),
                    good: self.goods[s.good.0 as usize].name.clone(),
                });
            }
            if desc.productivity == 0 {
                return Err(CatalogError::ZeroProductivity(desc.name.clone()));
            }
            if desc.footprint.area() == 0 {
                return Err(CatalogError::EmptyFootprint(desc.name.clone()));
            }
        }

        Ok(Catalog {
            goods: self.goods,
            good_name_to_id: self.good_name_to_id,
            factories: self.factories,
            factory_name_to_id: self.factory_name_to_id,
        })
    }
}

/// Immutable catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Catalog {
    goods: Vec<GoodDef>,
    good_name_to_id: HashMap<String, GoodId>,
    factories: Vec<FactoryDescriptor>,
    factory_name_to_id: HashMap<String, DescriptorId>,
}

impl Catalog {
    pub fn good(&self, id: GoodId) -> Option<&GoodDef> {
        self.goods.get(id.0 as usize)
    }

    pub fn good_id(&self, name: &str) -> Option<GoodId> {
        self.good_name_to_id.get(name).copied()
    }

    pub fn good_name(&self, id: GoodId) -> &str {
        self.good(id).map(|g| g.name.as_str()).unwrap_or("<unknown>")
    }

    pub fn descriptor(&self, id: DescriptorId) -> Option<&FactoryDescriptor> {
        self.factories.get(id.0 as usize)
    }

    pub fn descriptor_id(&self, name: &str) -> Option<DescriptorId> {
        self.factory_name_to_id.get(name).copied()
    }

    /// Look up a descriptor by name.
    pub fn get_descriptor(&self, name: &str) -> Option<&FactoryDescriptor> {
        self.descriptor_id(name).and_then(|id| self.descriptor(id))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = (DescriptorId, &FactoryDescriptor)> {
        self.factories
            .iter()
            .enumerate()
            .map(|(i, d)| (DescriptorId(i as u32), d))
    }

    pub fn good_count(&self) -> usize {
        self.goods.len()
    }

    pub fn descriptor_count(&self) -> usize {
        self.factories.len()
    }

    /// Every available descriptor producing `good`, with its distribution
    /// weight. Descriptors with zero weight are left out.
    pub fn find_producers(
        &self,
        good: GoodId,
        timeline: Option<YearMonth>,
    ) -> Vec<(DescriptorId, u32)> {
        self.descriptors()
            .filter(|(_, d)| {
                d.distribution_weight > 0
                    && d.is_available(timeline)
                    && d.product_slot(good).is_some()
            })
            .map(|(id, d)| (id, d.distribution_weight))
            .collect()
    }

    pub fn count_producers(&self, good: GoodId, timeline: Option<YearMonth>) -> usize {
        self.find_producers(good, timeline).len()
    }

    /// Weighted random pick of an end-of-chain consumer (or, with
    /// `electricity`, a power plant) that tolerates at least one of
    /// `climates`.
    pub fn random_consumer(
        &self,
        rng: &mut SimRng,
        electricity: bool,
        climates: ClimateBits,
        timeline: Option<YearMonth>,
    ) -> Option<DescriptorId> {
        let candidates: Vec<(DescriptorId, u32)> = self
            .descriptors()
            .filter(|(_, d)| {
                let role_matches = if electricity {
                    d.is_electricity_producer
                } else {
                    d.is_consumer_only()
                };
                role_matches
                    && d.distribution_weight > 0
                    && d.is_available(timeline)
                    && d.climates.0 & climates.0 != 0
            })
            .map(|(id, d)| (id, d.distribution_weight))
            .collect();
        pick_weighted(&candidates, rng)
    }
}

/// Cumulative-weight draw over a weighted descriptor list.
pub fn pick_weighted(list: &[(DescriptorId, u32)], rng: &mut SimRng) -> Option<DescriptorId> {
    let weights: Vec<u32> = list.iter().map(|(_, w)| *w).collect();
    rng.pick_weighted(&weights).map(|i| list[i].0)
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate factory name: {0}")]
    DuplicateName(String),
    #[error("factory {factory} references unknown good {good:?}")]
    UnknownGood { factory: String, good: GoodId },
    #[error("factory {factory} would supply itself with {good}")]
    SelfSupply { factory: String, good: String },
    #[error("factory {0} has zero productivity")]
    ZeroProductivity(String),
    #[error("factory {0} has an empty footprint")]
    EmptyFootprint(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FIXED_ONE;

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        let logs = b.register_good("logs");
        let planks = b.register_good("planks");

        let mut forest = FactoryDescriptor::new("forest", Footprint::new(2, 2));
        forest.products.push(ProductSpec {
            good: logs,
            capacity: 40,
            factor: FIXED_ONE,
        });
        b.register_factory(forest).unwrap();

        let mut sawmill = FactoryDescriptor::new("sawmill", Footprint::new(3, 2));
        sawmill.suppliers.push(SupplierSpec {
            good: logs,
            capacity: 40,
            supplier_count_wanted: 1,
            consumption_rate: FIXED_ONE,
        });
        sawmill.products.push(ProductSpec {
            good: planks,
            capacity: 40,
            factor: FIXED_ONE,
        });
        b.register_factory(sawmill).unwrap();

        let mut carpenter = FactoryDescriptor::new("carpenter", Footprint::new(2, 2));
        carpenter.suppliers.push(SupplierSpec {
            good: planks,
            capacity: 30,
            supplier_count_wanted: 1,
            consumption_rate: FIXED_ONE,
        });
        b.register_factory(carpenter).unwrap();
        b
    }

    #[test]
    fn register_and_build() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.good_count(), 2);
        assert_eq!(cat.descriptor_count(), 3);
        assert!(cat.get_descriptor("sawmill").is_some());
        assert!(cat.get_descriptor("nonexistent").is_none());
    }

    #[test]
    fn kinds_follow_recipes() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.get_descriptor("forest").unwrap().kind(), FactoryKind::Producer);
        assert_eq!(cat.get_descriptor("sawmill").unwrap().kind(), FactoryKind::Processor);
        assert_eq!(cat.get_descriptor("carpenter").unwrap().kind(), FactoryKind::Consumer);
        assert!(cat.get_descriptor("carpenter").unwrap().is_consumer_only());
    }

    #[test]
    fn find_producers_lists_weighted_candidates() {
        let cat = setup_builder().build().unwrap();
        let logs = cat.good_id("logs").unwrap();
        let producers = cat.find_producers(logs, None);
        assert_eq!(producers, vec![(cat.descriptor_id("forest").unwrap(), 1)]);
        assert_eq!(cat.count_producers(cat.good_id("planks").unwrap(), None), 1);
    }

    #[test]
    fn timeline_hides_unintroduced_factories() {
        let mut b = setup_builder();
        b.mutate_factory("forest", |d| d.intro_year_month = Some(1900 * 12))
            .unwrap();
        let cat = b.build().unwrap();
        let logs = cat.good_id("logs").unwrap();
        assert_eq!(cat.count_producers(logs, Some(1850 * 12)), 0);
        assert_eq!(cat.count_producers(logs, Some(1950 * 12)), 1);
        assert_eq!(cat.count_producers(logs, None), 1);
    }

    #[test]
    fn self_supply_rejected() {
        let mut b = setup_builder();
        let logs = b.good_id("logs").unwrap();
        b.mutate_factory("forest", |d| {
            d.suppliers.push(SupplierSpec {
                good: logs,
                capacity: 10,
                supplier_count_wanted: 1,
                consumption_rate: FIXED_ONE,
            })
        })
        .unwrap();
        match b.build() {
            Err(CatalogError::SelfSupply { factory, good }) => {
                assert_eq!(factory, "forest");
                assert_eq!(good, "logs");
            }
            other => panic!("expected SelfSupply, got: {other:?}"),
        }
    }

    #[test]
    fn no_descriptor_produces_its_own_inputs() {
        let cat = setup_builder().build().unwrap();
        for (id, desc) in cat.descriptors() {
            for s in &desc.suppliers {
                assert!(
                    cat.find_producers(s.good, None).iter().all(|(p, _)| *p != id),
                    "{} produces its own input",
                    desc.name
                );
            }
        }
    }

    #[test]
    fn unknown_good_rejected() {
        let mut b = setup_builder();
        b.mutate_factory("carpenter", |d| {
            d.products.push(ProductSpec {
                good: GoodId(99),
                capacity: 1,
                factor: FIXED_ONE,
            })
        })
        .unwrap();
        assert!(matches!(b.build(), Err(CatalogError::UnknownGood { .. })));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut b = setup_builder();
        let err = b
            .register_factory(FactoryDescriptor::new("forest", Footprint::single()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(name) if name == "forest"));
    }

    #[test]
    fn mutate_nonexistent_fails() {
        let mut b = setup_builder();
        assert!(matches!(
            b.mutate_factory("nonexistent", |_| {}),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn random_consumer_respects_climate() {
        let mut b = setup_builder();
        b.mutate_factory("carpenter", |d| {
            d.climates = ClimateBits::NONE.with(Climate::Desert)
        })
        .unwrap();
        let cat = b.build().unwrap();
        let mut rng = SimRng::new(5);
        assert_eq!(
            cat.random_consumer(&mut rng, false, Climate::Temperate.bit(), None),
            None
        );
        assert_eq!(
            cat.random_consumer(&mut rng, false, Climate::Desert.bit(), None),
            cat.descriptor_id("carpenter")
        );
        assert_eq!(cat.random_consumer(&mut rng, true, ClimateBits::ALL, None), None);
    }

    #[test]
    fn prodbase_scaling() {
        let cat = setup_builder().build().unwrap();
        let sawmill = cat.get_descriptor("sawmill").unwrap();
        assert_eq!(sawmill.scale_to_prodbase(40, 16), 40);
        assert_eq!(sawmill.scale_to_prodbase(40, 32), 80);
        assert_eq!(sawmill.scale_to_prodbase(40, 8), 20);
        assert_eq!(sawmill.scale_to_prodbase(u32::MAX, u32::MAX), MAX_SCALED_AMOUNT);
    }
}
