//! Factory builder: places single factories, grows supplier chains below
//! them and drives periodic industry growth.
//!
//! Nothing here fails loudly. A chain that cannot be completed stays
//! partial; callers learn how many factories were built and nothing more.

use std::sync::Arc;

use industria_core::catalog::{FactoryDescriptor, SiteKind, pick_weighted};
use industria_core::climate::ClimateBits;
use industria_core::coord::{Coord, Coord3d, Footprint, Rotation};
use industria_core::factory::Factory;
use industria_core::fixed::{Fixed64, fixed_from_int};
use industria_core::id::{DescriptorId, FactoryId, GoodId, PlayerId};
use industria_spatial::{SiteQuery, find_place_near, find_site};

use crate::world::World;

/// `number_of_chains` value that builds every supplier slot.
pub const UNLIMITED_CHAINS: u32 = u32::MAX;

/// Failed placements tolerated while building suppliers for one slot.
const CHAIN_RETRIES: u32 = 25;
/// Hard cap on supplier build attempts for one slot.
const CHAIN_ATTEMPTS: u32 = 50;
/// Random descriptors tried per growth pass.
const GROWTH_ATTEMPTS: u32 = 20;
/// Producers already feeding this many consumers are not cross-connected.
const MAX_CONSUMERS_PER_PRODUCER: usize = 10;
/// Extra rings searched beyond a city's half extent.
const CITY_SEARCH_MARGIN: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("unknown factory descriptor {0:?}")]
    UnknownDescriptor(DescriptorId),
    #[error("footprint at {0:?} leaves the map")]
    OutOfBounds(Coord),
    #[error("footprint at {0:?} overlaps another factory")]
    Overlap(Coord),
}

/// Borrowed view of a world used to build factories.
pub struct FactoryBuilder<'w> {
    world: &'w mut World,
}

impl World {
    pub fn builder(&mut self) -> FactoryBuilder<'_> {
        FactoryBuilder { world: self }
    }
}

impl FactoryBuilder<'_> {
    // -----------------------------------------------------------------------
    // Single factory
    // -----------------------------------------------------------------------

    /// Build exactly one factory at `pos`. A `prodbase` of `None` draws one
    /// from the descriptor. With a `parent`, the new factory supplies the
    /// factory anchored there.
    pub fn build_factory(
        &mut self,
        parent: Option<Coord>,
        descriptor: DescriptorId,
        prodbase: Option<u32>,
        rotation: Rotation,
        pos: Coord3d,
        owner: PlayerId,
    ) -> Result<FactoryId, BuildError> {
        let catalog = Arc::clone(&self.world.catalog);
        let desc = catalog
            .descriptor(descriptor)
            .ok_or(BuildError::UnknownDescriptor(descriptor))?;
        let anchor = pos.to_2d();
        let footprint = desc.footprint(rotation);
        if !footprint
            .tiles(anchor)
            .all(|t| self.world.terrain.is_within_limits(t))
        {
            return Err(BuildError::OutOfBounds(anchor));
        }

        let prodbase = prodbase.unwrap_or_else(|| desc.random_prodbase(&mut self.world.rng));
        let factory = Factory::new(pos, rotation, owner, descriptor, desc, prodbase);
        let id = self
            .world
            .registry
            .insert(factory)
            .map_err(|_| BuildError::Overlap(anchor))?;

        self.world
            .exclusion
            .mark(anchor, footprint, self.world.settings.min_factory_spacing);
        for tile in footprint.tiles(anchor) {
            self.world.terrain.set_occupied(tile, true);
        }

        if let Some(parent) = parent.and_then(|p| self.world.registry.resolve(p)) {
            self.world.connect(id, parent);
        }

        match desc.site {
            SiteKind::City => {}
            SiteKind::Water => self.open_water_halt(id, anchor, footprint, owner),
            _ => {
                for tile in footprint.tiles(anchor) {
                    for halt in self.world.halts.halts_at(tile) {
                        self.world.attach_halt(id, halt);
                    }
                }
            }
        }

        if desc.pax_level > 0 || desc.mail_level > 0 {
            self.assign_target_cities(id);
        }

        tracing::debug!(factory = %desc.name, pos = ?anchor, prodbase, "factory built");
        Ok(id)
    }

    /// Water factories get their own halt over the footprint and the open
    /// water right next to it.
    fn open_water_halt(&mut self, id: FactoryId, anchor: Coord, footprint: Footprint, owner: PlayerId) {
        let terrain = self.world.terrain.as_ref();
        let tiles: Vec<Coord> = footprint
            .inflated(1)
            .tiles(anchor.offset(-1, -1))
            .filter(|t| {
                footprint.contains(anchor, *t)
                    || terrain.lookup_ground(*t).is_some_and(|g| g.is_water())
            })
            .collect();
        let halt = self.world.halts.create_halt(&tiles, owner);
        self.world.attach_halt(id, halt);
    }

    /// Register the factory with the nearest cities: the minimum town count
    /// unconditionally, more up to the maximum while within the radius.
    fn assign_target_cities(&mut self, id: FactoryId) {
        let Some(factory) = self.world.registry.get(id) else {
            return;
        };
        let anchor = factory.anchor();
        let pax = factory.scaled_pax_demand();
        let mail = factory.scaled_mail_demand();
        let settings = &self.world.settings;
        let min_towns = settings.factory_worker_minimum_towns as usize;
        let max_towns = settings.factory_worker_maximum_towns as usize;
        let radius = settings.factory_worker_radius;

        let mut by_distance: Vec<(u32, usize)> = self
            .world
            .cities
            .iter()
            .enumerate()
            .map(|(i, c)| (c.pos.distance(&anchor), i))
            .collect();
        by_distance.sort_unstable();

        let mut chosen = Vec::new();
        for (distance, index) in by_distance {
            if chosen.len() >= max_towns || (chosen.len() >= min_towns && distance > radius) {
                break;
            }
            chosen.push(index);
        }

        for index in chosen {
            let city = &mut self.world.cities[index];
            if pax > 0 {
                city.pax_targets.update_factory(anchor, pax);
            }
            if mail > 0 {
                city.mail_targets.update_factory(anchor, mail);
            }
            let city_id = city.id;
            if let Some(factory) = self.world.registry.get_mut(id) {
                factory.add_target_city(city_id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Chains
    // -----------------------------------------------------------------------

    /// Build one factory and then suppliers for up to `number_of_chains` of
    /// its input slots. City factories are re-sited next to the nearest
    /// city's roads. Returns the number of factories built.
    #[allow(clippy::too_many_arguments)]
    pub fn build_link(
        &mut self,
        parent: Option<Coord>,
        descriptor: DescriptorId,
        prodbase: Option<u32>,
        rotation: Rotation,
        pos: Coord3d,
        owner: PlayerId,
        number_of_chains: u32,
        ignore_climates: bool,
    ) -> u32 {
        self.build_link_root(
            parent,
            descriptor,
            prodbase,
            rotation,
            pos,
            owner,
            number_of_chains,
            ignore_climates,
            &mut Vec::new(),
        )
        .0
    }

    /// Like [`Self::build_link`], also returning the top factory.
    /// `ancestors` holds the descriptors of the consumers this factory is
    /// being built for, nearest last.
    #[allow(clippy::too_many_arguments)]
    fn build_link_root(
        &mut self,
        parent: Option<Coord>,
        descriptor: DescriptorId,
        prodbase: Option<u32>,
        rotation: Rotation,
        pos: Coord3d,
        owner: PlayerId,
        number_of_chains: u32,
        ignore_climates: bool,
        ancestors: &mut Vec<DescriptorId>,
    ) -> (u32, Option<FactoryId>) {
        let catalog = Arc::clone(&self.world.catalog);
        let Some(desc) = catalog.descriptor(descriptor) else {
            return (0, None);
        };

        let (pos, rotation) = if desc.site == SiteKind::City {
            match self.place_in_city(desc, rotation, pos.to_2d(), ignore_climates) {
                Some(found) => found,
                None => {
                    tracing::debug!(factory = %desc.name, "no room next to a city");
                    return (0, None);
                }
            }
        } else {
            (pos, rotation)
        };

        let id = match self.build_factory(parent, descriptor, prodbase, rotation, pos, owner) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(factory = %desc.name, error = %e, "factory not built");
                return (0, None);
            }
        };

        let mut count = 1;
        let chains = desc.suppliers.len().min(number_of_chains as usize);
        ancestors.push(descriptor);
        for slot in 0..chains {
            count += self.supply_slot(id, slot, owner, ancestors);
        }
        ancestors.pop();
        (count, Some(id))
    }

    /// Ring search around the nearest city hall, unrotated and rotated.
    /// When both fit, a coin flip decides.
    fn place_in_city(
        &mut self,
        desc: &FactoryDescriptor,
        rotation: Rotation,
        near: Coord,
        ignore_climates: bool,
    ) -> Option<(Coord3d, Rotation)> {
        let city = self.world.find_nearest_city(near)?;
        let query = SiteQuery {
            origin: city.pos(),
            radius: city.half_extent() + CITY_SEARCH_MARGIN,
            footprint: desc.footprint(rotation),
            site: SiteKind::City,
            climates: desc.climates,
            ignore_climates,
            max_iterations: self.world.settings.site_search_iterations,
        };
        let terrain = self.world.terrain.as_ref();
        let exclusion = &self.world.exclusion;

        let plain = find_place_near(terrain, exclusion, &query, 1);
        let turned = rotation.rotate_cw();
        let rotated = if desc.can_rotate() {
            let query = SiteQuery {
                footprint: desc.footprint(turned),
                ..query
            };
            find_place_near(terrain, exclusion, &query, 1)
        } else {
            None
        };

        match (plain, rotated) {
            (Some(p), Some(r)) => {
                if self.world.rng.random(2) == 0 {
                    Some((r, turned))
                } else {
                    Some((p, rotation))
                }
            }
            (Some(p), None) => Some((p, rotation)),
            (None, Some(r)) => Some((r, turned)),
            (None, None) => None,
        }
    }

    /// Find suppliers for input `slot` of `consumer`: cross-connect to
    /// existing producers first, then build new ones until the slot's
    /// demand is covered. Returns the number of factories built.
    pub fn build_chain_link(&mut self, consumer: FactoryId, slot: usize, owner: PlayerId) -> u32 {
        let Some(our) = self.world.registry.get(consumer) else {
            return 0;
        };
        let mut ancestors = vec![our.descriptor()];
        self.supply_slot(consumer, slot, owner, &mut ancestors)
    }

    /// Body of [`Self::build_chain_link`]. Producers whose descriptor is in
    /// `ancestors` would close a supply cycle and are never built; existing
    /// ones may still be cross-connected.
    fn supply_slot(
        &mut self,
        consumer: FactoryId,
        slot: usize,
        owner: PlayerId,
        ancestors: &mut Vec<DescriptorId>,
    ) -> u32 {
        let catalog = Arc::clone(&self.world.catalog);
        let Some(our) = self.world.registry.get(consumer) else {
            return 0;
        };
        let our_anchor = our.anchor();
        let our_prodbase = our.prodbase();
        let Some(our_desc) = catalog.descriptor(our.descriptor()) else {
            return 0;
        };
        let Some(slot_def) = our_desc.suppliers.get(slot) else {
            return 0;
        };
        let good = slot_def.good;

        let mut producers = catalog.find_producers(good, self.world.timeline());
        if producers.is_empty() {
            tracing::info!(
                good = catalog.good_name(good),
                factory = %our_desc.name,
                "no producer exists for good"
            );
            return 0;
        }
        producers.retain(|(id, _)| !ancestors.contains(id));
        if producers.is_empty() {
            tracing::debug!(
                good = catalog.good_name(good),
                factory = %our_desc.name,
                "every producer would close a supply cycle"
            );
        }

        let mut consumption = slot_def.consumption_rate.saturating_mul(fixed_from_int(our_prodbase));
        let wanted = slot_def.supplier_count_wanted as usize;
        let min_spacing = self.world.settings.min_factory_spacing;
        let max_spacing = self.world.settings.max_factory_spacing;

        // Existing producers. Ones with spare output are linked right away;
        // saturated ones may be linked anyway, and then their current
        // consumers are owed a new supplier.
        let mut found = 0;
        let mut crossconnected: Vec<FactoryId> = Vec::new();
        let mut to_correct: Vec<(FactoryId, u32)> = Vec::new();

        for candidate in self.world.registry.in_radius(our_anchor, max_spacing) {
            if consumption <= Fixed64::ZERO || (wanted != 0 && found >= wanted) {
                break;
            }
            if candidate == consumer {
                continue;
            }
            let Some(fab) = self.world.registry.get(candidate) else {
                continue;
            };
            if !fab.produces(good)
                || fab.anchor().distance(&our_anchor) < min_spacing
                || fab.consumers().contains(&our_anchor)
                || fab.suppliers().contains(&our_anchor)
                || fab.consumers().len() >= MAX_CONSUMERS_PER_PRODUCER
            {
                continue;
            }
            let their_consumers = fab.consumers().to_vec();

            let left = production_left(self.world, candidate, good);
            if left > Fixed64::ZERO {
                consumption -= left;
                self.world.connect(candidate, consumer);
                found += 1;
            } else if self.world.rng.random(100) < self.world.settings.crossconnect_factor {
                crossconnected.push(candidate);
                for pos in their_consumers {
                    let Some(owed) = self.world.registry.resolve(pos) else {
                        continue;
                    };
                    match to_correct.iter_mut().find(|(id, _)| *id == owed) {
                        Some(entry) => entry.1 += 1,
                        None => to_correct.push((owed, 1)),
                    }
                }
                found += 1;
            }
        }

        // New producers.
        let mut built = 0;
        let mut new_suppliers: Vec<FactoryId> = Vec::new();
        let mut pool = producers.clone();
        let mut ignore_climates = false;
        let mut retries = CHAIN_RETRIES;
        let mut attempts = 0;

        while consumption > Fixed64::ZERO && retries > 0 && attempts < CHAIN_ATTEMPTS {
            attempts += 1;
            let Some(producer) = pick_weighted(&pool, &mut self.world.rng) else {
                break;
            };
            let Some(pdesc) = catalog.descriptor(producer) else {
                break;
            };
            let rotation = Rotation::from_index(self.world.rng.random(u32::from(pdesc.layouts.max(1))));

            let site = if pdesc.site == SiteKind::City {
                Some(Coord3d::new(our_anchor.x, our_anchor.y, 0))
            } else {
                let query = SiteQuery {
                    origin: our_anchor,
                    radius: self.world.settings.chain_search_radius,
                    footprint: pdesc.footprint(rotation),
                    site: pdesc.site,
                    climates: pdesc.climates,
                    ignore_climates,
                    max_iterations: self.world.settings.site_search_iterations,
                };
                find_site(
                    self.world.terrain.as_ref(),
                    &self.world.exclusion,
                    &query,
                    &mut self.world.rng,
                )
            };

            let Some(pos) = site else {
                pool.retain(|(id, _)| *id != producer);
                if pool.is_empty() {
                    if ignore_climates {
                        break;
                    }
                    tracing::debug!(good = catalog.good_name(good), "retrying supplier search ignoring climates");
                    pool = producers.clone();
                    ignore_climates = true;
                }
                retries -= 1;
                continue;
            };

            let (n, root) = self.build_link_root(
                Some(our_anchor),
                producer,
                None,
                rotation,
                pos,
                owner,
                UNLIMITED_CHAINS,
                ignore_climates,
                ancestors,
            );
            built += n;
            match root {
                Some(root) => {
                    consumption -= production_of(self.world, root, good);
                    new_suppliers.push(root);
                }
                None => retries -= 1,
            }
        }

        // Only now, with every new supplier in place, settle the debts.
        for producer in crossconnected {
            self.world.connect(producer, consumer);
        }
        for (owed, mut count) in to_correct {
            for &supplier in &new_suppliers {
                if count == 0 {
                    break;
                }
                if supplier != owed {
                    self.world.connect(supplier, owed);
                    count -= 1;
                }
            }
            if count > 0 {
                let pos = self.world.registry.get(owed).map(|f| f.anchor());
                tracing::warn!(?pos, missing = count, "phantom demand left after cross-connecting");
            }
        }

        if consumption > Fixed64::ZERO {
            tracing::debug!(
                factory = %our_desc.name,
                good = catalog.good_name(good),
                "supply chain left incomplete"
            );
        }
        built
    }

    // -----------------------------------------------------------------------
    // Growth
    // -----------------------------------------------------------------------

    /// Periodic industry growth. Completes the newest consumer's chain if
    /// it lacks a supplier, otherwise builds a power plant (when supply is
    /// short of the target ratio) or a new consumer chain. Returns the
    /// number of factories built.
    pub fn increase_industry_density(&mut self, report: bool) -> u32 {
        if let Some(n) = self.complete_last_chain(report) {
            return n;
        }

        let (supply, demand) = self.world.electricity_totals();
        let promille = u64::from(self.world.settings.electric_promille);
        if demand > 0 && supply * 1000 < demand * promille {
            let n = self.grow(true, report);
            if n > 0 {
                return n;
            }
        }
        self.grow(false, report)
    }

    fn complete_last_chain(&mut self, report: bool) -> Option<u32> {
        let catalog = Arc::clone(&self.world.catalog);
        let registry = &self.world.registry;
        let last = registry.ids().iter().rev().copied().find(|id| {
            registry
                .get(*id)
                .and_then(|f| catalog.descriptor(f.descriptor()))
                .is_some_and(|d| d.is_consumer_only())
        })?;
        let fab = registry.get(last)?;
        let desc = catalog.descriptor(fab.descriptor())?;
        let missing = desc.suppliers.iter().position(|def| {
            !fab.suppliers().iter().any(|pos| {
                registry
                    .resolve(*pos)
                    .and_then(|s| registry.get(s))
                    .is_some_and(|s| s.produces(def.good))
            })
        })?;

        let n = self.build_chain_link(last, missing, PlayerId::PUBLIC);
        if n == 0 {
            return None;
        }
        if report {
            tracing::info!(target: "industria::news", factory = %desc.name, count = n, "supply chain extended");
        } else {
            tracing::debug!(factory = %desc.name, count = n, "supply chain extended");
        }
        Some(n)
    }

    /// Try random power plants or end consumers at random map spots, first
    /// honouring climates, then ignoring them.
    fn grow(&mut self, electricity: bool, report: bool) -> u32 {
        let catalog = Arc::clone(&self.world.catalog);
        let timeline = self.world.timeline();
        let (width, height) = self.world.terrain.size();
        if width < 3 || height < 3 {
            return 0;
        }

        for ignore_climates in [false, true] {
            for _ in 0..GROWTH_ATTEMPTS {
                let rng = &mut self.world.rng;
                let Some(id) = catalog.random_consumer(rng, electricity, ClimateBits::ALL, timeline) else {
                    return 0;
                };
                let Some(desc) = catalog.descriptor(id) else {
                    return 0;
                };
                let rotation = Rotation::from_index(rng.random(u32::from(desc.layouts.max(1))));
                let center = Coord::new(
                    1 + rng.random(width - 2) as i32,
                    1 + rng.random(height - 2) as i32,
                );

                let pos = if desc.site == SiteKind::City {
                    Some(Coord3d::new(center.x, center.y, 0))
                } else {
                    let query = SiteQuery {
                        origin: center,
                        radius: self.world.settings.density_search_radius,
                        footprint: desc.footprint(rotation),
                        site: desc.site,
                        climates: desc.climates,
                        ignore_climates,
                        max_iterations: self.world.settings.site_search_iterations,
                    };
                    find_site(
                        self.world.terrain.as_ref(),
                        &self.world.exclusion,
                        &query,
                        &mut self.world.rng,
                    )
                };
                let Some(pos) = pos else {
                    continue;
                };

                let n = self.build_link(None, id, None, rotation, pos, PlayerId::PUBLIC, 1, ignore_climates);
                if n > 0 {
                    if report {
                        tracing::info!(target: "industria::news", factory = %desc.name, count = n, "new industry built");
                    } else {
                        tracing::debug!(factory = %desc.name, count = n, "new industry built");
                    }
                    return n;
                }
            }
        }
        0
    }
}

/// Monthly output of `good` at `producer`.
fn production_of(world: &World, producer: FactoryId, good: GoodId) -> Fixed64 {
    let Some(fab) = world.registry.get(producer) else {
        return Fixed64::ZERO;
    };
    world
        .catalog
        .descriptor(fab.descriptor())
        .and_then(|d| d.products.iter().find(|p| p.good == good))
        .map_or(Fixed64::ZERO, |p| p.factor.saturating_mul(fixed_from_int(fab.prodbase())))
}

/// Output of `good` at `producer` not yet claimed by its consumers.
fn production_left(world: &World, producer: FactoryId, good: GoodId) -> Fixed64 {
    let Some(fab) = world.registry.get(producer) else {
        return Fixed64::ZERO;
    };
    let mut left = production_of(world, producer, good);
    for pos in fab.consumers() {
        if left <= Fixed64::ZERO {
            break;
        }
        let Some(consumer) = world.registry.resolve(*pos).and_then(|c| world.registry.get(c)) else {
            continue;
        };
        let claimed = world
            .catalog
            .descriptor(consumer.descriptor())
            .and_then(|d| d.suppliers.iter().find(|s| s.good == good))
            .map_or(Fixed64::ZERO, |s| {
                s.consumption_rate.saturating_mul(fixed_from_int(consumer.prodbase()))
            });
        left = left.saturating_sub(claimed);
    }
    left
}
