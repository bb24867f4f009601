//! The industria world: factory placement, supply chains and the
//! simulation loop on top of `industria-core`.
//!
//! A [`World`] owns the catalog, settings, terrain, exclusion map, factory
//! registry, cities, halt network, power networks, the random stream and
//! the calendar. Nothing lives in globals; every operation goes through a
//! `&mut World`.
//!
//! # Building
//!
//! [`World::builder`] hands out a [`FactoryBuilder`]:
//!
//! - `build_factory` places one factory and wires it to its parent.
//! - `build_link` places a factory and recursively builds its supply chain.
//! - `build_chain_link` finds or builds suppliers for one input slot,
//!   cross-connecting existing producers where they have output to spare.
//! - `increase_industry_density` completes the newest unfinished chain,
//!   adds a power plant when electricity runs short, or plants a new
//!   consumer chain.
//!
//! # Running
//!
//! [`World::advance`] runs power, arrivals, production, distribution and
//! the calendar in that order. [`World::save`] and [`World::load`] persist
//! the whole world; [`validation::check_consistency`] verifies it.

pub mod builder;
pub mod city;
pub mod halt;
pub mod registry;
pub mod save;
pub mod settings;
pub mod simulation;
pub mod validation;
pub mod world;

#[cfg(test)]
mod testing;

pub use builder::{BuildError, FactoryBuilder, UNLIMITED_CHAINS};
pub use city::{City, FactorySet};
pub use halt::{HaltNetwork, Shipment, SimpleHalts};
pub use registry::FactoryRegistry;
pub use save::LoadError;
pub use settings::IndustrySettings;
pub use simulation::AdvanceResult;
pub use validation::{Inconsistency, check_consistency};
pub use world::{Calendar, World};
