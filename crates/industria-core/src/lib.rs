//! Industria Core -- factories, goods and production for a tile-based
//! supply-chain simulation.
//!
//! This crate holds everything that concerns a single factory: the immutable
//! catalog of goods and factory descriptors, the mutable [`factory::Factory`]
//! model with its goods slots and link lists, the production engine that
//! advances a factory tick by tick, statistics, and the persistent record
//! format. Placement, chain building and the world loop live in the
//! `industria-spatial` and `industria-world` crates.
//!
//! # Production Step
//!
//! Each call to [`factory::Factory::step`] accumulates elapsed ticks and runs
//! one production step per [`production::PRODUCTION_DELTA_T`]:
//!
//! 1. **Boosts** -- electric, passenger and mail boosts track their targets,
//!    moving at most [`production::BOOST_POWER_CHANGE_RATE`] per step.
//! 2. **Work** -- input availability and output room yield a work fraction.
//! 3. **Consume/produce** -- fixed-point accumulators carry fractions; output
//!    beyond capacity is dropped.
//! 4. **Bookkeeping** -- tick-weighted sums feed the monthly statistics.
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Goods and factory descriptors, validated once at
//!   load time and frozen.
//! - [`factory::Factory`] -- One built factory instance.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`rng::SimRng`] -- The single deterministic random source.
//! - [`serialize::FactoryRecord`] -- Persistent factory state.

pub mod catalog;
pub mod climate;
pub mod coord;
pub mod factory;
pub mod fixed;
pub mod id;
pub mod production;
pub mod rng;
pub mod serialize;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
