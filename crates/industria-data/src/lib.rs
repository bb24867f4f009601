//! Data-file loading for the industria simulation.
//!
//! Goods, factory descriptors and world settings are authored in RON, TOML
//! or JSON and resolved into a validated [`industria_core::catalog::Catalog`]
//! plus [`industria_world::IndustrySettings`].

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, IndustryData, load_industry_data};
