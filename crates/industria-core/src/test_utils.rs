//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{
    Catalog, CatalogBuilder, FactoryDescriptor, ProductSpec, SiteKind, SupplierSpec,
};
use crate::coord::{Coord3d, Footprint};
use crate::fixed::{FIXED_ONE, Fixed64};
use crate::id::{DescriptorId, GoodId};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn origin() -> Coord3d {
    Coord3d::new(0, 0, 0)
}

// ===========================================================================
// Recipe helpers
// ===========================================================================

pub fn supplier(good: GoodId, capacity: u32) -> SupplierSpec {
    SupplierSpec {
        good,
        capacity,
        supplier_count_wanted: 1,
        consumption_rate: FIXED_ONE,
    }
}

pub fn product(good: GoodId, capacity: u32) -> ProductSpec {
    ProductSpec {
        good,
        capacity,
        factor: FIXED_ONE,
    }
}

/// A land producer of `good`.
pub fn producer(name: &str, good: GoodId, size: Footprint) -> FactoryDescriptor {
    let mut desc = FactoryDescriptor::new(name, size);
    desc.products.push(product(good, 40));
    desc
}

/// A land consumer of `goods`.
pub fn consumer(name: &str, goods: &[GoodId], size: Footprint) -> FactoryDescriptor {
    let mut desc = FactoryDescriptor::new(name, size);
    desc.suppliers
        .extend(goods.iter().map(|&good| supplier(good, 40)));
    desc
}

// ===========================================================================
// Sample catalog
// ===========================================================================

/// Wood chain plus a few odd ones out:
///
/// - `forest` (2x2, produces logs)
/// - `sawmill` (3x2, logs -> planks)
/// - `electric_sawmill` (3x2, logs -> planks, wants electricity)
/// - `carpenter` (2x2, consumes planks, wants passengers)
/// - `nail_works` (2x2, produces nails)
/// - `furniture` (2x2, consumes planks and nails)
/// - `windmill` (1x1, power plant)
/// - `fishery` (2x2, water site, produces fish)
pub fn sample_catalog() -> Catalog {
    sample_catalog_builder()
        .build()
        .expect("sample catalog is valid")
}

pub fn sample_catalog_builder() -> CatalogBuilder {
    let mut b = CatalogBuilder::new();
    let logs = b.register_good("logs");
    let planks = b.register_good("planks");
    let nails = b.register_good("nails");
    let fish = b.register_good("fish");

    b.register_factory(producer("forest", logs, Footprint::new(2, 2)))
        .expect("forest");

    let mut sawmill = FactoryDescriptor::new("sawmill", Footprint::new(3, 2));
    sawmill.layouts = 2;
    sawmill.suppliers.push(supplier(logs, 40));
    sawmill.products.push(product(planks, 40));
    b.register_factory(sawmill.clone()).expect("sawmill");

    sawmill.name = "electric_sawmill".into();
    sawmill.electric_demand = 50;
    sawmill.electric_boost = FIXED_ONE;
    b.register_factory(sawmill).expect("electric_sawmill");

    let mut carpenter = consumer("carpenter", &[planks], Footprint::new(2, 2));
    carpenter.pax_level = 20;
    carpenter.pax_boost = fixed(0.5);
    b.register_factory(carpenter).expect("carpenter");

    b.register_factory(producer("nail_works", nails, Footprint::new(2, 2)))
        .expect("nail_works");
    b.register_factory(consumer("furniture", &[planks, nails], Footprint::new(2, 2)))
        .expect("furniture");

    let mut windmill = FactoryDescriptor::new("windmill", Footprint::single());
    windmill.is_electricity_producer = true;
    windmill.electric_demand = 100;
    b.register_factory(windmill).expect("windmill");

    let mut fishery = producer("fishery", fish, Footprint::new(2, 2));
    fishery.site = SiteKind::Water;
    b.register_factory(fishery).expect("fishery");
    b
}

/// Look up a descriptor of the sample catalog by name.
pub fn descriptor<'a>(catalog: &'a Catalog, name: &str) -> (DescriptorId, &'a FactoryDescriptor) {
    let id = catalog
        .descriptor_id(name)
        .unwrap_or_else(|| panic!("no descriptor named {name}"));
    let desc = catalog.descriptor(id).expect("id from the same catalog");
    (id, desc)
}
