//! World consistency checks.
//!
//! Used after loading and in tests to make sure the registry, the links
//! between factories and the exclusion map all agree with each other.

use industria_core::coord::Coord;

use crate::world::World;

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// The factory's descriptor is not in the catalog.
    UnknownDescriptor { factory: Coord },
    /// Slot goods or counts differ from the descriptor.
    SlotMismatch { factory: Coord, side: &'static str },
    /// A supplier coordinate does not resolve to a factory.
    DanglingSupplier { factory: Coord, supplier: Coord },
    /// A consumer coordinate does not resolve to a factory.
    DanglingConsumer { factory: Coord, consumer: Coord },
    /// `supplier` lists `consumer` but not the other way round, or vice versa.
    AsymmetricLink { supplier: Coord, consumer: Coord },
    /// A tile of the factory's spacing area is not marked.
    NotExcluded { factory: Coord, tile: Coord },
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Run every check and collect what is wrong. An empty result means the
/// world is consistent.
pub fn check_consistency(world: &World) -> Vec<Inconsistency> {
    let mut found = Vec::new();
    check_slots(world, &mut found);
    check_links(world, &mut found);
    check_exclusion(world, &mut found);
    found
}

fn check_slots(world: &World, found: &mut Vec<Inconsistency>) {
    for (_, f) in world.factories().iter() {
        let factory = f.anchor();
        let Some(desc) = world.catalog().descriptor(f.descriptor()) else {
            found.push(Inconsistency::UnknownDescriptor { factory });
            continue;
        };
        let inputs_match = f.inputs().len() == desc.suppliers.len()
            && f.inputs().iter().zip(&desc.suppliers).all(|(s, d)| s.good == d.good);
        if !inputs_match {
            found.push(Inconsistency::SlotMismatch {
                factory,
                side: "input",
            });
        }
        let outputs_match = f.outputs().len() == desc.products.len()
            && f.outputs().iter().zip(&desc.products).all(|(s, d)| s.good == d.good);
        if !outputs_match {
            found.push(Inconsistency::SlotMismatch {
                factory,
                side: "output",
            });
        }
    }
}

fn check_links(world: &World, found: &mut Vec<Inconsistency>) {
    let registry = world.factories();
    for (_, f) in registry.iter() {
        let factory = f.anchor();
        for &supplier in f.suppliers() {
            match registry.resolve(supplier).and_then(|id| registry.get(id)) {
                None => found.push(Inconsistency::DanglingSupplier { factory, supplier }),
                Some(s) if !s.consumers().contains(&factory) => {
                    found.push(Inconsistency::AsymmetricLink {
                        supplier,
                        consumer: factory,
                    })
                }
                Some(_) => {}
            }
        }
        for &consumer in f.consumers() {
            match registry.resolve(consumer).and_then(|id| registry.get(id)) {
                None => found.push(Inconsistency::DanglingConsumer { factory, consumer }),
                Some(c) if !c.suppliers().contains(&factory) => {
                    found.push(Inconsistency::AsymmetricLink {
                        supplier: factory,
                        consumer,
                    })
                }
                Some(_) => {}
            }
        }
    }
}

fn check_exclusion(world: &World, found: &mut Vec<Inconsistency>) {
    let spacing = world.settings().min_factory_spacing as i32;
    let (width, height) = world.exclusion().size();
    let (width, height) = (width as i32, height as i32);
    for (_, f) in world.factories().iter() {
        let origin = f.anchor();
        let footprint = f.footprint();
        let x0 = (origin.x - spacing).max(0);
        let y0 = (origin.y - spacing).max(0);
        let x1 = (origin.x + footprint.width as i32 + spacing).min(width);
        let y1 = (origin.y + footprint.height as i32 + spacing).min(height);
        // One finding per factory is enough to point at the problem.
        let missing = (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| Coord::new(x, y)))
            .find(|t| !world.exclusion().is_excluded(*t));
        if let Some(tile) = missing {
            found.push(Inconsistency::NotExcluded {
                factory: origin,
                tile,
            });
        }
    }
}
