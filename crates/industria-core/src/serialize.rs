//! Persistent factory state.
//!
//! A [`FactoryRecord`] holds everything about a factory that survives a
//! save: identity, prodbase, slot contents, link coordinates and statistics.
//! Amounts derived from prodbase (capacities, rates, shipment sizes, demand
//! levels) are not stored; loading re-derives them from the descriptor,
//! which is looked up again by name. Runtime status is not persisted.

use crate::catalog::Catalog;
use crate::coord::{Coord, Coord3d, Rotation};
use crate::factory::{Boosts, Factory, FactoryStatus};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{CityId, HaltId, PlayerId, PowerNetworkId};
use crate::stats::{StatHistory, WeightedSum};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an industria snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x1DD5_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("factory references descriptor {0:?} missing from the catalog")]
    UnknownDescriptor(u32),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("unknown factory descriptor: {0}")]
    UnknownDescriptor(String),
    #[error("factory {factory} has {found} {side} slots, descriptor declares {expected}")]
    SlotMismatch {
        factory: String,
        side: &'static str,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Simulation tick at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub stored: u32,
    pub in_transit: u32,
    pub accumulated: Fixed64,
    pub stats: StatHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub stored: u32,
    pub accumulated: Fixed64,
    pub index_offset: usize,
    pub stats: StatHistory,
}

/// Serializable snapshot of one factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryRecord {
    pub pos: Coord3d,
    pub rotation: Rotation,
    pub owner: PlayerId,
    pub descriptor: String,
    pub prodbase: u32,
    pub boost_electric: Fixed64,
    pub boost_pax: Fixed64,
    pub boost_mail: Fixed64,
    pub inputs: Vec<InputRecord>,
    pub outputs: Vec<OutputRecord>,
    pub suppliers: Vec<Coord>,
    pub consumers: Vec<Coord>,
    pub halts: Vec<HaltId>,
    pub target_cities: Vec<CityId>,
    pub power_network: Option<PowerNetworkId>,
    pub delta_sum: Ticks,
    pub power_satisfaction: Fixed64,
    pub power: u32,
    pub pax_arrived: [u32; 2],
    pub mail_arrived: [u32; 2],
    /// Production, power, electric, pax and mail running sums.
    pub sums: [WeightedSum; 5],
    pub stats: StatHistory,
}

impl Factory {
    /// Capture the persistent state of this factory.
    pub fn to_record(&self, catalog: &Catalog) -> Result<FactoryRecord, SerializeError> {
        let desc = catalog
            .descriptor(self.descriptor)
            .ok_or(SerializeError::UnknownDescriptor(self.descriptor.0))?;
        Ok(FactoryRecord {
            pos: self.pos,
            rotation: self.rotation,
            owner: self.owner,
            descriptor: desc.name.clone(),
            prodbase: self.prodbase,
            boost_electric: self.boosts.electric,
            boost_pax: self.boosts.pax,
            boost_mail: self.boosts.mail,
            inputs: self
                .inputs
                .iter()
                .map(|s| InputRecord {
                    stored: s.stored,
                    in_transit: s.in_transit,
                    accumulated: s.accumulated,
                    stats: s.stats.clone(),
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|s| OutputRecord {
                    stored: s.stored,
                    accumulated: s.accumulated,
                    index_offset: s.index_offset,
                    stats: s.stats.clone(),
                })
                .collect(),
            suppliers: self.suppliers.clone(),
            consumers: self.consumers.clone(),
            halts: self.halts.clone(),
            target_cities: self.target_cities.clone(),
            power_network: self.power_network,
            delta_sum: self.delta_sum,
            power_satisfaction: self.power_satisfaction,
            power: self.power,
            pax_arrived: [self.pax_arrived, self.pax_arrived_last_month],
            mail_arrived: [self.mail_arrived, self.mail_arrived_last_month],
            sums: [
                self.production_sum,
                self.power_sum,
                self.electric_sum,
                self.pax_sum,
                self.mail_sum,
            ],
            stats: self.stats.clone(),
        })
    }

    /// Rebuild a factory from its record, re-linking the descriptor by name.
    ///
    /// Supplier and consumer coordinates are taken as-is; resolving them to
    /// live factories is the owner's job once every factory is loaded.
    pub fn from_record(record: FactoryRecord, catalog: &Catalog) -> Result<Self, DeserializeError> {
        let id = catalog
            .descriptor_id(&record.descriptor)
            .ok_or_else(|| DeserializeError::UnknownDescriptor(record.descriptor.clone()))?;
        let desc = catalog
            .descriptor(id)
            .ok_or_else(|| DeserializeError::UnknownDescriptor(record.descriptor.clone()))?;

        if record.inputs.len() != desc.suppliers.len() {
            return Err(DeserializeError::SlotMismatch {
                factory: record.descriptor,
                side: "input",
                expected: desc.suppliers.len(),
                found: record.inputs.len(),
            });
        }
        if record.outputs.len() != desc.products.len() {
            return Err(DeserializeError::SlotMismatch {
                factory: record.descriptor,
                side: "output",
                expected: desc.products.len(),
                found: record.outputs.len(),
            });
        }

        let mut fab = Factory::new(
            record.pos,
            record.rotation,
            record.owner,
            id,
            desc,
            record.prodbase,
        );
        for (slot, rec) in fab.inputs.iter_mut().zip(record.inputs) {
            slot.stored = rec.stored;
            slot.in_transit = rec.in_transit;
            slot.accumulated = rec.accumulated;
            slot.stats = rec.stats;
        }
        for (slot, rec) in fab.outputs.iter_mut().zip(record.outputs) {
            slot.stored = rec.stored;
            slot.accumulated = rec.accumulated;
            slot.index_offset = rec.index_offset;
            slot.stats = rec.stats;
        }
        fab.boosts = Boosts {
            electric: record.boost_electric,
            pax: record.boost_pax,
            mail: record.boost_mail,
        };
        fab.suppliers = record.suppliers;
        fab.consumers = record.consumers;
        fab.halts = record.halts;
        fab.target_cities = record.target_cities;
        fab.power_network = record.power_network;
        fab.delta_sum = record.delta_sum;
        fab.power_satisfaction = record.power_satisfaction;
        fab.power = record.power;
        [fab.pax_arrived, fab.pax_arrived_last_month] = record.pax_arrived;
        [fab.mail_arrived, fab.mail_arrived_last_month] = record.mail_arrived;
        [
            fab.production_sum,
            fab.power_sum,
            fab.electric_sum,
            fab.pax_sum,
            fab.mail_sum,
        ] = record.sums;
        fab.stats = record.stats;
        fab.status = FactoryStatus::Idle;
        Ok(fab)
    }

    /// Serialize this factory alone into a header-tagged bitcode blob.
    pub fn serialize(&self, catalog: &Catalog, tick: u64) -> Result<Vec<u8>, SerializeError> {
        let snapshot = FactorySnapshot {
            header: SnapshotHeader::new(tick),
            record: self.to_record(catalog)?,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Inverse of [`Factory::serialize`].
    pub fn deserialize(data: &[u8], catalog: &Catalog) -> Result<Self, DeserializeError> {
        let snapshot: FactorySnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Factory::from_record(snapshot.record, catalog)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FactorySnapshot {
    header: SnapshotHeader,
    record: FactoryRecord,
}
