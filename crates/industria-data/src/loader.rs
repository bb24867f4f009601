//! Resolution pipeline: reads data files, resolves good names, builds the
//! catalog.
//!
//! A data directory holds `goods` and `factories` files and optionally a
//! `settings` file, each in RON, TOML or JSON (detected by extension).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use industria_core::catalog::{
    Catalog, CatalogBuilder, CatalogError, FactoryDescriptor, ProductSpec, SupplierSpec,
};
use industria_core::climate::ClimateBits;
use industria_core::coord::Footprint;
use industria_core::fixed::Fixed64;
use industria_core::id::{DescriptorId, GoodId};
use industria_world::IndustrySettings;
use serde::de::DeserializeOwned;

use crate::schema::{FactoryData, GoodData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A good name could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved catalog failed validation.
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`. More than one
/// of them is an error.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML has no top-level arrays, so there the list is
/// read from the array under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything read from a data directory.
#[derive(Debug)]
pub struct IndustryData {
    pub catalog: Catalog,
    pub settings: IndustrySettings,
}

/// Load goods, factories and settings from `dir`.
///
/// `goods` and `factories` are required. Without a `settings` file the
/// defaults apply.
pub fn load_industry_data(dir: &Path) -> Result<IndustryData, DataLoadError> {
    let goods_path = require_data_file(dir, "goods")?;
    let factories_path = require_data_file(dir, "factories")?;

    let goods: Vec<GoodData> = deserialize_list(&goods_path, "goods")?;
    let factories: Vec<FactoryData> = deserialize_list(&factories_path, "factories")?;

    let mut builder = CatalogBuilder::new();
    let mut good_ids: HashMap<String, GoodId> = HashMap::new();
    for good in &goods {
        check_duplicate(&good_ids, &good.name, &goods_path)?;
        good_ids.insert(good.name.clone(), builder.register_good(&good.name));
    }

    let mut descriptor_ids: HashMap<String, DescriptorId> = HashMap::new();
    for data in factories {
        check_duplicate(&descriptor_ids, &data.name, &factories_path)?;
        let name = data.name.clone();
        let desc = resolve_factory(data, &good_ids, &factories_path)?;
        descriptor_ids.insert(name, builder.register_factory(desc)?);
    }
    let catalog = builder.build()?;

    let settings = match find_data_file(dir, "settings")? {
        Some(path) => deserialize_file(&path)?,
        None => IndustrySettings::default(),
    };

    tracing::info!(
        goods = catalog.good_count(),
        factories = catalog.descriptor_count(),
        dir = %dir.display(),
        "industry data loaded"
    );
    Ok(IndustryData { catalog, settings })
}

fn resolve_factory(
    data: FactoryData,
    goods: &HashMap<String, GoodId>,
    file: &Path,
) -> Result<FactoryDescriptor, DataLoadError> {
    let mut desc = FactoryDescriptor::new(
        &data.name,
        Footprint::new(data.footprint.width, data.footprint.height),
    );
    desc.site = data.site;
    desc.layouts = data.layouts;
    if !data.climates.is_empty() {
        desc.climates = data.climates.iter().copied().collect::<ClimateBits>();
    }
    for s in &data.suppliers {
        desc.suppliers.push(SupplierSpec {
            good: *resolve_name(goods, &s.good, file, "good")?,
            capacity: s.capacity,
            supplier_count_wanted: s.count,
            consumption_rate: fixed_field(s.consumption, &data.name, "consumption", file)?,
        });
    }
    for p in &data.products {
        desc.products.push(ProductSpec {
            good: *resolve_name(goods, &p.good, file, "good")?,
            capacity: p.capacity,
            factor: fixed_field(p.factor, &data.name, "factor", file)?,
        });
    }
    desc.productivity = data.productivity;
    desc.range = data.range;
    desc.distribution_weight = data.distribution_weight;
    desc.pax_level = data.pax_level;
    desc.mail_level = data.mail_level;
    desc.electric_demand = data.electric_demand;
    desc.is_electricity_producer = data.power_plant;
    desc.electric_boost = fixed_field(data.electric_boost, &data.name, "electric_boost", file)?;
    desc.pax_boost = fixed_field(data.pax_boost, &data.name, "pax_boost", file)?;
    desc.mail_boost = fixed_field(data.mail_boost, &data.name, "mail_boost", file)?;
    desc.intro_year_month = data.intro.map(|d| d.year_month());
    desc.retire_year_month = data.retire.map(|d| d.year_month());
    tracing::debug!(factory = %desc.name, kind = ?desc.kind(), "descriptor resolved");
    Ok(desc)
}

/// A decimal field as Fixed64. NaN and values outside its range are
/// reported as a parse error of `file`.
fn fixed_field(value: f64, factory: &str, field: &str, file: &Path) -> Result<Fixed64, DataLoadError> {
    let fixed = if value.is_finite() {
        Fixed64::checked_from_num(value)
    } else {
        None
    };
    fixed.ok_or_else(|| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail: format!("{factory}: {field} {value} is out of range"),
    })
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
