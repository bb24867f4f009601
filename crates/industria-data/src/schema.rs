//! Serde data file structs for goods and factory descriptors.
//!
//! These mirror the on-disk format. Names stand in for ids; the loader
//! resolves them into a [`industria_core::catalog::Catalog`].

use industria_core::catalog::SiteKind;
use industria_core::climate::Climate;
use serde::Deserialize;

// ===========================================================================
// Goods
// ===========================================================================

/// A goods type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct GoodData {
    pub name: String,
}

// ===========================================================================
// Factories
// ===========================================================================

/// A factory descriptor in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FactoryData {
    pub name: String,
    #[serde(default)]
    pub site: SiteKind,
    #[serde(default = "default_footprint")]
    pub footprint: FootprintData,
    #[serde(default = "default_layouts")]
    pub layouts: u8,
    /// Allowed climates. Empty means every land climate.
    #[serde(default)]
    pub climates: Vec<Climate>,
    #[serde(default)]
    pub suppliers: Vec<SupplierData>,
    #[serde(default)]
    pub products: Vec<ProductData>,
    pub productivity: u32,
    #[serde(default)]
    pub range: u32,
    #[serde(default = "default_weight")]
    pub distribution_weight: u32,
    #[serde(default)]
    pub pax_level: u32,
    #[serde(default)]
    pub mail_level: u32,
    #[serde(default)]
    pub electric_demand: u32,
    #[serde(default)]
    pub power_plant: bool,
    #[serde(default)]
    pub electric_boost: f64,
    #[serde(default)]
    pub pax_boost: f64,
    #[serde(default)]
    pub mail_boost: f64,
    #[serde(default)]
    pub intro: Option<DateData>,
    #[serde(default)]
    pub retire: Option<DateData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootprintData {
    pub width: u32,
    pub height: u32,
}

fn default_footprint() -> FootprintData {
    FootprintData {
        width: 1,
        height: 1,
    }
}

fn default_layouts() -> u8 {
    1
}

fn default_weight() -> u32 {
    1
}

fn default_one() -> f64 {
    1.0
}

fn default_supplier_count() -> u32 {
    1
}

/// An input slot: which good, how much storage, how many suppliers to aim for.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierData {
    pub good: String,
    pub capacity: u32,
    #[serde(default = "default_supplier_count")]
    pub count: u32,
    /// Units consumed per unit of prodbase.
    #[serde(default = "default_one")]
    pub consumption: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductData {
    pub good: String,
    pub capacity: u32,
    #[serde(default = "default_one")]
    pub factor: f64,
}

/// Calendar date used for timeline introduction and retirement.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateData {
    pub year: u32,
    /// 1-based.
    #[serde(default = "default_month")]
    pub month: u32,
}

fn default_month() -> u32 {
    1
}

impl DateData {
    /// Months since year 0, the catalog's date unit.
    pub fn year_month(self) -> u32 {
        self.year * 12 + self.month.clamp(1, 12) - 1
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_defaults_from_ron() {
        let ron = r#"(name: "forest", productivity: 16, products: [(good: "logs", capacity: 40)])"#;
        let f: FactoryData = ron::from_str(ron).unwrap();
        assert_eq!(f.site, SiteKind::Land);
        assert_eq!((f.footprint.width, f.footprint.height), (1, 1));
        assert_eq!(f.layouts, 1);
        assert_eq!(f.distribution_weight, 1);
        assert!(f.climates.is_empty());
        assert!((f.products[0].factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn full_factory_from_json() {
        let json = r#"{
            "name": "cannery",
            "site": "shore",
            "footprint": {"width": 3, "height": 2},
            "layouts": 4,
            "climates": ["temperate", "tundra"],
            "suppliers": [{"good": "fish", "capacity": 60, "count": 2, "consumption": 1.5}],
            "products": [{"good": "tins", "capacity": 30, "factor": 0.5}],
            "productivity": 12,
            "range": 8,
            "pax_level": 10,
            "pax_boost": 0.25,
            "intro": {"year": 1935, "month": 6}
        }"#;
        let f: FactoryData = serde_json::from_str(json).unwrap();
        assert_eq!(f.site, SiteKind::Shore);
        assert_eq!(f.climates, vec![Climate::Temperate, Climate::Tundra]);
        assert_eq!(f.suppliers[0].count, 2);
        assert_eq!(f.intro.map(DateData::year_month), Some(1935 * 12 + 5));
        assert!(f.retire.is_none());
    }

    #[test]
    fn power_plant_from_toml() {
        let toml = r#"
name = "coal_plant"
productivity = 20
power_plant = true
electric_demand = 400
[[suppliers]]
good = "coal"
capacity = 80
"#;
        let f: FactoryData = toml::from_str(toml).unwrap();
        assert!(f.power_plant);
        assert_eq!(f.suppliers[0].good, "coal");
        assert!((f.suppliers[0].consumption - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_productivity_is_an_error() {
        let ron = r#"(name: "forest")"#;
        assert!(ron::from_str::<FactoryData>(ron).is_err());
    }
}
