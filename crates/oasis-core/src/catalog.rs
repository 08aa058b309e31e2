//! Building catalog
//!
//! Static per-type data (costs, build times, production, multipliers) and the
//! three level formulas. All eight building types share one formula shape and
//! differ only by data, so every formula lives on [`CatalogEntry`].
//!
//! The built-in table is constructed once per process; a catalog can also be
//! loaded from RON for retuning without a rebuild. Either way it is never
//! mutated after construction.

use crate::error::{Error, Result};
use crate::identity::BuildingType;
use crate::resource::Resources;
use chrono::TimeDelta;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// Build time used for a type the catalog does not know
pub const FALLBACK_BUILD_TIME_SECS: u64 = 60;

/// The fixed set of building types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Well,
    DateFarm,
    GoldMine,
    Quarry,
    Barracks,
    Wall,
    Storage,
    Market,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 8] = [
        BuildingKind::Well,
        BuildingKind::DateFarm,
        BuildingKind::GoldMine,
        BuildingKind::Quarry,
        BuildingKind::Barracks,
        BuildingKind::Wall,
        BuildingKind::Storage,
        BuildingKind::Market,
    ];

    /// Wire and storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingKind::Well => "well",
            BuildingKind::DateFarm => "date_farm",
            BuildingKind::GoldMine => "gold_mine",
            BuildingKind::Quarry => "quarry",
            BuildingKind::Barracks => "barracks",
            BuildingKind::Wall => "wall",
            BuildingKind::Storage => "storage",
            BuildingKind::Market => "market",
        }
    }

    pub fn building_type(&self) -> BuildingType {
        BuildingType::new(self.as_str())
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BuildingKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownBuildingType(s.to_string()))
    }
}

/// Static configuration for one building type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: BuildingKind,
    /// Display name
    pub name: String,
    /// Display name in Arabic
    #[serde(default)]
    pub name_ar: String,
    /// Icon identifier for the client
    pub icon: String,
    pub max_level: u32,
    /// Hourly production at level 1
    #[serde(default)]
    pub base_production: Resources,
    /// Cost of the initial construction (level 0 -> 1)
    pub base_cost: Resources,
    /// Seconds for the initial construction
    pub base_time: u64,
    pub cost_multiplier: f64,
    pub time_multiplier: f64,
    pub production_multiplier: f64,
    /// Storage capacity granted by every completed level
    #[serde(default)]
    pub storage_bonus: Option<u64>,
}

impl CatalogEntry {
    /// Cost of advancing from `level` to `level + 1`
    pub fn cost(&self, level: u32) -> Resources {
        let mult = self.cost_multiplier.powi(level as i32);
        self.base_cost.map(|_, base| (base * mult).floor())
    }

    /// Seconds to advance from `level` to `level + 1`
    pub fn build_time(&self, level: u32) -> u64 {
        (self.base_time as f64 * self.time_multiplier.powi(level as i32)).floor() as u64
    }

    /// [`Self::build_time`] as a duration
    pub fn build_duration(&self, level: u32) -> TimeDelta {
        secs_to_delta(self.build_time(level))
    }

    /// Hourly production of a building currently at `level`
    ///
    /// Zero at level 0: a building under initial construction produces nothing.
    pub fn production(&self, level: u32) -> Resources {
        if level == 0 {
            return Resources::ZERO;
        }
        let mult = self.production_multiplier.powi(level as i32 - 1);
        self.base_production.map(|_, base| (base * mult).floor())
    }

    pub fn is_max_level(&self, level: u32) -> bool {
        level >= self.max_level
    }

    fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::InvalidCatalog(format!("{}: {}", self.kind, msg)));
        if self.max_level == 0 {
            return fail("max_level must be at least 1");
        }
        if self.base_time == 0 {
            return fail("base_time must be positive");
        }
        if !(self.cost_multiplier >= 1.0) || !(self.time_multiplier >= 1.0) {
            return fail("cost and time multipliers must be >= 1");
        }
        if !(self.production_multiplier > 0.0) {
            return fail("production_multiplier must be positive");
        }
        let negative = self
            .base_cost
            .iter()
            .chain(self.base_production.iter())
            .any(|(_, v)| v < 0.0 || !v.is_finite());
        if negative {
            return fail("base cost and production must be finite and non-negative");
        }
        Ok(())
    }
}

pub(crate) fn secs_to_delta(secs: u64) -> TimeDelta {
    TimeDelta::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1_000))
}

/// Immutable lookup table keyed by building kind
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    entries: IndexMap<BuildingKind, CatalogEntry>,
}

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| Catalog {
    entries: builtin_entries().into_iter().map(|e| (e.kind, e)).collect(),
});

impl Catalog {
    /// The built-in game data
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Build a catalog from entries, validating each
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut map = IndexMap::with_capacity(entries.len());
        for entry in entries {
            entry.validate()?;
            let kind = entry.kind;
            if map.insert(kind, entry).is_some() {
                return Err(Error::InvalidCatalog(format!("duplicate entry for {}", kind)));
            }
        }
        Ok(Self { entries: map })
    }

    /// Parse a RON document of the form `(buildings: [ ... ])`
    pub fn from_ron_str(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct CatalogFile {
            buildings: Vec<CatalogEntry>,
        }

        let file: CatalogFile =
            ron::from_str(content).map_err(|e| Error::InvalidCatalog(e.to_string()))?;
        Self::from_entries(file.buildings)
    }

    /// Load a RON catalog file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::InvalidCatalog(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&content)
    }

    pub fn get(&self, kind: BuildingKind) -> Option<&CatalogEntry> {
        self.entries.get(&kind)
    }

    /// Look up a persisted type name
    pub fn lookup(&self, building_type: &BuildingType) -> Option<&CatalogEntry> {
        building_type
            .as_str()
            .parse::<BuildingKind>()
            .ok()
            .and_then(|kind| self.get(kind))
    }

    /// Like [`Self::lookup`] but failing with `UnknownBuildingType`
    pub fn require(&self, building_type: &BuildingType) -> Result<&CatalogEntry> {
        self.lookup(building_type)
            .ok_or_else(|| Error::UnknownBuildingType(building_type.to_string()))
    }

    /// Cost by type name; zero for unknown types
    pub fn cost(&self, building_type: &BuildingType, level: u32) -> Resources {
        self.lookup(building_type)
            .map(|e| e.cost(level))
            .unwrap_or(Resources::ZERO)
    }

    /// Build time by type name; [`FALLBACK_BUILD_TIME_SECS`] for unknown types
    pub fn build_time(&self, building_type: &BuildingType, level: u32) -> u64 {
        self.lookup(building_type)
            .map(|e| e.build_time(level))
            .unwrap_or(FALLBACK_BUILD_TIME_SECS)
    }

    /// Production by type name; zero for unknown types
    pub fn production(&self, building_type: &BuildingType, level: u32) -> Resources {
        self.lookup(building_type)
            .map(|e| e.production(level))
            .unwrap_or(Resources::ZERO)
    }

    /// Entries in catalog order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::builtin().clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    kind: BuildingKind,
    name: &str,
    name_ar: &str,
    icon: &str,
    base_production: Resources,
    base_cost: Resources,
    base_time: u64,
    (cost_multiplier, time_multiplier, production_multiplier): (f64, f64, f64),
    storage_bonus: Option<u64>,
) -> CatalogEntry {
    CatalogEntry {
        kind,
        name: name.to_string(),
        name_ar: name_ar.to_string(),
        icon: icon.to_string(),
        max_level: 10,
        base_production,
        base_cost,
        base_time,
        cost_multiplier,
        time_multiplier,
        production_multiplier,
        storage_bonus,
    }
}

fn builtin_entries() -> Vec<CatalogEntry> {
    use BuildingKind::*;
    let none = Resources::ZERO;
    vec![
        entry(
            Well,
            "Well",
            "بئر ماء",
            "water-outline",
            Resources::new(10.0, 0.0, 0.0, 0.0),
            Resources::new(0.0, 50.0, 30.0, 80.0),
            60,
            (1.5, 1.4, 1.3),
            None,
        ),
        entry(
            DateFarm,
            "Date Farm",
            "مزرعة تمور",
            "leaf-outline",
            Resources::new(0.0, 8.0, 0.0, 0.0),
            Resources::new(80.0, 0.0, 20.0, 60.0),
            90,
            (1.5, 1.4, 1.3),
            None,
        ),
        entry(
            GoldMine,
            "Gold Mine",
            "منجم ذهب",
            "diamond-outline",
            Resources::new(0.0, 0.0, 5.0, 0.0),
            Resources::new(100.0, 60.0, 0.0, 120.0),
            120,
            (1.6, 1.5, 1.25),
            None,
        ),
        entry(
            Quarry,
            "Quarry",
            "محجر حجر",
            "cube-outline",
            Resources::new(0.0, 0.0, 0.0, 7.0),
            Resources::new(60.0, 40.0, 50.0, 0.0),
            80,
            (1.5, 1.4, 1.3),
            None,
        ),
        entry(
            Barracks,
            "Barracks",
            "ثكنة عسكرية",
            "shield-outline",
            none,
            Resources::new(120.0, 80.0, 100.0, 150.0),
            180,
            (1.7, 1.5, 1.0),
            None,
        ),
        entry(
            Wall,
            "City Wall",
            "سور المدينة",
            "grid-outline",
            none,
            Resources::new(50.0, 30.0, 60.0, 200.0),
            150,
            (1.6, 1.5, 1.0),
            None,
        ),
        entry(
            Storage,
            "Storehouse",
            "مخزن",
            "archive-outline",
            none,
            Resources::new(80.0, 60.0, 40.0, 100.0),
            100,
            (1.5, 1.3, 1.0),
            Some(500),
        ),
        entry(
            Market,
            "Market",
            "سوق",
            "storefront-outline",
            none,
            Resources::new(100.0, 80.0, 80.0, 80.0),
            140,
            (1.5, 1.4, 1.0),
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_every_kind() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), BuildingKind::ALL.len());
        for kind in BuildingKind::ALL {
            assert!(catalog.get(kind).is_some(), "{kind} missing");
        }
    }

    #[test]
    fn test_cost_formula() {
        let well = Catalog::builtin().get(BuildingKind::Well).unwrap();
        assert_eq!(well.cost(0), Resources::new(0.0, 50.0, 30.0, 80.0));
        // 50 * 1.5 = 75, 30 * 1.5 = 45, 80 * 1.5 = 120
        assert_eq!(well.cost(1), Resources::new(0.0, 75.0, 45.0, 120.0));
        // 50 * 2.25 = 112.5 -> 112
        assert_eq!(well.cost(2).dates, 112.0);
    }

    #[test]
    fn test_build_time_formula() {
        let mine = Catalog::builtin().get(BuildingKind::GoldMine).unwrap();
        assert_eq!(mine.build_time(0), 120);
        assert_eq!(mine.build_time(1), 180);
        assert_eq!(mine.build_time(2), 270);
    }

    #[test]
    fn test_production_zero_at_level_zero() {
        let farm = Catalog::builtin().get(BuildingKind::DateFarm).unwrap();
        assert_eq!(farm.production(0), Resources::ZERO);
        assert_eq!(farm.production(1), Resources::new(0.0, 8.0, 0.0, 0.0));
        // 8 * 1.3 = 10.4 -> 10
        assert_eq!(farm.production(2).dates, 10.0);
    }

    #[test]
    fn test_cost_monotonic_in_level() {
        for entry in Catalog::builtin().entries() {
            for level in 0..entry.max_level {
                let a = entry.cost(level);
                let b = entry.cost(level + 1);
                assert!(b.covers(&a), "{} level {}", entry.kind, level);
            }
        }
    }

    #[test]
    fn test_unknown_type_fallbacks() {
        let catalog = Catalog::builtin();
        let unknown = BuildingType::new("temple");
        assert!(catalog.lookup(&unknown).is_none());
        assert_eq!(catalog.cost(&unknown, 3), Resources::ZERO);
        assert_eq!(catalog.production(&unknown, 3), Resources::ZERO);
        assert_eq!(catalog.build_time(&unknown, 3), FALLBACK_BUILD_TIME_SECS);
        assert_eq!(
            catalog.require(&unknown).unwrap_err(),
            Error::UnknownBuildingType("temple".into())
        );
    }

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in BuildingKind::ALL {
            assert_eq!(kind.as_str().parse::<BuildingKind>().unwrap(), kind);
        }
        assert!("Well".parse::<BuildingKind>().is_err());
    }

    #[test]
    fn test_catalog_from_ron() {
        let ron_str = r#"
        (
            buildings: [
                (
                    kind: well,
                    name: "Deep Well",
                    icon: "water-outline",
                    max_level: 3,
                    base_production: (water: 20.0),
                    base_cost: (stone: 10.0),
                    base_time: 30,
                    cost_multiplier: 2.0,
                    time_multiplier: 1.0,
                    production_multiplier: 1.5,
                ),
            ],
        )
        "#;

        let catalog = Catalog::from_ron_str(ron_str).unwrap();
        assert_eq!(catalog.len(), 1);
        let well = catalog.get(BuildingKind::Well).unwrap();
        assert_eq!(well.cost(1), Resources::new(0.0, 0.0, 0.0, 20.0));
        assert_eq!(well.production(2).water, 30.0);
        assert!(catalog.get(BuildingKind::Quarry).is_none());
    }

    #[test]
    fn test_catalog_rejects_bad_entries() {
        let mut bad = Catalog::builtin().get(BuildingKind::Wall).unwrap().clone();
        bad.cost_multiplier = 0.5;
        assert!(matches!(
            Catalog::from_entries(vec![bad]),
            Err(Error::InvalidCatalog(_))
        ));

        let wall = Catalog::builtin().get(BuildingKind::Wall).unwrap().clone();
        assert!(matches!(
            Catalog::from_entries(vec![wall.clone(), wall]),
            Err(Error::InvalidCatalog(_))
        ));
    }
}
