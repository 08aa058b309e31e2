//! Wire types for the JSON API
//!
//! Field names are camelCase to match the web client.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use oasis_core::{
    Building, BuildingState, Catalog, CatalogEntry, MapBounds, Profile, ResourceSnapshot,
    Resources, WorldMapCell,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateProfileRequest {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBuildRequest {
    pub building_type: String,
    pub slot_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub water: f64,
    pub dates: f64,
    pub gold: f64,
    pub stone: f64,
    pub water_rate: f64,
    pub dates_rate: f64,
    pub gold_rate: f64,
    pub stone_rate: f64,
    pub storage_capacity: u64,
    pub last_resource_update: DateTime<Utc>,
    pub map_x: i32,
    pub map_y: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileView {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id.to_string(),
            username: p.username.clone(),
            email: p.email.clone(),
            water: p.stocks.water,
            dates: p.stocks.dates,
            gold: p.stocks.gold,
            stone: p.stocks.stone,
            water_rate: p.rates.water,
            dates_rate: p.rates.dates,
            gold_rate: p.rates.gold,
            stone_rate: p.rates.stone,
            storage_capacity: p.storage_capacity,
            last_resource_update: p.last_resource_update,
            map_x: p.map_x,
            map_y: p.map_y,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesView {
    pub water: f64,
    pub dates: f64,
    pub gold: f64,
    pub stone: f64,
    pub water_rate: f64,
    pub dates_rate: f64,
    pub gold_rate: f64,
    pub stone_rate: f64,
    pub storage_capacity: u64,
    pub last_resource_update: DateTime<Utc>,
}

impl From<&ResourceSnapshot> for ResourcesView {
    fn from(s: &ResourceSnapshot) -> Self {
        Self {
            water: s.stocks.water,
            dates: s.stocks.dates,
            gold: s.stocks.gold,
            stone: s.stocks.stone,
            water_rate: s.rates.water,
            dates_rate: s.rates.dates,
            gold_rate: s.rates.gold,
            stone_rate: s.rates.stone,
            storage_capacity: s.storage_capacity,
            last_resource_update: s.last_update,
        }
    }
}

impl ResourcesView {
    /// Back to the engine's snapshot, e.g. to feed a client predictor
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            stocks: Resources::new(self.water, self.dates, self.gold, self.stone),
            rates: Resources::new(
                self.water_rate,
                self.dates_rate,
                self.gold_rate,
                self.stone_rate,
            ),
            storage_capacity: self.storage_capacity,
            last_update: self.last_resource_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingView {
    pub id: String,
    pub profile_id: String,
    pub building_type: String,
    pub level: u32,
    pub slot_index: u32,
    pub is_upgrading: bool,
    pub upgrade_start_time: Option<DateTime<Utc>>,
    pub upgrade_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub state: BuildingState,
}

impl BuildingView {
    pub fn new(building: &Building, catalog: &Catalog) -> Self {
        Self {
            id: building.id.to_string(),
            profile_id: building.profile_id.to_string(),
            building_type: building.building_type.to_string(),
            level: building.level,
            slot_index: building.slot_index,
            is_upgrading: building.is_upgrading(),
            upgrade_start_time: building.upgrade.map(|w| w.started_at()),
            upgrade_end_time: building.upgrade.map(|w| w.ends_at()),
            created_at: building.created_at,
            state: building.state(catalog.lookup(&building.building_type)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingConfigView {
    pub name: String,
    pub name_ar: String,
    pub icon: String,
    pub max_level: u32,
    pub base_production: Resources,
    pub base_cost: Resources,
    pub base_time: u64,
    pub cost_multiplier: f64,
    pub time_multiplier: f64,
    pub production_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_bonus: Option<u64>,
    /// Cost of the initial construction, for the build menu
    pub initial_cost: Resources,
    /// Seconds for the initial construction
    pub initial_build_time: u64,
}

impl From<&CatalogEntry> for BuildingConfigView {
    fn from(e: &CatalogEntry) -> Self {
        Self {
            name: e.name.clone(),
            name_ar: e.name_ar.clone(),
            icon: e.icon.clone(),
            max_level: e.max_level,
            base_production: e.base_production,
            base_cost: e.base_cost,
            base_time: e.base_time,
            cost_multiplier: e.cost_multiplier,
            time_multiplier: e.time_multiplier,
            production_multiplier: e.production_multiplier,
            storage_bonus: e.storage_bonus,
            initial_cost: e.cost(0),
            initial_build_time: e.build_time(0),
        }
    }
}

/// The whole catalog keyed by building type, in catalog order
pub fn building_config(catalog: &Catalog) -> IndexMap<&'static str, BuildingConfigView> {
    catalog
        .entries()
        .map(|e| (e.kind.as_str(), BuildingConfigView::from(e)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldCellView {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub profile_id: Option<String>,
    pub terrain_type: String,
    pub is_occupied: bool,
}

impl From<&WorldMapCell> for WorldCellView {
    fn from(c: &WorldMapCell) -> Self {
        Self {
            id: c.id.clone(),
            x: c.x,
            y: c.y,
            profile_id: c.profile_id.as_ref().map(|p| p.to_string()),
            terrain_type: c.terrain_type.clone(),
            is_occupied: c.is_occupied,
        }
    }
}

/// Parse `minX`, `maxX`, `minY`, `maxY` from a query string
///
/// Missing or non-numeric values fall back to the default 20x20 window.
pub fn map_bounds(query: Option<&str>) -> MapBounds {
    let mut bounds = MapBounds::default();
    for pair in query.unwrap_or_default().split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<i32>() else {
            continue;
        };
        match key {
            "minX" => bounds.min_x = value,
            "maxX" => bounds.max_x = value,
            "minY" => bounds.min_y = value,
            "maxY" => bounds.max_y = value,
            _ => {}
        }
    }
    bounds
}

/// Error body: `{"error": ..., "code": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    /// Shortfall per resource for `insufficient_resources`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Resources>,
}
