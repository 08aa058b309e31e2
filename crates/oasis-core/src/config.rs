//! Engine configuration - new-player seeding and city layout
//!
//! Every field has a default, so an empty RON block `()` is a valid config.

use crate::catalog::BuildingKind;
use crate::error::{Error, Result};
use crate::resource::Resources;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A building every new profile starts with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarterBuilding {
    pub kind: BuildingKind,
    pub slot_index: u32,
    #[serde(default = "default_starter_level")]
    pub level: u32,
}

fn default_starter_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stocks granted to a new profile (capped at `storage_capacity`)
    pub starting_stocks: Resources,
    /// Initial shared cap for all four resources
    pub storage_capacity: u64,
    /// Number of building slots in a city; valid indices are `0..city_slots`
    pub city_slots: u32,
    /// New profiles are placed in `0..map_size` on both axes
    pub map_size: u32,
    /// Placement seed; derived from the clock when absent
    pub map_seed: Option<u64>,
    pub starter_buildings: Vec<StarterBuilding>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_stocks: Resources::splat(500.0),
            storage_capacity: 2000,
            city_slots: 12,
            map_size: 100,
            map_seed: None,
            starter_buildings: vec![
                StarterBuilding {
                    kind: BuildingKind::Well,
                    slot_index: 0,
                    level: 1,
                },
                StarterBuilding {
                    kind: BuildingKind::DateFarm,
                    slot_index: 1,
                    level: 1,
                },
            ],
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.storage_capacity == 0 {
            return Err(Error::Validation("storage_capacity must be positive".into()));
        }
        if self.city_slots == 0 {
            return Err(Error::Validation("city_slots must be positive".into()));
        }
        if self.starting_stocks.iter().any(|(_, v)| v < 0.0 || !v.is_finite()) {
            return Err(Error::Validation(
                "starting_stocks must be finite and non-negative".into(),
            ));
        }
        let mut seen = HashSet::new();
        for starter in &self.starter_buildings {
            if starter.slot_index >= self.city_slots {
                return Err(Error::Validation(format!(
                    "starter {} is outside the city (slot {})",
                    starter.kind, starter.slot_index
                )));
            }
            if !seen.insert(starter.slot_index) {
                return Err(Error::Validation(format!(
                    "two starter buildings share slot {}",
                    starter.slot_index
                )));
            }
        }
        Ok(())
    }
}
