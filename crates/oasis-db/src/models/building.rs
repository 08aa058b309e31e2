//! Building model for database storage.

use crate::error::{Error, Result};
use native_db::*;
use native_model::{native_model, Model};
use oasis_core::time::from_micros;
use oasis_core::{Building, BuildingId, BuildingType, ProfileId, UpgradeWindow};
use serde::{Deserialize, Serialize};

/// Stored building.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredBuilding {
    /// Primary key - building UUID.
    #[primary_key]
    pub id: String,
    /// Owning profile. Prefix scans also match longer ids, so callers
    /// compare exactly.
    #[secondary_key]
    pub profile_id: String,
    /// `profile:slot`, unique per city slot.
    #[secondary_key(unique)]
    pub slot_key: String,
    pub building_type: String,
    pub level: u32,
    pub slot_index: u32,
    pub upgrade_started_at: Option<i64>,
    pub upgrade_ends_at: Option<i64>,
    pub created_at: i64,
}

/// Unique key for one city slot.
pub fn slot_key(profile_id: &ProfileId, slot_index: u32) -> String {
    format!("{}:{}", profile_id, slot_index)
}

impl StoredBuilding {
    pub fn from_building(building: &Building) -> Self {
        Self {
            id: building.id.to_string(),
            profile_id: building.profile_id.as_str().to_string(),
            slot_key: slot_key(&building.profile_id, building.slot_index),
            building_type: building.building_type.as_str().to_string(),
            level: building.level,
            slot_index: building.slot_index,
            upgrade_started_at: building.upgrade.map(|w| w.started_at().timestamp_micros()),
            upgrade_ends_at: building.upgrade.map(|w| w.ends_at().timestamp_micros()),
            created_at: building.created_at.timestamp_micros(),
        }
    }

    pub fn to_building(&self) -> Result<Building> {
        let id = self
            .id
            .parse::<BuildingId>()
            .map_err(|e| Error::Corrupt(format!("building id {}: {}", self.id, e)))?;
        let upgrade = match (self.upgrade_started_at, self.upgrade_ends_at) {
            (None, None) => None,
            (Some(start), Some(end)) => Some(
                UpgradeWindow::from_parts(from_micros(start), from_micros(end)).ok_or_else(
                    || Error::Corrupt(format!("building {}: upgrade ends before it starts", self.id)),
                )?,
            ),
            _ => {
                return Err(Error::Corrupt(format!(
                    "building {}: half-set upgrade window",
                    self.id
                )))
            }
        };
        Ok(Building {
            id,
            profile_id: ProfileId::new(self.profile_id.clone()),
            building_type: BuildingType::new(self.building_type.clone()),
            level: self.level,
            slot_index: self.slot_index,
            upgrade,
            created_at: from_micros(self.created_at),
        })
    }
}
