//! World map model for database storage.

use native_db::*;
use native_model::{native_model, Model};
use oasis_core::{NewWorldMapCell, ProfileId, WorldMapCell};
use serde::{Deserialize, Serialize};

/// Stored world map cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredWorldCell {
    #[primary_key]
    pub id: String,
    /// `x:y`, unique per coordinate.
    #[secondary_key(unique)]
    pub coord_key: String,
    pub x: i32,
    pub y: i32,
    pub profile_id: Option<String>,
    pub terrain_type: String,
    pub is_occupied: bool,
}

pub fn coord_key(x: i32, y: i32) -> String {
    format!("{}:{}", x, y)
}

impl StoredWorldCell {
    pub fn from_new(id: String, cell: &NewWorldMapCell) -> Self {
        Self {
            id,
            coord_key: coord_key(cell.x, cell.y),
            x: cell.x,
            y: cell.y,
            profile_id: cell.profile_id.as_ref().map(|p| p.as_str().to_string()),
            terrain_type: cell.terrain_type.clone(),
            is_occupied: cell.is_occupied,
        }
    }

    pub fn to_cell(&self) -> WorldMapCell {
        WorldMapCell {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
            profile_id: self.profile_id.clone().map(ProfileId::new),
            terrain_type: self.terrain_type.clone(),
            is_occupied: self.is_occupied,
        }
    }
}
