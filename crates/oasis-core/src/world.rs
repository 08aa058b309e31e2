//! World map cells
//!
//! Stored and queried only; no engine rule reads them.

use crate::identity::ProfileId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMapCell {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub profile_id: Option<ProfileId>,
    pub terrain_type: String,
    pub is_occupied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorldMapCell {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
    #[serde(default = "default_terrain")]
    pub terrain_type: String,
    #[serde(default)]
    pub is_occupied: bool,
}

fn default_terrain() -> String {
    "desert".to_string()
}

impl NewWorldMapCell {
    /// An unoccupied desert cell
    pub fn desert(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            profile_id: None,
            terrain_type: default_terrain(),
            is_occupied: false,
        }
    }
}

/// Inclusive rectangle of map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl MapBounds {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

impl Default for MapBounds {
    /// The 20x20 window the client opens on
    fn default() -> Self {
        Self {
            min_x: 0,
            max_x: 19,
            min_y: 0,
            max_y: 19,
        }
    }
}
