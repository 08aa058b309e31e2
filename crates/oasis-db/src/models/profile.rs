//! Profile model for database storage.

use super::{pack, unpack};
use native_db::*;
use native_model::{native_model, Model};
use oasis_core::time::from_micros;
use oasis_core::{Profile, ProfileId};
use serde::{Deserialize, Serialize};

/// Stored player profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredProfile {
    /// Primary key - external identity subject.
    #[primary_key]
    pub id: String,
    #[secondary_key]
    pub username: String,
    pub email: String,
    pub stocks: [f64; 4],
    /// Production per hour.
    pub rates: [f64; 4],
    pub storage_capacity: u64,
    pub last_resource_update: i64,
    pub map_x: i32,
    pub map_y: i32,
    pub created_at: i64,
}

impl StoredProfile {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            id: profile.id.as_str().to_string(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            stocks: pack(&profile.stocks),
            rates: pack(&profile.rates),
            storage_capacity: profile.storage_capacity,
            last_resource_update: profile.last_resource_update.timestamp_micros(),
            map_x: profile.map_x,
            map_y: profile.map_y,
            created_at: profile.created_at.timestamp_micros(),
        }
    }

    pub fn to_profile(&self) -> Profile {
        Profile {
            id: ProfileId::new(self.id.clone()),
            username: self.username.clone(),
            email: self.email.clone(),
            stocks: unpack(self.stocks),
            rates: unpack(self.rates),
            storage_capacity: self.storage_capacity,
            last_resource_update: from_micros(self.last_resource_update),
            map_x: self.map_x,
            map_y: self.map_y,
            created_at: from_micros(self.created_at),
        }
    }
}
