//! Common query patterns for the database.

use crate::error::Result;
use crate::models::*;
use crate::store::Store;
use oasis_core::{Building, MapBounds, Profile, ProfileId, WorldMapCell};

impl Store {
    /// Every building owned by a profile, in slot order.
    pub fn buildings_of(&self, profile_id: &ProfileId) -> Result<Vec<Building>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredBuilding>(StoredBuildingKey::profile_id)?;
        let iter = scan.start_with(profile_id.as_str())?;
        let rows: std::result::Result<Vec<StoredBuilding>, _> = iter.collect();
        let mut buildings = rows?
            .into_iter()
            .filter(|b| b.profile_id == profile_id.as_str())
            .map(|b| b.to_building())
            .collect::<Result<Vec<_>>>()?;
        buildings.sort_by_key(|b| b.slot_index);
        Ok(buildings)
    }

    /// Count all stored buildings.
    pub fn building_count(&self) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredBuilding>()?;
        let iter = scan.all()?;
        Ok(iter.count())
    }

    /// Count all stored profiles.
    pub fn profile_count(&self) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredProfile>()?;
        let iter = scan.all()?;
        Ok(iter.count())
    }

    /// First profile with exactly this username.
    pub fn profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredProfile>(StoredProfileKey::username)?;
        let iter = scan.start_with(username)?;
        let rows: std::result::Result<Vec<StoredProfile>, _> = iter.collect();
        Ok(rows?
            .into_iter()
            .find(|p| p.username == username)
            .map(|p| p.to_profile()))
    }

    /// World cells inside an inclusive rectangle.
    pub fn world_cells_in(&self, bounds: MapBounds) -> Result<Vec<WorldMapCell>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredWorldCell>()?;
        let iter = scan.all()?;
        let all: std::result::Result<Vec<StoredWorldCell>, _> = iter.collect();
        Ok(all?
            .into_iter()
            .filter(|c| bounds.contains(c.x, c.y))
            .map(|c| c.to_cell())
            .collect())
    }

    /// The cell at a coordinate, if stored.
    pub fn world_cell_at(&self, x: i32, y: i32) -> Result<Option<WorldMapCell>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredWorldCell> =
            r.get().secondary(StoredWorldCellKey::coord_key, coord_key(x, y))?;
        Ok(stored.map(|c| c.to_cell()))
    }
}
