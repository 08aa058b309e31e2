//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use native_db::*;
use oasis_core::{
    Building, BuildingId, BuildingPatch, MapBounds, NewBuilding, NewWorldMapCell, Profile,
    ProfileId, ProfilePatch, Repository, WorldMapCell,
};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;
use uuid::Uuid;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<StoredProfile>()
        .expect("StoredProfile model definition");
    models
        .define::<StoredBuilding>()
        .expect("StoredBuilding model definition");
    models
        .define::<StoredWorldCell>()
        .expect("StoredWorldCell model definition");
    models
});

/// Database store for profiles, buildings and world cells.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let db = Builder::new().create(&MODELS, path)?;
        info!(path = %path.display(), "store opened");
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new().create_in_memory(&MODELS)?;
        Ok(Self { db })
    }

    /// Load a profile by ID.
    pub fn load_profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredProfile> = r.get().primary(id.as_str().to_string())?;
        Ok(stored.map(|s| s.to_profile()))
    }

    /// Insert a new profile; an existing ID is rejected.
    pub fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let rw = self.db.rw_transaction()?;
        let existing: Option<StoredProfile> = rw.get().primary(profile.id.as_str().to_string())?;
        if existing.is_some() {
            return Err(Error::DuplicateKey(format!("profile {}", profile.id)));
        }
        rw.insert(StoredProfile::from_profile(profile))?;
        rw.commit()?;
        Ok(profile.clone())
    }

    /// Apply a partial update to a profile.
    pub fn patch_profile(&self, id: &ProfileId, patch: &ProfilePatch) -> Result<Option<Profile>> {
        let rw = self.db.rw_transaction()?;
        let Some(old) = rw.get().primary::<StoredProfile>(id.as_str().to_string())? else {
            return Ok(None);
        };
        let mut profile = old.to_profile();
        if patch.is_empty() {
            return Ok(Some(profile));
        }
        profile.apply(patch);
        rw.update(old, StoredProfile::from_profile(&profile))?;
        rw.commit()?;
        Ok(Some(profile))
    }

    /// Load a building by ID.
    pub fn load_building(&self, id: BuildingId) -> Result<Option<Building>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredBuilding> = r.get().primary(id.to_string())?;
        stored.map(|s| s.to_building()).transpose()
    }

    /// Insert a building under a fresh ID; an occupied slot is rejected.
    pub fn insert_building(&self, new: &NewBuilding) -> Result<Building> {
        let key = slot_key(&new.profile_id, new.slot_index);
        let rw = self.db.rw_transaction()?;
        let occupant: Option<StoredBuilding> =
            rw.get().secondary(StoredBuildingKey::slot_key, key.clone())?;
        if occupant.is_some() {
            return Err(Error::DuplicateKey(format!("building slot {}", key)));
        }
        let building = new.clone().into_building(BuildingId::new_v4());
        rw.insert(StoredBuilding::from_building(&building))?;
        rw.commit()?;
        Ok(building)
    }

    /// Apply a partial update to a building.
    pub fn patch_building(&self, id: BuildingId, patch: &BuildingPatch) -> Result<Option<Building>> {
        let rw = self.db.rw_transaction()?;
        let Some(old) = rw.get().primary::<StoredBuilding>(id.to_string())? else {
            return Ok(None);
        };
        let mut building = old.to_building()?;
        if patch.is_empty() {
            return Ok(Some(building));
        }
        building.apply(patch);
        rw.update(old, StoredBuilding::from_building(&building))?;
        rw.commit()?;
        Ok(Some(building))
    }

    /// Remove a building; false when there was none.
    pub fn remove_building(&self, id: BuildingId) -> Result<bool> {
        let rw = self.db.rw_transaction()?;
        let Some(old) = rw.get().primary::<StoredBuilding>(id.to_string())? else {
            return Ok(false);
        };
        rw.remove(old)?;
        rw.commit()?;
        Ok(true)
    }

    /// Insert a world map cell; an occupied coordinate is rejected.
    pub fn insert_world_cell(&self, cell: &NewWorldMapCell) -> Result<WorldMapCell> {
        let key = coord_key(cell.x, cell.y);
        let rw = self.db.rw_transaction()?;
        let existing: Option<StoredWorldCell> =
            rw.get().secondary(StoredWorldCellKey::coord_key, key.clone())?;
        if existing.is_some() {
            return Err(Error::DuplicateKey(format!("world cell {}", key)));
        }
        let stored = StoredWorldCell::from_new(Uuid::new_v4().to_string(), cell);
        let out = stored.to_cell();
        rw.insert(stored)?;
        rw.commit()?;
        Ok(out)
    }
}

impl Repository for Store {
    fn get_profile(&self, id: &ProfileId) -> oasis_core::Result<Option<Profile>> {
        Ok(self.load_profile(id)?)
    }

    fn get_profile_by_username(&self, username: &str) -> oasis_core::Result<Option<Profile>> {
        Ok(self.profile_by_username(username)?)
    }

    fn create_profile(&self, profile: &Profile) -> oasis_core::Result<Profile> {
        Ok(self.insert_profile(profile)?)
    }

    fn update_profile(
        &self,
        id: &ProfileId,
        patch: &ProfilePatch,
    ) -> oasis_core::Result<Option<Profile>> {
        Ok(self.patch_profile(id, patch)?)
    }

    fn get_buildings(&self, profile_id: &ProfileId) -> oasis_core::Result<Vec<Building>> {
        Ok(self.buildings_of(profile_id)?)
    }

    fn get_building(&self, id: BuildingId) -> oasis_core::Result<Option<Building>> {
        Ok(self.load_building(id)?)
    }

    fn create_building(&self, building: &NewBuilding) -> oasis_core::Result<Building> {
        Ok(self.insert_building(building)?)
    }

    fn update_building(
        &self,
        id: BuildingId,
        patch: &BuildingPatch,
    ) -> oasis_core::Result<Option<Building>> {
        Ok(self.patch_building(id, patch)?)
    }

    fn delete_building(&self, id: BuildingId) -> oasis_core::Result<bool> {
        Ok(self.remove_building(id)?)
    }

    fn get_world_map_cells(&self, bounds: MapBounds) -> oasis_core::Result<Vec<WorldMapCell>> {
        Ok(self.world_cells_in(bounds)?)
    }

    fn get_world_map_cell(&self, x: i32, y: i32) -> oasis_core::Result<Option<WorldMapCell>> {
        Ok(self.world_cell_at(x, y)?)
    }

    fn create_world_map_cell(&self, cell: &NewWorldMapCell) -> oasis_core::Result<WorldMapCell> {
        Ok(self.insert_world_cell(cell)?)
    }
}
