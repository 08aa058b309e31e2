//! In-memory repository
//!
//! Insertion-ordered maps behind `RwLock`s. Used by tests and by the server's
//! `Memory` storage backend; state is lost when the process exits.

use crate::building::{Building, BuildingPatch, NewBuilding};
use crate::error::{Error, Result};
use crate::identity::{BuildingId, ProfileId};
use crate::profile::{Profile, ProfilePatch};
use crate::repository::Repository;
use crate::world::{MapBounds, NewWorldMapCell, WorldMapCell};
use indexmap::IndexMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    profiles: RwLock<IndexMap<ProfileId, Profile>>,
    buildings: RwLock<IndexMap<BuildingId, Building>>,
    cells: RwLock<IndexMap<(i32, i32), WorldMapCell>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| Error::Repository("memory repository lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| Error::Repository("memory repository lock poisoned".into()))
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile_count(&self) -> usize {
        read(&self.profiles).map(|p| p.len()).unwrap_or(0)
    }

    pub fn building_count(&self) -> usize {
        read(&self.buildings).map(|b| b.len()).unwrap_or(0)
    }
}

impl Repository for MemoryRepository {
    fn get_profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
        Ok(read(&self.profiles)?.get(id).cloned())
    }

    fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        Ok(read(&self.profiles)?
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    fn create_profile(&self, profile: &Profile) -> Result<Profile> {
        let mut profiles = write(&self.profiles)?;
        if profiles.contains_key(&profile.id) {
            return Err(Error::Repository(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }

    fn update_profile(&self, id: &ProfileId, patch: &ProfilePatch) -> Result<Option<Profile>> {
        let mut profiles = write(&self.profiles)?;
        Ok(profiles.get_mut(id).map(|p| {
            p.apply(patch);
            p.clone()
        }))
    }

    fn get_buildings(&self, profile_id: &ProfileId) -> Result<Vec<Building>> {
        let mut out: Vec<Building> = read(&self.buildings)?
            .values()
            .filter(|b| &b.profile_id == profile_id)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.slot_index);
        Ok(out)
    }

    fn get_building(&self, id: BuildingId) -> Result<Option<Building>> {
        Ok(read(&self.buildings)?.get(&id).cloned())
    }

    fn create_building(&self, building: &NewBuilding) -> Result<Building> {
        let mut buildings = write(&self.buildings)?;
        let occupied = buildings
            .values()
            .any(|b| b.profile_id == building.profile_id && b.slot_index == building.slot_index);
        if occupied {
            return Err(Error::Repository(format!(
                "duplicate building at {}:{}",
                building.profile_id, building.slot_index
            )));
        }
        let created = building.clone().into_building(BuildingId::new_v4());
        buildings.insert(created.id, created.clone());
        Ok(created)
    }

    fn update_building(&self, id: BuildingId, patch: &BuildingPatch) -> Result<Option<Building>> {
        let mut buildings = write(&self.buildings)?;
        Ok(buildings.get_mut(&id).map(|b| {
            b.apply(patch);
            b.clone()
        }))
    }

    fn delete_building(&self, id: BuildingId) -> Result<bool> {
        Ok(write(&self.buildings)?.shift_remove(&id).is_some())
    }

    fn get_world_map_cells(&self, bounds: MapBounds) -> Result<Vec<WorldMapCell>> {
        Ok(read(&self.cells)?
            .values()
            .filter(|c| bounds.contains(c.x, c.y))
            .cloned()
            .collect())
    }

    fn get_world_map_cell(&self, x: i32, y: i32) -> Result<Option<WorldMapCell>> {
        Ok(read(&self.cells)?.get(&(x, y)).cloned())
    }

    fn create_world_map_cell(&self, cell: &NewWorldMapCell) -> Result<WorldMapCell> {
        let mut cells = write(&self.cells)?;
        if cells.contains_key(&(cell.x, cell.y)) {
            return Err(Error::Repository(format!(
                "duplicate world cell at {}:{}",
                cell.x, cell.y
            )));
        }
        let created = WorldMapCell {
            id: Uuid::new_v4().to_string(),
            x: cell.x,
            y: cell.y,
            profile_id: cell.profile_id.clone(),
            terrain_type: cell.terrain_type.clone(),
            is_occupied: cell.is_occupied,
        };
        cells.insert((cell.x, cell.y), created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuildingKind;
    use crate::time::from_micros;

    fn new_building(slot: u32) -> NewBuilding {
        NewBuilding {
            profile_id: ProfileId::new("u1"),
            building_type: BuildingKind::Well.building_type(),
            level: 1,
            slot_index: slot,
            upgrade: None,
            created_at: from_micros(0),
        }
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let repo = MemoryRepository::new();
        repo.create_building(&new_building(3)).unwrap();
        assert!(matches!(
            repo.create_building(&new_building(3)),
            Err(Error::Repository(_))
        ));
        repo.create_building(&new_building(4)).unwrap();
        assert_eq!(repo.building_count(), 2);
    }

    #[test]
    fn test_buildings_sorted_by_slot() {
        let repo = MemoryRepository::new();
        for slot in [5, 1, 3] {
            repo.create_building(&new_building(slot)).unwrap();
        }
        let slots: Vec<u32> = repo
            .get_buildings(&ProfileId::new("u1"))
            .unwrap()
            .iter()
            .map(|b| b.slot_index)
            .collect();
        assert_eq!(slots, vec![1, 3, 5]);
        assert!(repo.get_buildings(&ProfileId::new("u2")).unwrap().is_empty());
    }

    #[test]
    fn test_update_missing_building_is_none() {
        let repo = MemoryRepository::new();
        let patch = BuildingPatch {
            level: Some(2),
            upgrade: None,
        };
        assert!(repo.update_building(BuildingId::new_v4(), &patch).unwrap().is_none());
    }

    #[test]
    fn test_delete_frees_slot() {
        let repo = MemoryRepository::new();
        let b = repo.create_building(&new_building(3)).unwrap();
        assert!(repo.delete_building(b.id).unwrap());
        assert!(!repo.delete_building(b.id).unwrap());
        repo.create_building(&new_building(3)).unwrap();
        assert_eq!(repo.building_count(), 1);
    }

    #[test]
    fn test_world_cells_in_bounds() {
        let repo = MemoryRepository::new();
        repo.create_world_map_cell(&NewWorldMapCell::desert(1, 1)).unwrap();
        repo.create_world_map_cell(&NewWorldMapCell::desert(30, 1)).unwrap();
        let cells = repo.get_world_map_cells(MapBounds::default()).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(repo.get_world_map_cell(30, 1).unwrap().unwrap().terrain_type, "desert");
    }
}
