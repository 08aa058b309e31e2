//! Durable-state contract the engine operates over
//!
//! Implementations provide per-call atomicity only; the engine serializes
//! every read-modify-write sequence for a profile itself (see
//! [`crate::CityEngine`]). Store failures surface as
//! [`crate::Error::Repository`] and are never retried.

use crate::building::{Building, BuildingPatch, NewBuilding};
use crate::error::Result;
use crate::identity::{BuildingId, ProfileId};
use crate::profile::{Profile, ProfilePatch};
use crate::world::{MapBounds, NewWorldMapCell, WorldMapCell};

/// Profile, building and world-cell storage
///
/// # Implementing
///
/// - `update_*` returns `Ok(None)` when the row does not exist and leaves
///   fields absent from the patch untouched; an empty patch returns the
///   current row.
/// - `create_building` must reject a second building on an occupied
///   `(profile, slot)` pair.
/// - `create_profile` must reject an id that already exists.
pub trait Repository: Send + Sync {
    fn get_profile(&self, id: &ProfileId) -> Result<Option<Profile>>;

    fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Insert a fully seeded profile
    fn create_profile(&self, profile: &Profile) -> Result<Profile>;

    fn update_profile(&self, id: &ProfileId, patch: &ProfilePatch) -> Result<Option<Profile>>;

    /// Every building owned by `profile_id`, in slot order
    fn get_buildings(&self, profile_id: &ProfileId) -> Result<Vec<Building>>;

    fn get_building(&self, id: BuildingId) -> Result<Option<Building>>;

    fn create_building(&self, building: &NewBuilding) -> Result<Building>;

    fn update_building(&self, id: BuildingId, patch: &BuildingPatch) -> Result<Option<Building>>;

    /// Remove a building row; `Ok(false)` when it did not exist
    fn delete_building(&self, id: BuildingId) -> Result<bool>;

    fn get_world_map_cells(&self, bounds: MapBounds) -> Result<Vec<WorldMapCell>>;

    fn get_world_map_cell(&self, x: i32, y: i32) -> Result<Option<WorldMapCell>>;

    fn create_world_map_cell(&self, cell: &NewWorldMapCell) -> Result<WorldMapCell>;
}

macro_rules! forward_repository {
    ($ptr:ty) => {
        impl<T: Repository + ?Sized> Repository for $ptr {
            fn get_profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
                (**self).get_profile(id)
            }

            fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
                (**self).get_profile_by_username(username)
            }

            fn create_profile(&self, profile: &Profile) -> Result<Profile> {
                (**self).create_profile(profile)
            }

            fn update_profile(
                &self,
                id: &ProfileId,
                patch: &ProfilePatch,
            ) -> Result<Option<Profile>> {
                (**self).update_profile(id, patch)
            }

            fn get_buildings(&self, profile_id: &ProfileId) -> Result<Vec<Building>> {
                (**self).get_buildings(profile_id)
            }

            fn get_building(&self, id: BuildingId) -> Result<Option<Building>> {
                (**self).get_building(id)
            }

            fn create_building(&self, building: &NewBuilding) -> Result<Building> {
                (**self).create_building(building)
            }

            fn update_building(
                &self,
                id: BuildingId,
                patch: &BuildingPatch,
            ) -> Result<Option<Building>> {
                (**self).update_building(id, patch)
            }

            fn delete_building(&self, id: BuildingId) -> Result<bool> {
                (**self).delete_building(id)
            }

            fn get_world_map_cells(&self, bounds: MapBounds) -> Result<Vec<WorldMapCell>> {
                (**self).get_world_map_cells(bounds)
            }

            fn get_world_map_cell(&self, x: i32, y: i32) -> Result<Option<WorldMapCell>> {
                (**self).get_world_map_cell(x, y)
            }

            fn create_world_map_cell(&self, cell: &NewWorldMapCell) -> Result<WorldMapCell> {
                (**self).create_world_map_cell(cell)
            }
        }
    };
}

forward_repository!(Box<T>);
forward_repository!(std::sync::Arc<T>);
