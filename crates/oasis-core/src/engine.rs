//! City engine - the action service
//!
//! [`CityEngine`] is the only writer of profiles and buildings. Every action
//! runs under the owning profile's lock as one sequence:
//!
//! ```text
//! lock(profile) -> settle(now) -> validate -> mutate -> unlock
//! ```
//!
//! Settling applies every due completion in end-time order (accruing stocks
//! at the old rates up to each completion instant first), then accrues the
//! stocks up to `now`. All of it is persisted before validation, so a
//! rejected action still leaves the profile truthfully reconciled.

use crate::accrual::{reconcile, ResourceSnapshot};
use crate::building::{Building, BuildingPatch, Completion, NewBuilding, UpgradeWindow};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::identity::{BuildingId, BuildingType, ProfileId};
use crate::locks::ProfileLocks;
use crate::profile::{NewProfile, Profile, ProfilePatch};
use crate::repository::Repository;
use crate::resource::Resources;
use crate::rng::GameRng;
use crate::time::{Clock, SystemClock};
use crate::world::{MapBounds, WorldMapCell};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A profile brought current, with the buildings it owns
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub profile: Profile,
    /// In slot order
    pub buildings: Vec<Building>,
    /// Completions applied by this settlement, in the order they happened
    pub completed: Vec<Completion>,
}

pub struct CityEngine<R, C = SystemClock> {
    repo: R,
    clock: C,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    locks: ProfileLocks,
    rng: Mutex<GameRng>,
}

impl<R: Repository> CityEngine<R, SystemClock> {
    /// Engine over `repo` with the wall clock, built-in catalog and defaults
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: Repository, C: Clock> CityEngine<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self::assemble(repo, clock, Arc::new(Catalog::default()), EngineConfig::default())
    }

    pub fn with_config(
        repo: R,
        clock: C,
        catalog: impl Into<Arc<Catalog>>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(repo, clock, catalog.into(), config))
    }

    fn assemble(repo: R, clock: C, catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        let seed = config
            .map_seed
            .unwrap_or_else(|| clock.now().timestamp_micros() as u64);
        Self {
            repo,
            clock,
            catalog,
            config,
            locks: ProfileLocks::new(),
            rng: Mutex::new(GameRng::new(seed)),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn locks(&self) -> &ProfileLocks {
        &self.locks
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Return the profile for `new.id`, creating and seeding it on first call
    ///
    /// A repeat call settles and returns the existing profile; it never
    /// reseeds stocks or buildings.
    pub fn create_or_fetch_profile(&self, new: NewProfile) -> Result<Profile> {
        if let Some(field) = new.missing_field() {
            return Err(Error::Validation(format!("missing required field: {field}")));
        }
        let id = new.id.clone();
        self.locks
            .with(&id, || {
                let now = self.clock.now();
                match self.repo.get_profile(&new.id)? {
                    Some(existing) => Ok(self.settle_locked(existing, now)?.profile),
                    None => self.seed_profile(new, now),
                }
            })
            .inspect_err(|e| trace_failure("create_profile", &id, e))
    }

    /// Starter rows go in before the profile row; a failure removes whatever
    /// this call created, so the next attempt seeds from scratch.
    fn seed_profile(&self, new: NewProfile, now: DateTime<Utc>) -> Result<Profile> {
        let (map_x, map_y) = self
            .rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map_position(self.config.map_size);

        let mut rates = Resources::ZERO;
        let mut capacity = self.config.storage_capacity;
        for starter in &self.config.starter_buildings {
            if let Some(entry) = self.catalog.get(starter.kind) {
                rates = rates + entry.production(starter.level);
                let bonus = entry.storage_bonus.unwrap_or(0);
                capacity = capacity.saturating_add(bonus.saturating_mul(u64::from(starter.level)));
            }
        }
        let cap = capacity as f64;

        // A profile that does not exist owns nothing; clear rows left by an
        // interrupted seeding.
        for stale in self.repo.get_buildings(&new.id)? {
            warn!(profile = %new.id, building = %stale.id, "removing orphaned building");
            self.repo.delete_building(stale.id)?;
        }

        let mut created = Vec::with_capacity(self.config.starter_buildings.len());
        for starter in &self.config.starter_buildings {
            let inserted = self.repo.create_building(&NewBuilding {
                profile_id: new.id.clone(),
                building_type: starter.kind.building_type(),
                level: starter.level,
                slot_index: starter.slot_index,
                upgrade: None,
                created_at: now,
            });
            match inserted {
                Ok(building) => created.push(building.id),
                Err(e) => {
                    self.discard_buildings(&new.id, &created);
                    return Err(e);
                }
            }
        }

        let inserted = self.repo.create_profile(&Profile {
            id: new.id.clone(),
            username: new.username,
            email: new.email,
            stocks: self.config.starting_stocks.map(|_, v| v.min(cap)),
            rates,
            storage_capacity: capacity,
            last_resource_update: now,
            map_x,
            map_y,
            created_at: now,
        });
        let profile = match inserted {
            Ok(profile) => profile,
            Err(e) => {
                self.discard_buildings(&new.id, &created);
                return Err(e);
            }
        };

        info!(
            profile = %profile.id,
            username = %profile.username,
            map_x,
            map_y,
            "profile created"
        );
        Ok(profile)
    }

    fn discard_buildings(&self, owner: &ProfileId, ids: &[BuildingId]) {
        for &id in ids {
            if let Err(e) = self.repo.delete_building(id) {
                warn!(profile = %owner, building = %id, error = %e, "building rollback failed");
            }
        }
    }

    /// The settled profile
    pub fn get_profile(&self, id: &ProfileId) -> Result<Profile> {
        Ok(self.settle(id)?.profile)
    }

    /// Reconciled stocks, rates, capacity and last update instant
    pub fn resources(&self, id: &ProfileId) -> Result<ResourceSnapshot> {
        Ok(self.settle(id)?.profile.snapshot())
    }

    /// Buildings after every due completion has been applied
    pub fn buildings(&self, id: &ProfileId) -> Result<Vec<Building>> {
        Ok(self.settle(id)?.buildings)
    }

    /// Bring a profile current and persist the result
    pub fn settle(&self, id: &ProfileId) -> Result<Settlement> {
        self.locks
            .with(id, || {
                let now = self.clock.now();
                let profile = self.require_profile(id)?;
                self.settle_locked(profile, now)
            })
            .inspect_err(|e| trace_failure("settle", id, e))
    }

    fn require_profile(&self, id: &ProfileId) -> Result<Profile> {
        self.repo
            .get_profile(id)?
            .ok_or_else(|| Error::profile_not_found(id))
    }

    /// Caller must hold the profile's lock
    fn settle_locked(&self, profile: Profile, now: DateTime<Utc>) -> Result<Settlement> {
        let id = profile.id.clone();
        let mut profile = profile;
        let mut buildings = self.repo.get_buildings(&id)?;

        let mut due: Vec<usize> = (0..buildings.len())
            .filter(|&i| buildings[i].is_due(now))
            .collect();
        due.sort_by_key(|&i| buildings[i].upgrade.map(|w| w.ends_at()));

        let mut snapshot = profile.snapshot();
        let mut completed = Vec::with_capacity(due.len());
        for idx in due {
            let Some(completion) = buildings[idx].completion(&self.catalog) else {
                continue;
            };
            snapshot = reconcile(&snapshot, completion.at);

            // Building first: a crash between the two writes loses a rate
            // delta rather than applying it twice.
            let updated = self
                .repo
                .update_building(completion.building_id, &completion.building_patch())?
                .ok_or_else(|| Error::building_not_found(completion.building_id))?;

            snapshot.rates = snapshot.rates + completion.rate_delta;
            snapshot.storage_capacity = snapshot
                .storage_capacity
                .saturating_add(completion.storage_bonus);
            profile = self
                .repo
                .update_profile(&id, &ProfilePatch::snapshot(&snapshot))?
                .ok_or_else(|| Error::profile_not_found(&id))?;

            info!(
                profile = %id,
                building = %updated.id,
                building_type = %updated.building_type,
                level = updated.level,
                at = %completion.at,
                "construction completed"
            );
            buildings[idx] = updated;
            completed.push(completion);
        }

        let current = reconcile(&snapshot, now);
        if current != profile.snapshot() {
            profile = self
                .repo
                .update_profile(&id, &ProfilePatch::snapshot(&current))?
                .ok_or_else(|| Error::profile_not_found(&id))?;
        }

        Ok(Settlement {
            profile,
            buildings,
            completed,
        })
    }

    // ========================================================================
    // Construction queue
    // ========================================================================

    /// Start constructing a new building of `building_type` at `slot_index`
    ///
    /// Checks run in order: known type, slot in range, profile exists, queue
    /// free, slot free, affordable. Nothing is written by a rejected call
    /// beyond the settlement itself.
    pub fn start_build(
        &self,
        id: &ProfileId,
        building_type: &BuildingType,
        slot_index: u32,
    ) -> Result<Building> {
        self.try_start_build(id, building_type, slot_index)
            .inspect_err(|e| trace_failure("start_build", id, e))
    }

    fn try_start_build(
        &self,
        id: &ProfileId,
        building_type: &BuildingType,
        slot_index: u32,
    ) -> Result<Building> {
        let entry = self.catalog.require(building_type)?;
        if slot_index >= self.config.city_slots {
            return Err(Error::Validation(format!(
                "slot {slot_index} is outside the city (0..{})",
                self.config.city_slots
            )));
        }

        self.locks.with(id, || {
            let now = self.clock.now();
            let settled = self.settle_locked(self.require_profile(id)?, now)?;

            if settled.buildings.iter().any(Building::is_upgrading) {
                return Err(Error::QueueBusy);
            }
            if settled.buildings.iter().any(|b| b.slot_index == slot_index) {
                return Err(Error::SlotOccupied(slot_index));
            }

            let cost = entry.cost(0);
            ensure_affordable(&settled.profile, &cost)?;

            let window = UpgradeWindow::starting(now, entry.build_time(0));
            let building = self.repo.create_building(&NewBuilding {
                profile_id: id.clone(),
                building_type: entry.kind.building_type(),
                level: 0,
                slot_index,
                upgrade: Some(window),
                created_at: now,
            })?;
            if let Err(e) = self.debit(&settled.profile, &cost) {
                self.discard_buildings(id, &[building.id]);
                return Err(e);
            }

            info!(
                profile = %id,
                building = %building.id,
                building_type = %building.building_type,
                slot = slot_index,
                ends_at = %window.ends_at(),
                "construction started"
            );
            Ok(building)
        })
    }

    /// Start upgrading an idle building to its next level
    ///
    /// Checks run in order: building exists, known type, below max level,
    /// not already upgrading, queue free, affordable.
    pub fn start_upgrade(&self, building_id: BuildingId) -> Result<Building> {
        self.try_start_upgrade(building_id)
            .inspect_err(|e| trace_failure("start_upgrade", &building_id, e))
    }

    fn try_start_upgrade(&self, building_id: BuildingId) -> Result<Building> {
        let owner = self
            .repo
            .get_building(building_id)?
            .ok_or_else(|| Error::building_not_found(building_id))?
            .profile_id;

        self.locks.with(&owner, || {
            let now = self.clock.now();
            let settled = self.settle_locked(self.require_profile(&owner)?, now)?;

            let building = settled
                .buildings
                .iter()
                .find(|b| b.id == building_id)
                .ok_or_else(|| Error::building_not_found(building_id))?;
            let entry = self.catalog.require(&building.building_type)?;

            if entry.is_max_level(building.level) {
                return Err(Error::MaxLevelReached {
                    max_level: entry.max_level,
                });
            }
            if building.is_upgrading() {
                return Err(Error::AlreadyUpgrading);
            }
            if settled
                .buildings
                .iter()
                .any(|b| b.id != building_id && b.is_upgrading())
            {
                return Err(Error::QueueBusy);
            }

            let cost = entry.cost(building.level);
            ensure_affordable(&settled.profile, &cost)?;

            let window = UpgradeWindow::starting(now, entry.build_time(building.level));
            let updated = self
                .repo
                .update_building(building_id, &BuildingPatch::start_upgrade(window))?
                .ok_or_else(|| Error::building_not_found(building_id))?;
            if let Err(e) = self.debit(&settled.profile, &cost) {
                let idle = BuildingPatch {
                    level: None,
                    upgrade: Some(None),
                };
                if let Err(undo) = self.repo.update_building(building_id, &idle) {
                    warn!(
                        profile = %owner,
                        building = %building_id,
                        error = %undo,
                        "upgrade rollback failed"
                    );
                }
                return Err(e);
            }

            info!(
                profile = %owner,
                building = %building_id,
                building_type = %updated.building_type,
                target_level = updated.level + 1,
                ends_at = %window.ends_at(),
                "upgrade started"
            );
            Ok(updated)
        })
    }

    /// Spend `cost` from an already settled profile that covers it
    fn debit(&self, profile: &Profile, cost: &Resources) -> Result<Profile> {
        let snapshot = ResourceSnapshot {
            stocks: profile.stocks - *cost,
            ..profile.snapshot()
        };
        self.repo
            .update_profile(&profile.id, &ProfilePatch::stocks_at(&snapshot))?
            .ok_or_else(|| Error::profile_not_found(&profile.id))
    }

    // ========================================================================
    // World map
    // ========================================================================

    /// Stored cells inside `bounds`
    pub fn world_map(&self, bounds: MapBounds) -> Result<Vec<WorldMapCell>> {
        if bounds.min_x > bounds.max_x || bounds.min_y > bounds.max_y {
            return Err(Error::Validation(format!(
                "empty map window x {}..{} y {}..{}",
                bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y
            )));
        }
        self.repo.get_world_map_cells(bounds)
    }
}

fn ensure_affordable(profile: &Profile, cost: &Resources) -> Result<()> {
    if profile.stocks.covers(cost) {
        Ok(())
    } else {
        Err(Error::InsufficientResources {
            missing: profile.stocks.shortfall(cost),
        })
    }
}

fn trace_failure(action: &'static str, subject: &dyn fmt::Display, err: &Error) {
    if err.is_rejection() {
        debug!(action, subject = %subject, code = err.code(), "rejected: {err}");
    } else {
        warn!(action, subject = %subject, error = %err, "action failed");
    }
}
