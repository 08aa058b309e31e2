//! Buildings and their construction lifecycle
//!
//! ```text
//! (planned) ──StartBuild──▶ UnderConstruction(level 0) ──complete──▶ Active(1)
//!                                                                      │
//!            Active(n) ◀──complete── UnderConstruction(n) ◀─StartUpgrade─┘
//!                │
//!                └── n == max_level ──▶ MaxLevel
//! ```
//!
//! The planned state is never stored. While a building is under construction
//! it carries an [`UpgradeWindow`]; clearing the window is the completion.

use crate::catalog::{secs_to_delta, Catalog, CatalogEntry};
use crate::identity::{BuildingId, BuildingType, ProfileId};
use crate::resource::Resources;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Start and end of an in-flight construction or upgrade
///
/// Both instants exist together or not at all, and `ends_at > started_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeWindow {
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl UpgradeWindow {
    /// A window of `secs` seconds starting at `now`; at least one second long
    pub fn starting(now: DateTime<Utc>, secs: u64) -> Self {
        Self {
            started_at: now,
            ends_at: now + secs_to_delta(secs.max(1)),
        }
    }

    /// Rebuild from stored instants, rejecting an empty or inverted window
    pub fn from_parts(started_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Option<Self> {
        (ends_at > started_at).then_some(Self { started_at, ends_at })
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn duration(&self) -> TimeDelta {
        self.ends_at - self.started_at
    }

    /// Complete at `now`? The end instant itself counts as complete.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Time left until completion, zero once due
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.ends_at - now).max(TimeDelta::zero())
    }
}

/// Observable lifecycle state of a stored building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingState {
    UnderConstruction,
    Active,
    MaxLevel,
}

/// One occupied city slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub profile_id: ProfileId,
    pub building_type: BuildingType,
    /// 0 while the initial construction is in flight
    pub level: u32,
    pub slot_index: u32,
    pub upgrade: Option<UpgradeWindow>,
    pub created_at: DateTime<Utc>,
}

impl Building {
    pub fn is_upgrading(&self) -> bool {
        self.upgrade.is_some()
    }

    /// Upgrade in flight whose end instant has been reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.upgrade.is_some_and(|w| w.is_due(now))
    }

    pub fn state(&self, entry: Option<&CatalogEntry>) -> BuildingState {
        if self.is_upgrading() {
            BuildingState::UnderConstruction
        } else if entry.is_some_and(|e| e.is_max_level(self.level)) {
            BuildingState::MaxLevel
        } else {
            BuildingState::Active
        }
    }

    /// Effects of completing the in-flight upgrade, or `None` if idle
    ///
    /// Pure: nothing changes until the caller persists the result. Because
    /// the precondition is the window itself, a building whose window has
    /// been cleared can never yield a second completion.
    pub fn completion(&self, catalog: &Catalog) -> Option<Completion> {
        let window = self.upgrade?;
        let new_level = self.level + 1;
        let entry = catalog.lookup(&self.building_type);
        let rate_delta = match entry {
            Some(e) => e.production(new_level) - e.production(self.level),
            None => Resources::ZERO,
        };
        Some(Completion {
            building_id: self.id,
            new_level,
            at: window.ends_at(),
            rate_delta,
            storage_bonus: entry.and_then(|e| e.storage_bonus).unwrap_or(0),
        })
    }
}

/// The state change produced when a construction finishes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub building_id: BuildingId,
    pub new_level: u32,
    /// Instant the construction finished
    pub at: DateTime<Utc>,
    /// Change in hourly production for the owning profile
    pub rate_delta: Resources,
    /// Storage capacity added to the owning profile
    pub storage_bonus: u64,
}

impl Completion {
    pub fn building_patch(&self) -> BuildingPatch {
        BuildingPatch {
            level: Some(self.new_level),
            upgrade: Some(None),
        }
    }
}

/// Fields for a new building row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBuilding {
    pub profile_id: ProfileId,
    pub building_type: BuildingType,
    pub level: u32,
    pub slot_index: u32,
    /// Set when the row is created already under construction
    #[serde(default)]
    pub upgrade: Option<UpgradeWindow>,
    pub created_at: DateTime<Utc>,
}

impl NewBuilding {
    /// Materialize the row under a freshly assigned id
    pub fn into_building(self, id: BuildingId) -> Building {
        Building {
            id,
            profile_id: self.profile_id,
            building_type: self.building_type,
            level: self.level,
            slot_index: self.slot_index,
            upgrade: self.upgrade,
            created_at: self.created_at,
        }
    }
}

/// Partial building update; `None` leaves a field untouched
///
/// `upgrade: Some(None)` clears the window, `Some(Some(w))` starts one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingPatch {
    pub level: Option<u32>,
    pub upgrade: Option<Option<UpgradeWindow>>,
}

impl BuildingPatch {
    pub fn start_upgrade(window: UpgradeWindow) -> Self {
        Self {
            level: None,
            upgrade: Some(Some(window)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.upgrade.is_none()
    }
}

impl Building {
    /// Apply every field of `patch` that is set
    pub fn apply(&mut self, patch: &BuildingPatch) {
        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(upgrade) = patch.upgrade {
            self.upgrade = upgrade;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuildingKind;
    use crate::time::from_micros;

    fn building(kind: BuildingKind, level: u32, upgrade: Option<UpgradeWindow>) -> Building {
        Building {
            id: BuildingId::new_v4(),
            profile_id: ProfileId::new("u1"),
            building_type: kind.building_type(),
            level,
            slot_index: 0,
            upgrade,
            created_at: from_micros(0),
        }
    }

    #[test]
    fn test_window_end_is_inclusive() {
        let w = UpgradeWindow::starting(from_micros(0), 60);
        assert!(!w.is_due(from_micros(59_999_999)));
        assert!(w.is_due(from_micros(60_000_000)));
        assert_eq!(w.remaining(from_micros(90_000_000)), TimeDelta::zero());
    }

    #[test]
    fn test_window_rejects_inverted_parts() {
        assert!(UpgradeWindow::from_parts(from_micros(5), from_micros(5)).is_none());
        assert!(UpgradeWindow::from_parts(from_micros(5), from_micros(6)).is_some());
        assert_eq!(UpgradeWindow::starting(from_micros(0), 0).duration(), TimeDelta::seconds(1));
    }

    #[test]
    fn test_states() {
        let catalog = Catalog::builtin();
        let entry = catalog.get(BuildingKind::Well);
        let window = UpgradeWindow::starting(from_micros(0), 60);
        assert_eq!(
            building(BuildingKind::Well, 0, Some(window)).state(entry),
            BuildingState::UnderConstruction
        );
        assert_eq!(building(BuildingKind::Well, 3, None).state(entry), BuildingState::Active);
        assert_eq!(building(BuildingKind::Well, 10, None).state(entry), BuildingState::MaxLevel);
    }

    #[test]
    fn test_completion_of_new_well() {
        let window = UpgradeWindow::starting(from_micros(0), 60);
        let b = building(BuildingKind::Well, 0, Some(window));
        let c = b.completion(Catalog::builtin()).unwrap();
        assert_eq!(c.new_level, 1);
        assert_eq!(c.rate_delta, Resources::new(10.0, 0.0, 0.0, 0.0));
        assert_eq!(c.storage_bonus, 0);
        assert_eq!(c.at, window.ends_at());
    }

    #[test]
    fn test_completion_of_storage_grants_bonus() {
        let window = UpgradeWindow::starting(from_micros(0), 60);
        let b = building(BuildingKind::Storage, 2, Some(window));
        let c = b.completion(Catalog::builtin()).unwrap();
        assert_eq!(c.new_level, 3);
        assert_eq!(c.rate_delta, Resources::ZERO);
        assert_eq!(c.storage_bonus, 500);
    }

    #[test]
    fn test_completed_building_cannot_complete_again() {
        let window = UpgradeWindow::starting(from_micros(0), 60);
        let mut b = building(BuildingKind::Quarry, 1, Some(window));
        let c = b.completion(Catalog::builtin()).unwrap();
        b.apply(&c.building_patch());
        assert_eq!(b.level, 2);
        assert!(!b.is_upgrading());
        assert!(b.completion(Catalog::builtin()).is_none());
    }

    #[test]
    fn test_unknown_type_completes_without_effects() {
        let window = UpgradeWindow::starting(from_micros(0), 60);
        let mut b = building(BuildingKind::Well, 0, Some(window));
        b.building_type = BuildingType::new("temple");
        let c = b.completion(Catalog::builtin()).unwrap();
        assert_eq!(c.rate_delta, Resources::ZERO);
        assert_eq!(c.storage_bonus, 0);
    }
}
