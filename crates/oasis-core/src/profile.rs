//! Player profiles

use crate::accrual::ResourceSnapshot;
use crate::identity::ProfileId;
use crate::resource::Resources;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One player's city-wide state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub username: String,
    pub email: String,
    pub stocks: Resources,
    /// Production per hour
    pub rates: Resources,
    pub storage_capacity: u64,
    /// Instant the stocks were last brought current
    pub last_resource_update: DateTime<Utc>,
    pub map_x: i32,
    pub map_y: i32,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            stocks: self.stocks,
            rates: self.rates,
            storage_capacity: self.storage_capacity,
            last_update: self.last_resource_update,
        }
    }

    /// Apply every field of `patch` that is set
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(username) = &patch.username {
            self.username.clone_from(username);
        }
        if let Some(email) = &patch.email {
            self.email.clone_from(email);
        }
        if let Some(stocks) = patch.stocks {
            self.stocks = stocks;
        }
        if let Some(rates) = patch.rates {
            self.rates = rates;
        }
        if let Some(capacity) = patch.storage_capacity {
            self.storage_capacity = capacity;
        }
        if let Some(at) = patch.last_resource_update {
            self.last_resource_update = at;
        }
        if let Some(x) = patch.map_x {
            self.map_x = x;
        }
        if let Some(y) = patch.map_y {
            self.map_y = y;
        }
    }
}

/// Fields a player supplies to create a profile
///
/// Stocks, rates, capacity and coordinates are seeded by the engine from its
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: ProfileId,
    pub username: String,
    pub email: String,
}

impl NewProfile {
    pub fn new(id: impl Into<ProfileId>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
        }
    }

    /// Names the first missing required field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.id.as_str().trim().is_empty() {
            Some("id")
        } else if self.username.trim().is_empty() {
            Some("username")
        } else if self.email.trim().is_empty() {
            Some("email")
        } else {
            None
        }
    }
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub stocks: Option<Resources>,
    pub rates: Option<Resources>,
    pub storage_capacity: Option<u64>,
    pub last_resource_update: Option<DateTime<Utc>>,
    pub map_x: Option<i32>,
    pub map_y: Option<i32>,
}

impl ProfilePatch {
    /// Persist a reconciled snapshot (stocks and timestamp only)
    pub fn stocks_at(snapshot: &ResourceSnapshot) -> Self {
        Self {
            stocks: Some(snapshot.stocks),
            last_resource_update: Some(snapshot.last_update),
            ..Default::default()
        }
    }

    /// Persist a whole snapshot including rates and capacity
    pub fn snapshot(snapshot: &ResourceSnapshot) -> Self {
        Self {
            stocks: Some(snapshot.stocks),
            rates: Some(snapshot.rates),
            storage_capacity: Some(snapshot.storage_capacity),
            last_resource_update: Some(snapshot.last_update),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ProfilePatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_micros;

    fn profile() -> Profile {
        Profile {
            id: ProfileId::new("u1"),
            username: "sami".into(),
            email: "sami@example.com".into(),
            stocks: Resources::splat(500.0),
            rates: Resources::new(10.0, 8.0, 0.0, 0.0),
            storage_capacity: 2000,
            last_resource_update: from_micros(0),
            map_x: 4,
            map_y: 9,
            created_at: from_micros(0),
        }
    }

    #[test]
    fn test_partial_patch_leaves_other_fields() {
        let mut p = profile();
        p.apply(&ProfilePatch {
            storage_capacity: Some(2500),
            ..Default::default()
        });
        assert_eq!(p.storage_capacity, 2500);
        assert_eq!(p.stocks, Resources::splat(500.0));
        assert_eq!(p.username, "sami");
    }

    #[test]
    fn test_stocks_patch_keeps_rates() {
        let mut p = profile();
        let mut snap = p.snapshot();
        snap.stocks = Resources::splat(1.0);
        snap.rates = Resources::ZERO;
        snap.last_update = from_micros(5);
        p.apply(&ProfilePatch::stocks_at(&snap));
        assert_eq!(p.stocks, Resources::splat(1.0));
        assert_eq!(p.rates, Resources::new(10.0, 8.0, 0.0, 0.0));
        assert_eq!(p.last_resource_update, from_micros(5));
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(NewProfile::new("", "a", "b").missing_field(), Some("id"));
        assert_eq!(NewProfile::new("u", " ", "b").missing_field(), Some("username"));
        assert_eq!(NewProfile::new("u", "a", "").missing_field(), Some("email"));
        assert_eq!(NewProfile::new("u", "a", "b").missing_field(), None);
    }
}
