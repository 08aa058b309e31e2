//! Resource accrual
//!
//! Stocks grow continuously at their hourly rate and are capped at the shared
//! storage capacity. Nothing ticks in the background: a snapshot is brought
//! current on demand by [`reconcile`].

use crate::resource::Resources;
use crate::time::hours_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A profile's stocks plus the instant they are valid as of
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub stocks: Resources,
    /// Production per hour
    pub rates: Resources,
    pub storage_capacity: u64,
    pub last_update: DateTime<Utc>,
}

impl ResourceSnapshot {
    /// Bring this snapshot current; see [`reconcile`]
    pub fn reconciled(&self, now: DateTime<Utc>) -> ResourceSnapshot {
        reconcile(self, now)
    }
}

/// Advance `snapshot` to `now`
///
/// `stock' = clamp(stock + rate * elapsed_hours, 0, capacity)` per resource
/// and `last_update' = now`. An instant earlier than `last_update` counts as
/// zero elapsed time and leaves the snapshot unchanged.
pub fn reconcile(snapshot: &ResourceSnapshot, now: DateTime<Utc>) -> ResourceSnapshot {
    if now <= snapshot.last_update {
        return *snapshot;
    }
    let hours = hours_between(snapshot.last_update, now);
    let cap = snapshot.storage_capacity as f64;
    let stocks = snapshot
        .stocks
        .zip_with(snapshot.rates, |stock, rate| (stock + rate * hours).clamp(0.0, cap));
    ResourceSnapshot {
        stocks,
        last_update: now,
        ..*snapshot
    }
}
