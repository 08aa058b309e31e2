//! Client-side resource prediction
//!
//! Extrapolates the last server snapshot for display. Uses the same accrual
//! function as the server, measured from the local instant the snapshot was
//! received so client/server clock skew never shows up as a jump.

use chrono::{DateTime, TimeDelta, Utc};
use oasis_core::{reconcile, Resource, ResourceSnapshot, Resources};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often the display recomputes
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How often the client refetches from the server
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub tick_interval: Duration,
    pub refresh_interval: Duration,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// What the player sees for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayResources {
    /// Extrapolated stocks, floored
    pub stocks: Resources,
    /// Production per hour as last reported by the server
    pub rates: Resources,
    pub storage_capacity: u64,
    /// Local instant this prediction is for
    pub as_of: DateTime<Utc>,
}

impl DisplayResources {
    pub fn is_full(&self, resource: Resource) -> bool {
        self.stocks[resource] >= self.storage_capacity as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    snapshot: ResourceSnapshot,
    received_at: DateTime<Utc>,
}

/// Advisory resource display
///
/// Holds at most one server snapshot. Safe to compute with stale data: the
/// next [`ResourcePredictor::sync`] discards everything predicted so far.
#[derive(Debug, Clone, Default)]
pub struct ResourcePredictor {
    config: PredictorConfig,
    baseline: Option<Baseline>,
}

impl ResourcePredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PredictorConfig) -> Self {
        Self {
            config,
            baseline: None,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Replace the baseline with a fresh server snapshot
    pub fn sync(&mut self, snapshot: ResourceSnapshot, received_at: DateTime<Utc>) {
        self.baseline = Some(Baseline {
            snapshot,
            received_at,
        });
    }

    pub fn is_synced(&self) -> bool {
        self.baseline.is_some()
    }

    /// The snapshot exactly as the server sent it
    pub fn server_snapshot(&self) -> Option<&ResourceSnapshot> {
        self.baseline.as_ref().map(|b| &b.snapshot)
    }

    /// Extrapolated display values at `now`; `None` before the first sync
    pub fn predict(&self, now: DateTime<Utc>) -> Option<DisplayResources> {
        let baseline = self.baseline?;
        let local = ResourceSnapshot {
            last_update: baseline.received_at,
            ..baseline.snapshot
        };
        let current = reconcile(&local, now);
        Some(DisplayResources {
            stocks: current.stocks.floor(),
            rates: current.rates,
            storage_capacity: current.storage_capacity,
            as_of: now,
        })
    }

    /// Whether the displayed stocks cover `cost`; false before the first sync
    pub fn can_afford(&self, cost: &Resources, now: DateTime<Utc>) -> bool {
        self.predict(now).is_some_and(|d| d.stocks.covers(cost))
    }

    /// Displayed shortfall against `cost`; `None` before the first sync
    pub fn shortfall(&self, cost: &Resources, now: DateTime<Utc>) -> Option<Resources> {
        self.predict(now).map(|d| d.stocks.shortfall(cost))
    }

    /// True before the first sync and once the refresh interval has elapsed
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.baseline {
            None => true,
            Some(b) => now - b.received_at >= to_delta(self.config.refresh_interval),
        }
    }

    /// Next display instant after `now`, on the tick grid anchored at the
    /// last sync; `now + tick_interval` before the first sync
    pub fn next_tick(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let tick = to_delta(self.config.tick_interval);
        let tick_us = tick.num_microseconds().unwrap_or(i64::MAX).max(1);
        let Some(b) = self.baseline.filter(|b| now >= b.received_at) else {
            return now.checked_add_signed(tick).unwrap_or(DateTime::<Utc>::MAX_UTC);
        };
        let elapsed_us = (now - b.received_at).num_microseconds().unwrap_or(i64::MAX);
        let ticks = (elapsed_us / tick_us).saturating_add(1);
        b.received_at
            .checked_add_signed(TimeDelta::microseconds(ticks.saturating_mul(tick_us)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Drop the baseline (e.g. on logout)
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasis_core::time::from_micros;

    fn snapshot(water: f64, water_rate: f64, capacity: u64) -> ResourceSnapshot {
        ResourceSnapshot {
            stocks: Resources::new(water, 100.0, 0.0, 0.0),
            rates: Resources::new(water_rate, 0.0, 0.0, 0.0),
            storage_capacity: capacity,
            // server clock; deliberately far from the client's
            last_update: from_micros(0),
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        from_micros(1_700_000_000_000_000 + secs * 1_000_000)
    }

    #[test]
    fn test_predict_before_sync() {
        let p = ResourcePredictor::new();
        assert!(p.predict(t(0)).is_none());
        assert!(!p.can_afford(&Resources::ZERO, t(0)));
        assert!(p.needs_refresh(t(0)));
    }

    #[test]
    fn test_extrapolates_from_receipt() {
        let mut p = ResourcePredictor::new();
        p.sync(snapshot(100.0, 10.0, 2000), t(0));

        assert_eq!(p.predict(t(0)).unwrap().stocks.water, 100.0);
        // 10/h for 30 min
        assert_eq!(p.predict(t(1800)).unwrap().stocks.water, 105.0);
        // 10/h for 59s is 0.16, floored away
        assert_eq!(p.predict(t(59)).unwrap().stocks.water, 100.0);
    }

    #[test]
    fn test_prediction_is_capped() {
        let mut p = ResourcePredictor::new();
        p.sync(snapshot(1995.0, 100.0, 2000), t(0));
        let d = p.predict(t(3600)).unwrap();
        assert_eq!(d.stocks.water, 2000.0);
        assert!(d.is_full(Resource::Water));
        assert!(!d.is_full(Resource::Dates));
    }

    #[test]
    fn test_sync_discards_prediction() {
        let mut p = ResourcePredictor::new();
        p.sync(snapshot(100.0, 10.0, 2000), t(0));
        assert_eq!(p.predict(t(3600)).unwrap().stocks.water, 110.0);

        // the server spent some water meanwhile
        p.sync(snapshot(20.0, 10.0, 2000), t(3600));
        assert_eq!(p.predict(t(3600)).unwrap().stocks.water, 20.0);
        assert_eq!(p.server_snapshot().unwrap().stocks.water, 20.0);
    }

    #[test]
    fn test_can_afford_after_waiting() {
        let mut p = ResourcePredictor::new();
        p.sync(snapshot(100.0, 60.0, 2000), t(0));
        let cost = Resources::new(110.0, 50.0, 0.0, 0.0);

        assert!(!p.can_afford(&cost, t(0)));
        assert_eq!(
            p.shortfall(&cost, t(0)).unwrap(),
            Resources::new(10.0, 0.0, 0.0, 0.0)
        );
        assert!(p.can_afford(&cost, t(600)));
    }

    #[test]
    fn test_refresh_interval() {
        let mut p = ResourcePredictor::new();
        p.sync(snapshot(0.0, 0.0, 2000), t(0));
        assert!(!p.needs_refresh(t(29)));
        assert!(p.needs_refresh(t(30)));

        p.reset();
        assert!(!p.is_synced());
        assert!(p.needs_refresh(t(31)));
    }

    #[test]
    fn test_next_tick_follows_sync() {
        let mut p = ResourcePredictor::with_config(PredictorConfig {
            tick_interval: Duration::from_secs(5),
            ..Default::default()
        });
        assert_eq!(p.next_tick(t(3)), t(8));

        p.sync(snapshot(0.0, 0.0, 2000), t(1));
        assert_eq!(p.next_tick(t(1)), t(6));
        assert_eq!(p.next_tick(t(7)), t(11));
        assert_eq!(p.next_tick(t(11)), t(16));
        // clock stepped back behind the receipt
        assert_eq!(p.next_tick(t(0)), t(5));
    }

    #[test]
    fn test_config_from_ron() {
        let config: PredictorConfig =
            ron::from_str("(refresh_interval: (secs: 10, nanos: 0))").unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
    }
}
