//! Construction countdowns
//!
//! Derived from a building's upgrade window and the local clock. The window
//! only changes on a server refresh; between refreshes the countdown ticks.

use chrono::{DateTime, Utc};
use oasis_core::{Building, UpgradeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    window: UpgradeWindow,
}

impl Countdown {
    pub fn new(window: UpgradeWindow) -> Self {
        Self { window }
    }

    /// Countdown for a building under construction, `None` if idle
    pub fn for_building(building: &Building) -> Option<Self> {
        building.upgrade.map(Self::new)
    }

    /// Whole seconds left, rounded up so `0` means done
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let micros = self.window.remaining(now).num_microseconds().unwrap_or(i64::MAX);
        (micros.max(0) as u64).div_ceil(1_000_000)
    }

    /// Fraction complete in `0.0..=1.0`
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let total = self.window.duration().num_microseconds().unwrap_or(i64::MAX) as f64;
        let done = (now - self.window.started_at())
            .num_microseconds()
            .unwrap_or(i64::MAX) as f64;
        (done / total).clamp(0.0, 1.0)
    }

    /// Done by local reckoning; the server has not necessarily applied it yet
    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        self.window.is_due(now)
    }

    /// `remaining_secs` as a clock string
    pub fn label(&self, now: DateTime<Utc>) -> String {
        format_clock(self.remaining_secs(now))
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour up
pub fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use oasis_core::time::from_micros;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(84), "01:24");
        assert_eq!(format_clock(3600), "1:00:00");
        assert_eq!(format_clock(3 * 3600 + 5 * 60 + 9), "3:05:09");
    }

    #[test]
    fn test_countdown_ticks_down() {
        let start = from_micros(0);
        let c = Countdown::new(UpgradeWindow::starting(start, 90));

        assert_eq!(c.remaining_secs(start), 90);
        assert_eq!(c.label(start), "01:30");
        assert_eq!(c.remaining_secs(start + TimeDelta::milliseconds(500)), 90);
        assert_eq!(c.remaining_secs(start + TimeDelta::seconds(45)), 45);
        assert!((c.progress(start + TimeDelta::seconds(45)) - 0.5).abs() < 1e-9);
        assert!(!c.is_finished(start + TimeDelta::seconds(89)));

        let late = start + TimeDelta::seconds(120);
        assert_eq!(c.remaining_secs(late), 0);
        assert_eq!(c.progress(late), 1.0);
        assert!(c.is_finished(late));
    }
}
