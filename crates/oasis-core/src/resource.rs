//! The four city resources and per-resource quantity bundles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Index, IndexMut, Sub};

/// A resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Water,
    Dates,
    Gold,
    Stone,
}

impl Resource {
    /// All resources in display order
    pub const ALL: [Resource; 4] = [
        Resource::Water,
        Resource::Dates,
        Resource::Gold,
        Resource::Stone,
    ];

    /// Lowercase name used in messages and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Water => "water",
            Resource::Dates => "dates",
            Resource::Gold => "gold",
            Resource::Stone => "stone",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quantity per resource
///
/// Used for stocks, hourly rates, costs and production alike. Missing
/// fields deserialize as zero so catalog data only lists what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub water: f64,
    pub dates: f64,
    pub gold: f64,
    pub stone: f64,
}

impl Resources {
    /// All four quantities zero
    pub const ZERO: Resources = Resources {
        water: 0.0,
        dates: 0.0,
        gold: 0.0,
        stone: 0.0,
    };

    pub const fn new(water: f64, dates: f64, gold: f64, stone: f64) -> Self {
        Self {
            water,
            dates,
            gold,
            stone,
        }
    }

    /// Same quantity for every resource
    pub const fn splat(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    /// Apply `f` to every quantity
    pub fn map(self, mut f: impl FnMut(Resource, f64) -> f64) -> Self {
        let mut out = self;
        for r in Resource::ALL {
            out[r] = f(r, self[r]);
        }
        out
    }

    /// Combine two bundles quantity by quantity
    pub fn zip_with(self, other: Resources, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        self.map(|r, v| f(v, other[r]))
    }

    /// Iterate `(resource, quantity)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        Resource::ALL.into_iter().map(move |r| (r, self[r]))
    }

    /// Whether these stocks pay for `cost` in every resource
    pub fn covers(&self, cost: &Resources) -> bool {
        self.iter().all(|(r, have)| have >= cost[r])
    }

    /// How much of each resource is missing to pay `cost` (zero where covered)
    pub fn shortfall(&self, cost: &Resources) -> Resources {
        cost.zip_with(*self, |need, have| (need - have).max(0.0))
    }

    /// Round every quantity down, as shown to players
    pub fn floor(self) -> Self {
        self.map(|_, v| v.floor())
    }

    /// Human-readable list of the positive quantities, e.g. `"12 dates, 4 stone"`
    pub fn describe_positive(&self) -> String {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, v)| *v > 0.0)
            .map(|(r, v)| format!("{} {}", v.ceil(), r))
            .collect();
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl Index<Resource> for Resources {
    type Output = f64;

    fn index(&self, resource: Resource) -> &f64 {
        match resource {
            Resource::Water => &self.water,
            Resource::Dates => &self.dates,
            Resource::Gold => &self.gold,
            Resource::Stone => &self.stone,
        }
    }
}

impl IndexMut<Resource> for Resources {
    fn index_mut(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Water => &mut self.water,
            Resource::Dates => &mut self.dates,
            Resource::Gold => &mut self.gold,
            Resource::Stone => &mut self.stone,
        }
    }
}

impl Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for Resources {
    type Output = Resources;

    fn sub(self, rhs: Resources) -> Resources {
        self.zip_with(rhs, |a, b| a - b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_requires_every_resource() {
        let stock = Resources::new(100.0, 50.0, 30.0, 80.0);
        assert!(stock.covers(&Resources::new(0.0, 50.0, 30.0, 80.0)));
        assert!(!stock.covers(&Resources::new(0.0, 50.0, 31.0, 80.0)));
    }

    #[test]
    fn test_shortfall() {
        let stock = Resources::new(100.0, 10.0, 0.0, 0.0);
        let cost = Resources::new(50.0, 60.0, 0.0, 120.0);
        assert_eq!(stock.shortfall(&cost), Resources::new(0.0, 50.0, 0.0, 120.0));
    }

    #[test]
    fn test_index_and_arithmetic() {
        let mut r = Resources::ZERO;
        r[Resource::Gold] = 5.0;
        let sum = r + Resources::splat(1.0);
        assert_eq!(sum, Resources::new(1.0, 1.0, 6.0, 1.0));
        assert_eq!(sum - r, Resources::splat(1.0));
    }

    #[test]
    fn test_partial_ron_defaults_to_zero() {
        let r: Resources = ron::from_str("(water: 10.0)").unwrap();
        assert_eq!(r, Resources::new(10.0, 0.0, 0.0, 0.0));
    }
}
