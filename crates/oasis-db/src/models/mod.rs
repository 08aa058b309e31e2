//! Database models for persistent storage.
//!
//! Instants are stored as microseconds since the epoch and resource
//! quadruples as `[water, dates, gold, stone]`.

mod building;
mod profile;
mod world;

pub use building::*;
pub use profile::*;
pub use world::*;

use oasis_core::Resources;

pub(crate) fn pack(r: &Resources) -> [f64; 4] {
    [r.water, r.dates, r.gold, r.stone]
}

pub(crate) fn unpack([water, dates, gold, stone]: [f64; 4]) -> Resources {
    Resources::new(water, dates, gold, stone)
}
