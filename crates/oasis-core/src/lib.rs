//! Oasis Core - resource accrual and construction queue for a city builder
//!
//! This crate provides the authoritative game rules:
//! - Four resources with hourly production and a shared storage cap
//! - A data-driven building catalog (cost, build time, production per level)
//! - Lazy accrual: stocks are brought current on demand, never on a timer
//! - A construction queue with one in-flight job per profile
//! - The [`Repository`] contract plus an in-memory implementation
//!
//! ## Actions
//!
//! [`CityEngine`] is the single entry point for mutations. Each action
//! settles the profile first (due completions, then accrual), validates,
//! and only then writes. Actions on one profile are serialized with a
//! per-profile lock; different profiles never contend.
//!
//! ```
//! use oasis_core::{BuildingKind, CityEngine, MemoryRepository, NewProfile};
//!
//! let engine = CityEngine::new(MemoryRepository::new());
//! let profile = engine
//!     .create_or_fetch_profile(NewProfile::new("u1", "sami", "sami@example.com"))
//!     .unwrap();
//! let quarry = engine
//!     .start_build(&profile.id, &BuildingKind::Quarry.building_type(), 2)
//!     .unwrap();
//! assert!(quarry.is_upgrading());
//! ```

pub mod accrual;
mod building;
pub mod catalog;
mod config;
mod engine;
mod error;
mod identity;
mod locks;
mod memory;
mod profile;
pub mod repository;
mod resource;
mod rng;
pub mod time;
mod world;

pub use accrual::{reconcile, ResourceSnapshot};
pub use building::{
    Building, BuildingPatch, BuildingState, Completion, NewBuilding, UpgradeWindow,
};
pub use catalog::{BuildingKind, Catalog, CatalogEntry, FALLBACK_BUILD_TIME_SECS};
pub use config::{EngineConfig, StarterBuilding};
pub use engine::{CityEngine, Settlement};
pub use error::{Error, Result};
pub use identity::{BuildingId, BuildingType, ProfileId};
pub use locks::ProfileLocks;
pub use memory::MemoryRepository;
pub use profile::{NewProfile, Profile, ProfilePatch};
pub use repository::Repository;
pub use resource::{Resource, Resources};
pub use rng::GameRng;
pub use time::{Clock, ManualClock, SystemClock};
pub use world::{MapBounds, NewWorldMapCell, WorldMapCell};
