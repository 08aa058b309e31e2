//! Error types for oasis-core

use crate::resource::Resources;
use thiserror::Error;

/// Core error type
///
/// Every variant except [`Error::Repository`] is a rejection detected before
/// any mutation; the caller's state is left exactly as reconciled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("unknown building type: {0}")]
    UnknownBuildingType(String),

    #[error("construction queue is busy: another building is already under construction")]
    QueueBusy,

    #[error("slot {0} is already occupied")]
    SlotOccupied(u32),

    #[error("not enough resources: missing {}", .missing.describe_positive())]
    InsufficientResources { missing: Resources },

    #[error("building is already at its maximum level ({max_level})")]
    MaxLevelReached { max_level: u32 },

    #[error("building is already being upgraded")]
    AlreadyUpgrading,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("repository failure: {0}")]
    Repository(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl Error {
    /// Shorthand for a missing profile
    pub fn profile_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            entity: "profile",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing building
    pub fn building_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            entity: "building",
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::UnknownBuildingType(_) => "unknown_building_type",
            Error::QueueBusy => "queue_busy",
            Error::SlotOccupied(_) => "slot_occupied",
            Error::InsufficientResources { .. } => "insufficient_resources",
            Error::MaxLevelReached { .. } => "max_level_reached",
            Error::AlreadyUpgrading => "already_upgrading",
            Error::Validation(_) => "validation_error",
            Error::Repository(_) => "repository_failure",
            Error::InvalidCatalog(_) => "invalid_catalog",
        }
    }

    /// True for business-rule and input rejections, false for store failures
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Error::Repository(_) | Error::InvalidCatalog(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
