//! Oasis Server - JSON over HTTP for the city engine
//!
//! A thin hyper/tokio front for [`oasis_core::CityEngine`]. Routes map one
//! to one onto engine actions; engine rejections become 400/404 responses
//! with a stable `code`, storage failures become 500.
//!
//! Configuration is a RON file (see [`Config`]); the binary takes its path
//! as the first argument and defaults to `config/server.ron`.

pub mod api;
mod config;
mod error;
mod handlers;
pub mod rate_limit;
pub mod response;
mod router;
mod server;
mod state;

pub use config::{Config, StorageConfig};
pub use error::{Result, ServerError};
pub use handlers::handle_request;
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
pub use router::{Route, RouteMatch, Router};
pub use server::serve;
pub use state::{AppState, Engine};
