//! Oasis DB - durable repository using native_db
//!
//! Provides persistent storage for:
//! - Player profiles (stocks, rates, capacity, map position)
//! - Buildings, indexed by owner and by `(owner, slot)`
//! - World map cells, indexed by coordinate
//!
//! [`Store`] implements [`oasis_core::Repository`]; each call is one
//! native_db transaction.

mod error;
mod models;
mod queries;
mod store;

pub use error::{Error, Result};
pub use store::Store;
