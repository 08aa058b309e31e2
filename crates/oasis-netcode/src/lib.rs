//! Oasis Netcode - client-side display prediction
//!
//! The server is authoritative. Between refreshes a client extrapolates what
//! it last fetched so counters tick smoothly:
//!
//! - **Prediction**: stocks grow from the last server snapshot at its rates,
//!   capped at storage capacity, floored for display
//! - **Countdowns**: remaining time and progress of an in-flight construction
//!
//! Nothing here is ever written back; every refresh replaces the local
//! baseline wholesale.
//!
//! ```text
//!   fetch (every 30s) ──▶ sync(snapshot) ──▶ baseline
//!                                               │
//!   tick  (every 1s)  ──────────────────▶ predict(now) ──▶ render
//! ```

mod countdown;
mod prediction;

pub use countdown::{format_clock, Countdown};
pub use prediction::{
    DisplayResources, PredictorConfig, ResourcePredictor, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_TICK_INTERVAL,
};
