//! Birdnest feed - upstream drone and pilot endpoints
//!
//! Fetches monitoring-device snapshots and pilot details over HTTP and
//! exposes them through the [`DroneFeed`] and [`PilotDirectory`] traits.

pub mod client;
pub mod error;
pub mod pilot;
pub mod snapshot;
pub mod source;

pub use client::BirdnestClient;
pub use error::FetchError;
pub use pilot::parse_pilot;
pub use snapshot::parse_snapshot;
pub use source::{DroneFeed, PilotDirectory};
