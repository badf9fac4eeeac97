//! Shared library surface for the Birdnest server and its tests.

pub mod api;
pub mod backoff;
pub mod config;
pub mod cycle;
pub mod loops;
pub mod persistence;
pub mod render;
pub mod state;
