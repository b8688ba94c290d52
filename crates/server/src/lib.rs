//! HTTP surface for the questlog import engine.

pub mod api;
pub mod metrics;
pub mod state;
