//! The Shelf service layer: instance-scoped resource caches and the
//! process-wide refresh bus, plus configuration, logging and metrics for the
//! embedding launcher.
//!
//! See the [`caching`] module docs for how the cache layers fit together.

#[macro_use]
pub mod metrics;

pub mod bus;
pub mod caching;
pub mod config;
pub mod logging;
pub mod services;
