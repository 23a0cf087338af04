//! Trace-driven out-of-order register-rename simulator.
//!
//! This crate models the physical register allocator of an out-of-order core
//! and the minimum machinery needed to drive it from instruction traces:
//! 1. **Rename unit:** Free list, physical register file, frontend/backend
//!    alias tables and per-instruction rename history with speculative rollback.
//! 2. **Traces:** Packed little-endian record decoding (standard and
//!    cloudsuite layouts), plus a synthetic microbenchmark generator.
//! 3. **Replay:** A cycle loop exercising rename, completion, in-order
//!    retirement and misprediction squash.
//! 4. **Support:** Configuration, statistics and typed errors.

/// Common types, constants and errors.
pub mod common;

/// Simulator configuration.
pub mod config;

/// Core backend components (the rename unit).
pub mod core;

/// Trace decoding and the replay driver.
pub mod sim;

/// Replay statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The rename unit; construct with `RegisterAllocator::new`.
pub use crate::core::rename::RegisterAllocator;
/// The trace replay driver; construct with `ReplayEngine::new`.
pub use crate::sim::engine::ReplayEngine;
