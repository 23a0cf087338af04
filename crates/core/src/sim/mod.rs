//! Simulation: trace decoding and the replay driver.
//!
//! This module is the world around the rename unit:
//! 1. **Trace:** Packed record decoding/encoding and streaming readers/writers.
//! 2. **Engine:** The cycle loop that renames, completes, retires and squashes.
//! 3. **Synth:** Synthetic microbenchmark-shaped traces for demos and tests.

/// Cycle-level replay driver.
pub mod engine;

/// Synthetic trace generation.
pub mod synth;

/// Packed trace record decode/encode.
pub mod trace;

pub use engine::{ReplayEngine, ReplayError};
pub use trace::{TraceFormat, TraceInstruction, TraceReader, TraceWriter};
