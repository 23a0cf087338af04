//! Common types and constants shared across the simulator.
//!
//! This module provides the building blocks used by every other component:
//! 1. **Constants:** Architectural register space and physical id limits.
//! 2. **Error Handling:** The rename unit's typed failure modes.

/// Common constants used throughout the simulator.
pub mod constants;

/// Error types for the rename unit.
pub mod error;

pub use constants::{ARCH_REG_COUNT, FREE_SLOT_ARCH_REG, MAX_PHYS_ID};
pub use error::{InvariantViolation, RenameError};
