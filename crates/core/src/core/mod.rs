//! Core out-of-order backend components.
//!
//! Contains the rename unit, the piece of the backend this simulator
//! models at full fidelity. The surrounding stages (fetch, scheduling,
//! memory) are abstracted by the replay engine in [`crate::sim`].

/// Register rename unit (free list, register file, alias tables, protocol).
pub mod rename;

pub use rename::RegisterAllocator;
