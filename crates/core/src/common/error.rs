//! Error types surfaced by the rename unit.
//!
//! This module defines the failure modes of the register allocator. It provides:
//! 1. **Exhaustion:** `NoFreeRegister`, the stall condition the pipeline handles every cycle.
//! 2. **Programming errors:** `OutOfRange` for register ids outside the configured file.
//! 3. **Self-check failures:** `InvariantViolation` produced by the allocator's validator.

use std::fmt;

/// A single invariant violation found by [`validate`].
///
/// Carries a human-readable description of the broken invariant; the
/// validator returns all violations it finds, not just the first.
///
/// [`validate`]: crate::core::rename::RegisterAllocator::validate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the broken invariant, including the ids involved.
    pub message: String,
}

impl InvariantViolation {
    /// Creates a violation from a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors raised by the rename unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameError {
    /// The free list is empty and an allocation was requested.
    ///
    /// Not fatal: the decode stage stalls for the cycle and retries once
    /// retirement returns registers to the free list.
    NoFreeRegister,

    /// A register id outside the configured bounds was used.
    ///
    /// Indicates a caller bug; the allocator never hands out such ids.
    OutOfRange {
        /// What kind of id was out of range (e.g. `"physical register"`).
        what: &'static str,
        /// The offending index.
        index: usize,
        /// The exclusive upper bound the index was checked against.
        limit: usize,
    },

    /// The allocator's self-check found inconsistent state.
    ///
    /// Fatal to the simulation: some earlier operation corrupted the
    /// free-list / register-file bookkeeping.
    InvariantViolation(InvariantViolation),
}

impl fmt::Display for RenameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenameError::NoFreeRegister => write!(f, "no free physical register"),
            RenameError::OutOfRange { what, index, limit } => {
                write!(f, "{} id {} out of range (limit {})", what, index, limit)
            }
            RenameError::InvariantViolation(v) => write!(f, "invariant violation: {}", v),
        }
    }
}

impl std::error::Error for RenameError {}

impl From<InvariantViolation> for RenameError {
    fn from(v: InvariantViolation) -> Self {
        RenameError::InvariantViolation(v)
    }
}
