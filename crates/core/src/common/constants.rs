//! Common constants used throughout the simulator.

/// Number of architectural register names addressable by a trace record.
///
/// Trace records encode architectural registers in a single byte, so both
/// alias tables cover the full byte range.
pub const ARCH_REG_COUNT: usize = 256;

/// Upper bound on the physical register file size.
///
/// Physical register ids are `u16`; a file larger than this could not be
/// addressed.
pub const MAX_PHYS_ID: usize = u16::MAX as usize + 1;

/// `arch_reg_index` stored in a free physical register slot.
///
/// Not 0, so a leaked slot stands out in dumps instead of masquerading as
/// architectural register 0.
pub const FREE_SLOT_ARCH_REG: u8 = 0xFF;
