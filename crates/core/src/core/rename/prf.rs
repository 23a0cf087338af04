//! Physical register file.
//!
//! A fixed array of slots, one per physical register. This is a rename-level
//! model, so slots carry no data values, only the bookkeeping the allocator
//! needs: which architectural register owns the slot, which instruction
//! produces it, and the valid/busy lifecycle bits.

use crate::common::constants::FREE_SLOT_ARCH_REG;
use crate::common::error::RenameError;

use super::{InstrId, PhysReg};

/// Bookkeeping for one physical register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysRegSlot {
    /// Architectural register currently mapped to this slot
    /// (`FREE_SLOT_ARCH_REG` when free).
    pub arch_reg_index: u8,
    /// Id of the instruction whose execution writes this slot (0 for writes
    /// committed before the observed trace window).
    pub producer: InstrId,
    /// Has the producing instruction completed?
    pub valid: bool,
    /// Is the slot allocated anywhere in the pipeline?
    pub busy: bool,
}

impl PhysRegSlot {
    /// Returns the state of an unallocated slot.
    pub fn free() -> Self {
        Self {
            arch_reg_index: FREE_SLOT_ARCH_REG,
            producer: 0,
            valid: false,
            busy: false,
        }
    }

    /// Resets the slot to the unallocated state.
    pub fn reset(&mut self) {
        *self = Self::free();
    }
}

/// The physical register file: `num_physical` slots, directly indexed.
pub struct PhysRegFile {
    slots: Vec<PhysRegSlot>,
}

impl PhysRegFile {
    /// Creates a file of `count` free slots.
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![PhysRegSlot::free(); count],
        }
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the file has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the slot for `reg`, or `OutOfRange`.
    pub fn get(&self, reg: PhysReg) -> Result<&PhysRegSlot, RenameError> {
        self.slots
            .get(reg.index())
            .ok_or(RenameError::OutOfRange {
                what: "physical register",
                index: reg.index(),
                limit: self.slots.len(),
            })
    }

    /// Returns the slot for `reg` mutably, or `OutOfRange`.
    pub fn get_mut(&mut self, reg: PhysReg) -> Result<&mut PhysRegSlot, RenameError> {
        let limit = self.slots.len();
        self.slots
            .get_mut(reg.index())
            .ok_or(RenameError::OutOfRange {
                what: "physical register",
                index: reg.index(),
                limit,
            })
    }

    /// Returns the slot for `reg` if it exists; total variant for queries.
    pub fn try_get(&self, reg: PhysReg) -> Option<&PhysRegSlot> {
        self.slots.get(reg.index())
    }

    /// Iterates `(id, slot)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (PhysReg, &PhysRegSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (PhysReg(i as u16), slot))
    }
}
