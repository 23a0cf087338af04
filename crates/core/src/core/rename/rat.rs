//! Register alias table.
//!
//! A fixed 256-entry map from architectural register name to the physical
//! register currently holding it. The allocator keeps two instances: the
//! speculative frontend table updated at rename, and the backend table
//! updated only at retirement. Indexing by `u8` makes out-of-range
//! architectural accesses unrepresentable.

use crate::common::constants::ARCH_REG_COUNT;

use super::PhysReg;

/// Arch-to-phys alias table; `None` means no current mapping.
pub struct Rat {
    entries: [Option<PhysReg>; ARCH_REG_COUNT],
}

impl Default for Rat {
    fn default() -> Self {
        Self::new()
    }
}

impl Rat {
    /// Creates a table with every entry unmapped.
    pub fn new() -> Self {
        Self {
            entries: [None; ARCH_REG_COUNT],
        }
    }

    /// Returns the mapping for `arch`.
    #[inline]
    pub fn get(&self, arch: u8) -> Option<PhysReg> {
        self.entries[arch as usize]
    }

    /// Sets the mapping for `arch`.
    #[inline]
    pub fn set(&mut self, arch: u8, phys: Option<PhysReg>) {
        self.entries[arch as usize] = phys;
    }

    /// Overwrites this table with the contents of `other`.
    pub fn copy_from(&mut self, other: &Rat) {
        self.entries = other.entries;
    }

    /// Iterates `(arch, mapping)` pairs in register order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Option<PhysReg>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, &phys)| (i as u8, phys))
    }
}
