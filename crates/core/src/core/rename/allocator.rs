//! The register allocator protocol.
//!
//! Composes the free list, physical register file, alias tables and rename
//! history into the rename unit's public contract:
//! 1. **Rename:** `rename_dest` / `rename_src` map architectural names to physical slots.
//! 2. **Dataflow:** `complete` marks values ready; `count_unready_sources` drives wakeup.
//! 3. **Retirement:** `retire` promotes a mapping to architectural state and frees its predecessor.
//! 4. **Rollback:** `undo_rename` unwinds a squashed instruction's renames, LIFO.
//! 5. **Diagnostics:** `validate` re-derives the structural invariants; `dump` prints the whole unit.
//!
//! The unit is single-threaded and synchronous: it models one pipeline
//! stage, owned by the cycle loop that drives it.

use std::io::{self, Write};

use log::{debug, trace, warn};

use crate::common::constants::MAX_PHYS_ID;
use crate::common::error::{InvariantViolation, RenameError};

use super::free_list::FreeList;
use super::history::{RenameCheckpoint, RenameHistory};
use super::prf::{PhysRegFile, PhysRegSlot};
use super::rat::Rat;
use super::{InstrId, PhysReg};

/// Physical register allocator / rename unit.
///
/// Lifecycle of a physical register:
///
/// ```text
///          rename_dest            complete             retire (as old)
///  FREE ───────────────▶ BUSY_INVALID ─────▶ BUSY_VALID ──────────────▶ FREE
///    ▲                       │                                           │
///    │                       │ undo_rename                               │
///    └───────────────────────┴───────────────────────────────────────────┘
/// ```
///
/// A `rename_src` fresh allocation enters `BUSY_VALID` directly: a read of a
/// register never written inside the observed trace window stands for a
/// write that committed before the trace began.
pub struct RegisterAllocator {
    prf: PhysRegFile,
    free: FreeList,
    frontend_rat: Rat,
    backend_rat: Rat,
    history: RenameHistory,
}

impl RegisterAllocator {
    /// Creates an allocator with `num_physical_registers` slots, all free.
    ///
    /// Fails with `OutOfRange` unless `0 < num_physical_registers <= 65536`.
    pub fn new(num_physical_registers: usize) -> Result<Self, RenameError> {
        if num_physical_registers == 0 || num_physical_registers > MAX_PHYS_ID {
            return Err(RenameError::OutOfRange {
                what: "physical register file size",
                index: num_physical_registers,
                limit: MAX_PHYS_ID + 1,
            });
        }
        Ok(Self {
            prf: PhysRegFile::new(num_physical_registers),
            free: FreeList::new(num_physical_registers),
            frontend_rat: Rat::new(),
            backend_rat: Rat::new(),
            history: RenameHistory::new(),
        })
    }

    /// Renames a destination register for `producer`.
    ///
    /// Allocates a fresh physical register, points the frontend table at it,
    /// and checkpoints the previous mapping under `producer` so the rename
    /// can be undone on squash. Fails with `NoFreeRegister` when the file is
    /// exhausted; the caller stalls and retries.
    pub fn rename_dest(&mut self, arch_reg: u8, producer: InstrId) -> Result<PhysReg, RenameError> {
        let phys = self.free.pop().ok_or(RenameError::NoFreeRegister)?;
        let old_phys = self.frontend_rat.get(arch_reg);

        *self.prf.get_mut(phys)? = PhysRegSlot {
            arch_reg_index: arch_reg,
            producer,
            valid: false,
            busy: true,
        };
        self.frontend_rat.set(arch_reg, Some(phys));
        self.history.record(
            producer,
            RenameCheckpoint {
                arch_reg,
                old_phys,
                new_phys: phys,
            },
        );

        debug!(
            "rename dest: instr {} arch {} {:?} -> {}",
            producer, arch_reg, old_phys, phys
        );
        Ok(phys)
    }

    /// Resolves a source register to its current physical mapping.
    ///
    /// If `arch_reg` has never been written inside the observed window (a
    /// trace slice starts mid-program), a fresh register is allocated,
    /// marked valid, and installed in **both** tables: the unseen write is
    /// treated as already committed. Such allocations are architectural and
    /// are never checkpointed, so a later squash does not reclaim them.
    pub fn rename_src(&mut self, arch_reg: u8) -> Result<PhysReg, RenameError> {
        if let Some(phys) = self.frontend_rat.get(arch_reg) {
            return Ok(phys);
        }

        let phys = self.free.pop().ok_or(RenameError::NoFreeRegister)?;
        *self.prf.get_mut(phys)? = PhysRegSlot {
            arch_reg_index: arch_reg,
            producer: 0,
            valid: true,
            busy: true,
        };
        self.frontend_rat.set(arch_reg, Some(phys));
        self.backend_rat.set(arch_reg, Some(phys));

        debug!("rename src: arch {} fresh alloc {}", arch_reg, phys);
        Ok(phys)
    }

    /// Marks `phys` valid: its producing instruction has executed.
    ///
    /// Idempotent; does not change `busy`.
    pub fn complete(&mut self, phys: PhysReg) -> Result<(), RenameError> {
        let slot = self.prf.get_mut(phys)?;
        debug_assert!(slot.busy, "completing physical register {} while free", phys);
        slot.valid = true;
        trace!("complete: {}", phys);
        Ok(())
    }

    /// Retires the mapping held by `phys`.
    ///
    /// Promotes `phys` to the backend table for its architectural register
    /// and frees the mapping it replaces. The caller must also call
    /// [`retire_rename`](Self::retire_rename) with the retiring
    /// instruction's id once the retirement is committed.
    pub fn retire(&mut self, phys: PhysReg) -> Result<(), RenameError> {
        let slot = self.prf.get(phys)?;
        debug_assert!(slot.busy, "retiring physical register {} while free", phys);
        debug_assert!(slot.valid, "retiring physical register {} before completion", phys);
        let arch_reg = slot.arch_reg_index;

        let old_phys = self.backend_rat.get(arch_reg);
        self.backend_rat.set(arch_reg, Some(phys));
        debug!(
            "retire: arch {} {:?} -> {} in backend table",
            arch_reg, old_phys, phys
        );

        if let Some(old) = old_phys {
            self.free_register(old)?;
        }
        Ok(())
    }

    /// Returns `phys` to the free list and resets its slot.
    ///
    /// `phys` must currently be allocated; freeing a slot that is already on
    /// the free list is a double-free and asserts in debug builds.
    pub fn free_register(&mut self, phys: PhysReg) -> Result<(), RenameError> {
        self.prf.get_mut(phys)?.reset();
        self.free.push(phys);
        trace!("free: {}", phys);
        Ok(())
    }

    /// Drops the rename history of a retired instruction. No-op if the
    /// instruction recorded no renames.
    pub fn retire_rename(&mut self, instr_id: InstrId) {
        self.history.discard(instr_id);
    }

    /// Rolls back every rename attributed to a squashed instruction.
    ///
    /// Checkpoints are processed LIFO so that when one instruction renamed
    /// the same architectural register twice, the earliest previous mapping
    /// ends up back in the frontend table. The backend table is never
    /// touched: a squashed instruction by definition has not retired.
    ///
    /// No-op if the instruction has no history. A checkpoint whose allocated
    /// register is outside the file (a caller bug; the allocator never hands
    /// such ids out) is skipped entirely: resetting a nonexistent slot is
    /// impossible and pushing the id would poison the free list.
    pub fn undo_rename(&mut self, instr_id: InstrId) {
        let Some(checkpoints) = self.history.take(instr_id) else {
            debug!("undo: no rename history for instr {}", instr_id);
            return;
        };
        debug!(
            "undo: instr {} ({} mappings)",
            instr_id,
            checkpoints.len()
        );

        for cp in checkpoints.iter().rev() {
            self.frontend_rat.set(cp.arch_reg, cp.old_phys);
            match self.prf.get_mut(cp.new_phys) {
                Ok(slot) => {
                    slot.reset();
                    self.free.push(cp.new_phys);
                    trace!(
                        "undo: arch {} restored to {:?}, freed {}",
                        cp.arch_reg, cp.old_phys, cp.new_phys
                    );
                }
                Err(_) => {
                    warn!(
                        "undo: instr {} checkpoint holds out-of-range register {}",
                        instr_id, cp.new_phys
                    );
                }
            }
        }
    }

    /// Copies the backend table over the frontend table.
    ///
    /// For a full pipeline flush. Does not free registers held by squashed
    /// speculative instructions: the caller must run
    /// [`undo_rename`](Self::undo_rename) over every squashed instruction
    /// first, or those registers leak until the file exhausts.
    pub fn reset_frontend_rat(&mut self) {
        self.frontend_rat.copy_from(&self.backend_rat);
        debug!("frontend table reset from backend table");
    }

    /// Returns true if `phys` holds a produced value. False out of range.
    pub fn is_valid(&self, phys: PhysReg) -> bool {
        self.prf.try_get(phys).is_some_and(|slot| slot.valid)
    }

    /// Returns true if `arch_reg` has a speculative mapping.
    pub fn is_allocated(&self, arch_reg: u8) -> bool {
        self.frontend_rat.get(arch_reg).is_some()
    }

    /// Number of registers on the free list.
    pub fn count_free(&self) -> usize {
        self.free.len()
    }

    /// Counts the renamed sources whose values are not yet produced.
    ///
    /// The scheduler's wakeup test: zero means the instruction is ready to
    /// dispatch.
    pub fn count_unready_sources(&self, sources: &[PhysReg]) -> usize {
        sources.iter().filter(|&&phys| !self.is_valid(phys)).count()
    }

    /// Returns the frontend mapping for `arch_reg`, if any.
    pub fn current_mapping(&self, arch_reg: u8) -> Option<PhysReg> {
        self.frontend_rat.get(arch_reg)
    }

    /// Returns the id of the instruction producing `phys`, or 0 out of range.
    pub fn producer_of(&self, phys: PhysReg) -> InstrId {
        self.prf.try_get(phys).map_or(0, |slot| slot.producer)
    }

    /// Re-derives the structural invariants and returns every violation found.
    ///
    /// Checked:
    /// - the free list has no duplicates;
    /// - free-list membership and the `busy` bit agree, both directions;
    /// - both alias tables point only at busy slots, and the frontend
    ///   table's owner index matches;
    /// - no live checkpoint's allocated register sits on the free list;
    /// - every slot is either free or busy, so the file size balances.
    ///
    /// Intended for debug builds and tests; the scan is linear in the file
    /// size plus the live history.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let mut free_set = std::collections::HashSet::with_capacity(self.free.len());

        for phys in self.free.iter() {
            if !free_set.insert(phys) {
                violations.push(InvariantViolation::new(format!(
                    "physical register {} appears twice on the free list",
                    phys
                )));
            }
            match self.prf.try_get(phys) {
                Some(slot) if slot.busy || slot.valid => {
                    violations.push(InvariantViolation::new(format!(
                        "physical register {} is free but marked busy/valid",
                        phys
                    )));
                }
                Some(_) => {}
                None => {
                    violations.push(InvariantViolation::new(format!(
                        "free list holds out-of-range register {}",
                        phys
                    )));
                }
            }
        }

        let mut busy_count = 0;
        for (phys, slot) in self.prf.iter() {
            if slot.busy {
                busy_count += 1;
            } else if !free_set.contains(&phys) {
                violations.push(InvariantViolation::new(format!(
                    "physical register {} is not busy yet missing from the free list",
                    phys
                )));
            }
        }
        if free_set.len() + busy_count != self.prf.len() {
            violations.push(InvariantViolation::new(format!(
                "file imbalance: {} free + {} busy != {} slots",
                free_set.len(),
                busy_count,
                self.prf.len()
            )));
        }

        for (table, name, check_owner) in [
            (&self.frontend_rat, "frontend", true),
            (&self.backend_rat, "backend", false),
        ] {
            for (arch, mapping) in table.iter() {
                let Some(phys) = mapping else { continue };
                match self.prf.try_get(phys) {
                    Some(slot) if !slot.busy => {
                        violations.push(InvariantViolation::new(format!(
                            "{} table maps arch {} to non-busy register {}",
                            name, arch, phys
                        )));
                    }
                    Some(slot) if check_owner && slot.arch_reg_index != arch => {
                        violations.push(InvariantViolation::new(format!(
                            "{} table maps arch {} to register {} owned by arch {}",
                            name, arch, phys, slot.arch_reg_index
                        )));
                    }
                    Some(_) => {}
                    None => {
                        violations.push(InvariantViolation::new(format!(
                            "{} table maps arch {} to out-of-range register {}",
                            name, arch, phys
                        )));
                    }
                }
            }
        }

        for (instr_id, checkpoints) in self.history.iter() {
            for cp in checkpoints {
                if free_set.contains(&cp.new_phys) {
                    violations.push(InvariantViolation::new(format!(
                        "instr {} allocated register {} but it is on the free list",
                        instr_id, cp.new_phys
                    )));
                }
            }
        }

        violations
    }

    /// Writes a human-readable dump of both alias tables, the register file
    /// and the rename history.
    ///
    /// The deadlock report: when the free list is empty the dump carries a
    /// warning that the file is almost certainly undersized.
    pub fn dump(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(
            w,
            "Frontend Register Alias Table             Backend Register Alias Table"
        )?;
        for (arch, front) in self.frontend_rat.iter() {
            let back = self.backend_rat.get(arch);
            if front.is_none() && back.is_none() {
                continue;
            }
            writeln!(
                w,
                "Arch reg: {:3}    Phys reg: {:>4}           Arch reg: {:3}    Phys reg: {:>4}",
                arch,
                front.map_or_else(|| "-".to_string(), |p| p.to_string()),
                arch,
                back.map_or_else(|| "-".to_string(), |p| p.to_string()),
            )?;
        }

        if self.count_free() == 0 {
            writeln!(w)?;
            writeln!(
                w,
                "**WARNING** the physical register file is completely occupied."
            )?;
            writeln!(
                w,
                "It is extremely likely your register file size is too small."
            )?;
        }

        writeln!(w)?;
        writeln!(w, "Physical Register File ({} free)", self.count_free())?;
        for (phys, slot) in self.prf.iter() {
            if !slot.busy {
                continue;
            }
            writeln!(
                w,
                "Phys reg: {:4}\t Arch reg: {:3}\t Producer: {}\t Valid: {}\t Busy: {}",
                phys, slot.arch_reg_index, slot.producer, slot.valid, slot.busy
            )?;
        }

        writeln!(w)?;
        writeln!(w, "Rename History ({} instructions)", self.history.len())?;
        for (instr_id, checkpoints) in self.history.iter() {
            writeln!(w, "  instr {}: {} renames", instr_id, checkpoints.len())?;
            for cp in checkpoints {
                writeln!(
                    w,
                    "    arch {:3} : {:>4} -> {}",
                    cp.arch_reg,
                    cp.old_phys.map_or_else(|| "-".to_string(), |p| p.to_string()),
                    cp.new_phys
                )?;
            }
        }
        Ok(())
    }
}
