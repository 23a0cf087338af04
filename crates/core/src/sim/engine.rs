//! Cycle-level trace replay driver.
//!
//! The engine is the "surrounding pipeline" the rename unit is built for,
//! kept to the minimum that exercises the full allocator protocol:
//! 1. **Rename:** Up to `width` records per cycle map their sources and destinations.
//! 2. **Complete:** A fixed latency after rename, destinations become valid.
//! 3. **Retire:** Completed instructions leave the window head in program order.
//! 4. **Squash:** A mispredicted branch, at resolution, undoes every younger
//!    in-flight instruction (youngest first) and replays its record.
//!
//! Scheduling, memory and real branch prediction are out of scope; the
//! misprediction model is a configurable interval over taken branches, which
//! is enough to drive the rollback path hard.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};

use log::{debug, warn};

use crate::common::error::RenameError;
use crate::config::Config;
use crate::core::rename::{InstrId, PhysReg, RegisterAllocator};
use crate::stats::SimStats;

use super::trace::{TraceInstruction, TraceReader};

/// Errors terminating a replay run.
#[derive(Debug)]
pub enum ReplayError {
    /// Trace stream failure (including truncated records).
    Io(io::Error),
    /// Rename unit failure (deadlocked exhaustion or invariant violation).
    Rename(RenameError),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Io(e) => write!(f, "trace error: {}", e),
            ReplayError::Rename(e) => write!(f, "rename error: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        ReplayError::Io(e)
    }
}

impl From<RenameError> for ReplayError {
    fn from(e: RenameError) -> Self {
        ReplayError::Rename(e)
    }
}

/// A record waiting to be renamed, with the id it keeps across replays.
struct PendingInstr {
    id: InstrId,
    record: TraceInstruction,
}

/// A renamed instruction in the in-flight window.
struct InFlight {
    id: InstrId,
    destinations: Vec<PhysReg>,
    ready_at: u64,
    completed: bool,
    mispredicted: bool,
    /// Original record, kept so a squash can replay it.
    record: TraceInstruction,
}

/// Replays a trace through the rename unit cycle by cycle.
pub struct ReplayEngine {
    allocator: RegisterAllocator,
    config: Config,
    window: VecDeque<InFlight>,
    replay_queue: VecDeque<PendingInstr>,
    stats: SimStats,
    cycle: u64,
    next_id: InstrId,
    taken_branches: u64,
}

impl ReplayEngine {
    /// Creates an engine from `config`.
    ///
    /// Fails if the configured register file size is outside `(0, 65536]`.
    pub fn new(config: &Config) -> Result<Self, RenameError> {
        let allocator = RegisterAllocator::new(config.rename.num_physical_registers)?;
        let mut stats = SimStats::default();
        stats.min_free_registers = allocator.count_free();
        Ok(Self {
            allocator,
            config: config.clone(),
            window: VecDeque::with_capacity(config.pipeline.window_size),
            replay_queue: VecDeque::new(),
            stats,
            cycle: 0,
            next_id: 0,
            taken_branches: 0,
        })
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// The rename unit being driven (for dumps and tests).
    pub fn allocator(&self) -> &RegisterAllocator {
        &self.allocator
    }

    /// Replays `reader` to completion: every record renamed, completed and
    /// retired (possibly via squash and replay).
    pub fn run<R: Read>(&mut self, reader: &mut TraceReader<R>) -> Result<(), ReplayError> {
        let mut source_done = false;
        while !source_done || !self.window.is_empty() || !self.replay_queue.is_empty() {
            self.cycle += 1;
            self.stats.cycles += 1;

            self.complete_stage()?;
            self.retire_stage()?;
            self.rename_stage(reader, &mut source_done)?;

            if self.config.general.validate_each_cycle {
                if let Some(violation) = self.allocator.validate().into_iter().next() {
                    return Err(RenameError::InvariantViolation(violation).into());
                }
            }
            self.stats.min_free_registers = self
                .stats
                .min_free_registers
                .min(self.allocator.count_free());
        }
        Ok(())
    }

    /// Marks instructions whose latency elapsed as completed; a mispredicted
    /// branch squashes everything younger the moment it resolves.
    fn complete_stage(&mut self) -> Result<(), ReplayError> {
        let mut idx = 0;
        while idx < self.window.len() {
            let entry = &mut self.window[idx];
            if !entry.completed && entry.ready_at <= self.cycle {
                entry.completed = true;
                for i in 0..self.window[idx].destinations.len() {
                    let dest = self.window[idx].destinations[i];
                    self.allocator.complete(dest)?;
                }
                if self.window[idx].mispredicted {
                    self.window[idx].mispredicted = false;
                    self.squash_younger_than(idx);
                    // Everything after idx is gone; nothing left to scan.
                    break;
                }
            }
            idx += 1;
        }
        Ok(())
    }

    /// Undoes every instruction younger than `idx`, youngest first, and
    /// queues their records for replay in original order.
    fn squash_younger_than(&mut self, idx: usize) {
        self.stats.mispredictions += 1;
        let mut squashed = 0;
        while self.window.len() > idx + 1 {
            let Some(victim) = self.window.pop_back() else { break };
            self.allocator.undo_rename(victim.id);
            squashed += 1;
            self.replay_queue.push_front(PendingInstr {
                id: victim.id,
                record: victim.record,
            });
        }
        self.stats.instructions_squashed += squashed;
        debug!(
            "cycle {}: squashed {} instructions behind instr {}",
            self.cycle, squashed, self.window[idx].id
        );
    }

    /// Retires up to `retire_width` completed instructions from the head.
    fn retire_stage(&mut self) -> Result<(), ReplayError> {
        for _ in 0..self.config.pipeline.retire_width {
            if !matches!(self.window.front(), Some(head) if head.completed) {
                break;
            }
            let Some(entry) = self.window.pop_front() else { break };
            for dest in &entry.destinations {
                self.allocator.retire(*dest)?;
            }
            self.allocator.retire_rename(entry.id);
            self.stats.instructions_retired += 1;
        }
        Ok(())
    }

    /// Renames up to `width` instructions, preferring squash replays over
    /// fresh records. Stalls on a full window or an exhausted free list.
    fn rename_stage<R: Read>(
        &mut self,
        reader: &mut TraceReader<R>,
        source_done: &mut bool,
    ) -> Result<(), ReplayError> {
        for _ in 0..self.config.pipeline.width {
            if self.window.len() >= self.config.pipeline.window_size {
                self.stats.window_stalls += 1;
                break;
            }
            let pending = match self.replay_queue.pop_front() {
                Some(pending) => pending,
                None if *source_done => break,
                None => match reader.next_record()? {
                    Some(record) => {
                        self.next_id += 1;
                        self.stats.records_read += 1;
                        if record.is_branch {
                            self.stats.branches_seen += 1;
                            if record.branch_taken {
                                self.stats.branches_taken += 1;
                            }
                        }
                        PendingInstr {
                            id: self.next_id,
                            record,
                        }
                    }
                    None => {
                        *source_done = true;
                        break;
                    }
                },
            };

            match self.rename_one(&pending) {
                Ok(entry) => {
                    self.window.push_back(entry);
                    self.stats.instructions_renamed += 1;
                }
                Err(RenameError::NoFreeRegister) => {
                    // Roll back any destinations this instruction already
                    // claimed; it retries from the front of the queue.
                    self.allocator.undo_rename(pending.id);
                    self.stats.rename_stalls += 1;
                    if self.window.is_empty() {
                        // No retirement can ever free a register again.
                        warn!("register file deadlock at cycle {}", self.cycle);
                        let mut err = io::stderr().lock();
                        let _ = self.allocator.dump(&mut err);
                        return Err(RenameError::NoFreeRegister.into());
                    }
                    self.replay_queue.push_front(pending);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Renames one instruction's sources then destinations.
    fn rename_one(&mut self, pending: &PendingInstr) -> Result<InFlight, RenameError> {
        let record = &pending.record;

        let mut sources = Vec::with_capacity(record.source_registers.len());
        for &arch in &record.source_registers {
            sources.push(self.allocator.rename_src(arch)?);
        }
        let mut destinations = Vec::with_capacity(record.destination_registers.len());
        for &arch in &record.destination_registers {
            destinations.push(self.allocator.rename_dest(arch, pending.id)?);
        }

        self.stats.unready_sources += self.allocator.count_unready_sources(&sources) as u64;

        let mut mispredicted = false;
        if record.is_branch && record.branch_taken {
            self.taken_branches += 1;
            let interval = self.config.pipeline.mispredict_interval;
            mispredicted = interval > 0 && self.taken_branches % interval == 0;
        }

        Ok(InFlight {
            id: pending.id,
            destinations,
            ready_at: self.cycle + self.config.pipeline.complete_latency,
            completed: false,
            mispredicted,
            record: record.clone(),
        })
    }
}
