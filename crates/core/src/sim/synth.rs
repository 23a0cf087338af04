//! Synthetic trace generation.
//!
//! Produces the record stream a strided array-walk microbenchmark would
//! leave behind: per element a load, an accumulate, an increment-and-store,
//! an index update, and a backward loop branch. Useful for exercising the
//! replay engine and the CLI without shipping binary trace fixtures.

use super::trace::TraceInstruction;

/// Architectural registers used by the generated loop.
mod regs {
    /// Array base pointer.
    pub const BASE: u8 = 1;
    /// Loop index.
    pub const INDEX: u8 = 2;
    /// Loop bound.
    pub const BOUND: u8 = 3;
    /// Running sum.
    pub const SUM: u8 = 4;
    /// Loaded element.
    pub const ELEM: u8 = 5;
}

/// Loop body start address; each instruction occupies 4 bytes.
const LOOP_IP: u64 = 0x0040_1000;

/// Array base effective address.
const ARRAY_BASE: u64 = 0x7f00_0000_0000;

/// Bytes between touched elements (16 × 8-byte elements).
const STRIDE: u64 = 128;

/// Generates `iterations` passes of the stride loop.
///
/// Each iteration produces five records:
/// 1. load `ELEM <- [BASE + INDEX]`
/// 2. `SUM <- SUM + ELEM`
/// 3. `ELEM <- ELEM + 1`, stored back to the same address
/// 4. `INDEX <- INDEX + stride`
/// 5. compare-and-branch on `INDEX`/`BOUND`, taken except the last pass
pub fn stride_loop(iterations: usize) -> Vec<TraceInstruction> {
    let mut records = Vec::with_capacity(iterations * 5);
    for i in 0..iterations {
        let addr = ARRAY_BASE + i as u64 * STRIDE;

        records.push(TraceInstruction {
            ip: LOOP_IP,
            destination_registers: vec![regs::ELEM],
            source_registers: vec![regs::BASE, regs::INDEX],
            source_memory: vec![addr],
            ..Default::default()
        });
        records.push(TraceInstruction {
            ip: LOOP_IP + 4,
            destination_registers: vec![regs::SUM],
            source_registers: vec![regs::SUM, regs::ELEM],
            ..Default::default()
        });
        records.push(TraceInstruction {
            ip: LOOP_IP + 8,
            destination_registers: vec![regs::ELEM],
            source_registers: vec![regs::ELEM, regs::BASE],
            destination_memory: vec![addr],
            ..Default::default()
        });
        records.push(TraceInstruction {
            ip: LOOP_IP + 12,
            destination_registers: vec![regs::INDEX],
            source_registers: vec![regs::INDEX],
            ..Default::default()
        });
        records.push(TraceInstruction {
            ip: LOOP_IP + 16,
            is_branch: true,
            branch_taken: i + 1 != iterations,
            source_registers: vec![regs::INDEX, regs::BOUND],
            ..Default::default()
        });
    }
    records
}
