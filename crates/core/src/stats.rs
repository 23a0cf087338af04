//! Replay statistics collection and reporting.
//!
//! Tracks what the replay engine did to the rename unit: throughput, stall
//! and squash counts, and free-list pressure. The report layout is a flat
//! `key value` listing so runs diff cleanly.

use std::time::Instant;

/// Counters collected over one replay run.
#[derive(Clone)]
pub struct SimStats {
    start_time: Instant,
    /// Total simulated cycles.
    pub cycles: u64,
    /// Trace records decoded.
    pub records_read: u64,
    /// Instructions renamed (squashed instructions count again on replay).
    pub instructions_renamed: u64,
    /// Instructions retired.
    pub instructions_retired: u64,
    /// Instructions squashed by mispredictions.
    pub instructions_squashed: u64,
    /// Misprediction squash events.
    pub mispredictions: u64,
    /// Cycles in which rename stalled on an empty free list.
    pub rename_stalls: u64,
    /// Cycles in which rename stalled on a full window.
    pub window_stalls: u64,
    /// Branch records seen.
    pub branches_seen: u64,
    /// Taken-branch records seen.
    pub branches_taken: u64,
    /// Source operands observed not-yet-ready at rename time.
    pub unready_sources: u64,
    /// Free-list low-water mark over the run.
    pub min_free_registers: usize,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            records_read: 0,
            instructions_renamed: 0,
            instructions_retired: 0,
            instructions_squashed: 0,
            mispredictions: 0,
            rename_stalls: 0,
            window_stalls: 0,
            branches_seen: 0,
            branches_taken: 0,
            unready_sources: 0,
            min_free_registers: usize::MAX,
        }
    }
}

impl SimStats {
    /// Prints the full report to stdout.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let cyc = if self.cycles == 0 { 1 } else { self.cycles };

        println!("==========================================================");
        println!("RENAME REPLAY STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_cycles               {}", self.cycles);
        println!("trace_records            {}", self.records_read);
        println!("rename.instructions      {}", self.instructions_renamed);
        println!("retire.instructions      {}", self.instructions_retired);
        println!(
            "sim_ipc                  {:.4}",
            self.instructions_retired as f64 / cyc as f64
        );
        println!("----------------------------------------------------------");
        println!("squash.events            {}", self.mispredictions);
        println!("squash.instructions      {}", self.instructions_squashed);
        println!("stall.no_free_register   {}", self.rename_stalls);
        println!("stall.window_full        {}", self.window_stalls);
        println!("----------------------------------------------------------");
        println!("branch.seen              {}", self.branches_seen);
        println!("branch.taken             {}", self.branches_taken);
        println!("wakeup.unready_sources   {}", self.unready_sources);
        if self.min_free_registers != usize::MAX {
            println!("prf.min_free             {}", self.min_free_registers);
        }
        println!("==========================================================");
    }
}
