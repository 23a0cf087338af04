//! Replay engine end-to-end tests over synthetic traces.

use oosim_core::config::Config;
use oosim_core::sim::synth;
use oosim_core::sim::{ReplayEngine, TraceFormat, TraceReader};

use crate::common::init_logging;

fn reader_for(records: &[oosim_core::sim::TraceInstruction]) -> TraceReader<std::io::Cursor<Vec<u8>>> {
    let mut bytes = Vec::new();
    for record in records {
        bytes.extend(record.encode(TraceFormat::Standard));
    }
    TraceReader::new(std::io::Cursor::new(bytes), TraceFormat::Standard)
}

#[test]
fn test_stride_loop_replays_to_completion() {
    init_logging();
    let records = synth::stride_loop(100);

    let mut config = Config::default();
    config.rename.num_physical_registers = 32;
    config.general.validate_each_cycle = true;

    let mut engine = ReplayEngine::new(&config).unwrap();
    engine.run(&mut reader_for(&records)).unwrap();

    let stats = engine.stats();
    assert_eq!(stats.records_read, 500);
    assert_eq!(stats.instructions_retired, 500);
    assert_eq!(stats.branches_seen, 100);
    assert_eq!(stats.branches_taken, 99);
    assert_eq!(stats.mispredictions, 0);
    assert!(engine.allocator().validate().is_empty());
}

#[test]
fn test_stride_loop_with_mispredictions() {
    init_logging();
    let records = synth::stride_loop(60);

    let mut config = Config::default();
    config.rename.num_physical_registers = 48;
    config.general.validate_each_cycle = true;
    config.pipeline.mispredict_interval = 7;

    let mut engine = ReplayEngine::new(&config).unwrap();
    engine.run(&mut reader_for(&records)).unwrap();

    let stats = engine.stats();
    assert_eq!(stats.instructions_retired, 300);
    assert!(stats.mispredictions > 0);
    // Every squashed instruction was renamed once more on replay.
    assert_eq!(
        stats.instructions_renamed,
        stats.records_read + stats.instructions_squashed
    );
    // All speculative state drained: only the five loop registers remain
    // mapped, so the rest of the file is free again.
    assert_eq!(
        engine.allocator().count_free(),
        config.rename.num_physical_registers - 5
    );
    assert!(engine.allocator().validate().is_empty());
}

#[test]
fn test_free_list_pressure_tracked() {
    let records = synth::stride_loop(40);

    let mut config = Config::default();
    config.rename.num_physical_registers = 16;
    config.general.validate_each_cycle = true;

    let mut engine = ReplayEngine::new(&config).unwrap();
    engine.run(&mut reader_for(&records)).unwrap();

    let stats = engine.stats();
    assert!(stats.min_free_registers < 16);
    assert_eq!(stats.instructions_retired, 200);
}
