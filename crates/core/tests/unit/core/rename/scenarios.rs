//! End-to-end rename protocol scenarios.
//!
//! Each scenario drives an 8-slot allocator through a complete protocol
//! sequence and checks the externally observable state, including the two
//! deliberately asymmetric behaviors around squash and flush.

use oosim_core::core::rename::{PhysReg, RegisterAllocator};
use oosim_core::common::error::RenameError;

fn allocator() -> RegisterAllocator {
    RegisterAllocator::new(8).unwrap()
}

#[test]
fn test_basic_rename_and_retire() {
    let mut ra = allocator();
    let p1 = ra.rename_dest(5, 100).unwrap();
    assert_eq!(p1, PhysReg(0));
    assert_eq!(ra.current_mapping(5), Some(PhysReg(0)));
    assert_eq!(ra.count_free(), 7);

    ra.complete(p1).unwrap();
    assert!(ra.is_valid(p1));

    ra.retire(p1).unwrap();
    ra.retire_rename(100);
    // First retirement of arch 5: nothing older to free.
    assert_eq!(ra.count_free(), 7);

    // The backend table now holds the mapping: a flush restores it.
    ra.reset_frontend_rat();
    assert_eq!(ra.current_mapping(5), Some(p1));
    assert!(ra.validate().is_empty());
}

#[test]
fn test_source_read_before_any_write() {
    let mut ra = allocator();
    ra.rename_dest(5, 100).unwrap(); // occupy slot 0, as in the basic scenario

    let p = ra.rename_src(3).unwrap();
    assert_eq!(p, PhysReg(1));
    assert_eq!(ra.current_mapping(3), Some(p));
    assert!(ra.is_valid(p));
    assert_eq!(ra.producer_of(p), 0);
    assert_eq!(ra.count_free(), 6);

    // Repeated reads reuse the mapping without touching the free list.
    assert_eq!(ra.rename_src(3).unwrap(), p);
    assert_eq!(ra.count_free(), 6);

    // The unseen write counts as committed: it survives a flush.
    ra.undo_rename(100);
    ra.reset_frontend_rat();
    assert_eq!(ra.current_mapping(3), Some(p));
}

#[test]
fn test_squash_rollback_in_reverse_order() {
    let mut ra = allocator();
    let a = ra.rename_dest(5, 100).unwrap();
    let b = ra.rename_dest(5, 101).unwrap();
    assert_eq!((a, b), (PhysReg(0), PhysReg(1)));
    assert_eq!(ra.current_mapping(5), Some(b));

    ra.undo_rename(101);
    assert_eq!(ra.current_mapping(5), Some(a));
    assert!(!ra.is_valid(b));

    ra.undo_rename(100);
    assert_eq!(ra.current_mapping(5), None);
    assert!(!ra.is_allocated(5));
    assert_eq!(ra.count_free(), 8);
    assert!(ra.validate().is_empty());
}

#[test]
fn test_lifo_undo_within_one_instruction() {
    let mut ra = allocator();
    // A pseudo-instruction renaming arch 7 twice under one id.
    let a = ra.rename_dest(7, 200).unwrap();
    let b = ra.rename_dest(7, 200).unwrap();
    assert_eq!(ra.current_mapping(7), Some(b));

    ra.undo_rename(200);
    assert_eq!(ra.current_mapping(7), None);
    assert!(!ra.is_valid(a));
    assert!(!ra.is_valid(b));
    assert_eq!(ra.count_free(), 8);
}

#[test]
fn test_exhaustion_leaves_state_unchanged() {
    let mut ra = allocator();
    for i in 0..8 {
        ra.rename_dest(i, 100 + i as u64).unwrap();
    }
    assert_eq!(ra.count_free(), 0);

    assert_eq!(ra.rename_dest(0, 200), Err(RenameError::NoFreeRegister));
    assert_eq!(ra.count_free(), 0);
    for i in 0..8u8 {
        assert_eq!(ra.current_mapping(i), Some(PhysReg(i as u16)));
    }
    assert!(ra.validate().is_empty());
}

#[test]
fn test_flush_after_undo_walk_restores_backend_state() {
    let mut ra = allocator();

    // Committed state: arch 1 retired at slot 0.
    let committed = ra.rename_dest(1, 1).unwrap();
    ra.complete(committed).unwrap();
    ra.retire(committed).unwrap();
    ra.retire_rename(1);

    // Speculative work past a misprediction: instrs 2 and 3, one completed.
    let s1 = ra.rename_dest(1, 2).unwrap();
    let s2 = ra.rename_dest(2, 3).unwrap();
    ra.complete(s1).unwrap();
    let free_before_flush = ra.count_free();

    // Undo youngest-first, then flush.
    ra.undo_rename(3);
    ra.undo_rename(2);
    ra.reset_frontend_rat();

    assert_eq!(ra.current_mapping(1), Some(committed));
    assert_eq!(ra.current_mapping(2), None);
    assert_eq!(ra.count_free(), free_before_flush + 2);
    assert!(!ra.is_valid(s1));
    assert!(!ra.is_valid(s2));
    assert!(ra.validate().is_empty());
}

// Open-question pins: the two behaviors future maintainers are most likely
// to "fix" by accident.

#[test]
fn test_fresh_source_allocation_is_not_reclaimed_by_squash() {
    let mut ra = allocator();

    // The very first use of arch 4 is a source read inside an instruction
    // that later gets squashed.
    let src = ra.rename_src(4).unwrap();
    let dest = ra.rename_dest(6, 50).unwrap();
    assert_eq!(ra.count_free(), 6);

    ra.undo_rename(50);

    // The destination came back; the source allocation did not.
    assert!(!ra.is_valid(dest));
    assert_eq!(ra.count_free(), 7);
    assert_eq!(ra.current_mapping(4), Some(src));
    assert!(ra.is_valid(src));
    assert!(ra.validate().is_empty());
}

#[test]
fn test_flush_without_undo_walk_leaks_registers() {
    let mut ra = allocator();
    ra.rename_dest(1, 10).unwrap();
    ra.rename_dest(2, 11).unwrap();
    assert_eq!(ra.count_free(), 6);

    // Flush alone: the frontend table forgets the mappings, but the
    // speculative registers stay allocated until the file exhausts.
    ra.reset_frontend_rat();
    assert_eq!(ra.current_mapping(1), None);
    assert_eq!(ra.count_free(), 6);
}
