//! Model-based invariant properties.
//!
//! Drives the allocator with random legal operation sequences while a
//! shadow model tracks the expected frontend mappings and free count. After
//! every operation the real unit must agree with the model and its own
//! validator must find nothing, which together cover the structural
//! invariants: file-size balance, duplicate-free free list, tables pointing
//! only at busy slots, and live checkpoints staying off the free list.

use std::collections::VecDeque;

use proptest::prelude::*;

use oosim_core::common::error::RenameError;
use oosim_core::core::rename::{PhysReg, RegisterAllocator};

const NUM_PHYSICAL: usize = 8;
const ARCH_REGS: u8 = 6;

/// One step of a legal protocol sequence. Steps that are illegal in the
/// current state (e.g. retiring an empty window) degrade to no-ops.
#[derive(Clone, Copy, Debug)]
enum Op {
    /// Rename a destination as a new one-destination instruction.
    Dest(u8),
    /// Read a source register.
    Src(u8),
    /// Complete the n-th oldest in-flight instruction.
    Complete(usize),
    /// Retire the oldest instruction, if completed.
    Retire,
    /// Squash the youngest instruction.
    Undo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ARCH_REGS).prop_map(Op::Dest),
        (0..ARCH_REGS).prop_map(Op::Src),
        (0usize..NUM_PHYSICAL).prop_map(Op::Complete),
        Just(Op::Retire),
        Just(Op::Undo),
    ]
}

/// Shadow of one in-flight single-destination instruction.
struct Entry {
    id: u64,
    arch: u8,
    phys: PhysReg,
    old_front: Option<PhysReg>,
    completed: bool,
}

struct Model {
    front: [Option<PhysReg>; ARCH_REGS as usize],
    back: [Option<PhysReg>; ARCH_REGS as usize],
    free: usize,
    window: VecDeque<Entry>,
    next_id: u64,
}

impl Model {
    fn new() -> Self {
        Self {
            front: [None; ARCH_REGS as usize],
            back: [None; ARCH_REGS as usize],
            free: NUM_PHYSICAL,
            window: VecDeque::new(),
            next_id: 0,
        }
    }
}

fn apply(ra: &mut RegisterAllocator, model: &mut Model, op: Op) {
    match op {
        Op::Dest(arch) => {
            model.next_id += 1;
            let id = model.next_id;
            match ra.rename_dest(arch, id) {
                Ok(phys) => {
                    assert!(model.free > 0, "allocation succeeded with empty model");
                    let old_front = model.front[arch as usize];
                    model.front[arch as usize] = Some(phys);
                    model.free -= 1;
                    model.window.push_back(Entry {
                        id,
                        arch,
                        phys,
                        old_front,
                        completed: false,
                    });
                }
                Err(RenameError::NoFreeRegister) => {
                    assert_eq!(model.free, 0);
                    ra.undo_rename(id); // no history recorded; must be a no-op
                }
                Err(e) => panic!("unexpected rename error: {}", e),
            }
        }
        Op::Src(arch) => match model.front[arch as usize] {
            Some(expected) => {
                assert_eq!(ra.rename_src(arch).unwrap(), expected);
            }
            None => match ra.rename_src(arch) {
                Ok(phys) => {
                    assert!(model.free > 0);
                    assert!(ra.is_valid(phys));
                    assert_eq!(ra.producer_of(phys), 0);
                    model.front[arch as usize] = Some(phys);
                    model.back[arch as usize] = Some(phys);
                    model.free -= 1;
                }
                Err(RenameError::NoFreeRegister) => assert_eq!(model.free, 0),
                Err(e) => panic!("unexpected rename error: {}", e),
            },
        },
        Op::Complete(n) => {
            if model.window.is_empty() {
                return;
            }
            let idx = n % model.window.len();
            let entry = &mut model.window[idx];
            ra.complete(entry.phys).unwrap();
            entry.completed = true;
            assert!(ra.is_valid(entry.phys));
        }
        Op::Retire => {
            let Some(head) = model.window.front() else { return };
            if !head.completed {
                return;
            }
            let entry = model.window.pop_front().unwrap();
            let free_before = ra.count_free();
            ra.retire(entry.phys).unwrap();
            ra.retire_rename(entry.id);

            // Retirement monotonicity: the replaced backend mapping, if any,
            // is released.
            let old_back = model.back[entry.arch as usize];
            model.back[entry.arch as usize] = Some(entry.phys);
            if old_back.is_some() {
                model.free += 1;
                assert_eq!(ra.count_free(), free_before + 1);
            } else {
                assert_eq!(ra.count_free(), free_before);
            }
        }
        Op::Undo => {
            let Some(entry) = model.window.pop_back() else { return };
            ra.undo_rename(entry.id);
            model.front[entry.arch as usize] = entry.old_front;
            model.free += 1;
            assert!(!ra.is_valid(entry.phys));
        }
    }

    // The unit agrees with the model after every step.
    assert_eq!(ra.count_free(), model.free, "free-list size diverged");
    for arch in 0..ARCH_REGS {
        assert_eq!(
            ra.current_mapping(arch),
            model.front[arch as usize],
            "frontend mapping for arch {} diverged",
            arch
        );
        assert_eq!(ra.is_allocated(arch), model.front[arch as usize].is_some());
    }

    let violations = ra.validate();
    assert!(violations.is_empty(), "invariants broken: {:?}", violations);
}

proptest! {
    #[test]
    fn random_legal_sequences_hold_invariants(
        ops in proptest::collection::vec(op_strategy(), 1..250)
    ) {
        let mut ra = RegisterAllocator::new(NUM_PHYSICAL).unwrap();
        let mut model = Model::new();
        for op in ops {
            apply(&mut ra, &mut model, op);
        }
    }

    #[test]
    fn rename_then_undo_is_identity(
        arch in 0..ARCH_REGS,
        warmup in proptest::collection::vec(op_strategy(), 0..60)
    ) {
        let mut ra = RegisterAllocator::new(NUM_PHYSICAL).unwrap();
        let mut model = Model::new();
        for op in warmup {
            apply(&mut ra, &mut model, op);
        }

        let before_mapping = ra.current_mapping(arch);
        let before_free = ra.count_free();
        match ra.rename_dest(arch, u64::MAX) {
            Ok(_) => {
                ra.undo_rename(u64::MAX);
                prop_assert_eq!(ra.current_mapping(arch), before_mapping);
                prop_assert_eq!(ra.count_free(), before_free);
                let violations = ra.validate();
                prop_assert!(violations.is_empty(), "invariants broken: {:?}", violations);
            }
            Err(RenameError::NoFreeRegister) => prop_assert_eq!(before_free, 0),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
