use crate::arch::{MemoryAccess, Register, RegisterId};
use crate::ast::tests::TestNode;
use crate::ast::Arena;
use crate::context::*;
use crate::symbolic::{ExpressionKind, SymbolicExpression};

#[test]
fn begin_resets_and_tags() {
    let mut arena = Arena::new();
    let node = arena.insert(TestNode::concrete(64)).unwrap();

    let mut pool = Pool::new(Options::new());
    {
        let instruction = pool.begin(7, 0x1000).unwrap();
        instruction.set_opcodes(&[0xc3]).unwrap();
        instruction.set_disassembly("ret");
        instruction.set_read_register(Register::new(RegisterId::Rsp), node);
    }
    pool.observe_register(7, Register::with_value(RegisterId::Rsp, 0x8000u32)).unwrap();

    let instruction = pool.begin(7, 0x2000).unwrap();
    assert_eq!(instruction.thread_id(), 7);
    assert_eq!(instruction.address(), 0x2000);
    assert_eq!(instruction.disassembly(), "");
    assert!(instruction.read_registers().is_empty());
    assert!(instruction.register_states().is_empty());
    assert_eq!(pool.len(), 1);
}

#[test]
fn relift_keeps_concrete_context() {
    let mut arena = Arena::new();
    let node = arena.insert(TestNode::concrete(64)).unwrap();

    let mut pool = Pool::new(Options::new());
    pool.begin(1, 0x40_0000).unwrap();
    pool.observe_register(1, Register::with_value(RegisterId::Rax, 0x10u32)).unwrap();
    pool.observe_memory(1, MemoryAccess::new(0x5000, 8).unwrap()).unwrap();
    {
        let instruction = pool.get_mut(1).unwrap();
        instruction.set_opcodes(&[0x48, 0x8b, 0x00]).unwrap();
        instruction.set_load_access(MemoryAccess::new(0x5000, 8).unwrap(), node);
        instruction
            .add_symbolic_expression(
                SymbolicExpression::new(0, node, ExpressionKind::Register(RegisterId::Rax))
                    .into_ref(),
            )
            .unwrap();
    }

    let instruction = pool.relift(1).unwrap();
    assert_eq!(instruction.address(), 0x40_0000);
    assert_eq!(instruction.thread_id(), 1);
    assert!(instruction.load_access().is_empty());
    assert!(instruction.symbolic_expressions().is_empty());
    assert_eq!(
        instruction.register_state(RegisterId::Rax).value_u64(),
        Some(0x10)
    );
    assert_eq!(instruction.memory_accesses().len(), 1);

    assert!(pool.relift(2).is_none());
}

#[test]
fn threads_get_separate_records() {
    let mut pool = Pool::new(Options::new());
    pool.begin(2, 0x10).unwrap();
    pool.begin(1, 0x20).unwrap();
    pool.observe_register(1, Register::with_value(RegisterId::Rcx, 3u32)).unwrap();

    assert_eq!(pool.thread_ids().collect::<Vec<u32>>(), vec![1, 2]);
    assert_eq!(
        pool.get(1).unwrap().register_state(RegisterId::Rcx).value_u64(),
        Some(3)
    );
    assert_eq!(
        pool.get(2).unwrap().register_state(RegisterId::Rcx).value_u64(),
        Some(0)
    );

    let released = pool.release(2).unwrap();
    assert_eq!(released.address(), 0x10);
    assert!(pool.get(2).is_none());
    assert_eq!(pool.len(), 1);
}

#[test]
fn max_threads() {
    let options = OptionsBuilder::new().max_threads(1).build();
    let mut pool = Pool::new(options);
    pool.begin(1, 0).unwrap();
    assert!(pool.begin(2, 0).is_err());
    // An existing thread can always start a new instruction.
    assert!(pool.begin(1, 4).is_ok());
}

#[test]
fn tracking_can_be_disabled() {
    let options = OptionsBuilder::new()
        .track_register_state(false)
        .track_memory_accesses(false)
        .build();
    let mut pool = Pool::new(options);
    pool.begin(1, 0).unwrap();
    pool.observe_register(1, Register::with_value(RegisterId::Rax, 1u32)).unwrap();
    pool.observe_memory(1, MemoryAccess::new(0, 1).unwrap()).unwrap();

    let instruction = pool.get(1).unwrap();
    assert!(instruction.register_states().is_empty());
    assert!(instruction.memory_accesses().is_empty());
}

#[test]
fn observing_unknown_thread_fails() {
    let mut pool = Pool::new(Options::default());
    assert!(pool.observe_register(9, Register::new(RegisterId::Rax)).is_err());
    assert!(pool.trace_json(9).is_err());
}

#[test]
fn trace_json() {
    let mut pool = Pool::new(Options::new());
    pool.begin(4, 0x1234).unwrap().set_disassembly("nop");
    let json = pool.trace_json(4).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["address"], 0x1234);
    assert_eq!(value["disassembly"], "nop");
}
