//! The semantic record of one processed instruction.

use crate::arch::*;
use crate::ast::{AstContext, NodeRef};
use crate::symbolic::SymbolicExpressionRef;
use crate::Error;
use bitflags::bitflags;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The maximum length of an encoded instruction, in bytes.
pub const MAX_OPCODE_SIZE: usize = 15;

bitflags! {
    /// Boolean properties of an `Instruction`.
    #[derive(Default, Deserialize, Serialize)]
    pub struct InstructionFlags: u8 {
        const BRANCH          = 0b0001;
        const CONTROL_FLOW    = 0b0010;
        const CONDITION_TAKEN = 0b0100;
        const TAINTED         = 0b1000;
    }
}

/// Everything known about one instruction as it is processed.
///
/// # Pipeline
///
/// An `Instruction` is filled in a fixed order:
///
/// 1. The lifter sets the opcode bytes, address, decoded type and prefix, the
/// control-flow flags, the disassembly and the operands.
/// 2. The expression builder calls `set_load_access`, `set_store_access`,
/// `set_read_register`, `set_written_register` and `set_read_immediate` for
/// every effect it models, and `add_symbolic_expression` for every expression
/// it emits.
/// 3. The taint engine calls `compute_taint`.
///
/// After that the record is read-only until it is reset. Lifting again
/// without a reset adds every effect a second time; identical
/// `(operand, node)` pairs are not duplicated, but nothing else is detected.
///
/// # Resetting
///
/// `reset` returns the record to the state of `Instruction::new()`.
/// `partial_reset` does the same, except that the concrete register state and
/// the memory access log survive, for when the same instruction is lifted
/// again.
///
/// # Node handles
///
/// Every `NodeRef` stored in the record belongs to an expression graph owned
/// by someone else. The record must not be queried through an `AstContext`
/// other than the one which allocated its nodes, and must be reset or dropped
/// no later than that graph.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(try_from = "InstructionFields")]
pub struct Instruction {
    address: u64,
    size: u32,
    opcodes: [u8; MAX_OPCODE_SIZE],
    instruction_type: u32,
    prefix: u32,
    thread_id: u32,
    flags: InstructionFlags,
    disassembly: String,
    operands: Vec<Operand>,
    load_access: AccessSet<MemoryAccess>,
    store_access: AccessSet<MemoryAccess>,
    read_registers: AccessSet<Register>,
    written_registers: AccessSet<Register>,
    read_immediates: AccessSet<Immediate>,
    register_state: BTreeMap<RegisterId, Register>,
    memory_accesses: Vec<MemoryAccess>,
    symbolic_expressions: Vec<SymbolicExpressionRef>,
}

impl Instruction {
    /// Create a new, empty, `Instruction`.
    pub fn new() -> Instruction {
        Instruction::default()
    }

    /// Create a new `Instruction` holding the given opcode bytes.
    pub fn from_opcodes(opcodes: &[u8]) -> Result<Instruction, Error> {
        let mut instruction = Instruction::new();
        instruction.set_opcodes(opcodes)?;
        Ok(instruction)
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn set_address(&mut self, address: u64) {
        self.address = address;
    }

    /// The address of the instruction which follows this one.
    ///
    /// This is only meaningful once the size has been set.
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(self.size as u64)
    }

    /// The opcode bytes of this instruction.
    pub fn opcodes(&self) -> &[u8] {
        &self.opcodes[..self.size as usize]
    }

    /// Set the opcode bytes, and the size to their length.
    ///
    /// Fails with `Error::InvalidOperand`, changing nothing, if there are more
    /// than `MAX_OPCODE_SIZE` bytes.
    pub fn set_opcodes(&mut self, opcodes: &[u8]) -> Result<(), Error> {
        if opcodes.len() > MAX_OPCODE_SIZE {
            return Err(Error::InvalidOperand(format!(
                "Opcode length {} exceeds the maximum of {}",
                opcodes.len(),
                MAX_OPCODE_SIZE
            )));
        }
        self.opcodes = [0; MAX_OPCODE_SIZE];
        self.opcodes[..opcodes.len()].copy_from_slice(opcodes);
        self.size = opcodes.len() as u32;
        Ok(())
    }

    /// The size of this instruction in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Fails with `Error::InvalidOperand`, changing nothing, if `size` is
    /// greater than `MAX_OPCODE_SIZE`.
    pub fn set_size(&mut self, size: u32) -> Result<(), Error> {
        if size as usize > MAX_OPCODE_SIZE {
            return Err(Error::InvalidOperand(format!(
                "Instruction size {} exceeds the maximum of {}",
                size, MAX_OPCODE_SIZE
            )));
        }
        self.size = size;
        Ok(())
    }

    /// The mnemonic id assigned by the lifter.
    pub fn instruction_type(&self) -> u32 {
        self.instruction_type
    }

    pub fn set_instruction_type(&mut self, instruction_type: u32) {
        self.instruction_type = instruction_type;
    }

    /// The prefix id assigned by the lifter, or 0.
    pub fn prefix(&self) -> u32 {
        self.prefix
    }

    pub fn set_prefix(&mut self, prefix: u32) {
        self.prefix = prefix;
    }

    pub fn is_prefixed(&self) -> bool {
        self.prefix != 0
    }

    /// The thread this instruction was executed by.
    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn set_thread_id(&mut self, thread_id: u32) {
        self.thread_id = thread_id;
    }

    pub fn flags(&self) -> InstructionFlags {
        self.flags
    }

    pub fn is_branch(&self) -> bool {
        self.flags.contains(InstructionFlags::BRANCH)
    }

    pub fn set_branch(&mut self, branch: bool) {
        self.flags.set(InstructionFlags::BRANCH, branch);
    }

    pub fn is_control_flow(&self) -> bool {
        self.flags.contains(InstructionFlags::CONTROL_FLOW)
    }

    pub fn set_control_flow(&mut self, control_flow: bool) {
        self.flags.set(InstructionFlags::CONTROL_FLOW, control_flow);
    }

    pub fn is_condition_taken(&self) -> bool {
        self.flags.contains(InstructionFlags::CONDITION_TAKEN)
    }

    pub fn set_condition_taken(&mut self, condition_taken: bool) {
        self.flags.set(InstructionFlags::CONDITION_TAKEN, condition_taken);
    }

    pub fn disassembly(&self) -> &str {
        &self.disassembly
    }

    /// Replace the disassembly text, reusing the existing buffer.
    pub fn set_disassembly(&mut self, disassembly: &str) {
        self.disassembly.clear();
        self.disassembly.push_str(disassembly);
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operands_mut(&mut self) -> &mut Vec<Operand> {
        &mut self.operands
    }

    pub fn push_operand<O: Into<Operand>>(&mut self, operand: O) {
        self.operands.push(operand.into());
    }

    pub fn set_operands(&mut self, operands: Vec<Operand>) {
        self.operands = operands;
    }

    /// Memory loaded by this instruction, and the nodes of the loaded values.
    pub fn load_access(&self) -> &AccessSet<MemoryAccess> {
        &self.load_access
    }

    /// Memory stored by this instruction, and the nodes of the stored values.
    pub fn store_access(&self) -> &AccessSet<MemoryAccess> {
        &self.store_access
    }

    pub fn read_registers(&self) -> &AccessSet<Register> {
        &self.read_registers
    }

    pub fn written_registers(&self) -> &AccessSet<Register> {
        &self.written_registers
    }

    pub fn read_immediates(&self) -> &AccessSet<Immediate> {
        &self.read_immediates
    }

    /// Returns false if the pair was already recorded.
    pub fn set_load_access(&mut self, memory: MemoryAccess, node: NodeRef) -> bool {
        self.load_access.insert(memory, node)
    }

    /// Returns false if the pair was already recorded.
    pub fn set_store_access(&mut self, memory: MemoryAccess, node: NodeRef) -> bool {
        self.store_access.insert(memory, node)
    }

    /// Returns false if the pair was already recorded.
    pub fn set_read_register(&mut self, register: Register, node: NodeRef) -> bool {
        self.read_registers.insert(register, node)
    }

    /// Returns false if the pair was already recorded.
    pub fn set_written_register(&mut self, register: Register, node: NodeRef) -> bool {
        self.written_registers.insert(register, node)
    }

    /// Returns false if the pair was already recorded.
    pub fn set_read_immediate(&mut self, immediate: Immediate, node: NodeRef) -> bool {
        self.read_immediates.insert(immediate, node)
    }

    pub fn is_memory_read(&self) -> bool {
        !self.load_access.is_empty()
    }

    pub fn is_memory_write(&self) -> bool {
        !self.store_access.is_empty()
    }

    /// Record the concrete value of a register as observed while processing
    /// this instruction.
    ///
    /// State is kept per full-width register. Recording a sub-register
    /// replaces only its bits of the full-width value. Later records win.
    pub fn update_register_context(&mut self, register: Register) {
        let parent = register.parent();
        if register.is_full() {
            self.register_state.insert(parent, register);
        } else {
            self.register_state
                .entry(parent)
                .or_insert_with(|| Register::new(parent))
                .deposit(&register);
        }
    }

    /// Append a concrete memory access to the memory access log.
    pub fn update_memory_context(&mut self, memory: MemoryAccess) {
        self.memory_accesses.push(memory);
    }

    /// The concrete value of a register, as recorded with
    /// `update_register_context`.
    ///
    /// A register which was never recorded is returned holding zero. This is
    /// indistinguishable from a register recorded as zero.
    pub fn register_state(&self, id: RegisterId) -> Register {
        match self.register_state.get(&id.parent()) {
            Some(full) if full.id() == id => full.clone(),
            Some(full) => full.extract(id),
            None => Register::new(id),
        }
    }

    /// The recorded register state, keyed by full-width register.
    pub fn register_states(&self) -> &BTreeMap<RegisterId, Register> {
        &self.register_state
    }

    /// Every concrete memory access recorded, in order.
    pub fn memory_accesses(&self) -> &[MemoryAccess] {
        &self.memory_accesses
    }

    /// Attach a symbolic expression to this instruction.
    ///
    /// Fails with `Error::InvalidArgument`, changing nothing, when given
    /// `None`. This is a bug in the caller.
    pub fn add_symbolic_expression<E>(&mut self, expression: E) -> Result<(), Error>
    where
        E: Into<Option<SymbolicExpressionRef>>,
    {
        let expression = expression.into().ok_or_else(|| {
            Error::InvalidArgument("Cannot add a null symbolic expression".to_string())
        })?;
        self.symbolic_expressions.push(expression);
        Ok(())
    }

    /// The symbolic expressions attached to this instruction, in order.
    pub fn symbolic_expressions(&self) -> &[SymbolicExpressionRef] {
        &self.symbolic_expressions
    }

    /// Recompute the taint summary from the attached symbolic expressions.
    pub fn compute_taint(&mut self) {
        let tainted = self
            .symbolic_expressions
            .iter()
            .any(|expression| expression.is_tainted());
        self.flags.set(InstructionFlags::TAINTED, tainted);
    }

    /// The taint summary as of the last call to `compute_taint`.
    pub fn is_tainted(&self) -> bool {
        self.flags.contains(InstructionFlags::TAINTED)
    }

    /// Returns true if any attached symbolic expression contains a symbolic
    /// variable.
    ///
    /// `ast` must be the context which owns the nodes of the attached
    /// expressions.
    pub fn is_symbolized<A: AstContext + ?Sized>(&self, ast: &A) -> Result<bool, Error> {
        for expression in &self.symbolic_expressions {
            if expression.is_symbolized(ast)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Clear everything, returning this `Instruction` to a fresh state.
    pub fn reset(&mut self) {
        trace!("reset instruction 0x{:x}", self.address);
        self.partial_reset();
        self.register_state.clear();
        self.memory_accesses.clear();
    }

    /// Clear everything except the recorded register state and memory access
    /// log.
    pub fn partial_reset(&mut self) {
        trace!("partial reset instruction 0x{:x}", self.address);
        self.address = 0;
        self.size = 0;
        self.opcodes = [0; MAX_OPCODE_SIZE];
        self.instruction_type = 0;
        self.prefix = 0;
        self.thread_id = 0;
        self.flags = InstructionFlags::empty();
        self.disassembly.clear();
        self.operands.clear();
        self.load_access.clear();
        self.store_access.clear();
        self.read_registers.clear();
        self.written_registers.clear();
        self.read_immediates.clear();
        self.symbolic_expressions.clear();
    }

    /// Serialize this `Instruction` to a single line of JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Deserialize)]
struct InstructionFields {
    address: u64,
    size: u32,
    opcodes: [u8; MAX_OPCODE_SIZE],
    instruction_type: u32,
    prefix: u32,
    thread_id: u32,
    flags: InstructionFlags,
    disassembly: String,
    operands: Vec<Operand>,
    load_access: AccessSet<MemoryAccess>,
    store_access: AccessSet<MemoryAccess>,
    read_registers: AccessSet<Register>,
    written_registers: AccessSet<Register>,
    read_immediates: AccessSet<Immediate>,
    register_state: BTreeMap<RegisterId, Register>,
    memory_accesses: Vec<MemoryAccess>,
    symbolic_expressions: Vec<SymbolicExpressionRef>,
}

impl TryFrom<InstructionFields> for Instruction {
    type Error = Error;

    fn try_from(fields: InstructionFields) -> Result<Instruction, Error> {
        let size = fields.size as usize;
        if size > MAX_OPCODE_SIZE {
            return Err(Error::InvalidOperand(format!(
                "Instruction size {} exceeds the maximum of {}",
                size, MAX_OPCODE_SIZE
            )));
        }

        let mut instruction = Instruction::from_opcodes(&fields.opcodes[..size])?;
        instruction.address = fields.address;
        instruction.instruction_type = fields.instruction_type;
        instruction.prefix = fields.prefix;
        instruction.thread_id = fields.thread_id;
        instruction.flags = InstructionFlags::from_bits_truncate(fields.flags.bits());
        instruction.disassembly = fields.disassembly;
        instruction.operands = fields.operands;
        instruction.load_access = fields.load_access;
        instruction.store_access = fields.store_access;
        instruction.read_registers = fields.read_registers;
        instruction.written_registers = fields.written_registers;
        instruction.read_immediates = fields.read_immediates;
        // Keys are rederived from each register's parent.
        for register in fields.register_state.into_values() {
            instruction.update_register_context(register);
        }
        instruction.memory_accesses = fields.memory_accesses;
        instruction.symbolic_expressions = fields.symbolic_expressions;
        Ok(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}: {}", self.address, self.disassembly)
    }
}
