use crate::arch::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an `Operand`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum OperandKind {
    Immediate,
    Memory,
    Register,
}

/// A decoded instruction operand.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operand {
    Immediate(Immediate),
    Memory(MemoryAccess),
    Register(Register),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match *self {
            Operand::Immediate(_) => OperandKind::Immediate,
            Operand::Memory(_) => OperandKind::Memory,
            Operand::Register(_) => OperandKind::Register,
        }
    }

    /// The width of this operand in bits.
    pub fn bits(&self) -> usize {
        match *self {
            Operand::Immediate(ref immediate) => immediate.bits(),
            Operand::Memory(ref memory) => memory.bits(),
            Operand::Register(ref register) => register.bits(),
        }
    }

    pub fn immediate(&self) -> Option<&Immediate> {
        match *self {
            Operand::Immediate(ref immediate) => Some(immediate),
            _ => None,
        }
    }

    pub fn memory(&self) -> Option<&MemoryAccess> {
        match *self {
            Operand::Memory(ref memory) => Some(memory),
            _ => None,
        }
    }

    pub fn register(&self) -> Option<&Register> {
        match *self {
            Operand::Register(ref register) => Some(register),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Operand::Immediate(ref immediate) => immediate.fmt(f),
            Operand::Memory(ref memory) => memory.fmt(f),
            Operand::Register(ref register) => register.fmt(f),
        }
    }
}

impl From<Immediate> for Operand {
    fn from(immediate: Immediate) -> Operand {
        Operand::Immediate(immediate)
    }
}

impl From<MemoryAccess> for Operand {
    fn from(memory: MemoryAccess) -> Operand {
        Operand::Memory(memory)
    }
}

impl From<Register> for Operand {
    fn from(register: Register) -> Operand {
        Operand::Register(register)
    }
}
