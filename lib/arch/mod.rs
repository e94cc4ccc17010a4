//! Operand descriptors and the per-instruction semantic record.
//!
//! # Operands
//!
//! There are three kinds of operand:
//!
//! * `Register`: a CPU register, identified by a `RegisterId`, with a concrete
//! value.
//! * `MemoryAccess`: a memory location, identified by its address and size,
//! with a concrete value and the registers which formed the address.
//! * `Immediate`: a constant encoded in the instruction.
//!
//! All three are plain values. They are cheap to clone, and compare, hash and
//! order structurally, which lets them act as keys in an `AccessSet`.
//!
//! # The record
//!
//! `Instruction` is the record built for every processed instruction. See its
//! documentation for the pipeline which fills it and the two ways to reset
//! it.

mod access_set;
mod immediate;
mod instruction;
mod memory_access;
mod operand;
mod register;


pub use self::access_set::*;
pub use self::immediate::*;
pub use self::instruction::*;
pub use self::memory_access::*;
pub use self::operand::*;
pub use self::register::*;

use num_bigint::BigUint;
use num_traits::One;

/// A mask of the lowest `bits` bits.
pub(crate) fn mask(bits: usize) -> BigUint {
    (BigUint::one() << bits) - BigUint::one()
}
