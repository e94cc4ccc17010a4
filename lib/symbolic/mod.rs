//! Symbolic expressions attributed to instructions.
//!
//! Symbolic expressions are owned by the symbolic engine. An `Instruction`
//! holds `SymbolicExpressionRef` pointers to the expressions emitted while its
//! semantics were lifted.

mod expression;

pub use self::expression::*;
