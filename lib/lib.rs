//! Talon: instruction-level semantic context for dynamic binary analysis.
//!
//! Every machine instruction processed by an analysis engine passes through a
//! single record, the `arch::Instruction`. The record collects:
//!
//! * The concrete bytes, address and size of the instruction, along with the
//! decoded type, prefix and control-flow flags.
//! * The decoded operands.
//! * Every register and memory location read or written, and every immediate
//! consumed, each paired with the expression graph node which models it.
//! * The symbolic expressions emitted for the instruction.
//! * The concrete register state and memory accesses observed while
//! processing the instruction.
//! * A cached taint summary.
//!
//! The record is filled in three stages. The lifter decodes raw bytes and sets
//! the scalar fields and operands. The expression builder registers every
//! access it models, and attaches symbolic expressions. Finally the taint
//! engine calls `Instruction::compute_taint`. After that the record is
//! read-only until it is reset.
//!
//! # Expression graph handles
//!
//! Talon does not build expression graphs. Nodes live in an arena owned by the
//! expression builder, and the record only stores `ast::NodeRef` handles.
//! Queries which need to look inside a node, such as
//! `Instruction::is_symbolized`, take the owning `ast::AstContext` as an
//! argument. A handle which the context does not recognise results in an
//! `Error::InvalidNode`.
//!
//! # Reuse
//!
//! Records are meant to be reused across an unbounded trace. `reset` returns a
//! record to its freshly constructed state. `partial_reset` clears everything
//! produced by decoding and lifting, but keeps the concrete register state and
//! the memory access log. `context::Pool` keeps one reusable record per
//! thread.

pub mod arch;
pub mod ast;
pub mod context;
pub mod symbolic;

#[cfg(not(feature = "thread_safe"))]
use std::rc::Rc;
#[cfg(not(feature = "thread_safe"))]
pub type RC<T> = Rc<T>;

#[cfg(feature = "thread_safe")]
use std::sync::Arc;
#[cfg(feature = "thread_safe")]
pub type RC<T> = Arc<T>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("The node {0} does not belong to this expression graph")]
    InvalidNode(ast::NodeRef),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}
