//! Per-thread reuse of instruction records.
//!
//! Tracing a multi-threaded target processes instructions from several
//! threads. Each thread gets its own `Instruction`, held by a `Pool`, and
//! records are never shared between threads.

mod options;
mod pool;

#[cfg(test)]
mod test;

pub use self::options::*;
pub use self::pool::*;
