use crate::arch::{Instruction, MemoryAccess, Register};
use crate::context::Options;
use crate::Error;
use log::{debug, trace};
use std::collections::BTreeMap;

/// Reusable `Instruction` records, one per thread.
///
/// A `Pool` is owned by a single analysis thread. Each traced thread of the
/// target gets its own record, which is reused for every instruction that
/// thread executes.
#[derive(Clone, Debug, Default)]
pub struct Pool {
    options: Options,
    records: BTreeMap<u32, Instruction>,
}

impl Pool {
    /// Create a new, empty, `Pool`.
    pub fn new(options: Options) -> Pool {
        Pool {
            options,
            records: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Start processing a new instruction for `thread_id`.
    ///
    /// The thread's record is fully reset, then tagged with the thread id and
    /// `address`. A record is created the first time a thread is seen, which
    /// fails if the pool already holds `max_threads` records.
    pub fn begin(&mut self, thread_id: u32, address: u64) -> Result<&mut Instruction, Error> {
        if !self.records.contains_key(&thread_id) {
            if let Some(max_threads) = self.options.max_threads() {
                if self.records.len() >= max_threads {
                    return Err(Error::Custom(format!(
                        "Cannot track thread {}, already tracking {} threads",
                        thread_id, max_threads
                    )));
                }
            }
            debug!("new instruction record for thread {}", thread_id);
        }

        let instruction = self.records.entry(thread_id).or_default();
        instruction.reset();
        instruction.set_thread_id(thread_id);
        instruction.set_address(address);
        Ok(instruction)
    }

    /// Prepare the current instruction of `thread_id` to be lifted again.
    ///
    /// The record is partially reset, so observed register state and memory
    /// accesses are kept, and the thread id and address are restored.
    pub fn relift(&mut self, thread_id: u32) -> Option<&mut Instruction> {
        let instruction = self.records.get_mut(&thread_id)?;
        let address = instruction.address();
        trace!("relifting 0x{:x} for thread {}", address, thread_id);
        instruction.partial_reset();
        instruction.set_thread_id(thread_id);
        instruction.set_address(address);
        Some(instruction)
    }

    pub fn get(&self, thread_id: u32) -> Option<&Instruction> {
        self.records.get(&thread_id)
    }

    pub fn get_mut(&mut self, thread_id: u32) -> Option<&mut Instruction> {
        self.records.get_mut(&thread_id)
    }

    fn record_mut(&mut self, thread_id: u32) -> Result<&mut Instruction, Error> {
        self.records.get_mut(&thread_id).ok_or_else(|| {
            Error::Custom(format!("No instruction in progress for thread {}", thread_id))
        })
    }

    /// Record a register value observed by `thread_id`, if register tracking
    /// is enabled.
    pub fn observe_register(&mut self, thread_id: u32, register: Register) -> Result<(), Error> {
        let track = self.options.track_register_state();
        let instruction = self.record_mut(thread_id)?;
        if track {
            instruction.update_register_context(register);
        }
        Ok(())
    }

    /// Record a memory access observed by `thread_id`, if memory tracking is
    /// enabled.
    pub fn observe_memory(&mut self, thread_id: u32, memory: MemoryAccess) -> Result<(), Error> {
        let track = self.options.track_memory_accesses();
        let instruction = self.record_mut(thread_id)?;
        if track {
            instruction.update_memory_context(memory);
        }
        Ok(())
    }

    /// Stop tracking `thread_id`, returning its last record.
    pub fn release(&mut self, thread_id: u32) -> Option<Instruction> {
        debug!("releasing instruction record for thread {}", thread_id);
        self.records.remove(&thread_id)
    }

    /// The threads this pool holds records for, in ascending order.
    pub fn thread_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render the current record of `thread_id` as a line of JSON.
    pub fn trace_json(&self, thread_id: u32) -> Result<String, Error> {
        self.get(thread_id)
            .ok_or_else(|| Error::Custom(format!("No instruction for thread {}", thread_id)))?
            .to_json()
    }
}
