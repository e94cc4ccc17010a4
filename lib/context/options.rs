use std::default;

/// Options which change the behavior of a `Pool`.
#[derive(Clone, Debug)]
pub struct Options {
    max_threads: Option<usize>,
    track_register_state: bool,
    track_memory_accesses: bool,
}

impl Options {
    /// Create a new set of Options with the default settings.
    pub fn new() -> Options {
        Options::default()
    }

    /// The maximum number of threads the pool will hold records for. `None`,
    /// the default, means no limit.
    pub fn max_threads(&self) -> Option<usize> {
        self.max_threads
    }

    pub fn set_max_threads(&mut self, max_threads: Option<usize>) {
        self.max_threads = max_threads;
    }

    /// Whether observed register values are recorded into instructions. On by
    /// default.
    pub fn track_register_state(&self) -> bool {
        self.track_register_state
    }

    pub fn set_track_register_state(&mut self, track_register_state: bool) {
        self.track_register_state = track_register_state;
    }

    /// Whether observed memory accesses are recorded into instructions. On by
    /// default.
    pub fn track_memory_accesses(&self) -> bool {
        self.track_memory_accesses
    }

    pub fn set_track_memory_accesses(&mut self, track_memory_accesses: bool) {
        self.track_memory_accesses = track_memory_accesses;
    }
}

impl default::Default for Options {
    fn default() -> Options {
        Options {
            max_threads: None,
            track_register_state: true,
            track_memory_accesses: true,
        }
    }
}

/// Create your options with the builder pattern.
///
/// For more details on the options, see `context::Options`
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder for pool options.
    pub fn new() -> OptionsBuilder {
        OptionsBuilder {
            options: Options::default(),
        }
    }

    pub fn max_threads(mut self, max_threads: usize) -> OptionsBuilder {
        self.options.max_threads = Some(max_threads);
        self
    }

    pub fn track_register_state(mut self, track_register_state: bool) -> OptionsBuilder {
        self.options.track_register_state = track_register_state;
        self
    }

    pub fn track_memory_accesses(mut self, track_memory_accesses: bool) -> OptionsBuilder {
        self.options.track_memory_accesses = track_memory_accesses;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

impl default::Default for OptionsBuilder {
    fn default() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}
