/// Optimization level handed to the native code generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    /// Name of the setting value understood by the code generator.
    pub const fn as_setting(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Speed => "speed",
            Self::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Code generation knobs for filter kernels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JitConfig {
    /// Backend optimization level. Default: `Speed`.
    pub opt_level: OptLevel,
    /// Inline the predicate body into the bulk and boundary loops instead of
    /// emitting a call to the standalone predicate function. Default: true.
    pub inline_predicate: bool,
    /// Run the backend IR verifier on every function. Default: on in debug builds.
    pub verify_ir: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Speed,
            inline_predicate: true,
            verify_ir: cfg!(debug_assertions),
        }
    }
}

/// Configuration for a sift query engine instance.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Rows per output chunk produced by materialization. Default: 16384.
    pub materialize_chunk_size: usize,
    /// Maximum number of worker threads. `1` runs everything on the caller's
    /// thread. Default: number of CPUs.
    pub max_threads: usize,
    pub jit: JitConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            materialize_chunk_size: 2 << 13,
            max_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            jit: JitConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Single-threaded configuration, mostly useful for tests and debugging.
    pub fn sequential() -> Self {
        Self {
            max_threads: 1,
            ..Self::default()
        }
    }
}
