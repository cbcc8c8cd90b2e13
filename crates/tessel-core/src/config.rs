use std::env;
use std::sync::OnceLock;

/// Tuning knobs shared by the kernels.
///
/// None of these change results: the reduction fast path is bit-identical to
/// the general path, and matmul batches write disjoint slices whether they run
/// in parallel or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Allow rayon parallelism across matmul batches.
    pub parallel: bool,
    /// Minimum number of batches before matmul goes parallel.
    pub parallel_min_batches: usize,
    /// Let `reduce_sum` use the contiguous fast path when the input allows it.
    pub contiguous_fast_path: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_min_batches: 2,
            contiguous_fast_path: true,
        }
    }
}

impl KernelConfig {
    pub fn parallel(mut self, p: bool) -> Self {
        self.parallel = p;
        self
    }

    pub fn parallel_min_batches(mut self, n: usize) -> Self {
        self.parallel_min_batches = n;
        self
    }

    pub fn contiguous_fast_path(mut self, f: bool) -> Self {
        self.contiguous_fast_path = f;
        self
    }

    /// Defaults overridden by `TESSEL_PARALLEL`, `TESSEL_PARALLEL_MIN_BATCHES`
    /// and `TESSEL_CONTIGUOUS_FAST_PATH`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(flag) = env_flag("TESSEL_PARALLEL") {
            config.parallel = flag;
        }
        if let Some(n) = env::var("TESSEL_PARALLEL_MIN_BATCHES")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.parallel_min_batches = n;
        }
        if let Some(flag) = env_flag("TESSEL_CONTIGUOUS_FAST_PATH") {
            config.contiguous_fast_path = flag;
        }
        config
    }

    /// Process-wide configuration, read from the environment on first use.
    pub fn global() -> &'static KernelConfig {
        static GLOBAL: OnceLock<KernelConfig> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = Self::from_env();
            log::debug!("tessel kernel config: {:?}", config);
            config
        })
    }

    /// Whether a loop over `batches` independent units should run in parallel.
    pub fn use_parallel(&self, batches: usize) -> bool {
        self.parallel && batches >= self.parallel_min_batches.max(2)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
