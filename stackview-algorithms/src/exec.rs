//! Sequential/parallel kernel dispatch.

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use stackview_core::{EngineConfig, Error, Result};

/// How a kernel iterates over its elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// Single-threaded iteration.
    Sequential,
    /// Data-parallel iteration on the current rayon pool.
    Parallel,
}

/// Chooses the execution mode for a kernel and owns the optional
/// dedicated worker pool.
#[derive(Debug)]
pub struct Executor {
    threshold: usize,
    pool: Option<ThreadPool>,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            threshold: EngineConfig::default().parallel_threshold,
            pool: None,
        }
    }
}

impl Executor {
    /// Builds an executor, spawning a dedicated pool when the configuration
    /// asks for a fixed number of threads.
    ///
    /// # Errors
    /// Returns an error if the thread pool cannot be created.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let pool = match config.parallelism {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads.max(1))
                    .thread_name(|index| format!("stackview-{index}"))
                    .build()
                    .map_err(|e| Error::ConfigError(format!("thread pool: {e}")))?;
                debug!("Started worker pool with {} thread(s)", pool.current_num_threads());
                Some(pool)
            }
            None => None,
        };
        Ok(Self {
            threshold: config.parallel_threshold,
            pool,
        })
    }

    /// Execution mode for a kernel touching `elements` values.
    #[must_use]
    pub fn mode(&self, elements: usize) -> Execution {
        if elements > self.threshold {
            Execution::Parallel
        } else {
            Execution::Sequential
        }
    }

    /// Runs `kernel` with the mode chosen for `elements`, inside the
    /// dedicated pool when one exists and the kernel runs in parallel.
    pub fn run<R, F>(&self, elements: usize, kernel: F) -> R
    where
        R: Send,
        F: FnOnce(Execution) -> R + Send,
    {
        let mode = self.mode(elements);
        match (&self.pool, mode) {
            (Some(pool), Execution::Parallel) => pool.install(|| kernel(mode)),
            _ => kernel(mode),
        }
    }
}
