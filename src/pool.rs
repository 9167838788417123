use crate::{
    completer::Completer,
    config::{Config, PoolConfig},
    task::Scheduler,
    types::{CompletionError, NodeRef, TaskOutput},
};
use crossbeam_utils::Backoff;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder, Yield};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Error returned by [`ForkJoinPool::new`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolBuildError {
    /// The underlying rayon pool could not be created.
    #[error("failed to build worker pool: {0}")]
    Rayon(#[from] ThreadPoolBuildError),
}

/// Work-stealing scheduler backed by rayon.
///
/// Forked nodes become rayon jobs. When forked from a worker they land on that
/// worker's local deque, which is what [`Scheduler::help_complete`] drains.
/// Cloning is cheap and clones share the same workers.
#[derive(Debug, Clone)]
pub struct ForkJoinPool {
    /// `None` selects rayon's global pool.
    pool: Option<Arc<ThreadPool>>,
}

impl Default for ForkJoinPool {
    fn default() -> Self {
        Self::common()
    }
}

impl ForkJoinPool {
    /// Build a dedicated pool.
    ///
    /// # Errors
    /// If rayon fails to spawn the worker threads.
    pub fn new(config: &PoolConfig) -> Result<Self, PoolBuildError> {
        let PoolConfig {
            num_threads,
            thread_name_prefix,
            stack_size,
        } = config;
        let mut builder = ThreadPoolBuilder::new();
        if let Some(num_threads) = num_threads {
            builder = builder.num_threads(num_threads.get());
        }
        if let Some(prefix) = thread_name_prefix.clone() {
            builder = builder.thread_name(move |idx| format!("{prefix}-{idx}"));
        }
        if let Some(stack_size) = stack_size {
            builder = builder.stack_size(*stack_size);
        }
        Ok(Self {
            pool: Some(Arc::new(builder.build()?)),
        })
    }

    /// The process-wide pool shared by everything that does not supply its
    /// own (rayon's global pool).
    #[must_use]
    pub fn common() -> Self {
        Self { pool: None }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn parallelism(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Whether the calling thread is one of this pool's workers.
    #[must_use]
    pub fn is_worker(&self) -> bool {
        match &self.pool {
            Some(pool) => pool.current_thread_index().is_some(),
            None => rayon::current_thread_index().is_some(),
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            // No `install` for the global pool: `scope` runs `op` on one of its
            // workers when called from outside it.
            None => rayon::scope(|_| op()),
        }
    }

    fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }

    /// Run `root` on a worker of this pool and wait until it is done.
    ///
    /// While waiting, the worker executes other queued jobs, then backs off.
    ///
    /// # Errors
    /// The exception `root` completed with.
    pub fn invoke<'a, C: Config>(
        &self,
        root: &'a NodeRef<C>,
    ) -> Result<Option<&'a TaskOutput<C>>, CompletionError> {
        self.install(|| {
            root.exec(self);
            let backoff = Backoff::new();
            while !root.is_done() {
                match rayon::yield_now() {
                    Some(Yield::Executed) => backoff.reset(),
                    Some(Yield::Idle) | None => backoff.snooze(),
                }
            }
        });
        root.try_join().expect("ForkJoinPool::invoke: [1]")
    }
}

impl<C: Config> Scheduler<C> for ForkJoinPool {
    fn fork(&self, node: NodeRef<C>) {
        let pool = self.clone();
        self.spawn(move || node.exec(&pool));
    }

    fn help_complete(&self, node: &Completer<C>, max_tasks: usize) {
        if !self.is_worker() {
            return;
        }
        let mut executed = 0usize;
        while executed < max_tasks && !node.is_done() {
            match rayon::yield_local() {
                Some(Yield::Executed) => executed += 1,
                Some(Yield::Idle) | None => break,
            }
        }
        trace!(executed, max_tasks, "helped complete");
    }
}
