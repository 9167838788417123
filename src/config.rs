use crate::task::Task;
use core::num::NonZeroUsize;

/// Configuration entry-point for a completion tree.
///
/// A concrete `Config` binds a specific `Task` implementation to the nodes of
/// a tree. Every node of one tree runs the same task type, so callbacks can
/// inspect the task of the `caller` node without downcasting. Trees that mix
/// several kinds of work use an enum as their task type.
pub trait Config: Sized + 'static {
    /// The user-defined task type carried by every node.
    type Task: Task<Self>;
}

/// Settings for building a dedicated [`ForkJoinPool`](crate::pool::ForkJoinPool).
///
/// Unset fields fall back to rayon's defaults (which honour
/// `RAYON_NUM_THREADS`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub num_threads: Option<NonZeroUsize>,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: Option<String>,
    /// Stack size of each worker thread in bytes.
    pub stack_size: Option<usize>,
}

impl PoolConfig {
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: NonZeroUsize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }
}
