mod propagate;
mod state;

use crate::{
    completer::state::StateCell,
    config::Config,
    pending::PendingCount,
    task::{Scheduler, Task},
    types::{CompletionError, NodeRef, Status, TaskOutput},
};
use core::{fmt, ptr};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::debug;

/// One node of a completion tree.
///
/// A node holds its task, an optional completer (the node to check once this
/// one is done), a [`PendingCount`] of outstanding sub-completions and a
/// terminal status with its result or exception.
///
/// Nodes are always shared through [`NodeRef`]. A child keeps its completer
/// alive through that link, and the link is fixed at construction, so the
/// completer graph of a tree is finite, acyclic and rooted by construction.
pub struct Completer<C: Config> {
    task: C::Task,
    completer: Option<NodeRef<C>>,
    pending: PendingCount,
    state: StateCell<TaskOutput<C>>,
}

impl<C: Config> Completer<C> {
    /// Create a node reporting to `completer` once its `initial_pending`
    /// sub-completions (and its own) have been signalled.
    pub fn new(completer: Option<NodeRef<C>>, initial_pending: i32, task: C::Task) -> NodeRef<C> {
        Arc::new(Self {
            task,
            completer,
            pending: PendingCount::new(initial_pending),
            state: StateCell::new(),
        })
    }

    /// Create a node without a completer and with a zero pending count.
    pub fn new_root(task: C::Task) -> NodeRef<C> {
        Self::new(None, 0, task)
    }

    /// Create a node reporting to `parent`, with a zero pending count.
    ///
    /// The caller is responsible for having accounted for the new node in the
    /// pending count of `parent`.
    pub fn new_child(parent: &NodeRef<C>, task: C::Task) -> NodeRef<C> {
        Self::new(Some(Arc::clone(parent)), 0, task)
    }

    #[must_use]
    pub fn task(&self) -> &C::Task {
        &self.task
    }

    /// The node this one reports to, `None` for a root.
    #[must_use]
    pub fn completer(&self) -> Option<&NodeRef<C>> {
        self.completer.as_ref()
    }

    #[must_use]
    pub fn pending_count(&self) -> i32 {
        self.pending.get()
    }

    pub fn set_pending_count(&self, count: i32) {
        self.pending.set(count);
    }

    /// Atomically adds `delta` to the pending count.
    pub fn add_to_pending_count(&self, delta: i32) {
        self.pending.fetch_add(delta);
    }

    /// Sets the pending count to `count` only if it currently holds
    /// `expected`; returns whether it did.
    pub fn compare_and_set_pending_count(&self, expected: i32, count: i32) -> bool {
        self.pending.compare_and_swap(expected, count)
    }

    /// Decrements the pending count unless it is zero and returns the value
    /// observed beforehand. A zero return means nothing was decremented.
    pub fn decrement_pending_count_unless_zero(&self) -> i32 {
        self.pending.decrement_unless_zero()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.state.status()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    #[must_use]
    pub fn is_completed_normally(&self) -> bool {
        self.status() == Status::CompletedNormally
    }

    #[must_use]
    pub fn is_completed_abnormally(&self) -> bool {
        self.status() == Status::CompletedExceptionally
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.exception(), Some(CompletionError::Cancelled))
    }

    /// Result published by a normal completion.
    ///
    /// `None` while the node is active, after an exceptional completion, or
    /// when it completed without a result.
    #[must_use]
    pub fn raw_result(&self) -> Option<&TaskOutput<C>> {
        match self.state.outcome() {
            Some(Ok(result)) => result,
            _ => None,
        }
    }

    /// Exception recorded by an exceptional completion.
    #[must_use]
    pub fn exception(&self) -> Option<&CompletionError> {
        match self.state.outcome() {
            Some(Err(error)) => Some(error),
            _ => None,
        }
    }

    /// Non-blocking join: `None` while the node is active, otherwise its
    /// result or a clone of its exception.
    #[must_use]
    pub fn try_join(&self) -> Option<Result<Option<&TaskOutput<C>>, CompletionError>> {
        self.state.outcome().map(|outcome| outcome.map_err(Clone::clone))
    }

    /// Run this node's work function.
    ///
    /// An error returned by [`Task::compute`], or a panic inside it, completes
    /// this node exceptionally and walks the exception up the completer chain.
    /// Nodes that are already done are not run.
    pub fn exec(self: &Arc<Self>, scheduler: &impl Scheduler<C>) {
        if self.is_done() {
            return;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.task.compute(self, scheduler)));
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => {
                let error = CompletionError::from_panic(payload);
                debug!(node = ?ptr::from_ref(&**self), %error, "task panicked");
                error
            }
        };
        self.complete_exceptionally(error);
    }

    /// Ask `scheduler` to run up to `max_tasks` queued jobs that may feed this
    /// node's completion. Does nothing once the node is done.
    pub fn help_complete(&self, scheduler: &impl Scheduler<C>, max_tasks: usize) {
        if max_tasks > 0 && !self.is_done() {
            scheduler.help_complete(self, max_tasks);
        }
    }
}

impl<C: Config> fmt::Debug for Completer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("task", &self.task)
            .field("has_completer", &self.completer.is_some())
            .field("pending", &self.pending_count())
            .field("status", &self.status())
            .finish()
    }
}
