use crate::{
    completer::Completer,
    config::Config,
    types::{CompletionError, NodeRef},
};
use core::fmt::Debug;

/// The work and callbacks carried by one node of a completion tree.
///
/// A scheduler invokes `compute` once per node (see [`Completer::exec`]). By
/// convention `compute` finishes by calling exactly one of
/// [`Completer::try_complete`], [`Completer::propagate_completion`] or
/// [`Completer::complete`] on its node, either directly or by handing its
/// pending contribution to a subtask that does so.
pub trait Task<C: Config>: Debug + Send + Sync + Sized + 'static {
    /// Result published by a node that completes normally.
    type Output: Send + Sync;

    /// Run this node's own work.
    ///
    /// Subtasks are created with `node` as their completer and handed to
    /// `scheduler.fork(..)` after the pending count of `node` accounts for
    /// them. Returning `Err` (or panicking) completes `node` exceptionally
    /// and offers the error to its completer chain.
    ///
    /// # Errors
    /// Any failure of the task's own work.
    fn compute(
        &self,
        node: &NodeRef<C>,
        scheduler: &impl Scheduler<C>,
    ) -> Result<(), CompletionError>;

    /// Completion action, run at most once per node when its pending count
    /// is observed at zero by a completion walk.
    ///
    /// `caller` is `node` itself when the node's own `try_complete` found the
    /// count at zero, or the child whose completion released it otherwise.
    /// All writes made by completed subtasks happen-before this call.
    fn on_completion(&self, node: &Completer<C>, caller: &Completer<C>) {
        let _ = (node, caller);
    }

    /// Offered every exception recorded on `node`, either raised by `node`
    /// itself (`caller` is `node`) or relayed from the child `caller`.
    ///
    /// Returning `false` stops the exception from being relayed to the
    /// completer of `node`.
    fn on_exceptional_completion(
        &self,
        node: &Completer<C>,
        error: &CompletionError,
        caller: &Completer<C>,
    ) -> bool {
        let _ = (node, error, caller);
        true
    }

    /// Value published as the node's result when it completes without an
    /// explicit [`Completer::complete`] call.
    fn raw_result(&self) -> Option<Self::Output> {
        None
    }
}

/// Executor collaborator that runs nodes' work functions.
pub trait Scheduler<C: Config>: Sized {
    /// Arrange for `node` to be executed, possibly on another thread.
    fn fork(&self, node: NodeRef<C>);

    /// Execute up to `max_tasks` other pending jobs on the calling thread
    /// while `node` is still active.
    ///
    /// Purely a throughput optimization; the default does nothing.
    fn help_complete(&self, node: &Completer<C>, max_tasks: usize) {
        let _ = (node, max_tasks);
    }
}

/// Scheduler that executes forked nodes immediately on the calling thread.
///
/// Forking becomes a depth-first recursive call, so trees run
/// deterministically. Helping is a no-op: nothing is ever queued.
#[derive(Debug, Default, Copy, Clone)]
pub struct Inline;

impl<C: Config> Scheduler<C> for Inline {
    fn fork(&self, node: NodeRef<C>) {
        node.exec(self);
    }
}
