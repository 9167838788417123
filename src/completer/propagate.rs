use crate::{
    completer::Completer,
    config::Config,
    task::Task,
    types::{CompletionError, TaskOutput},
};
use core::ptr;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, trace, warn};

impl<C: Config> Completer<C> {
    /// Signal that this node's own work is done.
    ///
    /// If the pending count is non-zero it is decremented and the call
    /// returns. Otherwise [`Task::on_completion`] runs, the node is marked
    /// completed and the same check repeats on its completer, until a count
    /// is decremented or the root is completed.
    ///
    /// Among any number of racing calls, exactly one observes a given node's
    /// count at zero, so its completion action runs at most once.
    pub fn try_complete(&self) {
        self.walk(true);
    }

    /// Same walk as [`Completer::try_complete`] without running
    /// [`Task::on_completion`].
    pub fn propagate_completion(&self) {
        self.walk(false);
    }

    fn walk(&self, notify: bool) {
        let mut node = self;
        let mut caller = self;
        loop {
            let c = node.pending.get();
            if c == 0 {
                if notify && !node.run_on_completion(caller) {
                    return;
                }
                node.quietly_complete();
                let Some(completer) = node.completer.as_deref() else {
                    trace!(root = ?ptr::from_ref(node), "completion reached the root");
                    return;
                };
                caller = node;
                node = completer;
            } else {
                if c < 0 {
                    warn!(
                        node = ?ptr::from_ref(node),
                        pending = c,
                        "negative pending count, the node will not complete"
                    );
                }
                if node.pending.compare_and_swap(c, c - 1) {
                    return;
                }
            }
        }
    }

    /// Runs [`Task::on_completion`]. A panic completes this node exceptionally
    /// and relays the panic up the completer chain; returns `false` then.
    fn run_on_completion(&self, caller: &Self) -> bool {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.task.on_completion(self, caller)));
        match outcome {
            Ok(()) => true,
            Err(payload) => {
                let error = CompletionError::from_panic(payload);
                debug!(node = ?ptr::from_ref(self), %error, "completion action panicked");
                self.complete_exceptionally(error);
                false
            }
        }
    }

    /// Complete this node with `result` regardless of its pending count, then
    /// signal its completer with [`Completer::try_complete`].
    ///
    /// On a node that is already done the status and result are left as they
    /// are and no completion action runs, but the completer is still
    /// signalled. If the completion action panics, the node completes
    /// exceptionally instead and the panic is relayed like any exception.
    pub fn complete(&self, result: TaskOutput<C>) {
        if let Some(claim) = self.state.claim() {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| self.task.on_completion(self, self)));
            if let Err(payload) = outcome {
                let error = CompletionError::from_panic(payload);
                debug!(node = ?ptr::from_ref(self), %error, "completion action panicked");
                claim.fail(error.clone());
                self.propagate_exception(&error);
                return;
            }
            claim.publish(Some(result));
        }
        if let Some(completer) = &self.completer {
            completer.try_complete();
        }
    }

    /// Mark this node completed normally without running callbacks or
    /// touching its completer. The published result is
    /// [`Task::raw_result`].
    ///
    /// Returns `false` if the node was already done.
    pub fn quietly_complete(&self) -> bool {
        match self.state.claim() {
            Some(claim) => {
                claim.publish(self.task.raw_result());
                true
            }
            None => false,
        }
    }

    /// [`Completer::quietly_complete`] applied to the root of this node's
    /// tree, making it joinable before the rest of the tree finishes.
    pub fn quietly_complete_root(&self) -> bool {
        self.root().quietly_complete()
    }

    /// One step of a custom completion traversal.
    ///
    /// Returns `Some(self)` if the pending count is zero, handing the caller
    /// the processing of this node. Otherwise decrements it and returns
    /// `None`. Typical use:
    ///
    /// ```ignore
    /// let mut next = node.first_complete();
    /// while let Some(owned) = next {
    ///     process(owned);
    ///     next = owned.next_complete();
    /// }
    /// ```
    #[must_use]
    pub fn first_complete(&self) -> Option<&Self> {
        loop {
            let c = self.pending.get();
            if c == 0 {
                return Some(self);
            }
            if self.pending.compare_and_swap(c, c - 1) {
                return None;
            }
        }
    }

    /// Finish a node owned through [`Completer::first_complete`] and move on
    /// to its completer with the same check.
    ///
    /// The node is marked completed. Returns the completer if the caller now
    /// owns it, or `None` if the completer absorbed the signal or this node is
    /// the root.
    #[must_use]
    pub fn next_complete(&self) -> Option<&Self> {
        self.quietly_complete();
        self.completer.as_deref()?.first_complete()
    }

    /// Complete this node with `error` and offer it up the completer chain.
    ///
    /// The first exception recorded on a node wins; later ones leave the
    /// stored exception untouched. Relaying stops when
    /// [`Task::on_exceptional_completion`] returns `false`, at the root, or at
    /// a completer that is already done.
    pub fn complete_exceptionally(&self, error: CompletionError) {
        if self.record_exceptional(error.clone()) {
            debug!(node = ?ptr::from_ref(self), %error, "exceptional completion recorded");
        }
        self.propagate_exception(&error);
    }

    /// Record a [`CompletionError::Cancelled`] completion on this node only.
    ///
    /// Cancellation is not relayed to the completer. Returns `false` if the
    /// node was already done.
    pub fn cancel(&self) -> bool {
        self.record_exceptional(CompletionError::Cancelled)
    }

    fn record_exceptional(&self, error: CompletionError) -> bool {
        match self.state.claim() {
            Some(claim) => {
                claim.fail(error);
                true
            }
            None => false,
        }
    }

    fn propagate_exception(&self, error: &CompletionError) {
        let mut node = self;
        let mut caller = self;
        while node.task.on_exceptional_completion(node, error, caller) {
            let Some(completer) = node.completer.as_deref() else {
                break;
            };
            if !completer.record_exceptional(error.clone()) {
                break;
            }
            debug!(
                node = ?ptr::from_ref(completer),
                %error,
                "exception relayed to completer"
            );
            caller = node;
            node = completer;
        }
    }
}
