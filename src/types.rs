use crate::{completer::Completer, config::Config, sync::UnsafeCell, task::Task};
use core::any::Any;
use derive_more::Display;
use std::{error::Error, sync::Arc};
use thiserror::Error;

/// A minimal `UnsafeCell` wrapper that is `Sync` when `T: Sync`.
///
/// Used for the result and exception slots of a node. Correctness is ensured
/// by the status protocol: the single thread that claimed the node writes the
/// slot before publishing a terminal status, and readers only look at the slot
/// after observing that status.
#[derive(Debug)]
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T>(UnsafeCell<T>);

unsafe impl<T: Sync> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    pub(crate) fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }

    #[cfg(not(feature = "loom"))]
    pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
        f(self.0.get().cast_const())
    }

    #[cfg(not(feature = "loom"))]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.0.get())
    }

    #[cfg(feature = "loom")]
    pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
        self.0.with(f)
    }

    #[cfg(feature = "loom")]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        self.0.with_mut(f)
    }
}

/// Shared handle to a node of a completion tree.
pub type NodeRef<C> = Arc<Completer<C>>;
/// Output type produced by a task of the tree bound to `C`.
pub type TaskOutput<C> = <<C as Config>::Task as Task<C>>::Output;

/// Lifecycle status of a node.
///
/// Monotonic: once a node leaves [`Status::Active`] it never returns to it.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// The node has not reached a terminal status yet.
    #[display("active")]
    Active,
    /// The node completed normally; its result (if any) is readable.
    #[display("completed normally")]
    CompletedNormally,
    /// The node completed with an exception.
    #[display("completed exceptionally")]
    CompletedExceptionally,
}

impl Status {
    /// Whether this is one of the two terminal statuses.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Active
    }
}

/// Exception recorded on a node and relayed along its completer chain.
///
/// Cloning is cheap: the payload is reference counted, so every ancestor that
/// receives the exception holds the very same value (see
/// [`CompletionError::same_as`]).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CompletionError {
    /// The task's work function reported a failure.
    #[error("task failed: {0}")]
    Failed(Arc<dyn Error + Send + Sync + 'static>),
    /// The task's work function (or one of its callbacks) panicked.
    #[error("task panicked: {0}")]
    Panicked(Arc<str>),
    /// The node was cancelled.
    #[error("task was cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

impl CompletionError {
    /// Wrap an arbitrary error as a task failure.
    pub fn failed(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Failed(Arc::new(err))
    }

    /// Task failure carrying only a message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::failed(Message(msg.into()))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg: Arc<str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("non-string panic payload")
        };
        Self::Panicked(msg)
    }

    /// Whether `self` and `other` are the same recorded exception rather than
    /// two equal-looking ones.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Failed(lhs), Self::Failed(rhs)) => Arc::ptr_eq(lhs, rhs),
            (Self::Panicked(lhs), Self::Panicked(rhs)) => Arc::ptr_eq(lhs, rhs),
            (Self::Cancelled, Self::Cancelled) => true,
            _ => false,
        }
    }
}
