//! Lock-free counted-completion trees for fork-join style task coordination.
//!
//! A completion tree is a set of nodes where every node may report to a single
//! completer (its parent). Each node carries an atomic pending count: the
//! number of sub-completions it still waits for before its own completion
//! action may run. Signalling a node either decrements that count or, when it
//! is already zero, runs the node's completion action exactly once and
//! continues with its completer, so completion ripples up to the root
//! without locks.
//!
//! Key modules:
//! - `config`: binds a concrete task type to a tree via the `Config` trait, and
//!   holds `PoolConfig` for dedicated worker pools.
//! - `task`: the `Task` trait (work function and callbacks) and the `Scheduler`
//!   collaborator that runs nodes.
//! - `completer`: the `Completer` node with the completion walks
//!   (`try_complete`, `propagate_completion`, `complete`,
//!   `first_complete`/`next_complete`, exceptional completion).
//! - `pool`: a rayon-backed `ForkJoinPool` scheduler.
//! - `recipes`: parallel `for_each`, `search` and `map_reduce` built on the
//!   above.
//!
//! Quick start:
//! 1. Implement `Config` with your `Task` type.
//! 2. In `Task::compute`, add one to the node's pending count per subtask,
//!    fork each subtask with the node as its completer, do the node's own work
//!    and finish with `try_complete`.
//! 3. Override `Task::on_completion` to combine results of finished subtasks.
//! 4. Create a root with `Completer::new_root` and run it with
//!    `ForkJoinPool::invoke`.
//!
//! Every decrement of a pending count happens-before the completion action
//! that observes the count at zero, and a node's terminal status is published
//! after its result, so readers that see a node done also see its result.

/// Public interface to configure completion trees and worker pools.
pub mod config;
/// Completion tree nodes and the counted-completion protocol.
pub mod completer;
/// The per-node atomic pending counter.
pub mod pending;
/// The rayon-backed fork-join scheduler.
#[cfg(not(feature = "loom"))]
pub mod pool;
/// Parallel array operations built on completion trees.
#[cfg(not(feature = "loom"))]
pub mod recipes;
mod sync;
/// Task definitions and the scheduler collaborator.
pub mod task;
/// Walking a node's completer chain.
pub mod tree;
/// Statuses, errors and type aliases shared across the crate.
pub mod types;
#[cfg(not(feature = "loom"))]
mod utils;
