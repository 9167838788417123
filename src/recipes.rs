//! Parallel array operations expressed as completion trees.
//!
//! Each operation halves its index range, forking the upper half as a child
//! and keeping the lower half, until one index is left. Forks are accounted for
//! with [`Completer::add_to_pending_count`] before they are handed to the
//! scheduler.

use crate::{
    completer::Completer,
    config::Config,
    pool::ForkJoinPool,
    task::{Scheduler, Task},
    types::{CompletionError, NodeRef},
    utils::RangeSplitOffHalf,
};
use core::{fmt, marker::PhantomData, ops::Range};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Apply `op` to every item in parallel on `pool`.
///
/// # Errors
/// If `op` panics for any item.
pub fn for_each<E, F>(
    pool: &ForkJoinPool,
    items: impl Into<Arc<[E]>>,
    op: F,
) -> Result<(), CompletionError>
where
    E: Send + Sync + 'static,
    F: Fn(&E) + Send + Sync + 'static,
{
    let items = items.into();
    let range = 0..items.len();
    let root = Completer::<ForEachConfig<E, F>>::new_root(ForEach {
        shared: Arc::new(ForEachShared { items, op }),
        range,
    });
    pool.invoke(&root).map(|_| ())
}

/// Index of some item matching `predicate`, or `None`.
///
/// The first match found completes the whole search at once; branches still
/// running notice the match and stop splitting.
///
/// # Errors
/// If `predicate` panics before a match completes the search.
pub fn search<E, P>(
    pool: &ForkJoinPool,
    items: impl Into<Arc<[E]>>,
    predicate: P,
) -> Result<Option<usize>, CompletionError>
where
    E: Send + Sync + 'static,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    let items = items.into();
    let range = 0..items.len();
    let root = Completer::<SearchConfig<E, P>>::new_root(Search {
        shared: Arc::new(SearchShared {
            items,
            predicate,
            found: OnceLock::new(),
        }),
        range,
    });
    pool.invoke(&root).map(|found| found.copied())
}

/// Map every item with `mapper` and fold the results with `reducer`.
///
/// Partial results are combined in whatever order subtasks finish, so
/// `reducer` must be associative and commutative. Returns `None` for no
/// items.
///
/// # Errors
/// If `mapper` or `reducer` panics.
pub fn map_reduce<E, T, M, R>(
    pool: &ForkJoinPool,
    items: impl Into<Arc<[E]>>,
    mapper: M,
    reducer: R,
) -> Result<Option<T>, CompletionError>
where
    E: Send + Sync + 'static,
    T: Send + 'static,
    M: Fn(&E) -> T + Send + Sync + 'static,
    R: Fn(T, T) -> T + Send + Sync + 'static,
{
    let items = items.into();
    let range = 0..items.len();
    let root = Completer::<MapReduceConfig<E, T, M, R>>::new_root(MapReduce {
        shared: Arc::new(MapReduceShared {
            items,
            mapper,
            reducer,
            _marker: PhantomData,
        }),
        range,
        acc: Mutex::new(None),
    });
    pool.invoke(&root)?;
    Ok(root.task().take())
}

struct ForEachConfig<E, F>(PhantomData<fn() -> (E, F)>);

impl<E, F> Config for ForEachConfig<E, F>
where
    E: Send + Sync + 'static,
    F: Fn(&E) + Send + Sync + 'static,
{
    type Task = ForEach<E, F>;
}

struct ForEachShared<E, F> {
    items: Arc<[E]>,
    op: F,
}

struct ForEach<E, F> {
    shared: Arc<ForEachShared<E, F>>,
    range: Range<usize>,
}

impl<E, F> fmt::Debug for ForEach<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEach")
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl<E, F> Task<ForEachConfig<E, F>> for ForEach<E, F>
where
    E: Send + Sync + 'static,
    F: Fn(&E) + Send + Sync + 'static,
{
    type Output = ();

    fn compute(
        &self,
        node: &NodeRef<ForEachConfig<E, F>>,
        scheduler: &impl Scheduler<ForEachConfig<E, F>>,
    ) -> Result<(), CompletionError> {
        let ForEachShared { items, op } = &*self.shared;
        let mut range = self.range.clone();
        while let Some(upper) = range.split_off_upper_half() {
            node.add_to_pending_count(1);
            scheduler.fork(Completer::new_child(node, Self {
                shared: Arc::clone(&self.shared),
                range: upper,
            }));
        }
        if let Some(item) = range.next().and_then(|idx| items.get(idx)) {
            op(item);
        }
        // Nothing here overrides `on_completion`, so the cheaper walk suffices.
        node.propagate_completion();
        Ok(())
    }
}

struct SearchConfig<E, P>(PhantomData<fn() -> (E, P)>);

impl<E, P> Config for SearchConfig<E, P>
where
    E: Send + Sync + 'static,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    type Task = Search<E, P>;
}

struct SearchShared<E, P> {
    items: Arc<[E]>,
    predicate: P,
    found: OnceLock<usize>,
}

struct Search<E, P> {
    shared: Arc<SearchShared<E, P>>,
    range: Range<usize>,
}

impl<E, P> fmt::Debug for Search<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Search")
            .field("range", &self.range)
            .field("found", &self.shared.found.get())
            .finish_non_exhaustive()
    }
}

impl<E, P> Task<SearchConfig<E, P>> for Search<E, P>
where
    E: Send + Sync + 'static,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    type Output = usize;

    fn compute(
        &self,
        node: &NodeRef<SearchConfig<E, P>>,
        scheduler: &impl Scheduler<SearchConfig<E, P>>,
    ) -> Result<(), CompletionError> {
        let SearchShared {
            items,
            predicate,
            found,
        } = &*self.shared;
        let mut range = self.range.clone();
        while found.get().is_none() {
            if let Some(upper) = range.split_off_upper_half() {
                node.add_to_pending_count(1);
                scheduler.fork(Completer::new_child(node, Self {
                    shared: Arc::clone(&self.shared),
                    range: upper,
                }));
                continue;
            }
            if let Some(idx) = range.next() {
                if items.get(idx).is_some_and(predicate) && found.set(idx).is_ok() {
                    node.quietly_complete_root();
                }
            }
            break;
        }
        node.try_complete();
        Ok(())
    }

    fn raw_result(&self) -> Option<usize> {
        self.shared.found.get().copied()
    }
}

struct MapReduceConfig<E, T, M, R>(PhantomData<fn() -> (E, T, M, R)>);

impl<E, T, M, R> Config for MapReduceConfig<E, T, M, R>
where
    E: Send + Sync + 'static,
    T: Send + 'static,
    M: Fn(&E) -> T + Send + Sync + 'static,
    R: Fn(T, T) -> T + Send + Sync + 'static,
{
    type Task = MapReduce<E, T, M, R>;
}

struct MapReduceShared<E, T, M, R> {
    items: Arc<[E]>,
    mapper: M,
    reducer: R,
    _marker: PhantomData<fn() -> T>,
}

struct MapReduce<E, T, M, R> {
    shared: Arc<MapReduceShared<E, T, M, R>>,
    range: Range<usize>,
    /// Own mapped item folded with everything completed children handed up.
    acc: Mutex<Option<T>>,
}

impl<E, T, M, R> MapReduce<E, T, M, R>
where
    R: Fn(T, T) -> T,
{
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.acc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> Option<T> {
        self.lock().take()
    }

    fn fold(&self, value: T) {
        let mut acc = self.lock();
        let folded = match acc.take() {
            Some(prev) => (self.shared.reducer)(prev, value),
            None => value,
        };
        *acc = Some(folded);
    }
}

impl<E, T, M, R> fmt::Debug for MapReduce<E, T, M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduce")
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl<E, T, M, R> Task<MapReduceConfig<E, T, M, R>> for MapReduce<E, T, M, R>
where
    E: Send + Sync + 'static,
    T: Send + 'static,
    M: Fn(&E) -> T + Send + Sync + 'static,
    R: Fn(T, T) -> T + Send + Sync + 'static,
{
    // The total is taken out of the root's `acc` once the tree is done.
    type Output = ();

    fn compute(
        &self,
        node: &NodeRef<MapReduceConfig<E, T, M, R>>,
        scheduler: &impl Scheduler<MapReduceConfig<E, T, M, R>>,
    ) -> Result<(), CompletionError> {
        let mut range = self.range.clone();
        while let Some(upper) = range.split_off_upper_half() {
            node.add_to_pending_count(1);
            scheduler.fork(Completer::new_child(node, Self {
                shared: Arc::clone(&self.shared),
                range: upper,
                acc: Mutex::new(None),
            }));
        }
        if let Some(item) = range.next().and_then(|idx| self.shared.items.get(idx)) {
            self.fold((self.shared.mapper)(item));
        }
        node.try_complete();
        Ok(())
    }

    fn on_completion(
        &self,
        node: &Completer<MapReduceConfig<E, T, M, R>>,
        _caller: &Completer<MapReduceConfig<E, T, M, R>>,
    ) {
        // Every child has already folded into `acc`; hand the total upwards.
        if let Some(completer) = node.completer() {
            if let Some(value) = self.take() {
                completer.task().fold(value);
            }
        }
    }
}
