use crate::{
    sync::{AtomicU8, Ordering},
    types::{CompletionError, Status, SyncUnsafeCell},
};
use core::fmt;

const ACTIVE: u8 = 0;
/// A single writer owns the slots and has not published yet. Observed as
/// [`Status::Active`] from the outside.
const CLAIMED: u8 = 1;
const NORMAL: u8 = 2;
const EXCEPTIONAL: u8 = 3;

/// Terminal status of a node together with its result or exception.
///
/// The status only moves forward: `ACTIVE -> CLAIMED -> NORMAL | EXCEPTIONAL`.
/// Winning the `ACTIVE -> CLAIMED` CAS grants exclusive write access to the
/// slots; the `Release` store of the terminal status publishes them to every
/// reader that loads it with `Acquire`.
pub(super) struct StateCell<T> {
    status: AtomicU8,
    result: SyncUnsafeCell<Option<T>>,
    exception: SyncUnsafeCell<Option<CompletionError>>,
}

impl<T> StateCell<T> {
    pub(super) fn new() -> Self {
        Self {
            status: AtomicU8::new(ACTIVE),
            result: SyncUnsafeCell::new(None),
            exception: SyncUnsafeCell::new(None),
        }
    }

    /// Try to become the single writer of this cell.
    pub(super) fn claim(&self) -> Option<Claim<'_, T>> {
        self.status
            .compare_exchange(ACTIVE, CLAIMED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Claim {
                cell: self,
                armed: true,
            })
    }

    pub(super) fn status(&self) -> Status {
        match self.status.load(Ordering::Acquire) {
            NORMAL => Status::CompletedNormally,
            EXCEPTIONAL => Status::CompletedExceptionally,
            _ => Status::Active,
        }
    }

    /// `None` while active, otherwise the published result or exception.
    pub(super) fn outcome(&self) -> Option<Result<Option<&T>, &CompletionError>> {
        match self.status.load(Ordering::Acquire) {
            // SAFETY: `NORMAL` was stored with `Release` after the only write to
            // `result`, and nothing writes the slot afterwards.
            NORMAL => Some(Ok(self.result.with(|ptr| unsafe { (*ptr).as_ref() }))),
            EXCEPTIONAL => {
                // SAFETY: as above, for `exception` and `EXCEPTIONAL`.
                let error = self.exception.with(|ptr| unsafe { (*ptr).as_ref() });
                Some(Err(error.expect("StateCell::outcome: [1]")))
            }
            _ => None,
        }
    }
}

impl<T> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Exclusive write access to a [`StateCell`] won through [`StateCell::claim`].
///
/// Dropping an unpublished claim (a completion action panicked in between)
/// publishes an exceptional status so the node never stays claimed forever.
pub(super) struct Claim<'a, T> {
    cell: &'a StateCell<T>,
    armed: bool,
}

impl<T> Claim<'_, T> {
    pub(super) fn publish(mut self, result: Option<T>) {
        self.armed = false;
        // SAFETY: the claim grants exclusive access to the slot until the status
        // store below.
        self.cell.result.with_mut(|ptr| unsafe { *ptr = result });
        self.cell.status.store(NORMAL, Ordering::Release);
    }

    pub(super) fn fail(mut self, error: CompletionError) {
        self.armed = false;
        self.fail_in_place(error);
    }

    fn fail_in_place(&self, error: CompletionError) {
        // SAFETY: the claim grants exclusive access to the slot until the status
        // store below.
        self.cell.exception.with_mut(|ptr| unsafe { *ptr = Some(error) });
        self.cell.status.store(EXCEPTIONAL, Ordering::Release);
    }
}

impl<T> Drop for Claim<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.fail_in_place(CompletionError::Panicked(
                "completion action panicked before the node was published".into(),
            ));
        }
    }
}
