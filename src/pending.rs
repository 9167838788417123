use crate::sync::{AtomicI32, Ordering};

/// Atomic pending count of a single node.
///
/// Loads are `Acquire`, stores `Release` and read-modify-writes `AcqRel`.
/// Successive decrements therefore form a release sequence: the thread that
/// observes the count at zero synchronizes with every thread that decremented
/// it on the way down.
///
/// Driving the count below zero is caller misuse. The counter does not
/// prevent it, except through [`PendingCount::decrement_unless_zero`].
#[derive(Debug)]
#[repr(align(128))]
pub struct PendingCount(AtomicI32);

impl PendingCount {
    #[must_use]
    pub fn new(initial: i32) -> Self {
        Self(AtomicI32::new(initial))
    }

    #[inline]
    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: i32) {
        self.0.store(value, Ordering::Release);
    }

    /// Returns `true` iff the count was `expected` and is now `new`.
    #[inline]
    pub fn compare_and_swap(&self, expected: i32, new: i32) -> bool {
        self.0
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Adds `delta` and returns the value before the addition.
    #[inline]
    pub fn fetch_add(&self, delta: i32) -> i32 {
        self.0.fetch_add(delta, Ordering::AcqRel)
    }

    /// Decrements unless the count is zero, returning the value observed
    /// before the decrement (so `0` means nothing was changed).
    ///
    /// A negative count is still decremented; only zero is a floor.
    pub fn decrement_unless_zero(&self) -> i32 {
        loop {
            let c = self.get();
            if c == 0 || self.compare_and_swap(c, c - 1) {
                return c;
            }
        }
    }
}
