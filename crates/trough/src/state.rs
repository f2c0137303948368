use crate::{Error, Result, slots::SegVec};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use parking_lot::{Condvar, Mutex};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Sentinel stored in the `capacity` mirror while no capacity is declared.
const CAPACITY_UNSET: usize = usize::MAX;

/// Claim-side bookkeeping, guarded by [`Shared::inner`].
struct Inner<T> {
    /// Append-only item storage. Slot addresses are stable, which is what
    /// makes it sound to hand `&T` out of [`Shared::claim_next`] while the
    /// producer keeps appending.
    slots: SegVec<T>,
    /// Number of slots already handed to some consumer. Always `<=
    /// slots.len()`. Every index below `claimed` was returned exactly once.
    claimed: usize,
}

/// The shared state behind one producer run: item storage, the claim cursor,
/// and the stream's terminal flags.
///
/// One `Shared` is owned by a [`Trough`] and referenced by its [`Context`]
/// and every [`Drain`]. All coordination funnels through `inner`'s lock;
/// the atomics are read-only mirrors for lock-free snapshots (`size`,
/// `current`, flag queries) and are only ever written while the lock is held,
/// except `panicked`, which is written once during producer unwind.
///
/// [`Trough`]: crate::Trough
/// [`Context`]: crate::Context
/// [`Drain`]: crate::Drain
pub(crate) struct Shared<T> {
    #[cfg(feature = "cache-padded")]
    inner: crossbeam_utils::CachePadded<Mutex<Inner<T>>>,
    #[cfg(not(feature = "cache-padded"))]
    inner: Mutex<Inner<T>>,
    /// Signaled on publish (one waiter) and on completion/cancellation (all
    /// waiters).
    ready: Condvar,
    /// Mirror of `inner.slots.len()`. Keeping the producer's hot counter on
    /// its own cache line keeps `current()` polling off the claim mutex.
    #[cfg(feature = "cache-padded")]
    produced: crossbeam_utils::CachePadded<AtomicUsize>,
    #[cfg(not(feature = "cache-padded"))]
    produced: AtomicUsize,
    /// Declared capacity, or [`CAPACITY_UNSET`].
    capacity: AtomicUsize,
    completed: AtomicBool,
    cancelled: AtomicBool,
    panicked: AtomicBool,
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            inner: crossbeam_utils::CachePadded::new(Mutex::new(Inner {
                slots: SegVec::new(),
                claimed: 0,
            })),
            #[cfg(not(feature = "cache-padded"))]
            inner: Mutex::new(Inner {
                slots: SegVec::new(),
                claimed: 0,
            }),
            ready: Condvar::new(),
            #[cfg(feature = "cache-padded")]
            produced: crossbeam_utils::CachePadded::new(AtomicUsize::new(0)),
            #[cfg(not(feature = "cache-padded"))]
            produced: AtomicUsize::new(0),
            capacity: AtomicUsize::new(CAPACITY_UNSET),
            completed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            panicked: AtomicBool::new(false),
        }
    }

    /// Records the declared final size of the stream.
    ///
    /// Rejected once a capacity is already declared or once any item has been
    /// published; a rejected call leaves every counter untouched.
    pub(crate) fn declare_capacity(&self, n: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        if self.capacity.load(Ordering::Relaxed) != CAPACITY_UNSET {
            return Err(Error::CapacityAlreadyDeclared);
        }
        if !inner.slots.is_empty() {
            return Err(Error::CapacityAfterPublish);
        }
        debug_assert_ne!(n, CAPACITY_UNSET, "capacity sentinel value");
        inner.slots.reserve(n);
        self.capacity.store(n, Ordering::Release);
        #[cfg(feature = "tracing")]
        tracing::trace!(capacity = n, "capacity declared");
        Ok(())
    }

    /// Publishes one item and wakes one blocked claimant.
    ///
    /// The value is constructed under the lock, which is what backs the
    /// in-place (`push_with`) publication form.
    pub(crate) fn append_with(&self, make: impl FnOnce() -> T) {
        let mut inner = self.inner.lock();
        debug_assert!(
            !self.completed.load(Ordering::Relaxed),
            "published after completion was signaled"
        );
        inner.slots.push(make());
        let produced = inner.slots.len();
        debug_assert!(
            produced <= self.capacity.load(Ordering::Relaxed),
            "published past the declared capacity"
        );
        self.produced.store(produced, Ordering::Release);
        #[cfg(feature = "tracing")]
        tracing::trace!(slot = produced - 1, "item published");
        drop(inner);
        self.ready.notify_one();
    }

    /// Publishes a batch under a single lock acquisition.
    pub(crate) fn append_all(&self, items: impl IntoIterator<Item = T>) {
        let mut inner = self.inner.lock();
        debug_assert!(
            !self.completed.load(Ordering::Relaxed),
            "published after completion was signaled"
        );
        for item in items {
            inner.slots.push(item);
        }
        let produced = inner.slots.len();
        debug_assert!(
            produced <= self.capacity.load(Ordering::Relaxed),
            "published past the declared capacity"
        );
        self.produced.store(produced, Ordering::Release);
        drop(inner);
        self.ready.notify_all();
    }

    /// Marks the stream complete and wakes every waiter. Idempotent; once
    /// set, `completed` never reverts.
    pub(crate) fn complete(&self) {
        let _inner = self.inner.lock();
        if self.completed.swap(true, Ordering::Release) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            produced = self.produced.load(Ordering::Relaxed),
            "stream completed"
        );
        self.ready.notify_all();
    }

    /// Requests cooperative cancellation and wakes every waiter so blocked
    /// consumers re-check promptly. Idempotent. Never un-publishes items.
    pub(crate) fn request_cancel(&self) {
        let _inner = self.inner.lock();
        if self.cancelled.swap(true, Ordering::Release) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("cancellation requested");
        self.ready.notify_all();
    }

    /// Records that the producer invocation unwound instead of returning.
    pub(crate) fn mark_panicked(&self) {
        self.panicked.store(true, Ordering::Release);
    }

    /// Claims the next globally unclaimed slot, blocking until an item is
    /// available or the stream completes.
    ///
    /// This is the single synchronization point for consumer hand-off: every
    /// slot index is granted to exactly one caller, in production order.
    /// Returns `None` once the stream is complete and fully drained, and
    /// `None` is then permanent.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub(crate) fn claim_next(&self) -> Option<&T> {
        let mut inner = self.inner.lock();
        loop {
            if inner.claimed < inner.slots.len() {
                let slot = inner.claimed;
                inner.claimed += 1;
                let ptr = inner.slots.slot_ptr(slot);
                // SAFETY: slot `slot` is initialized (`slot < len`), its
                // address never changes, and it is neither written again nor
                // dropped until `self` drops. `self` outlives the returned
                // borrow, and the claim cursor guarantees no other caller is
                // handed this slot.
                return Some(unsafe { &*ptr });
            }
            if self.completed.load(Ordering::Relaxed) {
                #[cfg(feature = "tracing")]
                tracing::trace!("stream exhausted");
                return None;
            }
            self.ready.wait(&mut inner);
        }
    }

    pub(crate) fn produced(&self) -> usize {
        self.produced.load(Ordering::Acquire)
    }

    pub(crate) fn capacity(&self) -> Option<usize> {
        match self.capacity.load(Ordering::Acquire) {
            CAPACITY_UNSET => None,
            n => Some(n),
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn is_panicked(&self) -> bool {
        self.panicked.load(Ordering::Acquire)
    }
}
