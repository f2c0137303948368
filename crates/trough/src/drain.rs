use crate::state::Shared;
use core::iter::FusedIterator;

/// A per-consumer claim ticket over one stream.
///
/// Each call to [`next`] attempts to claim the next globally unclaimed item,
/// blocking cooperatively while none is ready and the stream is not yet
/// complete. All `Drain`s over the same [`Trough`] share one claim cursor:
/// the `k`-th produced item is yielded by exactly one of them, and the merged
/// yield order across every consumer equals production order.
///
/// `None` means the stream is complete and fully drained; it is permanent
/// (`Drain` is a [`FusedIterator`]), so exhaustion is terminal rather than a
/// transient "no data yet" condition.
///
/// A `Drain` is owned by one consumer thread at a time, but many may coexist:
/// sharing `&Trough` across threads and calling [`Trough::iter`] on each is
/// the intended fan-out pattern.
///
/// [`next`]: Iterator::next
/// [`Trough`]: crate::Trough
/// [`Trough::iter`]: crate::Trough::iter
pub struct Drain<'a, T> {
    shared: &'a Shared<T>,
}

impl<'a, T> Drain<'a, T> {
    pub(crate) fn new(shared: &'a Shared<T>) -> Self {
        Self { shared }
    }
}

impl<'a, T> Iterator for Drain<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.shared.claim_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // The shared claim cursor makes any lower bound stale immediately;
        // the declared capacity is the only stable bound.
        (0, self.shared.capacity())
    }
}

impl<T> FusedIterator for Drain<'_, T> {}
