use crate::{Result, state::Shared};
use std::sync::Arc;

/// Producer-side handle over one stream.
///
/// A `Context` is created for exactly one producer invocation and passed to
/// the producer closure by [`Trough::spawn`]. It is the only way to publish
/// into the stream: it is not `Clone`, every publishing method takes `&mut
/// self`, and the launching code never hands out a second one, which is what
/// enforces the single-writer invariant statically.
///
/// Dropping the `Context` — whether the producer returned normally or
/// unwound — signals completion unconditionally, so a producer that forgets
/// to call [`end`] (or panics halfway) can never leave a consumer blocked
/// forever.
///
/// # Example
///
/// ```
/// use trough::Trough;
///
/// let stream = Trough::spawn(|ctx| {
///     ctx.begin(2).unwrap();
///     ctx.push("a");
///     ctx.push_with(|| "b");
///     ctx.end();
/// });
/// assert_eq!(stream.iter().copied().collect::<Vec<_>>(), ["a", "b"]);
/// ```
///
/// [`Trough::spawn`]: crate::Trough::spawn
/// [`end`]: Context::end
pub struct Context<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Context<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        #[cfg(feature = "tracing")]
        tracing::trace!("producer started");
        Self { shared }
    }

    /// Declares the final number of items this producer will publish.
    ///
    /// Optional, but when declared it lets [`Trough::size`] report a stable
    /// upper bound before production completes. May be called at most once,
    /// and only before the first [`push`].
    ///
    /// # Errors
    /// - [`Error::CapacityAlreadyDeclared`] if a capacity was already declared
    /// - [`Error::CapacityAfterPublish`] if an item was already published
    ///
    /// A rejected call leaves the stream's counters untouched.
    ///
    /// [`Trough::size`]: crate::Trough::size
    /// [`push`]: Context::push
    /// [`Error::CapacityAlreadyDeclared`]: crate::Error::CapacityAlreadyDeclared
    /// [`Error::CapacityAfterPublish`]: crate::Error::CapacityAfterPublish
    pub fn begin(&mut self, n: usize) -> Result<()> {
        self.shared.declare_capacity(n)
    }

    /// Publishes one item, waking a blocked consumer if there is one.
    ///
    /// Publishing after [`end`] is a producer contract violation: consumers
    /// that already observed exhaustion must never see the stream reopen.
    /// It trips a debug assertion.
    ///
    /// [`end`]: Context::end
    pub fn push(&mut self, value: T) {
        self.shared.append_with(|| value);
    }

    /// Publishes one item built in place, under the stream's lock.
    ///
    /// Useful when constructing the value is cheap but moving it twice is
    /// not, or when construction should be deferred until the slot is
    /// actually being written.
    pub fn push_with(&mut self, make: impl FnOnce() -> T) {
        self.shared.append_with(make);
    }

    /// Publishes a batch of items under a single lock acquisition, then wakes
    /// every blocked consumer.
    pub fn push_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.shared.append_all(items);
    }

    /// Marks production as logically finished.
    ///
    /// Idempotent. The producer body may keep running after `end` (cleanup,
    /// unrelated work), but must not publish again: exhaustion is permanent
    /// once a consumer has observed it, so a late publish trips a debug
    /// assertion. Omitting `end` entirely is allowed: completion also fires
    /// when the producer invocation returns.
    pub fn end(&mut self) {
        self.shared.complete();
    }

    /// Returns whether the consumer side has requested cancellation.
    ///
    /// Non-blocking and cheap enough to poll every loop iteration.
    /// Cancellation is cooperative only: nothing forcibly interrupts a
    /// producer that never polls.
    ///
    /// # Example
    ///
    /// ```
    /// use trough::Trough;
    ///
    /// let stream = Trough::spawn(|ctx| {
    ///     for i in 0..u64::MAX {
    ///         if ctx.cancel_requested() {
    ///             break;
    ///         }
    ///         ctx.push(i);
    ///     }
    /// });
    /// stream.cancel();
    /// // Consumers drain whatever was published and terminate.
    /// let drained = stream.iter().count();
    /// assert_eq!(drained, stream.current());
    /// ```
    pub fn cancel_requested(&self) -> bool {
        self.shared.is_cancelled()
    }
}

impl<T> Drop for Context<T> {
    fn drop(&mut self) {
        // Runs on the producer thread when the invocation returns or unwinds.
        if std::thread::panicking() {
            self.shared.mark_panicked();
            #[cfg(feature = "tracing")]
            tracing::warn!("producer panicked");
        }
        self.shared.complete();
        #[cfg(feature = "tracing")]
        tracing::trace!("producer finished");
    }
}
