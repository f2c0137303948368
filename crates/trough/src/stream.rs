use crate::{Context, Drain, state::Shared};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A cancellable single-producer / multi-consumer streaming container.
///
/// `Trough::spawn` launches the producer closure on a dedicated background
/// thread with a [`Context`] bound to a fresh shared state. Any number of
/// foreground threads may then drain the stream through [`iter`]: each call
/// to `next()` atomically claims the next globally unclaimed item, blocking
/// (without spinning) while none is ready. Across all consumers combined,
/// claim order equals production order and every item is delivered exactly
/// once.
///
/// Completion fires when the producer calls [`Context::end`], or
/// unconditionally when the producer invocation returns or panics — whichever
/// happens first — so consumers can never block forever on a forgotten or
/// failed producer.
///
/// Dropping a `Trough` retires the stream: cancellation is requested and the
/// producer thread is joined. A producer that never polls
/// [`Context::cancel_requested`] therefore delays drop until it returns on
/// its own.
///
/// # Example
///
/// ```
/// use trough::Trough;
///
/// let stream = Trough::spawn(|ctx| {
///     ctx.begin(4).unwrap();
///     for i in 1..=4 {
///         ctx.push(i);
///     }
///     ctx.end();
/// });
///
/// # // The producer runs concurrently with `spawn` returning; wait for its
/// # // declaration to become visible before asserting on `size`.
/// # for _ in 0..1000 {
/// #     if stream.size() == 4 { break; }
/// #     std::thread::sleep(std::time::Duration::from_millis(1));
/// # }
/// // `size` reports the declared capacity even before production finishes.
/// assert_eq!(stream.size(), 4);
/// assert_eq!(stream.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4]);
///
/// // The stream is destructively shared: a second pass finds it drained.
/// assert_eq!(stream.iter().next(), None);
/// ```
///
/// [`iter`]: Trough::iter
pub struct Trough<T> {
    shared: Arc<Shared<T>>,
    producer: Option<JoinHandle<()>>,
}

impl<T> Trough<T>
where
    T: Send + 'static,
{
    /// Creates a stream and launches `producer` on a background thread.
    ///
    /// The closure receives the stream's [`Context`] and is invoked exactly
    /// once. Items it publishes become claimable immediately; consumers do
    /// not wait for the closure to return.
    pub fn spawn<F>(producer: F) -> Self
    where
        F: FnOnce(&mut Context<T>) + Send + 'static,
    {
        let shared = Arc::new(Shared::new());
        let handle = launch(Arc::clone(&shared), producer);
        Self {
            shared,
            producer: Some(handle),
        }
    }

    /// Retires the current producer and launches a new one in its place.
    ///
    /// Retirement is join-before-replace: cancellation is requested, the old
    /// producer thread is joined (completion has then fired), and only then
    /// is the new shared state installed and the new producer launched.
    /// Items left unclaimed in the old stream are discarded with it.
    ///
    /// Iterators obtained before `restart` borrow the `Trough`, so using one
    /// across a `restart` is a compile error rather than a runtime hazard.
    pub fn restart<F>(&mut self, producer: F)
    where
        F: FnOnce(&mut Context<T>) + Send + 'static,
    {
        self.retire();
        self.shared = Arc::new(Shared::new());
        self.producer = Some(launch(Arc::clone(&self.shared), producer));
    }
}

impl<T> Trough<T> {
    /// Returns the declared capacity if one was set, otherwise a snapshot of
    /// the number of items produced so far.
    ///
    /// Once a capacity has been declared, the result is a stable upper bound
    /// usable for bounds checks while production continues.
    pub fn size(&self) -> usize {
        self.shared
            .capacity()
            .unwrap_or_else(|| self.shared.produced())
    }

    /// Snapshot of the number of items produced so far.
    ///
    /// Monotonically non-decreasing; a progress counter, not a claim.
    pub fn current(&self) -> usize {
        self.shared.produced()
    }

    /// Requests cooperative cancellation of the producer.
    ///
    /// Best-effort: returns immediately, never waits for the producer to
    /// actually stop, and never discards items already produced but not yet
    /// claimed. The producer observes the request through
    /// [`Context::cancel_requested`]; blocked consumers are woken so they
    /// re-check promptly and terminate once the producer's return triggers
    /// completion.
    pub fn cancel(&self) {
        self.shared.request_cancel();
    }

    /// Whether completion has been signaled (explicitly or by producer
    /// return). Never reverts.
    pub fn is_complete(&self) -> bool {
        self.shared.is_complete()
    }

    /// Whether cancellation has been requested for the current producer run.
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Whether the producer invocation panicked instead of returning.
    ///
    /// A panicking producer still triggers completion, so consumers drain
    /// whatever was published before the panic and then terminate; this flag
    /// is how the failure stays observable afterwards.
    pub fn panicked(&self) -> bool {
        self.shared.is_panicked()
    }

    /// Returns a fresh claim ticket over this stream.
    ///
    /// Every iterator created from the same `Trough` competes for the same
    /// underlying sequence: the stream is destructively shared, not
    /// restartable per consumer.
    pub fn iter(&self) -> Drain<'_, T> {
        Drain::new(&self.shared)
    }

    /// Cancels the producer and joins its thread. A join error (the producer
    /// panicked) is already recorded in the shared state, so it is dropped
    /// here rather than resumed.
    fn retire(&mut self) {
        self.shared.request_cancel();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

impl<T> Drop for Trough<T> {
    fn drop(&mut self) {
        self.retire();
    }
}

impl<'a, T> IntoIterator for &'a Trough<T> {
    type Item = &'a T;
    type IntoIter = Drain<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn launch<T, F>(shared: Arc<Shared<T>>, producer: F) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnOnce(&mut Context<T>) + Send + 'static,
{
    std::thread::spawn(move || {
        let mut ctx = Context::new(shared);
        producer(&mut ctx);
        // `ctx` drops here — or during unwind — signaling completion either
        // way.
    })
}
