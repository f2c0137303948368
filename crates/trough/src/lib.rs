//! Cancellable single-producer / multi-consumer streaming container.
//!
//! A background thread publishes a sequence of results incrementally while
//! any number of foreground threads drain that sequence through blocking
//! iterators. Every item is delivered to exactly one consumer, in production
//! order, even when many consumers race to read concurrently.
//!
//! - [`Trough`] owns the stream: it launches the producer, exposes progress
//!   snapshots ([`Trough::size`], [`Trough::current`]), best-effort
//!   cancellation, and iterator creation.
//! - [`Context`] is the producer's handle: capacity declaration, publication,
//!   completion signaling, and cancellation polling.
//! - [`Drain`] is a per-consumer claim ticket: each `next()` claims the next
//!   globally unclaimed item or blocks until one is published.
//!
//! Completion always fires when the producer invocation returns — even if it
//! never called [`Context::end`], even if it panicked — so no consumer can
//! block forever.

mod context;
mod drain;
mod error;
mod slots;
mod state;
mod stream;

pub use crate::context::*;
pub use crate::drain::*;
pub use crate::error::*;
pub use crate::stream::*;
