//! Error types for stream configuration.
//!
//! The only recoverable error surface is producer-side configuration misuse:
//! a capacity may be declared at most once, and only before the first item is
//! published. Everything else — producer panics, cancellation — is reported
//! through the stream's terminal flags rather than as errors.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for `trough`.
#[derive(Clone, Copy, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// `begin` was called after a capacity had already been declared.
    #[error("capacity already declared for this stream")]
    CapacityAlreadyDeclared,

    /// `begin` was called after one or more items had been published.
    #[error("capacity declared after items were published")]
    CapacityAfterPublish,
}
