//! The canonical semantic status vocabulary shared by every resource
//! handler and adapter.
//!
//! Handlers never speak CoAP: they succeed with a value or fail with one
//! of these statuses, and only the dispatcher translates to response
//! codes. The original C client declared this enum twice with different
//! capitalisation; there is exactly one here.

use thiserror::Error;

/// Semantic failure statuses of handlers and device adapters.
///
/// Success is the `Ok` arm of [`HandlerResult`], not a variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreStatus {
    /// The operation was accepted and completes asynchronously; the
    /// dispatcher suspends the response until the completion fires.
    #[error("operation in flight")]
    AsyncInFlight,

    /// Unspecified failure.
    #[error("general failure")]
    General,

    /// A value fell outside its permitted range.
    #[error("value out of range")]
    IncorrectRange,

    /// The target is declared but has no implementation behind it.
    #[error("not yet implemented")]
    NotImplemented,

    /// The operation is not supported on this target.
    #[error("operation not supported")]
    OpNotSupported,

    /// The caller passed a malformed argument.
    #[error("invalid argument")]
    InvalidArg,

    /// The operation is legal but not in the current state.
    #[error("invalid state")]
    InvalidState,

    /// A buffer or stored value exceeded its size bound.
    #[error("overflow")]
    Overflow,

    /// The request repeats work already done; treated as success.
    #[error("already processed")]
    AlreadyProcessed,
}

/// Result type of resource handlers and device adapters.
pub type HandlerResult<T> = std::result::Result<T, CoreStatus>;
