//! Error types for sendlater.

use thiserror::Error;

use crate::authz::Capability;

/// A `Result` alias with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sendlater operations.
///
/// Only [`Error::InvalidArguments`] crosses the method-call boundary as a
/// structured error. Everything else is caught at the boundary nearest its
/// origin and converted to a log line (see [`crate::api`]).
#[derive(Debug, Error)]
pub enum Error {
    /// The calling environment lacks an authorization capability.
    ///
    /// For [`Capability::ExactAlarm`] this is raised at scheduling time;
    /// callers are expected to run the two-phase request protocol on
    /// [`Authorization`](crate::Authorization) and retry.
    #[error("permission denied: {0} authorization missing")]
    PermissionDenied(Capability),

    /// A caller-supplied argument was missing or malformed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The telephony layer rejected the send.
    ///
    /// Raised by [`SmsSender`](crate::SmsSender) implementations. When the
    /// dispatcher hits this it records a `Failed` outcome and swallows the
    /// error; it never reaches a caller.
    #[error("platform send failure for {target:?}: {reason}")]
    SendFailure {
        /// The destination address the send was attempted against.
        target: String,
        /// Description of the rejection from the telephony layer.
        reason: String,
    },

    /// Failed to serialize or deserialize a dispatch signal.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// PostgreSQL storage error.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
}

impl Error {
    /// Create a send failure with context.
    pub fn send_failure(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SendFailure {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
