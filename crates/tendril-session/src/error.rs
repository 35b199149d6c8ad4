//! Error types for document sessions.

use tendril_codec::CodecError;

/// Error from a [`DocumentSession`](crate::DocumentSession) call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The cross-context channel cannot be constructed here.
    ///
    /// Fatal for the context that tried to open the session.
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// The session's coordinator has stopped.
    #[error("session is closed")]
    Closed,

    /// Edited presentation could not be decoded.
    #[error("failed to decode presentation")]
    Decode(#[from] CodecError),
}

/// Error from a persistence write.
///
/// Every variant drives the save coordinator to its error state.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WriteError {
    /// The request did not reach the server or failed in transit.
    #[error("network failure")]
    NetworkFailure(#[from] ureq::Error),

    /// The server answered with status >= 400.
    #[error("write rejected with HTTP {status}: {body}")]
    RejectedWrite {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// The write task stopped before reporting a result.
    #[error("write interrupted: {0}")]
    Interrupted(String),
}
