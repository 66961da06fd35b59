use crate::conn::SessionState;
use thiserror::Error;

/// A list specifying categories of [`PgError`](crate::PgError).
///
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PgError {
    /// The server requested an authentication mode this client does not support;
    /// only trust ("no authentication") connections are possible.
    #[error("Authentication mode {0} is not supported")]
    AuthenticationNotSupported(u32),

    /// A server message violated the wire framing
    /// (bad length field, truncated payload, broken NUL framing).
    #[error("Malformed server message: {0}")]
    MalformedFrame(String),

    /// A row projection was requested although no buffer format is established.
    #[error("No buffer format is established; run a query first")]
    NoBufferFormat,

    /// A public operation was invoked from a state in which it is not allowed.
    /// The session state is left unchanged.
    #[error("Operation {operation} is not allowed in state {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the session was in.
        state: SessionState,
    },

    /// Pop on an empty queue.
    #[error("Attempt to pop empty {0} queue")]
    QueueEmpty(&'static str),

    /// The server sent a message code this implementation does not recognize.
    #[error("Cannot handle server message with code {:#04x}", _0)]
    UnknownMessageCode(u8),

    /// Error occured in communication with the server.
    #[error(transparent)]
    Io {
        /// The causing Error.
        #[from]
        source: std::io::Error,
    },

    /// Error caused by wrong usage.
    #[error("Wrong usage: {}", _0)]
    Usage(&'static str),
}

/// Abbreviation of `Result<T, PgError>`.
pub type PgResult<T> = std::result::Result<T, PgError>;

impl PgError {
    /// True if the error invalidates the session.
    ///
    /// After a fatal error the transport is closed and the session is back in
    /// [`SessionState::NotConnected`](crate::SessionState::NotConnected).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationNotSupported(_)
                | Self::MalformedFrame(_)
                | Self::UnknownMessageCode(_)
                | Self::Io { .. }
        )
    }
}
