use std::fmt;
use std::time::Duration;

use mpd_rs_protocol::{Ack, AckCode, ProtocolError};

/// Client-side error codes, numbered like the reference C client's
/// `mpd_error` so hosts can keep comparing raw codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ClientErrorCode {
    Argument = 2,
    State = 3,
    Timeout = 4,
    System = 5,
    Resolver = 6,
    Malformed = 7,
    Closed = 8,
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i32)
    }
}

/// Failures detected on this side of the socket.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Operation attempted without a live transport.
    #[error("not connected to MPD server")]
    NotConnected,

    /// Method called in the wrong connection mode (e.g. a command while a
    /// command list is open).
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Operation exceeded the configured timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// TCP or socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host name did not resolve to any address.
    #[error("failed to resolve {0:?}")]
    Resolve(String),

    /// Daemon sent something that is not valid protocol.
    #[error("malformed response: {0}")]
    Protocol(#[from] ProtocolError),

    /// Daemon sent a well-formed line in the wrong place.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Daemon closed the connection (read returned 0 bytes).
    #[error("connection closed by server")]
    Closed,
}

impl ClientError {
    pub fn code(&self) -> ClientErrorCode {
        match self {
            Self::NotConnected | Self::InvalidState { .. } => ClientErrorCode::State,
            Self::Argument(_) => ClientErrorCode::Argument,
            Self::Timeout(_) => ClientErrorCode::Timeout,
            Self::Io(_) => ClientErrorCode::System,
            Self::Resolve(_) => ClientErrorCode::Resolver,
            Self::Protocol(_) | Self::UnexpectedResponse(_) => ClientErrorCode::Malformed,
            Self::Closed => ClientErrorCode::Closed,
        }
    }

    /// True when the byte stream can no longer be trusted and the transport
    /// must be dropped.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NotConnected | Self::InvalidState { .. } | Self::Argument(_)
        )
    }
}

/// The daemon rejected a request with an `ACK` line.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("server error [{code}] {{{command}}}: {message}")]
pub struct ServerError {
    pub code: AckCode,
    pub command_index: u32,
    pub command: String,
    pub message: String,
}

impl From<Ack> for ServerError {
    fn from(ack: Ack) -> Self {
        Self {
            code: ack.code,
            command_index: ack.command_index,
            command: ack.command,
            message: ack.message,
        }
    }
}

/// Any failure of an MPD operation: either side of the socket.
#[derive(Debug, thiserror::Error)]
pub enum MpdError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl MpdError {
    /// Numeric code: the client code, or the daemon's ACK code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Client(e) => e.code() as i32,
            Self::Server(e) => e.code.code(),
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    pub(crate) fn is_fatal(&self) -> bool {
        match self {
            Self::Client(e) => e.is_fatal(),
            Self::Server(_) => false,
        }
    }
}

impl From<std::io::Error> for MpdError {
    fn from(e: std::io::Error) -> Self {
        Self::Client(ClientError::Io(e))
    }
}

impl From<ProtocolError> for MpdError {
    fn from(e: ProtocolError) -> Self {
        Self::Client(ClientError::Protocol(e))
    }
}

/// Convenience alias for `Result<T, MpdError>`.
pub type Result<T> = std::result::Result<T, MpdError>;
