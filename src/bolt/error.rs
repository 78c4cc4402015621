//! Wire-level error types.

use std::fmt;
use std::io;

use super::packstream::PackStreamError;

/// Result type for wire operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Errors raised while moving bytes and messages over a connection.
#[derive(Debug)]
pub enum BoltError {
    /// Socket failure
    Io(io::Error),

    /// Malformed PackStream data
    PackStream(PackStreamError),

    /// Well-formed data that violates the protocol
    Protocol(String),

    /// Server accepted none of the proposed versions
    NoCommonVersion,

    /// Reassembled message larger than the decoder accepts
    MessageTooLarge { size: usize, max: usize },

    /// Peer closed the stream
    ConnectionClosed,
}

impl fmt::Display for BoltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltError::Io(e) => write!(f, "I/O error: {}", e),
            BoltError::PackStream(e) => write!(f, "PackStream error: {}", e),
            BoltError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            BoltError::NoCommonVersion => write!(f, "Server supports none of the proposed Bolt versions"),
            BoltError::MessageTooLarge { size, max } => {
                write!(f, "Message too large: {} bytes (max: {})", size, max)
            }
            BoltError::ConnectionClosed => write!(f, "Connection closed by peer"),
        }
    }
}

impl BoltError {
    /// True when the byte stream itself can no longer be trusted.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            BoltError::PackStream(_)
                | BoltError::Protocol(_)
                | BoltError::NoCommonVersion
                | BoltError::MessageTooLarge { .. }
        )
    }
}

impl std::error::Error for BoltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoltError::Io(e) => Some(e),
            BoltError::PackStream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Io(err)
    }
}

impl From<PackStreamError> for BoltError {
    fn from(err: PackStreamError) -> Self {
        BoltError::PackStream(err)
    }
}
