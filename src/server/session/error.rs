use thiserror::Error;

use crate::protocol::ProtocolError;

/// Session error types.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport failure, including the client hanging up mid-handshake.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The client sent a frame that could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),
    /// A startup parameter required to finish the handshake was not sent.
    #[error("client doesn't send {0}")]
    MissingParameter(&'static str),
    /// The client sent a CancelRequest instead of a startup packet.
    #[error("client disconnected (cancel request for pid {process_id})")]
    Cancelled { process_id: i32, secret_key: i32 },
}

impl SessionError {
    /// Whether this error should be reported as a failed session.
    /// A cancel request is an ordinary disconnect.
    pub fn is_fault(&self) -> bool {
        !matches!(self, SessionError::Cancelled { .. })
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(e) => SessionError::Io(e),
            e => SessionError::Protocol(e),
        }
    }
}
