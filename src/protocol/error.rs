use thiserror::Error;

/// Protocol parsing errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A startup-only operation was applied to a typed message.
    #[error("not an untyped startup message: 0x{0:02x}")]
    NotUntyped(u8),
    /// The message carries a type tag the operation does not accept.
    #[error("unexpected message type: 0x{found:02x}")]
    UnexpectedType { found: u8 },
    #[error("message truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("not a cancel message")]
    NotCancelRequest,
    #[error("invalid message length: {0}")]
    InvalidLength(u32),
    #[error("message of {length} bytes exceeds the {max} byte limit")]
    MessageTooLarge { length: usize, max: usize },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Optional fields a value may expose when it is reported to the client
/// as an `ErrorResponse`.
///
/// Only the primary message is required. Every other accessor defaults to
/// "absent", in which case the field is left out of the encoded message
/// (severity and SQLSTATE fall back to `ERROR` / `XX000`).
pub trait ErrorFields: std::fmt::Display {
    fn severity(&self) -> Option<&str> {
        None
    }

    fn code(&self) -> Option<&str> {
        None
    }

    fn detail(&self) -> Option<&str> {
        None
    }

    fn hint(&self) -> Option<&str> {
        None
    }

    /// Cursor position. Negative values are treated as absent.
    fn position(&self) -> Option<i32> {
        None
    }
}

/// A plain error description with every field settable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub severity: Option<String>,
    pub code: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<i32>,
}

impl ErrorDescriptor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorDescriptor {}

impl ErrorFields for ErrorDescriptor {
    fn severity(&self) -> Option<&str> {
        self.severity.as_deref()
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    fn position(&self) -> Option<i32> {
        self.position
    }
}

/// The error every completed handshake ends with.
#[derive(Debug, Clone, Copy, Error)]
#[error("unknown application")]
pub struct UnknownApplication;

impl ErrorFields for UnknownApplication {
    fn code(&self) -> Option<&str> {
        Some(crate::protocol::sql_state::INTERNAL_ERROR)
    }
}
