/// Error and notice message field type codes.
/// See: https://www.postgresql.org/docs/current/protocol-error-fields.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorFieldCode {
    /// Severity: ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG
    Severity = b'S',
    /// SQLSTATE code
    SqlState = b'C',
    /// Primary human-readable error message
    Message = b'M',
    /// Optional detail message
    Detail = b'D',
    /// Optional hint message
    Hint = b'H',
    /// Error cursor position in the original query string
    Position = b'P',
}

impl ErrorFieldCode {
    /// Converts the ErrorFieldCode to a u8 value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Authentication request codes carried by 'R' messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AuthCode {
    Ok = 0,
    CleartextPassword = 3,
}

impl AuthCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// SQLSTATE codes used in error responses.
pub mod sql_state {
    pub const INTERNAL_ERROR: &str = "XX000";
}

/// Default severity for error responses.
pub const DEFAULT_SEVERITY: &str = "ERROR";
