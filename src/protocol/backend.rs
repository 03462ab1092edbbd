use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::codec::{MessageCodec, put_cstring};
use crate::protocol::error::ErrorFields;
use crate::protocol::message::Message;
use crate::protocol::types::{AuthCode, DEFAULT_SEVERITY, ErrorFieldCode, sql_state};
use crate::protocol::ProtocolError;

/// Messages sent by the backend (server) to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// 'S' / 'N' - Single-byte answer to an SSLRequest or GSSENCRequest
    SslResponse { accepted: bool },
    /// 'R' - AuthenticationCleartextPassword
    AuthenticationCleartextPassword,
    /// 'R' - Authentication response (AuthenticationOk)
    AuthenticationOk,
    /// 'K' - Backend key data for cancel requests
    BackendKeyData { process_id: i32, secret_key: i32 },
    /// 'E' - Error response
    ErrorResponse { fields: Vec<ErrorField> },
}

impl BackendMessage {
    /// Builds an `ErrorResponse` from any value exposing [`ErrorFields`].
    ///
    /// Severity, SQLSTATE and message are always present. Detail and hint
    /// are included only when non-empty, position only when non-negative.
    pub fn error<E: ErrorFields + ?Sized>(err: &E) -> Self {
        let severity = err
            .severity()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SEVERITY);
        let code = err
            .code()
            .filter(|c| !c.is_empty())
            .unwrap_or(sql_state::INTERNAL_ERROR);

        let mut fields = vec![
            ErrorField::new(ErrorFieldCode::Severity, severity),
            ErrorField::new(ErrorFieldCode::SqlState, code),
            ErrorField::new(ErrorFieldCode::Message, err.to_string()),
        ];
        if let Some(detail) = err.detail().filter(|d| !d.is_empty()) {
            fields.push(ErrorField::new(ErrorFieldCode::Detail, detail));
        }
        if let Some(hint) = err.hint().filter(|h| !h.is_empty()) {
            fields.push(ErrorField::new(ErrorFieldCode::Hint, hint));
        }
        if let Some(position) = err.position().filter(|p| *p >= 0) {
            fields.push(ErrorField::new(ErrorFieldCode::Position, position.to_string()));
        }

        BackendMessage::ErrorResponse { fields }
    }

    /// Serializes this message onto the end of `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            BackendMessage::SslResponse { accepted } => {
                dst.put_u8(if *accepted { b'S' } else { b'N' });
            }
            BackendMessage::AuthenticationCleartextPassword => {
                dst.put_u8(b'R');
                dst.put_i32(8); // length
                dst.put_i32(AuthCode::CleartextPassword.as_i32());
            }
            BackendMessage::AuthenticationOk => {
                dst.put_u8(b'R');
                dst.put_i32(8); // length
                dst.put_i32(AuthCode::Ok.as_i32());
            }
            BackendMessage::BackendKeyData {
                process_id,
                secret_key,
            } => {
                dst.put_u8(b'K');
                dst.put_i32(12); // length
                dst.put_i32(*process_id);
                dst.put_i32(*secret_key);
            }
            BackendMessage::ErrorResponse { fields } => {
                dst.put_u8(b'E');
                let body_len: usize =
                    fields.iter().map(|f| 1 + f.value.len() + 1).sum::<usize>() + 1;
                dst.put_i32((4 + body_len) as i32);
                for field in fields {
                    dst.put_u8(field.code.as_u8());
                    put_cstring(dst, &field.value);
                }
                dst.put_u8(0); // terminator
            }
        }
    }

    /// Encodes this message into a standalone [`Message`].
    pub fn to_message(&self) -> Message {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        Message::typed(buf.freeze())
    }
}

impl Encoder<BackendMessage> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: BackendMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

/// A single tagged field of an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorField {
    pub code: ErrorFieldCode,
    pub value: String,
}

impl ErrorField {
    pub fn new(code: ErrorFieldCode, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::{ErrorDescriptor, UnknownApplication};

    fn encode(msg: &BackendMessage) -> Vec<u8> {
        let mut buf = BytesMut::new();
        msg.encode(&mut buf);
        buf.to_vec()
    }

    /// Splits an encoded error response into (tag, value) pairs.
    fn error_fields(buf: &[u8]) -> Vec<(u8, String)> {
        let mut fields = Vec::new();
        let mut rest = &buf[5..];
        while rest[0] != 0 {
            let tag = rest[0];
            let end = rest.iter().position(|&b| b == 0).unwrap();
            fields.push((tag, String::from_utf8(rest[1..end].to_vec()).unwrap()));
            rest = &rest[end + 1..];
        }
        assert_eq!(rest, &[0], "field list must end with a single terminator");
        fields
    }

    #[test]
    fn test_write_ssl_response() {
        assert_eq!(encode(&BackendMessage::SslResponse { accepted: false }), b"N");
        assert_eq!(encode(&BackendMessage::SslResponse { accepted: true }), b"S");
    }

    #[test]
    fn test_write_authentication_cleartext_password() {
        let buf = encode(&BackendMessage::AuthenticationCleartextPassword);
        assert_eq!(buf, vec![b'R', 0, 0, 0, 8, 0, 0, 0, 3]);
    }

    #[test]
    fn test_write_authentication_ok() {
        let buf = encode(&BackendMessage::AuthenticationOk);
        assert_eq!(buf, vec![b'R', 0, 0, 0, 8, 0, 0, 0, 0]);
    }

    #[test]
    fn test_write_backend_key_data() {
        let buf = encode(&BackendMessage::BackendKeyData {
            process_id: 0x01020304,
            secret_key: -1,
        });
        assert_eq!(
            buf,
            vec![b'K', 0, 0, 0, 12, 1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_error_response_defaults() {
        let msg = BackendMessage::error(&ErrorDescriptor::new("boom"));
        let buf = encode(&msg);

        assert_eq!(buf[0], b'E');
        assert_eq!(
            error_fields(&buf),
            vec![
                (b'S', "ERROR".to_string()),
                (b'C', "XX000".to_string()),
                (b'M', "boom".to_string()),
            ]
        );
    }

    #[test]
    fn test_error_response_all_fields() {
        let err = ErrorDescriptor::new("syntax error")
            .with_severity("FATAL")
            .with_code("42601")
            .with_detail("near here")
            .with_hint("try again")
            .with_position(17);
        let buf = encode(&BackendMessage::error(&err));

        assert_eq!(
            error_fields(&buf),
            vec![
                (b'S', "FATAL".to_string()),
                (b'C', "42601".to_string()),
                (b'M', "syntax error".to_string()),
                (b'D', "near here".to_string()),
                (b'H', "try again".to_string()),
                (b'P', "17".to_string()),
            ]
        );
    }

    #[test]
    fn test_error_response_skips_empty_and_negative() {
        let err = ErrorDescriptor::new("oops")
            .with_code("")
            .with_detail("")
            .with_hint("")
            .with_position(-1);
        let fields = error_fields(&encode(&BackendMessage::error(&err)));

        assert_eq!(fields.len(), 3);
        assert!(fields.contains(&(b'C', "XX000".to_string())));
    }

    #[test]
    fn test_error_response_length_matches_bytes() {
        let cases = [
            ErrorDescriptor::new(""),
            ErrorDescriptor::new("unknown application"),
            ErrorDescriptor::new("ünïcödé").with_detail("d").with_position(0),
            ErrorDescriptor::new("x".repeat(1000)).with_hint("h".repeat(300)),
        ];

        for err in &cases {
            let msg = BackendMessage::error(err).to_message();
            assert_eq!(msg.type_byte(), b'E');
            assert_eq!(
                msg.declared_len(),
                Some(msg.len() as u32 - 1),
                "length mismatch for {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_application_error() {
        let buf = encode(&BackendMessage::error(&UnknownApplication));
        assert_eq!(
            error_fields(&buf),
            vec![
                (b'S', "ERROR".to_string()),
                (b'C', "XX000".to_string()),
                (b'M', "unknown application".to_string()),
            ]
        );
    }

    #[test]
    fn test_fixed_messages_are_consistent() {
        let messages = [
            BackendMessage::AuthenticationCleartextPassword,
            BackendMessage::AuthenticationOk,
            BackendMessage::BackendKeyData {
                process_id: 7,
                secret_key: 8,
            },
        ];
        for msg in &messages {
            let m = msg.to_message();
            assert_eq!(m.declared_len(), Some(m.len() as u32 - 1));
        }
    }
}
