use bytes::{BufMut, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::ProtocolError;
use crate::protocol::message::{Framing, Message};

/// Maximum message size in bytes (16 MB).
/// PostgreSQL uses up to 1 GB, but 16 MB is plenty for a startup exchange.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Smallest valid untyped frame: length (4) + protocol version (4).
const MIN_UNTYPED_LENGTH: usize = 8;

/// Smallest valid typed frame length: the length field itself.
const MIN_TYPED_LENGTH: usize = 4;

/// Splits a buffer into NUL-terminated strings.
///
/// Scanning stops at the first stretch with no terminator, so a missing
/// final NUL drops the trailing bytes instead of failing. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn split_cstrings(mut buf: &[u8]) -> Vec<String> {
    let mut strings = Vec::new();
    while let Some(null_pos) = buf.iter().position(|&b| b == 0) {
        strings.push(String::from_utf8_lossy(&buf[..null_pos]).into_owned());
        buf = &buf[null_pos + 1..];
    }
    strings
}

/// Returns the bytes up to the first NUL, or the whole buffer if there is none.
pub fn until_nul(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(null_pos) => &buf[..null_pos],
        None => buf,
    }
}

/// Write a null-terminated string to a BytesMut buffer.
pub fn put_cstring(dst: &mut BytesMut, s: &str) {
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
}

/// Codec for the startup exchange of the PostgreSQL protocol.
///
/// Decodes one [`Message`] per frame using the current [`Framing`], and
/// encodes [`BackendMessage`](crate::protocol::BackendMessage)s. The framing
/// is switched by the owner once the startup packet has been consumed; bytes
/// already buffered are decoded under whichever framing is active when the
/// next frame is requested.
#[derive(Debug)]
pub struct MessageCodec {
    framing: Framing,
    pub(crate) max_message_size: usize,
}

impl MessageCodec {
    /// Creates a codec expecting an untyped startup packet.
    pub fn new() -> Self {
        Self {
            framing: Framing::Untyped,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    fn check_size(&self, length: usize) -> Result<(), ProtocolError> {
        if length > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                length,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Offset of the length field: 0 for untyped frames, 1 after a type byte
        let (offset, min_len) = match self.framing {
            Framing::Untyped => (0, MIN_UNTYPED_LENGTH),
            Framing::Typed => (1, MIN_TYPED_LENGTH),
        };

        if src.len() < offset + 4 {
            return Ok(None);
        }

        // Peek at the length (don't consume yet)
        let raw_len = u32::from_be_bytes([
            src[offset],
            src[offset + 1],
            src[offset + 2],
            src[offset + 3],
        ]);
        let len = raw_len as usize;
        if len < min_len {
            return Err(ProtocolError::InvalidLength(raw_len));
        }
        self.check_size(len)?;

        let total = offset + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total).freeze();
        Ok(Some(match self.framing {
            Framing::Untyped => Message::untyped(frame),
            Framing::Typed => Message::typed(frame),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut MessageCodec, buf: &[u8]) -> Vec<Message> {
        let mut bytes = BytesMut::from(buf);
        let mut out = Vec::new();
        while let Some(msg) = codec.decode(&mut bytes).unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_split_cstrings() {
        assert_eq!(split_cstrings(b"a\0bc\0\0"), vec!["a", "bc", ""]);
        assert_eq!(split_cstrings(b"a\0tail"), vec!["a"]);
        assert!(split_cstrings(b"").is_empty());
    }

    #[test]
    fn test_split_cstrings_invalid_utf8() {
        assert_eq!(split_cstrings(b"\xff\0"), vec!["\u{FFFD}"]);
    }

    #[test]
    fn test_until_nul() {
        assert_eq!(until_nul(b"secret\0junk"), b"secret");
        assert_eq!(until_nul(b"no-terminator"), b"no-terminator");
        assert_eq!(until_nul(b""), b"");
    }

    #[test]
    fn test_put_cstring() {
        let mut buf = BytesMut::new();
        put_cstring(&mut buf, "test");
        assert_eq!(buf, b"test\0"[..]);
    }

    #[test]
    fn test_decode_untyped() {
        let mut codec = MessageCodec::new();
        let msgs = decode_all(&mut codec, &[0, 0, 0, 8, 0, 3, 0, 0]);
        assert_eq!(msgs.len(), 1);
        assert!(!msgs[0].is_typed());
        assert_eq!(msgs[0].as_bytes(), &[0, 0, 0, 8, 0, 3, 0, 0]);
    }

    #[test]
    fn test_decode_typed() {
        let mut codec = MessageCodec::new();
        codec.set_framing(Framing::Typed);
        let msgs = decode_all(&mut codec, b"p\0\0\0\x09pass\0");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].type_byte(), b'p');
        assert_eq!(msgs[0].len(), 10);
    }

    #[test]
    fn test_decode_waits_for_complete_frame() {
        let mut codec = MessageCodec::new();
        let mut bytes = BytesMut::from(&[0, 0, 0, 12, 0, 3][..]);
        assert!(codec.decode(&mut bytes).unwrap().is_none());
        assert_eq!(bytes.len(), 6, "partial frame must stay buffered");

        bytes.extend_from_slice(&[0, 0, b'a', 0, b'b', 0]);
        let msg = codec.decode(&mut bytes).unwrap().unwrap();
        assert_eq!(msg.len(), 12);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_decode_switches_framing_between_frames() {
        let mut codec = MessageCodec::new();
        let mut bytes = BytesMut::new();
        bytes.extend_from_slice(&[0, 0, 0, 8, 0, 3, 0, 0]);
        bytes.extend_from_slice(b"X\0\0\0\x04");

        let startup = codec.decode(&mut bytes).unwrap().unwrap();
        assert!(!startup.is_typed());

        codec.set_framing(Framing::Typed);
        let terminate = codec.decode(&mut bytes).unwrap().unwrap();
        assert!(terminate.is_terminate());
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_decode_rejects_short_length() {
        let mut codec = MessageCodec::new();
        let mut bytes = BytesMut::from(&[0, 0, 0, 4][..]);
        assert!(matches!(
            codec.decode(&mut bytes),
            Err(ProtocolError::InvalidLength(4))
        ));

        codec.set_framing(Framing::Typed);
        let mut bytes = BytesMut::from(&[b'p', 0, 0, 0, 3][..]);
        assert!(matches!(
            codec.decode(&mut bytes),
            Err(ProtocolError::InvalidLength(3))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized() {
        let mut codec = MessageCodec::new();
        let mut bytes = BytesMut::from(&[0x7F, 0xFF, 0xFF, 0xFF][..]);
        assert!(matches!(
            codec.decode(&mut bytes),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }
}
