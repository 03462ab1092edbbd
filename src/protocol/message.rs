use bytes::Bytes;

/// Framing rule for the next frame read from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Int32 length (inclusive of itself) followed by the body.
    /// Only used for the startup packet and its TLS/cancel variants.
    Untyped,
    /// Byte1 type tag, then Int32 length (inclusive of itself, not the tag),
    /// then the body.
    Typed,
}

/// One complete protocol unit, as it appeared on the wire.
///
/// The bytes are kept exactly as framed, so for an untyped message offset 0
/// is the length field while for a typed message offset 0 is the tag. All
/// field accessors gate on [`Message::is_typed`] before reading at fixed
/// offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Bytes,
    typed: bool,
}

impl Message {
    /// Wraps a length-prefixed frame that has no type tag.
    pub fn untyped(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            typed: false,
        }
    }

    /// Wraps a frame whose first byte is its type tag.
    pub fn typed(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            typed: true,
        }
    }

    pub fn is_typed(&self) -> bool {
        self.typed
    }

    /// Returns the type tag, or 0 for untyped messages.
    pub fn type_byte(&self) -> u8 {
        if self.typed {
            self.bytes.first().copied().unwrap_or(0)
        } else {
            0
        }
    }

    /// The value of the Int32 length field, if the message is long enough to
    /// carry one.
    pub fn declared_len(&self) -> Option<u32> {
        let offset = self.length_offset();
        let field = self.bytes.get(offset..offset + 4)?;
        Some(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
    }

    pub(crate) fn length_offset(&self) -> usize {
        if self.typed { 1 } else { 0 }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
