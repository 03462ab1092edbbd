use std::collections::HashMap;

use crate::protocol::ProtocolError;
use crate::protocol::codec::{split_cstrings, until_nul};
use crate::protocol::message::Message;

/// Ensures that the message has at least `n` bytes.
/// Returns `ProtocolError::Truncated` if not.
macro_rules! ensure_len {
    ($msg:expr, $n:expr) => {
        if $msg.len() < $n {
            return Err(ProtocolError::Truncated {
                needed: $n,
                actual: $msg.len(),
            });
        }
    };
}

/// Protocol version carried by an untyped startup packet.
///
/// Besides real versions, the same slot carries the request codes for
/// SSL, GSSAPI encryption and query cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    /// Protocol 3.0, the only real version spoken by current clients.
    pub const V3_0: Self = Self::new(3, 0);
    /// SSLRequest code (80877103)
    pub const SSL_REQUEST: Self = Self::new(1234, 5679);
    /// GSSENCRequest code (80877104)
    pub const GSSENC_REQUEST: Self = Self::new(1234, 5680);
    /// CancelRequest code (80877102)
    pub const CANCEL_REQUEST: Self = Self::new(1234, 5678);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Startup parameters from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupParameters(HashMap<String, String>);

impl StartupParameters {
    /// Pairs a flat list of strings into parameters: even entries are names,
    /// odd entries their values. An unpaired trailing name is dropped.
    pub fn from_flat(strings: Vec<String>) -> Self {
        let mut params = HashMap::with_capacity(strings.len() / 2);
        let mut iter = strings.into_iter();
        while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
            params.insert(name, value);
        }
        Self(params)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn user(&self) -> Option<&str> {
        self.get("user")
    }

    pub fn database(&self) -> Option<&str> {
        self.get("database")
    }

    pub fn application_name(&self) -> Option<&str> {
        self.get("application_name")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StartupParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Offset of the protocol version inside an untyped message.
const VERSION_OFFSET: usize = 4;

/// Offset of the parameter list (or cancel key data) inside an untyped message.
const BODY_OFFSET: usize = 8;

/// Offset of the payload inside a typed message (tag + length).
const TYPED_PAYLOAD_OFFSET: usize = 5;

/// Startup-phase field access.
impl Message {
    fn ensure_untyped(&self) -> Result<(), ProtocolError> {
        match self.type_byte() {
            0 => Ok(()),
            tag => Err(ProtocolError::NotUntyped(tag)),
        }
    }

    /// Reads the protocol version (or request code) of a startup packet.
    pub fn version(&self) -> Result<ProtocolVersion, ProtocolError> {
        self.ensure_untyped()?;
        ensure_len!(self, BODY_OFFSET);

        let bytes = self.as_bytes();
        let major = u16::from_be_bytes([bytes[VERSION_OFFSET], bytes[VERSION_OFFSET + 1]]);
        let minor = u16::from_be_bytes([bytes[VERSION_OFFSET + 2], bytes[VERSION_OFFSET + 3]]);
        Ok(ProtocolVersion::new(major, minor))
    }

    /// Parses the name/value list that follows the version in a startup packet.
    ///
    /// Scanning is lenient: a missing final terminator or an odd number of
    /// strings simply drops the incomplete tail.
    pub fn startup_parameters(&self) -> Result<StartupParameters, ProtocolError> {
        self.ensure_untyped()?;
        ensure_len!(self, BODY_OFFSET);

        let strings = split_cstrings(&self.as_bytes()[BODY_OFFSET..]);
        Ok(StartupParameters::from_flat(strings))
    }

    /// Extracts the password from a PasswordMessage ('p').
    ///
    /// Untyped messages are accepted as well since they belong to the same
    /// startup exchange. The payload is read from offset 5 up to the first
    /// NUL or the end of the message.
    pub fn password(&self) -> Result<String, ProtocolError> {
        match self.type_byte() {
            0 | b'p' => {}
            found => return Err(ProtocolError::UnexpectedType { found }),
        }
        ensure_len!(self, TYPED_PAYLOAD_OFFSET);

        let payload = until_nul(&self.as_bytes()[TYPED_PAYLOAD_OFFSET..]);
        Ok(String::from_utf8_lossy(payload).into_owned())
    }

    pub fn is_tls_request(&self) -> bool {
        matches!(self.version(), Ok(ProtocolVersion::SSL_REQUEST))
    }

    pub fn is_gss_encryption_request(&self) -> bool {
        matches!(self.version(), Ok(ProtocolVersion::GSSENC_REQUEST))
    }

    pub fn is_cancel_request(&self) -> bool {
        matches!(self.version(), Ok(ProtocolVersion::CANCEL_REQUEST))
    }

    /// 'X' - Termination
    pub fn is_terminate(&self) -> bool {
        self.type_byte() == b'X'
    }

    /// Reads the (process id, secret key) pair of a CancelRequest.
    pub fn cancel_key_data(&self) -> Result<(i32, i32), ProtocolError> {
        if !self.is_cancel_request() {
            return Err(ProtocolError::NotCancelRequest);
        }
        ensure_len!(self, BODY_OFFSET + 8);

        let bytes = &self.as_bytes()[BODY_OFFSET..BODY_OFFSET + 8];
        let process_id = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let secret_key = i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok((process_id, secret_key))
    }
}
