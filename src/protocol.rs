//! PostgreSQL wire protocol, startup subset.
//!
//! This module implements just enough of the PostgreSQL v3.0 wire protocol
//! to carry a client through the connection startup: framing, startup
//! packet inspection, and the handful of backend messages the handshake
//! needs. There is no query protocol.
//!
//! ## Architecture
//!
//! ```text
//! +----------+                           +----------+
//! |  Client  |  ------- Message ------>  |  Server  |
//! |  (psql)  |  <-- BackendMessage  ---  | (pglure) |
//! +----------+                           +----------+
//!               ^                   ^
//!               |   MessageCodec    |
//!               +-------------------+
//! ```
//!
//! ## Terminology
//!
//! - **Message**: one framed unit as read from the client, untyped during
//!   startup and typed (1-byte tag) afterwards
//! - **Startup packet**: the first untyped message; its version slot also
//!   carries the SSL, GSSENC and Cancel request codes
//! - **BackendMessage**: messages from server to client (Authentication, BackendKeyData, ...)
//! - **Codec**: framing for both directions

pub mod backend;
pub mod codec;
pub mod error;
pub mod message;
pub mod startup;
pub mod types;

pub use backend::{BackendMessage, ErrorField};
pub use codec::MessageCodec;
pub use error::{ErrorDescriptor, ErrorFields, ProtocolError, UnknownApplication};
pub use message::{Framing, Message};
pub use startup::{ProtocolVersion, StartupParameters};
pub use types::{AuthCode, ErrorFieldCode, sql_state};
