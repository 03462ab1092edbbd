//! TCP server for PostgreSQL-compatible connections.
//!
//! This module provides the network layer that accepts client connections
//! and drives each one through the startup handshake.
//!
//! ## Architecture
//!
//! ```text
//! +--------+
//! | Server |  <- Accepts TCP connections, stops after the first capture
//! +--------+
//!      |
//!      v
//! +---------+     +----------------+
//! | Session | --> | CredentialSink |  <- Receives user/password/database
//! +---------+     +----------------+
//! ```
//!
//! ## Terminology
//!
//! - **Server**: TCP listener that spawns sessions
//! - **Session**: Per-client handshake ending in a synthetic error
//! - **Capture**: The credentials a client offered, handed to the sink

pub mod capture;
pub mod listener;
pub mod session;

pub use capture::{CredentialSink, Credentials, MemorySink, TracingSink};
pub use listener::{Server, listen};
pub use session::{Phase, Session, SessionError};
