use crate::protocol::Framing;

/// Where a session is in the startup handshake.
///
/// There is no authenticated or serving phase: every handshake that gets
/// past the password ends in a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first startup packet (or an SSL/GSSENC/Cancel request).
    AwaitingStartup,
    /// Encryption was declined, waiting for the client to resend startup in cleartext.
    AwaitingCleartextStartup,
    /// Startup consumed and cleartext password requested.
    AwaitingPassword,
    /// Terminal: the client was sent authentication success and then an error.
    Rejected,
}

impl Phase {
    /// Framing rule for reads made in this phase.
    pub fn framing(self) -> Framing {
        match self {
            Phase::AwaitingStartup | Phase::AwaitingCleartextStartup => Framing::Untyped,
            Phase::AwaitingPassword | Phase::Rejected => Framing::Typed,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::AwaitingStartup => "awaiting startup",
            Phase::AwaitingCleartextStartup => "awaiting cleartext startup",
            Phase::AwaitingPassword => "awaiting password",
            Phase::Rejected => "rejected",
        };
        f.write_str(name)
    }
}
