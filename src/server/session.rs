mod error;
mod state;

pub use error::SessionError;
pub use state::Phase;

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::protocol::{BackendMessage, Message, MessageCodec, StartupParameters, UnknownApplication};
use crate::server::capture::{CredentialSink, Credentials};

/// A single client session.
///
/// Walks the client through the startup handshake far enough to collect
/// its credentials, then rejects it:
///
/// 1. Read the startup packet. SSL and GSSENC requests are declined with
///    `N` and the packet re-read; a CancelRequest ends the session.
/// 2. Request a cleartext password and hand whatever comes back to the
///    [`CredentialSink`].
/// 3. Report authentication success and send backend key data.
/// 4. Fail with [`SessionError::MissingParameter`] if the client never sent
///    `application_name`, otherwise send an "unknown application" error and
///    finish cleanly.
///
/// There are no timeouts; a silent client holds its session open.
pub struct Session<S> {
    framed: Framed<S, MessageCodec>,
    phase: Phase,
    sink: Arc<dyn CredentialSink>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(stream: S, sink: Arc<dyn CredentialSink>) -> Self {
        let phase = Phase::AwaitingStartup;
        let mut codec = MessageCodec::new();
        codec.set_framing(phase.framing());
        Self {
            framed: Framed::new(stream, codec),
            phase,
            sink,
        }
    }

    /// Runs the handshake to completion.
    ///
    /// `Ok(())` means the client made it all the way to the final
    /// "unknown application" error.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let mut startup = self.read().await?;

        // libpq may try GSSAPI encryption, then SSL, before falling back to
        // cleartext. Each kind is declined at most once.
        let (mut declined_tls, mut declined_gss) = (false, false);
        loop {
            let tls = startup.is_tls_request() && !declined_tls;
            let gss = startup.is_gss_encryption_request() && !declined_gss;
            if !tls && !gss {
                break;
            }
            declined_tls |= tls;
            declined_gss |= gss;

            self.send(BackendMessage::SslResponse { accepted: false })
                .await?;
            self.transition(Phase::AwaitingCleartextStartup);
            startup = self.read().await?;
        }

        if startup.is_cancel_request() {
            // A short cancel packet is still a cancel
            let (process_id, secret_key) = startup.cancel_key_data().unwrap_or_default();
            return Err(SessionError::Cancelled {
                process_id,
                secret_key,
            });
        }

        if let Ok(version) = startup.version() {
            debug!(%version, "startup packet received");
        }
        self.transition(Phase::AwaitingPassword);
        let parameters = startup.startup_parameters().unwrap_or_default();

        self.send(BackendMessage::AuthenticationCleartextPassword)
            .await?;

        let auth = self.read().await?;
        if !parameters.is_empty() {
            self.capture(&parameters, &auth);
        }

        self.send(BackendMessage::AuthenticationOk).await?;
        self.send(BackendMessage::BackendKeyData {
            process_id: random_key(),
            secret_key: random_key(),
        })
        .await?;

        if !parameters.contains("application_name") {
            return Err(SessionError::MissingParameter("application_name"));
        }

        self.send(BackendMessage::error(&UnknownApplication)).await?;
        self.transition(Phase::Rejected);
        Ok(())
    }

    /// Reads one message using the framing of the current phase.
    async fn read(&mut self) -> Result<Message, SessionError> {
        match self.framed.next().await {
            Some(result) => Ok(result?),
            None => Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()),
        }
    }

    async fn send(&mut self, message: BackendMessage) -> Result<(), SessionError> {
        self.framed.send(message).await?;
        Ok(())
    }

    fn transition(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "session phase");
        self.phase = phase;
        self.framed.codec_mut().set_framing(phase.framing());
    }

    fn capture(&self, parameters: &StartupParameters, auth: &Message) {
        if auth.is_terminate() {
            debug!("client terminated instead of sending a password");
            return;
        }

        match auth.password() {
            Ok(password) => {
                let credentials = Credentials::new(parameters, Some(password));
                if !credentials.is_empty() {
                    self.sink.capture(&credentials);
                }
            }
            Err(e) => debug!(error = %e, "no password in authentication response"),
        }
    }
}

/// Process id / secret key for BackendKeyData. Only needs to look plausible.
fn random_key() -> i32 {
    rand::random_range(0..=i32::MAX)
}
