use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};

use crate::server::capture::CredentialSink;
use crate::server::session::Session;

/// TCP server speaking the startup half of the PostgreSQL wire protocol.
///
/// Every accepted connection gets its own [`Session`] task. The first
/// session that completes without error stops the accept loop; sessions
/// already in flight are left to finish on their own.
pub struct Server {
    listener: TcpListener,
    sink: Arc<dyn CredentialSink>,
    stop: CancellationToken,
}

impl Server {
    /// Creates a new server with a given listener and credential sink.
    pub fn new(listener: TcpListener, sink: Arc<dyn CredentialSink>) -> Self {
        Self {
            listener,
            sink,
            stop: CancellationToken::new(),
        }
    }

    /// Binds a listener on `addr`.
    pub async fn bind<A: ToSocketAddrs>(addr: A, sink: Arc<dyn CredentialSink>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, sink))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Token that stops the accept loop when cancelled.
    ///
    /// Cancelling more than once is harmless, so concurrent sessions may all
    /// report success.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Accepts connections until a session succeeds or the stop token is
    /// cancelled, then drops the listener.
    ///
    /// Returns an error only if accepting itself fails.
    pub async fn serve(self) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "server started");

        loop {
            let (socket, peer_addr) = tokio::select! {
                biased;
                _ = self.stop.cancelled() => return Ok(()),
                accepted = self.listener.accept() => accepted?,
            };

            let sink = self.sink.clone();
            let stop = self.stop.clone();
            let span = info_span!("session", client_addr = %peer_addr);

            tokio::spawn(
                async move {
                    match Session::new(socket, sink).run().await {
                        Ok(()) => {
                            info!("session successfully processed, time to stop listening");
                            stop.cancel();
                        }
                        Err(e) if e.is_fault() => {
                            info!(error = %e, "failed to process session");
                        }
                        Err(e) => {
                            debug!(error = %e, "client sent cancel request");
                        }
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// Binds `addr` and serves until the first successful capture.
pub async fn listen<A: ToSocketAddrs>(addr: A, sink: Arc<dyn CredentialSink>) -> io::Result<()> {
    Server::bind(addr, sink).await?.serve().await
}
