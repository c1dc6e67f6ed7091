use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sttrelay_asr::SharedTranscriber;
use sttrelay_transport::{Endpoint, Listener};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::handler::ConnectionHandler;

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts clients and runs one [`ConnectionHandler`] per connection.
pub struct Server {
    listener: Listener,
    config: Arc<ServerConfig>,
    transcriber: SharedTranscriber,
}

impl Server {
    /// Bind the endpoint. Must be called from within a tokio runtime.
    pub async fn bind(
        endpoint: &Endpoint,
        config: ServerConfig,
        transcriber: SharedTranscriber,
    ) -> Result<Self> {
        let listener = Listener::bind(endpoint).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            transcriber,
        })
    }

    /// The bound endpoint, with the real port when bound to port 0.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        Ok(self.listener.local_endpoint()?)
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connection failures never end the loop. Open connections are aborted
    /// on shutdown.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(open = connections.len(), "shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let client_id = Uuid::new_v4();
                        info!(%client_id, %peer, "client connected");
                        let span = info_span!("connection", %client_id, %peer);
                        let handler = ConnectionHandler::new(
                            stream,
                            Arc::clone(&self.config),
                            Arc::clone(&self.transcriber),
                            span.clone(),
                        );
                        connections.spawn(async move {
                            match handler.run().await {
                                Ok(stats) => info!(
                                    parent: &span,
                                    messages = stats.messages,
                                    utterances = stats.utterances,
                                    "client disconnected"
                                ),
                                Err(err) if err.is_protocol_error() => {
                                    debug!(parent: &span, error = %err, "connection closed")
                                }
                                Err(err) => warn!(parent: &span, error = %err, "connection closed"),
                            }
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            error!(error = %err, "connection task panicked");
                        } else {
                            debug!(error = %err, "connection task cancelled");
                        }
                    }
                }
            }
        }

        connections.shutdown().await;
        Ok(())
    }
}
