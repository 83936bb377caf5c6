//! WebSocket listener.
//!
//! Accepts connections, runs one session per connection and pipes frames
//! between the socket and the session. Reading, processing and writing are
//! separate tasks joined by channels. Frames that arrive during a model call
//! wait in a bounded queue; a client that overruns it is disconnected.

use crate::error::ServerError;
use crate::protocol::OutboundEvent;
use crate::session::SessionController;
use cognode_graph::GraphStore;
use cognode_model::ModelClient;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Where and on which path to accept sessions.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Request path clients must connect to, e.g. `/ws/chat`.
    pub path: String,
    /// Frames a session may hold while it is busy with a model call.
    pub queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            path: "/ws/chat".to_string(),
            queue_depth: 32,
        }
    }
}

/// Serves cognitive graph sessions over WebSocket.
pub struct CognodeServer {
    config: ServerConfig,
    model: Arc<dyn ModelClient>,
}

impl CognodeServer {
    pub fn new(model: Arc<dyn ModelClient>, config: ServerConfig) -> Self {
        Self { config, model }
    }

    /// Binds the configured address and serves until the process exits.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.addr,
                source,
            })?;
        self.serve(listener).await
    }

    /// Serves sessions on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener.local_addr().ok();
        info!(
            "Listening on ws://{}{}",
            local.map(|a| a.to_string()).unwrap_or_default(),
            self.config.path
        );

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let model = Arc::clone(&self.model);
            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, model, config).await {
                    warn!(peer = %peer, "Connection ended with error: {}", e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    model: Arc<dyn ModelClient>,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == config.path {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("not found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    let socket = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;

    let controller = SessionController::new(GraphStore::new(), model);
    let session_id = controller.id().to_string();
    info!(session = %session_id, peer = %peer, "Session opened");

    let (mut sink, mut source) = socket.split();
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(config.queue_depth.max(1));
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEvent>();

    let worker = tokio::spawn(controller.run(inbound_rx, outbound_tx));

    let writer_session = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(session = %writer_session, "Failed to encode event: {}", e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!(session = %writer_session, "Send failed: {}", e);
                break;
            }
        }
    });

    'read: while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(session = %session_id, "Read failed: {}", e);
                break;
            }
        };

        let text = match inbound_tx.try_send(text) {
            Ok(()) => continue,
            Err(TrySendError::Closed(_)) => break,
            Err(TrySendError::Full(text)) => text,
        };

        // Hold this one frame until the session makes room, but keep
        // watching the socket so a close is still noticed.
        loop {
            tokio::select! {
                permit = inbound_tx.reserve() => match permit {
                    Ok(permit) => {
                        permit.send(text);
                        continue 'read;
                    }
                    Err(_) => break 'read,
                },
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(_))) => {
                        warn!(
                            session = %session_id,
                            queue_depth = config.queue_depth,
                            "Inbound queue overflowed, closing session"
                        );
                        break 'read;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break 'read,
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    // The session is over; drop any in-flight model call and pending events.
    drop(inbound_tx);
    worker.abort();
    writer.abort();

    info!(session = %session_id, peer = %peer, "Session closed");
    Ok(())
}
