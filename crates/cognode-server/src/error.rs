use cognode_model::ModelCallError;
use std::net::SocketAddr;
use thiserror::Error;

/// Failures while answering a question. Each one becomes an `error` event;
/// none of them ends the session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("model call failed")]
    Model(#[from] ModelCallError),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("websocket error")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
