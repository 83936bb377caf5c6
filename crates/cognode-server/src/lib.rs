//! Cognode Server - WebSocket sessions over a cognitive graph
//!
//! Every connection gets its own session: a fresh graph, a controller that
//! turns client messages into graph mutations and model calls, and a
//! stream of events back to the client.
//!
//! The server supports:
//! - Multiple concurrent connections, each with an independent graph
//! - Plain-text questions as well as typed JSON messages
//! - Strictly ordered processing within a session

mod error;
mod protocol;
mod server;
mod session;

pub use error::{ServerError, SessionError};
pub use protocol::{GraphUpdate, InboundMessage, OutboundEvent};
pub use server::{CognodeServer, ServerConfig};
pub use session::{SessionController, SessionState};
