//! Cognode Graph - the per-session node store
//!
//! Each session owns one `GraphStore`. It is a plain in-memory map with no
//! locking and no I/O; the session that owns it is its only writer.

mod store;

pub use store::{GraphError, GraphStore};
