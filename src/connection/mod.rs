//! Connection Module
//!
//! One async task per accepted client. The accept loop in `main.rs` hands
//! each socket to [`handle_connection`], which loops:
//!
//! ```text
//! READING ──> DISPATCHING ──> WRITING ──┐
//!    ▲                                  │
//!    └──────────────────────────────────┘
//! ```
//!
//! until EOF, an I/O error, or the literal line `QUIT` closes the
//! connection. Incoming bytes accumulate in a `BytesMut` buffer so
//! pipelined commands and partial lines are handled correctly.

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
