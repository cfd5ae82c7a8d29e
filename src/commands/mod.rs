//! Command Processing Module
//!
//! The dispatch layer between the connection handler and the store:
//! one input line in, one [`crate::protocol::Reply`] out.
//!
//! ```text
//! client line
//!      │
//!      ▼
//! ┌──────────────────┐
//! │  CommandHandler  │   tokenize, dispatch, validate
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │      Store       │   (storage module)
//! └──────────────────┘
//! ```
//!
//! Commands: `GET`, `SET` (with optional `EX` expiry and quoted values),
//! `DEL`, `EXPIRE`, `TTL`, `KEYS`, `ZADD`, `ZRANGE`.

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
