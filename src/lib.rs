//! # linekv - An In-Memory Key-Value Store with a Line Protocol
//!
//! linekv is a small in-memory key-value server speaking a plain-text,
//! line-oriented TCP protocol: string values with optional expiry and
//! simple sorted sets.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            linekv                              │
//! │                                                                │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐    │
//! │  │ TCP Server  │───>│  Connection  │───>│ CommandHandler  │    │
//! │  │ (main.rs)   │    │   Handler    │    │ (dispatch)      │    │
//! │  └─────────────┘    └──────────────┘    └────────┬────────┘    │
//! │                                                  │             │
//! │  ┌─────────────┐                                 ▼             │
//! │  │  Tokenizer  │    ┌───────────────────────────────────────┐  │
//! │  │  + Replies  │    │                 Store                 │  │
//! │  └─────────────┘    │  strings │ expiry marks │ sorted sets │  │
//! │                     └───────────────────────────────────────┘  │
//! │                                          ▲                     │
//! │                     ┌────────────────────┴──────────────────┐  │
//! │                     │            ExpirySweeper              │  │
//! │                     │        (background tokio task)        │  │
//! │                     └───────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! One command per input line; replies are CRLF-terminated text lines:
//!
//! ```text
//! > SET name ferris
//! +OK
//! > GET name
//! $ferris
//! > SET session token EX 60
//! +OK
//! > TTL session
//! :59
//! > ZADD board 1 alice 2 bob
//! :2
//! > ZRANGE board 0 -1
//! alice
//! 1
//! bob
//! 2
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key` / `SET key value [EX seconds]` / `DEL key [key ...]`
//! - `EXPIRE key seconds` / `TTL key`
//! - `KEYS pattern` (restricted `*` / `?` matching)
//! - `ZADD key score member [score member ...]` / `ZRANGE key start end`
//! - `QUIT` closes the connection
//!
//! ## Design Highlights
//!
//! ### One Lock, Every Operation
//!
//! All three key spaces sit behind a single mutex and every store
//! operation takes it, reads included, because GET evicts the expired
//! entries it finds. No operation observes the maps half-updated.
//!
//! ### Lazy + Swept Expiry
//!
//! Expiry marks are absolute deadlines kept beside the values. A due key
//! is deleted either by the next GET that touches it, or by a background
//! sweeper task that retires unread marks. A plain SET clears the key's
//! mark, so a stale deadline can never destroy newer data.
//!
//! ## Module Overview
//!
//! - [`protocol`]: line tokenizers and the `Reply` wire format
//! - [`storage`]: the store, the key matcher, and the expiry sweeper
//! - [`commands`]: command dispatch and validation
//! - [`connection`]: per-client connection handling

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Reply, split_plain, split_quoted};
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, KeyPattern, Store};

/// The port linekv listens on. Fixed at build time; there is no CLI or
/// environment configuration.
pub const DEFAULT_PORT: u16 = 6379;

/// The host linekv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
