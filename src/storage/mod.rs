//! Storage Module
//!
//! The core of linekv: a shared in-memory store holding three key spaces
//! (string values, expiry marks, sorted sets) behind one lock, plus the
//! background sweeper that retires expired entries nobody reads.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Store                     │
//! │   Mutex ─┬─ strings: key -> value            │
//! │          ├─ marks:   key -> deadline         │
//! │          └─ sets:    key -> member -> score  │
//! └──────────────────────────────────────────────┘
//!                        ▲
//!                        │ sweep_expired()
//!           ┌────────────┴────────────┐
//!           │      ExpirySweeper      │
//!           │ (background tokio task) │
//!           └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use linekv::storage::Store;
//! use std::time::Duration;
//!
//! let store = Store::new();
//! store.set("name".into(), "ferris".into());
//! assert_eq!(store.get("name"), Some("ferris".to_string()));
//!
//! store.set_with_ttl("session".into(), "token".into(), Duration::from_secs(60));
//! assert!(store.ttl("session").is_some());
//! ```

pub mod expiry;
pub mod pattern;
pub mod store;

// Re-export commonly used types
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
pub use pattern::KeyPattern;
pub use store::Store;
