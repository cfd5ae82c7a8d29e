//! Line Protocol Implementation
//!
//! linekv speaks a plain-text, line-oriented protocol: one command per input
//! line, one or more CRLF-terminated lines per reply.
//!
//! ## Modules
//!
//! - `tokenizer`: splits an input line into argument tokens
//! - `reply`: the `Reply` enum and its wire serialization
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{split_plain, Reply};
//!
//! let tokens = split_plain("GET name");
//! assert_eq!(tokens, vec!["GET", "name"]);
//!
//! let response = Reply::Value("ferris".to_string());
//! assert_eq!(response.serialize(), b"$ferris\r\n");
//! ```

pub mod reply;
pub mod tokenizer;

// Re-export commonly used items for convenience
pub use reply::{Reply, CRLF};
pub use tokenizer::{split_plain, split_quoted};
