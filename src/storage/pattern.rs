//! Key Pattern Matcher
//!
//! A restricted matcher for the KEYS command. This is deliberately NOT
//! standard glob matching: callers depend on the exact two-pointer walk
//! described below, which gives `*` different results from conventional
//! glob whenever it appears anywhere but as a no-op.
//!
//! ## Algorithm
//!
//! Pattern and key are walked together, one byte position each:
//!
//! - `?`, or a byte equal to the current key byte, consumes one position
//!   from both sides. The equality check runs first, so a literal `*` in
//!   the key can be matched by a `*` in the pattern.
//! - `*` consumes one key byte and stays put, unless the pattern byte
//!   directly after the `*` equals the current key byte, in which case the
//!   walk steps past the `*` without consuming from the key.
//! - Anything else fails immediately.
//!
//! A match requires both pattern and key to be exhausted together. Note
//! that a trailing `*` can therefore never be stepped past, so patterns
//! like `a*` match nothing; `KEYS` special-cases the lone `*` pattern
//! before ever consulting this matcher.

/// A compiled key pattern for the restricted matcher.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    pattern: String,
}

impl KeyPattern {
    /// Creates a pattern. No compilation happens; the walk is direct.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
        }
    }

    /// Runs the two-pointer walk against a literal key.
    pub fn matches(&self, key: &str) -> bool {
        let pattern = self.pattern.as_bytes();
        let key = key.as_bytes();

        let (mut i, mut j) = (0, 0);
        while i < pattern.len() && j < key.len() {
            if pattern[i] == b'?' || pattern[i] == key[j] {
                i += 1;
                j += 1;
            } else if pattern[i] == b'*' {
                if i + 1 < pattern.len() && pattern[i + 1] == key[j] {
                    i += 1;
                } else {
                    j += 1;
                }
            } else {
                return false;
            }
        }

        i == pattern.len() && j == key.len()
    }
}
