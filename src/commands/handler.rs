//! Command Handler
//!
//! Maps one input line to one [`Reply`]: tokenize, dispatch on the
//! (case-insensitive) command name, validate arity and numeric arguments,
//! run the store operation, format the result.
//!
//! ## Supported Commands
//!
//! - `GET key`
//! - `SET key value [EX seconds]` (value may be double-quoted)
//! - `DEL key [key ...]`
//! - `EXPIRE key seconds`
//! - `TTL key`
//! - `KEYS pattern`
//! - `ZADD key score member [score member ...]`
//! - `ZRANGE key start end`
//!
//! `QUIT` is not a command: the connection handler intercepts it before
//! dispatch and closes the connection. Command failures are replies, not
//! errors; the connection stays open after an `-ERR` line.

use crate::protocol::{split_plain, split_quoted, Reply};
use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;

/// Maps a seconds argument to a TTL. Seconds are parsed as `i64`, so
/// values past the signed range fail at the parse; non-positive values
/// become a zero TTL, a mark that is due immediately.
fn seconds_to_ttl(seconds: i64) -> Duration {
    if seconds > 0 {
        Duration::from_secs(seconds as u64)
    } else {
        Duration::ZERO
    }
}

/// Executes commands against the shared store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
}

impl CommandHandler {
    /// Creates a handler over the shared store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Executes one trimmed input line and returns the reply to send.
    pub fn execute(&self, line: &str) -> Reply {
        let fields = split_plain(line);
        if fields.is_empty() {
            return Reply::error("Empty Command");
        }

        match fields[0].to_uppercase().as_str() {
            "GET" => self.cmd_get(&fields),
            // SET re-tokenizes the raw line so the value may be quoted
            "SET" => self.cmd_set(line),
            "DEL" => self.cmd_del(&fields),
            "EXPIRE" => self.cmd_expire(&fields),
            "TTL" => self.cmd_ttl(&fields),
            "KEYS" => self.cmd_keys(&fields),
            "ZADD" => self.cmd_zadd(&fields),
            "ZRANGE" => self.cmd_zrange(&fields),
            _ => Reply::error(format!("Unknown command '{}'", fields[0])),
        }
    }

    /// GET key
    fn cmd_get(&self, fields: &[&str]) -> Reply {
        if fields.len() != 2 {
            return Reply::error("wrong number of arguments for 'GET' command");
        }

        match self.store.get(fields[1]) {
            Some(value) => Reply::Value(value),
            None => Reply::NotFound,
        }
    }

    /// SET key value [EX seconds]
    fn cmd_set(&self, line: &str) -> Reply {
        let tokens = split_quoted(line);
        if tokens.len() != 3 && tokens.len() != 5 {
            return Reply::error("wrong number of arguments for 'SET' command");
        }

        let key = tokens[1].clone();
        let value = tokens[2].clone();

        if tokens.len() == 5 {
            if !tokens[3].eq_ignore_ascii_case("EX") {
                return Reply::error("syntax error");
            }
            let seconds: i64 = match tokens[4].parse() {
                Ok(s) => s,
                Err(_) => return Reply::error("Invalid expiration time"),
            };
            if !self.store.set_with_ttl(key, value, seconds_to_ttl(seconds)) {
                return Reply::error("Invalid expiration time");
            }
        } else {
            self.store.set(key, value);
        }

        Reply::Ok
    }

    /// DEL key [key ...]
    fn cmd_del(&self, fields: &[&str]) -> Reply {
        if fields.len() < 2 {
            return Reply::error("wrong number of arguments for 'DEL' command");
        }

        let deleted = self.store.delete_many(&fields[1..]);
        Reply::Integer(deleted as i64)
    }

    /// EXPIRE key seconds
    fn cmd_expire(&self, fields: &[&str]) -> Reply {
        if fields.len() != 3 {
            return Reply::error("wrong number of arguments for 'EXPIRE' command");
        }

        let seconds: i64 = match fields[2].parse() {
            Ok(s) => s,
            Err(_) => return Reply::error("invalid expire time"),
        };

        if !self.store.expire(fields[1].to_string(), seconds_to_ttl(seconds)) {
            return Reply::error("invalid expire time");
        }
        Reply::ExpireAck
    }

    /// TTL key
    fn cmd_ttl(&self, fields: &[&str]) -> Reply {
        if fields.len() != 2 {
            return Reply::error("wrong number of arguments for 'TTL' command");
        }

        match self.store.ttl(fields[1]) {
            Some(seconds) => Reply::Integer(seconds as i64),
            None => Reply::Integer(-1),
        }
    }

    /// KEYS pattern
    fn cmd_keys(&self, fields: &[&str]) -> Reply {
        if fields.len() != 2 {
            return Reply::error("wrong number of arguments for 'KEYS' command");
        }

        Reply::Keys(self.store.keys(fields[1]))
    }

    /// ZADD key score member [score member ...]
    fn cmd_zadd(&self, fields: &[&str]) -> Reply {
        if fields.len() < 4 || (fields.len() - 2) % 2 != 0 {
            return Reply::error("wrong number of arguments for 'ZADD' command");
        }

        // Validate every score before applying anything, so a bad pair
        // leaves the set untouched
        let mut pairs = Vec::with_capacity((fields.len() - 2) / 2);
        for pair in fields[2..].chunks(2) {
            let score: f64 = match pair[0].parse() {
                Ok(s) => s,
                Err(_) => return Reply::error("invalid score"),
            };
            pairs.push((score, pair[1].to_string()));
        }

        let count = self.store.zadd(fields[1], pairs);
        Reply::Integer(count as i64)
    }

    /// ZRANGE key start end
    fn cmd_zrange(&self, fields: &[&str]) -> Reply {
        if fields.len() < 4 {
            return Reply::error("wrong number of arguments for 'ZRANGE' command");
        }

        let start: i64 = match fields[2].parse() {
            Ok(n) => n,
            Err(_) => return Reply::error("invalid start index"),
        };
        let end: i64 = match fields[3].parse() {
            Ok(n) => n,
            Err(_) => return Reply::error("invalid end index"),
        };

        match self.store.zrange(fields[1], start, end) {
            Some(entries) => Reply::Range(entries),
            None => Reply::Sentinel,
        }
    }
}
