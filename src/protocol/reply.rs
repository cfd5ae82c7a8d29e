//! Wire Replies
//!
//! This module defines the responses linekv sends back to clients.
//! The protocol is line oriented: every reply is one or more text lines,
//! each terminated with CRLF (`\r\n`).
//!
//! ## Reply Shapes
//!
//! Value: `$<value>\r\n`
//! Not found: `$-1\r\n`
//! Status: `+OK\r\n`
//! Error: `-ERR <message>\r\n`
//! Integer: `:<n>\r\n`
//! Expire ack: `$:1\r\n`
//! Key listing: one `"<key>"\r\n` line per key, then a `-1\r\n` sentinel
//! Range: `<member>\r\n<score>\r\n` pairs, scores formatted with no decimals
//! Sentinel: `-1\r\n` alone, marking an empty or unknown range

use std::fmt;

/// The CRLF terminator used on every reply line.
pub const CRLF: &[u8] = b"\r\n";

/// A response to a single command.
///
/// Replies are built by the command handler and serialized by the
/// connection handler just before writing to the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Successful write acknowledgement. Format: `+OK\r\n`
    Ok,

    /// A string value, as returned by GET. Format: `$<value>\r\n`
    Value(String),

    /// Key absent or expired. Format: `$-1\r\n`
    NotFound,

    /// A signed integer, used for counts and TTLs. Format: `:<n>\r\n`
    Integer(i64),

    /// The EXPIRE acknowledgement. Format: `$:1\r\n`
    ///
    /// The leading `$` is part of the historical wire format and is kept
    /// for compatibility with existing clients.
    ExpireAck,

    /// A key listing: each key quoted on its own line, closed by the
    /// `-1\r\n` sentinel. An empty listing is the sentinel alone.
    Keys(Vec<String>),

    /// A sorted-set range: member and score on alternating lines.
    /// A successful range carries no trailing sentinel.
    Range(Vec<(String, f64)>),

    /// The bare `-1\r\n` sentinel, answering a range that resolved empty
    /// or named an unknown sorted set.
    Sentinel,

    /// An error line. Format: `-ERR <message>\r\n`
    Error(String),
}

impl Reply {
    /// Creates an error reply. The `ERR ` prefix is added at serialization.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Ok => {
                buf.extend_from_slice(b"+OK");
                buf.extend_from_slice(CRLF);
            }
            Reply::Value(value) => {
                buf.push(b'$');
                buf.extend_from_slice(value.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::NotFound => {
                buf.extend_from_slice(b"$-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::ExpireAck => {
                buf.extend_from_slice(b"$:1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Keys(keys) => {
                for key in keys {
                    buf.push(b'"');
                    buf.extend_from_slice(key.as_bytes());
                    buf.push(b'"');
                    buf.extend_from_slice(CRLF);
                }
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Range(entries) => {
                for (member, score) in entries {
                    buf.extend_from_slice(member.as_bytes());
                    buf.extend_from_slice(CRLF);
                    buf.extend_from_slice(format!("{score:.0}").as_bytes());
                    buf.extend_from_slice(CRLF);
                }
            }
            Reply::Sentinel => {
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(message) => {
                buf.extend_from_slice(b"-ERR ");
                buf.extend_from_slice(message.as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns true if this reply is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.serialize()))
    }
}
