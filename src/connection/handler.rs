//! Connection Handler
//!
//! One task per connected client, looping read -> dispatch -> write until
//! the client disconnects, an I/O error occurs, or the client sends the
//! literal line `QUIT`.
//!
//! ## Buffer Management
//!
//! TCP is a stream: a read may deliver half a line or several lines at
//! once. Incoming bytes accumulate in a `BytesMut` buffer and complete
//! lines are carved off the front, so pipelined commands in one packet
//! are each answered in order. A client that never sends a newline is cut
//! off at `MAX_BUFFER_SIZE`.
//!
//! Transport errors terminate the task quietly. The peer observes the
//! disconnect; other connections and the store are unaffected.

use crate::commands::CommandHandler;
use crate::protocol::Reply;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shares the store with every connection)
    commands: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        commands: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            commands,
            stats,
        }
    }

    /// Runs the connection to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-dispatch-write loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(line) = self.next_line() {
                let line = line.trim();
                trace!(client = %self.addr, line = %line, "Received command");

                // QUIT closes the connection before dispatch, with no
                // goodbye line
                if line == "QUIT" {
                    return Ok(());
                }

                let reply = self.commands.execute(line);
                self.stats.command_processed();
                self.send_reply(&reply).await?;
            }

            // No complete line buffered, read from the socket
            self.read_more_data().await?;
        }
    }

    /// Carves the next newline-terminated line off the front of the
    /// buffer, if one is complete.
    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line = self.buffer.split_to(pos + 1);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial line left in the buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Writes one reply and flushes it. Best effort, no retry.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Stream ended with a partial line still buffered
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection to completion.
///
/// Convenience wrapper for the accept loop: builds a `ConnectionHandler`
/// and swallows the routine disconnect errors.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, commands, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Arc<Store>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Store::new());
        let stats = Arc::new(ConnectionStats::new());

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let commands = CommandHandler::new(Arc::clone(&store_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, commands, stats));
            }
        });

        (addr, store, stats)
    }

    async fn read_reply(client: &mut TcpStream) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn set_then_get_over_the_wire() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SET name ferris\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"+OK\r\n");

        client.write_all(b"GET name\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"$ferris\r\n");

        client.write_all(b"GET missing\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn quoted_set_value_round_trips() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"SET greeting \"hello world\"\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client).await, b"+OK\r\n");

        client.write_all(b"GET greeting\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"$hello world\r\n");
    }

    #[tokio::test]
    async fn unknown_and_empty_commands_keep_the_connection_open() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"FOO\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"-ERR Unknown command 'FOO'\r\n");

        client.write_all(b"\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"-ERR Empty Command\r\n");

        // Still alive after both errors
        client.write_all(b"SET k v\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"+OK\r\n");
    }

    #[tokio::test]
    async fn quit_closes_without_a_goodbye() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"QUIT\n").await.unwrap();

        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn pipelined_commands_are_answered_in_order() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"SET k1 v1\nSET k2 v2\nGET k1\nGET k2\n")
            .await
            .unwrap();

        // Expected: +OK\r\n+OK\r\n$v1\r\n$v2\r\n (22 bytes)
        let mut buf = vec![0u8; 256];
        let mut total = 0;
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(2);

        while total < 22 && tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                client.read(&mut buf[total..]),
            )
            .await
            {
                Ok(Ok(n)) if n > 0 => total += n,
                _ => break,
            }
        }

        assert_eq!(&buf[..total], b"+OK\r\n+OK\r\n$v1\r\n$v2\r\n");
    }

    #[tokio::test]
    async fn zadd_and_zrange_over_the_wire() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"ZADD board 2 bob 1 alice\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b":2\r\n");

        client.write_all(b"ZRANGE board 0 -1\n").await.unwrap();
        assert_eq!(
            read_reply(&mut client).await,
            b"alice\r\n1\r\nbob\r\n2\r\n"
        );

        client.write_all(b"ZRANGE board 5 10\n").await.unwrap();
        assert_eq!(read_reply(&mut client).await, b"-1\r\n");
    }

    #[tokio::test]
    async fn two_clients_share_one_store() {
        let (addr, _, _) = create_test_server().await;

        let mut writer = TcpStream::connect(addr).await.unwrap();
        writer.write_all(b"SET shared yes\n").await.unwrap();
        assert_eq!(read_reply(&mut writer).await, b"+OK\r\n");

        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"GET shared\n").await.unwrap();
        assert_eq!(read_reply(&mut reader).await, b"$yes\r\n");
    }

    #[tokio::test]
    async fn concurrent_writers_lose_no_updates() {
        let (addr, store, _) = create_test_server().await;

        let mut tasks = Vec::new();
        for t in 0..4 {
            tasks.push(tokio::spawn(async move {
                let mut client = TcpStream::connect(addr).await.unwrap();
                for i in 0..50 {
                    let cmd = format!("SET key-{t}-{i} v\n");
                    client.write_all(cmd.as_bytes()).await.unwrap();
                    let mut buf = [0u8; 16];
                    let n = client.read(&mut buf).await.unwrap();
                    assert_eq!(&buf[..n], b"+OK\r\n");
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len(), 200);
    }

    #[tokio::test]
    async fn connection_stats_track_lifecycle() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"SET k v\n").await.unwrap();
        let _ = read_reply(&mut client).await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        drop(client);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
