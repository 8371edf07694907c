mod connection_string;
mod protocol;

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use replay_api::{BoxFuture, ConnectionInfo, Connector, ErrorKind, PublishError, PublishHandle};

pub use connection_string::ConnectionString;
use protocol::{AttachFrame, encode_line, exchange};

// ═══════════════════════════════════════════════════════════════
//  Config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct TcpPublisherConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Максимальный размер payload в байтах; больше — Fatal без I/O.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_ack_timeout_ms() -> u64 {
    5_000
}
fn default_max_message_size() -> usize {
    1024 * 1024
}

impl Default for TcpPublisherConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl TcpPublisherConfig {
    fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Connector
// ═══════════════════════════════════════════════════════════════

/// Line-protocol publisher over TCP: attach once, then one payload line
/// per record, each acknowledged by one reply line.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: TcpPublisherConfig,
}

impl TcpConnector {
    pub fn new(config: TcpPublisherConfig) -> Self {
        Self { config }
    }
}

impl Connector for TcpConnector {
    fn connect<'a>(
        &'a self,
        info: &'a ConnectionInfo,
    ) -> BoxFuture<'a, Result<Box<dyn PublishHandle>, PublishError>> {
        Box::pin(async move {
            let cs = ConnectionString::parse(&info.connection_string)?;
            let mut handle = TcpPublishHandle {
                cs,
                stream: info.stream.clone(),
                config: self.config.clone(),
                conn: None,
                buf: Vec::with_capacity(8192),
                closed: false,
            };
            handle.conn = Some(handle.open().await?);
            Ok(Box::new(handle) as Box<dyn PublishHandle>)
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Publish handle
// ═══════════════════════════════════════════════════════════════

pub struct TcpPublishHandle {
    cs: ConnectionString,
    stream: String,
    config: TcpPublisherConfig,
    conn: Option<BufReader<TcpStream>>,
    buf: Vec<u8>,
    closed: bool,
}

impl TcpPublishHandle {
    /// TCP connect + attach. Errors: `Connect`, `Auth`.
    async fn open(&mut self) -> Result<BufReader<TcpStream>, PublishError> {
        let addr = &self.cs.addr;
        let socket = tokio::time::timeout(self.config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| {
                PublishError::connect(format!(
                    "TCP connect to {addr}: timed out after {}ms",
                    self.config.connect_timeout_ms
                ))
            })?
            .map_err(|e| PublishError::connect(format!("TCP connect to {addr}: {e}")))?;
        socket.set_nodelay(true).ok();
        let mut conn = BufReader::new(socket);

        let attach = AttachFrame::new(&self.stream, self.cs.key_name.as_deref(), self.cs.key.as_deref());
        self.buf.clear();
        serde_json::to_writer(&mut self.buf, &attach)?;
        self.buf.push(b'\n');

        let reply = exchange(&mut conn, &self.buf, self.config.ack_timeout())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Auth => e,
                _ => PublishError::connect(format!("attach to {addr}: {e}")),
            })?;
        reply.into_attach_result()?;

        tracing::info!(addr = %addr, stream = %self.stream, "tcp publisher attached");
        Ok(conn)
    }

    /// Reconnect after a dropped connection. A refused attach mid-run is
    /// fatal; an unreachable endpoint is transient.
    async fn ensure_connected(&mut self) -> Result<(), PublishError> {
        if self.conn.is_some() {
            return Ok(());
        }
        tracing::info!(addr = %self.cs.addr, "reconnecting");
        let conn = self.open().await.map_err(|e| match e.kind() {
            ErrorKind::Auth => PublishError::fatal(format!("re-attach rejected: {e}")),
            _ => PublishError::transient(e.message()),
        })?;
        self.conn = Some(conn);
        Ok(())
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), PublishError> {
        if self.closed {
            return Err(PublishError::fatal("publish on closed handle"));
        }
        if payload.len() > self.config.max_message_size {
            return Err(PublishError::fatal(format!(
                "message too large: {}B exceeds limit of {}B",
                payload.len(),
                self.config.max_message_size
            )));
        }
        if payload.contains(&b'\n') {
            return Err(PublishError::fatal("payload contains a newline"));
        }

        self.ensure_connected().await?;

        self.buf.clear();
        encode_line(payload, &mut self.buf);

        let Some(conn) = self.conn.as_mut() else {
            return Err(PublishError::transient("not connected"));
        };
        let reply = match exchange(conn, &self.buf, self.config.ack_timeout()).await {
            Ok(reply) => reply,
            Err(e) => {
                // stream state is unknown (a late ack would desync it), start over
                tracing::warn!(addr = %self.cs.addr, error = ?e, "send error, dropping connection");
                self.conn = None;
                return Err(e);
            }
        };
        reply.into_publish_result()
    }
}

impl PublishHandle for TcpPublishHandle {
    fn publish<'a>(&'a mut self, payload: &'a [u8]) -> BoxFuture<'a, Result<(), PublishError>> {
        Box::pin(self.send(payload))
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), PublishError>> {
        Box::pin(async move {
            self.closed = true;
            if let Some(mut conn) = self.conn.take() {
                conn.flush().await?;
                conn.shutdown().await?;
                tracing::info!(addr = %self.cs.addr, "tcp publisher closed");
            }
            Ok(())
        })
    }

    fn peer_info(&self) -> String {
        format!("tcp://{}", self.cs.addr)
    }
}
