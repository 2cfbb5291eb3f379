//! Line transports for outgoing commands.
//!
//! The session writes one command per line and never reads through the
//! transport; output lines are pushed into the session by whoever owns the
//! debugger's stdout.
use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

/// Sink for outgoing command lines.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one line. The implementation appends the newline.
    async fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Transport over any async writer, typically the debugger's stdin.
pub struct WriterTransport<W> {
    writer: Mutex<W>,
}

impl<W> WriterTransport<W> {
    /// Wrap `writer`; concurrent writes are serialized line by line.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Transport for WriterTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }
}

/// Transport that forwards lines to an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver that observes its lines.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn write_line(&self, line: &str) -> io::Result<()> {
        self.tx
            .send(line.to_string())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "transport channel closed"))
    }
}
