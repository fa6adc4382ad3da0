//! MCP transport layer.
//!
//! A transport moves newline-delimited frames over a byte stream. It knows
//! nothing about JSON-RPC; the engine above it decodes the lines.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{debug, error, trace};

use crate::error::{Error, Result};

/// Line-oriented transport for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Read the next line, without its delimiter.
    ///
    /// Fails with [`Error::Eof`] once the stream is exhausted and with
    /// [`Error::ConnectionClosed`] after [`Transport::close`]. A line that is
    /// not valid UTF-8 is consumed and reported as [`Error::Decode`]; the
    /// stream stays usable.
    async fn read_line(&mut self) -> Result<String>;

    /// Write one line and flush it.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Close the transport. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Transport over any async reader/writer pair.
pub struct StreamTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    closed: bool,
}

/// Transport over the process's standard input and output.
pub type StdioTransport = StreamTransport<Stdin, Stdout>;

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport reading from `reader` and writing to `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            closed: false,
        }
    }

    /// Check if the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StdioTransport {
    /// Create a stdio transport.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<String> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("EOF on input stream");
                Err(Error::Eof)
            }
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                let line = String::from_utf8(buf).map_err(|e| {
                    Error::Decode(format!("line is not valid UTF-8: {}", e.utf8_error()))
                })?;
                trace!("Received: {}", line);
                Ok(line)
            }
            Err(e) => {
                error!("Error reading input stream: {}", e);
                Err(Error::Io(e))
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        trace!("Sending: {}", line);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.writer.shutdown().await {
            debug!("Error shutting down output stream: {}", e);
        }
        Ok(())
    }
}
