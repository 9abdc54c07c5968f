use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use pokebat_protocol::{MAX_LINE_BYTES, ServerMessage};
use thiserror::Error;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("connection closed by peer")]
    Closed,

    #[error("no input within {0:?}")]
    Timeout(Duration),

    #[error("line longer than {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Newline-framed text connection owned by exactly one session
pub struct Connection<S = TcpStream> {
    stream: BufReader<S>,
    peer: String,
    read_timeout: Option<Duration>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>, read_timeout: Option<Duration>) -> Self {
        Self {
            stream: BufReader::new(stream),
            peer: peer.into(),
            read_timeout,
        }
    }

    /// Peer label used in logs
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Read the next line, trimmed of surrounding whitespace.
    ///
    /// A line may be at most `MAX_LINE_BYTES` long. A final line without a
    /// terminator is returned as-is; the read after it reports `Closed`.
    pub async fn read_line(&mut self) -> Result<String, ConnectionError> {
        // Room for "\r\n" on a line of exactly MAX_LINE_BYTES
        let limit = (MAX_LINE_BYTES + 2) as u64;
        let mut buf = Vec::new();

        let read = {
            let mut limited = (&mut self.stream).take(limit);
            let pending = limited.read_until(b'\n', &mut buf);
            match self.read_timeout {
                Some(deadline) => tokio::time::timeout(deadline, pending)
                    .await
                    .map_err(|_| ConnectionError::Timeout(deadline))??,
                None => pending.await?,
            }
        };

        if read == 0 {
            return Err(ConnectionError::Closed);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > MAX_LINE_BYTES {
            return Err(ConnectionError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }

        let line = String::from_utf8(buf).map_err(|_| ConnectionError::InvalidUtf8)?;
        tracing::trace!(peer = %self.peer, line = %line, "received");
        Ok(line.trim().to_string())
    }

    /// Write one protocol line
    pub async fn send(&mut self, message: &ServerMessage) -> Result<(), ConnectionError> {
        self.send_raw(&message.to_wire_format()).await
    }

    /// Write raw text followed by a newline
    pub async fn send_raw(&mut self, text: &str) -> Result<(), ConnectionError> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Send a prompt and wait for the reply line
    pub async fn prompt(&mut self, message: &ServerMessage) -> Result<String, ConnectionError> {
        self.send(message).await?;
        self.read_line().await
    }

    /// Drop whatever the peer already sent without waiting for more.
    ///
    /// Returns the number of bytes dropped, or `Closed` once the peer has
    /// gone away.
    pub async fn discard_pending(&mut self) -> Result<usize, ConnectionError> {
        let mut discarded = 0;
        loop {
            let available = std::future::poll_fn(|cx| {
                match Pin::new(&mut self.stream).poll_fill_buf(cx) {
                    Poll::Ready(Ok(buf)) => Poll::Ready(Some(Ok(buf.len()))),
                    Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
                    Poll::Pending => Poll::Ready(None),
                }
            })
            .await;

            match available {
                None => break,
                Some(Ok(0)) => return Err(ConnectionError::Closed),
                Some(Ok(n)) => {
                    self.stream.consume(n);
                    discarded += n;
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }

        if discarded > 0 {
            tracing::debug!(peer = %self.peer, bytes = discarded, "dropped unprompted input");
        }
        Ok(discarded)
    }

    /// Resolve once the peer is gone, dropping anything it sends meanwhile.
    ///
    /// No read timeout applies. Cancel-safe: input that arrives after the
    /// future is dropped stays buffered.
    pub async fn closed(&mut self) -> ConnectionError {
        loop {
            let n = match self.stream.fill_buf().await {
                Ok(buf) => buf.len(),
                Err(e) => return e.into(),
            };
            if n == 0 {
                return ConnectionError::Closed;
            }
            self.stream.consume(n);
        }
    }

    /// Flush and shut down the write side
    pub async fn shutdown(&mut self) -> Result<(), ConnectionError> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}
