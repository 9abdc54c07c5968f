use anyhow::{Context, Result, bail};
use pokebat_protocol::{ClientCommand, MAX_LINE_BYTES};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Receiving half of a server connection
pub struct LineReader {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

/// Sending half of a server connection
pub struct LineWriter {
    write: OwnedWriteHalf,
}

/// Open a TCP connection and split it into its two halves
pub async fn connect(addr: &str) -> Result<(LineReader, LineWriter)> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;
    stream.set_nodelay(true)?;

    let (read, write) = stream.into_split();
    Ok((
        LineReader {
            lines: BufReader::new(read).lines(),
        },
        LineWriter { write },
    ))
}

impl LineReader {
    /// Next line from the server, `None` once it closed the connection
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from server")?;

        Ok(line.map(|l| l.trim_end_matches('\r').to_string()))
    }
}

impl LineWriter {
    pub async fn send(&mut self, command: &ClientCommand) -> Result<()> {
        self.send_raw(&command.to_wire_format()).await
    }

    /// Send a raw line; the server drops anything over the line limit
    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        if text.len() > MAX_LINE_BYTES {
            bail!("line is {} bytes, the limit is {}", text.len(), MAX_LINE_BYTES);
        }

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write
            .write_all(line.as_bytes())
            .await
            .context("Failed to send line")
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.write.shutdown().await.context("Failed to close connection")
    }
}
