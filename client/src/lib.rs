mod connection;

use anyhow::{Result, bail};

pub use connection::{LineReader, LineWriter};
pub use pokebat_protocol::{
    Action, AuthStatus, ClientCommand, Credentials, ServerMessage, parse_server_message,
};

/// A line from the server, raw and parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    pub line: String,
    pub message: ServerMessage,
}

/// Main Pokebat client
pub struct Client {
    reader: LineReader,
    writer: LineWriter,
}

impl Client {
    /// Connect to a Pokebat server at `host:port`
    pub async fn connect(addr: &str) -> Result<Self> {
        let (reader, writer) = connection::connect(addr).await?;
        Ok(Self { reader, writer })
    }

    /// Send credentials and wait for the verdict.
    ///
    /// Returns `false` when the server refused them; it closes the
    /// connection right after.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<bool> {
        self.writer
            .send(&ClientCommand::Login(credentials.clone()))
            .await?;

        // The verdict is the first line the server sends
        let Some(reply) = self.next_message().await? else {
            bail!("Server closed the connection during login");
        };
        match reply.message {
            ServerMessage::Auth(AuthStatus::Success) => Ok(true),
            ServerMessage::Auth(AuthStatus::Failure) => Ok(false),
            other => bail!("Unexpected login reply: {:?}", other),
        }
    }

    /// Get the next message from the server
    pub async fn next_message(&mut self) -> Result<Option<Incoming>> {
        next_message(&mut self.reader).await
    }

    pub async fn send(&mut self, command: &ClientCommand) -> Result<()> {
        self.writer.send(command).await
    }

    /// Split into halves that can be driven from separate branches
    pub fn into_split(self) -> (LineReader, LineWriter) {
        (self.reader, self.writer)
    }
}

/// Read and parse one line; unparseable lines come back as `Raw`
pub async fn next_message(reader: &mut LineReader) -> Result<Option<Incoming>> {
    let Some(line) = reader.next_line().await? else {
        return Ok(None);
    };

    let message = match parse_server_message(&line) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, line = %line, "unrecognized server line");
            ServerMessage::Raw(line.clone())
        }
    };
    Ok(Some(Incoming { line, message }))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    /// One-connection server that checks the handshake and replies `reply`
    async fn fake_server(reply: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();

            let handshake = lines.next_line().await.unwrap().unwrap();
            let credentials = Credentials::parse(&handshake).unwrap();
            assert_eq!(credentials, Credentials::new("ash", "pikachu"));

            write.write_all(reply.as_bytes()).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_login_success_then_messages() {
        let addr =
            fake_server("{\"status\":\"success\"}\nWelcome, ash!\nnot a known line\r\n").await;
        let mut client = Client::connect(&addr).await.unwrap();

        assert!(
            client
                .login(&Credentials::new("ash", "pikachu"))
                .await
                .unwrap()
        );

        let welcome = client.next_message().await.unwrap().unwrap();
        assert_eq!(
            welcome.message,
            ServerMessage::Welcome {
                name: "ash".to_string()
            }
        );

        let raw = client.next_message().await.unwrap().unwrap();
        assert_eq!(raw.line, "not a known line");
        assert_eq!(raw.message, ServerMessage::Raw("not a known line".to_string()));

        assert!(client.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_failure() {
        let addr = fake_server("{\"status\":\"failure\"}\n").await;
        let mut client = Client::connect(&addr).await.unwrap();

        assert!(
            !client
                .login(&Credentials::new("ash", "pikachu"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_line_limit_enforced_locally() {
        let addr = fake_server("").await;
        let (_reader, mut writer) = Client::connect(&addr).await.unwrap().into_split();

        let long = "x".repeat(pokebat_protocol::MAX_LINE_BYTES + 1);
        assert!(writer.send_raw(&long).await.is_err());
    }
}
