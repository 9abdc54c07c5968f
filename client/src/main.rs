use anyhow::{Context, Result, bail};
use clap::Parser;
use pokebat_client::{Client, ClientCommand, Credentials, next_message};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// Terminal client for the Pokebat battle server
#[derive(Parser, Debug)]
#[command(name = "pokebat-client")]
#[command(about = "Log in and battle on a Pokebat server", long_about = None)]
#[command(version)]
struct Args {
    /// Server address
    #[arg(long, env = "POKEBAT_SERVER", default_value = "127.0.0.1:8081")]
    server: String,

    /// Account name; asked for when missing
    #[arg(long)]
    name: Option<String>,

    /// Account password; asked for when missing
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let name = match args.name {
        Some(name) => name,
        None => ask(&mut stdin, "Name: ").await?,
    };
    let password = match args.password {
        Some(password) => password,
        None => ask(&mut stdin, "Password: ").await?,
    };

    let mut client = Client::connect(&args.server).await?;
    if !client.login(&Credentials::new(name, password)).await? {
        bail!("Login refused");
    }

    let (mut reader, mut writer) = client.into_split();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            incoming = next_message(&mut reader) => {
                let Some(incoming) = incoming? else {
                    tracing::info!("server closed the connection");
                    break;
                };
                println!("{}", incoming.line);
                if incoming.message.is_terminal() {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => writer.send(&ClientCommand::Raw(line.trim().to_string())).await?,
                    None => stdin_open = false,
                }
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        tracing::debug!(error = %e, "shutdown failed");
    }
    Ok(())
}

async fn ask(stdin: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    match stdin.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => bail!("stdin closed"),
    }
}
