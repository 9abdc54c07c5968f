use anyhow::{Context, Result};
use clap::Parser;
use pokebat_battle::Pokedex;
use pokebat_server::{AccountStore, Config, PlayerDataStore, Server, ServerContext};

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run(Config::parse()).await {
        tracing::error!(error = ?e, "fatal startup error");
        std::process::exit(1);
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config) -> Result<()> {
    let pokedex = Pokedex::load(&config.pokedex)
        .with_context(|| format!("loading pokedex {}", config.pokedex.display()))?;
    let accounts = AccountStore::load(&config.accounts)
        .with_context(|| format!("loading accounts {}", config.accounts.display()))?;
    let player_data = PlayerDataStore::load_optional(&config.player_data)
        .with_context(|| format!("loading player data {}", config.player_data.display()))?;

    if pokedex.len() < config.session().roster_size {
        tracing::warn!(
            creatures = pokedex.len(),
            roster_size = config.roster_size,
            "pokedex is smaller than a roster; nobody can pick a team"
        );
    }
    tracing::info!(
        creatures = pokedex.len(),
        accounts = accounts.len(),
        saved_players = player_data.len(),
        "stores loaded"
    );

    let context = ServerContext::new(
        pokedex,
        accounts,
        player_data,
        config.session(),
        config.battle(),
    );
    let server = Server::bind(config.addr, context)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    server.run().await.context("accept loop failed")
}
