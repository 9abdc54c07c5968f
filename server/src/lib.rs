//! Pokebat battle server: login, roster selection, matchmaking and battles
//! over newline-delimited TCP.
//!
//! Every accepted connection gets its own task that authenticates the
//! player and settles a roster. Ready sessions go to a single matchmaker
//! task that pairs them in arrival order and spawns one task per battle.

pub mod arena;
mod attempts;
pub mod auth;
pub mod config;
pub mod connection;
pub mod lobby;
pub mod selection;
pub mod stores;

use std::net::SocketAddr;
use std::sync::Arc;

use pokebat_battle::{BattleConfig, Creature, Pokedex};
use pokebat_protocol::ServerMessage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;

pub use arena::{BattleOutcome, run_battle};
pub use config::{Config, SessionSettings};
pub use connection::{Connection, ConnectionError};
pub use lobby::{Matchmaker, ReadySession, SessionLease, SessionPhase, SessionRegistry};
pub use selection::SelectionError;
pub use stores::{AccountStore, PlayerDataStore, StoreError};

/// Sessions that may wait for the matchmaker at once
const READY_QUEUE: usize = 64;

/// Read-only state shared by every task
#[derive(Debug)]
pub struct ServerContext {
    pub pokedex: Pokedex,
    pub accounts: AccountStore,
    pub player_data: PlayerDataStore,
    pub settings: SessionSettings,
    pub battle: BattleConfig,
    pub registry: SessionRegistry,
}

impl ServerContext {
    pub fn new(
        pokedex: Pokedex,
        accounts: AccountStore,
        player_data: PlayerDataStore,
        settings: SessionSettings,
        battle: BattleConfig,
    ) -> Self {
        Self {
            pokedex,
            accounts,
            player_data,
            settings,
            battle,
            registry: SessionRegistry::new(),
        }
    }
}

pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    pub async fn bind(addr: impl ToSocketAddrs, context: ServerContext) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            context: Arc::new(context),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        let (ready, matchmaker) = lobby::queue(READY_QUEUE);
        tokio::spawn(run_matchmaker(matchmaker, Arc::clone(&self.context)));

        tracing::info!(addr = %self.local_addr()?, "listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(peer = %peer, error = %e, "could not set TCP_NODELAY");
            }
            tracing::info!(peer = %peer, "accepted connection");

            let read_timeout = self.context.settings.read_timeout;
            let conn = Connection::new(stream, peer.to_string(), read_timeout);
            tokio::spawn(handle_connection(
                conn,
                Arc::clone(&self.context),
                ready.clone(),
            ));
        }
    }
}

/// Pair ready sessions and start a battle task for each pair
pub async fn run_matchmaker<S>(mut matchmaker: Matchmaker<S>, context: Arc<ServerContext>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    while let Some((first, second)) = matchmaker.next_pair().await {
        let config = context.battle;
        let max_attempts = context.settings.max_attempts;

        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            match run_battle(first, second, config, max_attempts, &mut rng).await {
                Ok(outcome) => tracing::debug!(?outcome, "battle task done"),
                Err(e) => tracing::error!(error = %e, "could not start battle"),
            }
        });
    }
    tracing::info!("matchmaker stopped");
}

/// Take a connection from login to the matchmaking queue.
///
/// Failures end the connection here; nothing is queued for them.
pub async fn handle_connection<S>(
    mut conn: Connection<S>,
    context: Arc<ServerContext>,
    ready: mpsc::Sender<ReadySession<S>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut phase = SessionPhase::Connected;

    let (lease, roster) = match prepare(&mut conn, &context, &mut phase).await {
        Ok(Some(prepared)) => prepared,
        Ok(None) => {
            tracing::info!(peer = %conn.peer(), "login refused, closing");
            return;
        }
        Err(e) => {
            tracing::info!(peer = %conn.peer(), phase = %phase, error = %e, "connection ended");
            return;
        }
    };

    if let Err(e) = conn.send(&ServerMessage::WaitingForOpponent).await {
        tracing::info!(peer = %conn.peer(), player = %lease.name(), error = %e, "connection ended");
        return;
    }

    let player = lease.name().to_string();
    let session = ReadySession { lease, roster, conn };
    if ready.send(session).await.is_err() {
        tracing::warn!(player = %player, "matchmaker is gone, dropping session");
    }
}

/// Authenticate, then restore or select a roster
async fn prepare<S>(
    conn: &mut Connection<S>,
    context: &ServerContext,
    phase: &mut SessionPhase,
) -> Result<Option<(SessionLease, Vec<Creature>)>, SelectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(lease) = auth::authenticate(conn, &context.accounts, &context.registry).await? else {
        return Ok(None);
    };
    *phase = SessionPhase::Authenticated;
    tracing::info!(peer = %conn.peer(), player = %lease.name(), "authenticated");

    let size = context.settings.roster_size;
    let restored = auth::restore_roster(lease.name(), &context.player_data, &context.pokedex, size);

    let roster = match restored {
        Some(roster) => {
            let names = roster.iter().map(|c| c.name.clone()).collect();
            conn.send(&ServerMessage::RosterRestored { names }).await?;
            tracing::info!(player = %lease.name(), "restored saved roster");
            roster
        }
        None => {
            *phase = SessionPhase::RosterSelection;
            selection::select_roster(conn, &context.pokedex, size, context.settings.max_attempts)
                .await?
        }
    };

    *phase = SessionPhase::WaitingForOpponent;
    Ok(Some((lease, roster)))
}
