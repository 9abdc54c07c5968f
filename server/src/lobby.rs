//! Session bookkeeping before a battle: login leases and FIFO pairing

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use pokebat_battle::Creature;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::connection::Connection;

/// How far a connection got before it was handed to the matchmaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connected,
    Authenticated,
    RosterSelection,
    WaitingForOpponent,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Connected => "connected",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::RosterSelection => "roster_selection",
            SessionPhase::WaitingForOpponent => "waiting_for_opponent",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Names currently logged in; one live session per account
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, or `None` if another session holds it
    pub fn claim(&self, name: &str) -> Option<SessionLease> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(name.to_string()) {
            return None;
        }
        Some(SessionLease {
            name: name.to_string(),
            registry: self.clone(),
        })
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(name))
            .unwrap_or(false)
    }

    fn release(&self, name: &str) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(name);
    }
}

/// Held for the lifetime of a session; releases the name on drop
#[derive(Debug)]
pub struct SessionLease {
    name: String,
    registry: SessionRegistry,
}

impl SessionLease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}

/// An authenticated session with a finished roster
pub struct ReadySession<S = tokio::net::TcpStream> {
    pub lease: SessionLease,
    pub roster: Vec<Creature>,
    pub conn: Connection<S>,
}

impl<S> ReadySession<S> {
    pub fn name(&self) -> &str {
        self.lease.name()
    }
}

/// FIFO matchmaker: pairs ready sessions in arrival order
pub struct Matchmaker<S = tokio::net::TcpStream> {
    incoming: mpsc::Receiver<ReadySession<S>>,
    waiting: Option<ReadySession<S>>,
}

/// Create the queue that connection tasks push ready sessions into
pub fn queue<S>(capacity: usize) -> (mpsc::Sender<ReadySession<S>>, Matchmaker<S>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        tx,
        Matchmaker {
            incoming: rx,
            waiting: None,
        },
    )
}

impl<S> Matchmaker<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wait for the next two live sessions. `None` once every sender is gone.
    ///
    /// The waiting session's connection is watched while it waits. A player
    /// who disconnects leaves the queue, which releases their login. Both
    /// sessions are checked again right before pairing.
    ///
    /// An odd session left when the queue closes stays in `waiting`.
    pub async fn next_pair(&mut self) -> Option<(ReadySession<S>, ReadySession<S>)> {
        loop {
            let Some(waiting) = self.waiting.as_mut() else {
                let session = self.incoming.recv().await?;
                if let Some(pair) = self.admit(session).await {
                    return Some(pair);
                }
                continue;
            };

            let event = tokio::select! {
                arrived = self.incoming.recv() => Ok(arrived),
                gone = waiting.conn.closed() => Err(gone),
            };

            match event {
                Ok(Some(session)) => {
                    if let Some(pair) = self.admit(session).await {
                        return Some(pair);
                    }
                }
                Ok(None) => return None,
                Err(reason) => {
                    if let Some(gone) = self.waiting.take() {
                        tracing::info!(
                            player = %gone.name(),
                            reason = %reason,
                            "left the queue"
                        );
                    }
                }
            }
        }
    }

    /// Pair `session` with the waiting one, or make it the waiting one
    async fn admit(
        &mut self,
        mut session: ReadySession<S>,
    ) -> Option<(ReadySession<S>, ReadySession<S>)> {
        if let Err(e) = session.conn.discard_pending().await {
            tracing::info!(player = %session.name(), error = %e, "left before pairing");
            return None;
        }

        let Some(mut first) = self.waiting.take() else {
            tracing::debug!(player = %session.name(), "waiting for an opponent");
            self.waiting = Some(session);
            return None;
        };

        if let Err(e) = first.conn.discard_pending().await {
            tracing::info!(player = %first.name(), error = %e, "left before pairing");
            tracing::debug!(player = %session.name(), "waiting for an opponent");
            self.waiting = Some(session);
            return None;
        }

        tracing::info!(
            p1 = %first.name(),
            p2 = %session.name(),
            "paired players"
        );
        Some((first, session))
    }

    /// Name of the session waiting for an opponent, if any
    pub fn waiting(&self) -> Option<&str> {
        self.waiting.as_ref().map(ReadySession::name)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{DuplexStream, duplex};

    use super::*;

    fn session(
        registry: &SessionRegistry,
        name: &str,
    ) -> (ReadySession<DuplexStream>, DuplexStream) {
        let (client, server) = duplex(1024);
        let session = ReadySession {
            lease: registry.claim(name).unwrap(),
            roster: Vec::new(),
            conn: Connection::new(server, name, None),
        };
        (session, client)
    }

    #[test]
    fn test_registry_single_login() {
        let registry = SessionRegistry::new();

        let lease = registry.claim("ash").unwrap();
        assert_eq!(lease.name(), "ash");
        assert!(registry.is_active("ash"));
        assert!(registry.claim("ash").is_none());

        drop(lease);
        assert!(!registry.is_active("ash"));
        assert!(registry.claim("ash").is_some());
    }

    #[tokio::test]
    async fn test_pairs_in_arrival_order() {
        let registry = SessionRegistry::new();
        let (tx, mut matchmaker) = queue(8);

        let mut clients = Vec::new();
        for name in ["ash", "misty", "brock"] {
            let (s, c) = session(&registry, name);
            clients.push(c);
            tx.send(s).await.unwrap();
        }

        let (p1, p2) = matchmaker.next_pair().await.unwrap();
        assert_eq!(p1.name(), "ash");
        assert_eq!(p2.name(), "misty");

        drop(tx);
        // brock has nobody to play
        assert!(matchmaker.next_pair().await.is_none());
        assert_eq!(matchmaker.waiting(), Some("brock"));
    }

    #[tokio::test]
    async fn test_disconnected_waiter_leaves_queue() {
        let registry = SessionRegistry::new();
        let (tx, mut matchmaker) = queue(8);

        let (ash, ash_client) = session(&registry, "ash");
        tx.send(ash).await.unwrap();
        drop(ash_client);

        let (misty, _misty_client) = session(&registry, "misty");
        let (brock, _brock_client) = session(&registry, "brock");
        tx.send(misty).await.unwrap();
        tx.send(brock).await.unwrap();

        let (p1, p2) = matchmaker.next_pair().await.unwrap();
        assert_eq!(p1.name(), "misty");
        assert_eq!(p2.name(), "brock");
        assert!(!registry.is_active("ash"));
        assert!(registry.claim("ash").is_some());
    }

    #[tokio::test]
    async fn test_dead_arrival_is_not_paired() {
        let registry = SessionRegistry::new();
        let (tx, mut matchmaker) = queue(8);

        let (ash, _ash_client) = session(&registry, "ash");
        let (misty, misty_client) = session(&registry, "misty");
        let (brock, _brock_client) = session(&registry, "brock");
        drop(misty_client);
        for s in [ash, misty, brock] {
            tx.send(s).await.unwrap();
        }

        let (p1, p2) = matchmaker.next_pair().await.unwrap();
        assert_eq!(p1.name(), "ash");
        assert_eq!(p2.name(), "brock");
        assert!(!registry.is_active("misty"));
    }
}
