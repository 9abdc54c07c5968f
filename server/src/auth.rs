//! Login handshake and saved-roster restore

use pokebat_battle::{Creature, Pokedex};
use pokebat_protocol::{AuthStatus, Credentials, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::{Connection, ConnectionError};
use crate::lobby::{SessionLease, SessionRegistry};
use crate::stores::{AccountStore, PlayerDataStore};

/// Run the handshake on a fresh connection.
///
/// Reads one JSON credentials line. On success claims the name in the
/// registry and replies `{"status":"success"}` followed by a welcome line.
/// Malformed JSON, wrong credentials and a name that is already logged in
/// all get `{"status":"failure"}` and `Ok(None)`.
pub async fn authenticate<S>(
    conn: &mut Connection<S>,
    accounts: &AccountStore,
    registry: &SessionRegistry,
) -> Result<Option<SessionLease>, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let line = conn.read_line().await?;

    let lease = match Credentials::parse(&line) {
        Ok(credentials) if accounts.verify(&credentials) => {
            let lease = registry.claim(&credentials.name);
            if lease.is_none() {
                tracing::warn!(
                    peer = %conn.peer(),
                    player = %credentials.name,
                    "already logged in"
                );
            }
            lease
        }
        Ok(credentials) => {
            tracing::warn!(peer = %conn.peer(), player = %credentials.name, "bad credentials");
            None
        }
        Err(e) => {
            tracing::warn!(peer = %conn.peer(), error = %e, "malformed handshake");
            None
        }
    };

    match lease {
        Some(lease) => {
            conn.send(&ServerMessage::Auth(AuthStatus::Success)).await?;
            conn.send(&ServerMessage::Welcome {
                name: lease.name().to_string(),
            })
            .await?;
            Ok(Some(lease))
        }
        None => {
            conn.send(&ServerMessage::Auth(AuthStatus::Failure)).await?;
            Ok(None)
        }
    }
}

/// Rebuild a roster from the creatures a player has saved.
///
/// Save files keep every creature the player ever caught, so the roster is
/// the first `size` distinct ids the pokedex knows. Repeats and unknown ids
/// are skipped. Fewer than `size` usable ids means no restore. Stats always
/// come from the pokedex, not the save file.
pub fn restore_roster(
    player: &str,
    player_data: &PlayerDataStore,
    pokedex: &Pokedex,
    size: usize,
) -> Option<Vec<Creature>> {
    let saved = player_data.saved_roster(player)?;

    let mut picked: Vec<&str> = Vec::with_capacity(size);
    for id in saved.iter().map(|id| id.trim()) {
        if picked.len() == size {
            break;
        }
        if picked.contains(&id) {
            continue;
        }
        if pokedex.lookup(id).is_none() {
            tracing::debug!(player = %player, id = %id, "saved creature not in pokedex");
            continue;
        }
        picked.push(id);
    }

    if picked.len() < size {
        tracing::warn!(
            player = %player,
            usable = picked.len(),
            size,
            "not enough saved creatures for a roster"
        );
        return None;
    }

    match pokedex.resolve_roster(&picked, size) {
        Ok(roster) => Some(roster),
        Err(e) => {
            tracing::warn!(player = %player, error = %e, "ignoring saved roster");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pokebat_battle::Stats;
    use pokebat_protocol::parse_server_message;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex};

    use super::*;

    fn accounts() -> AccountStore {
        AccountStore::from_json(r#"[{"Name": "ash", "Password": "pikachu"}]"#).unwrap()
    }

    fn pokedex() -> Pokedex {
        Pokedex::from_creatures(
            ["1", "4", "7", "25"]
                .iter()
                .map(|id| {
                    let stats = Stats::new(50, 10, 10, 10, 10, 10);
                    Creature::new(*id, format!("Mon{}", id), stats)
                })
                .collect(),
        )
        .unwrap()
    }

    async fn handshake(
        line: &str,
        registry: &SessionRegistry,
    ) -> (Option<SessionLease>, Vec<String>) {
        let (client, server): (DuplexStream, DuplexStream) = duplex(4096);
        let mut conn = Connection::new(server, "test", None);
        let (read, mut write) = tokio::io::split(client);

        write.write_all(line.as_bytes()).await.unwrap();
        write.write_all(b"\n").await.unwrap();

        let lease = authenticate(&mut conn, &accounts(), registry).await.unwrap();
        drop(conn);

        let mut lines = BufReader::new(read).lines();
        let mut replies = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            replies.push(line);
        }
        (lease, replies)
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let registry = SessionRegistry::new();
        let (lease, replies) =
            handshake(r#"{"name":"ash","password":"pikachu"}"#, &registry).await;

        assert_eq!(lease.as_ref().map(SessionLease::name), Some("ash"));
        assert_eq!(replies, vec![r#"{"status":"success"}"#, "Welcome, ash!"]);
        assert_eq!(
            parse_server_message(&replies[0]).unwrap(),
            ServerMessage::Auth(AuthStatus::Success)
        );
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let registry = SessionRegistry::new();

        for line in [
            r#"{"name":"ash","password":"wrong"}"#,
            r#"{"name":"gary","password":"pikachu"}"#,
            "not json",
            r#"{"name":"ash"}"#,
        ] {
            let (lease, replies) = handshake(line, &registry).await;
            assert!(lease.is_none(), "{} should be refused", line);
            assert_eq!(replies, vec![r#"{"status":"failure"}"#]);
        }
    }

    #[tokio::test]
    async fn test_authenticate_rejects_second_login() {
        let registry = SessionRegistry::new();
        let first = registry.claim("ash").unwrap();

        let (lease, replies) =
            handshake(r#"{"name":"ash","password":"pikachu"}"#, &registry).await;
        assert!(lease.is_none());
        assert_eq!(replies, vec![r#"{"status":"failure"}"#]);

        drop(first);
        let (lease, _) = handshake(r#"{"name":"ash","password":"pikachu"}"#, &registry).await;
        assert!(lease.is_some());
    }

    #[test]
    fn test_restore_roster() {
        let dex = pokedex();
        let data = PlayerDataStore::from_json(
            r#"[
                {"player_name": "ash", "pokemons": ["25", "1", "4"]},
                {"player_name": "misty", "pokemons": ["7", "999", "1"]},
                {"player_name": "brock", "pokemons": ["1", "1", "4"]},
                {"player_name": "gary", "pokemons": ["1", "4"]}
            ]"#,
        )
        .unwrap();

        let roster = restore_roster("ash", &data, &dex, 3).unwrap();
        let ids: Vec<&str> = roster.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["25", "1", "4"]);
        assert_eq!(roster[0].hp(), 50);

        // Unknown and repeated ids are skipped, leaving too few
        assert!(restore_roster("misty", &data, &dex, 3).is_none());
        assert!(restore_roster("brock", &data, &dex, 3).is_none());
        assert!(restore_roster("gary", &data, &dex, 3).is_none());
        assert!(restore_roster("nobody", &data, &dex, 3).is_none());
    }

    #[test]
    fn test_restore_from_long_save() {
        let dex = pokedex();
        let data = PlayerDataStore::from_json(
            r#"[
                {"player_name": "ash", "pokemons": ["4", "999", "4", "7", "1", "25"]},
                {"player_name": "misty", "pokemons": [{"id": "7"}, {"id": "7"}, {"id": "25"}]}
            ]"#,
        )
        .unwrap();

        let roster = restore_roster("ash", &data, &dex, 3).unwrap();
        let ids: Vec<&str> = roster.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "7", "1"]);

        let roster = restore_roster("misty", &data, &dex, 2).unwrap();
        let ids: Vec<&str> = roster.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "25"]);
    }
}
