//! Interactive roster selection

use pokebat_battle::{Creature, Pokedex, RosterError};
use pokebat_protocol::{ServerMessage, parse_roster_pick};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::attempts::Attempts;
use crate::connection::{Connection, ConnectionError};

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("gave up after {0} invalid submissions")]
    TooManyAttempts(u32),
}

/// Reply for a refused submission
fn rejection(error: &RosterError, size: usize) -> ServerMessage {
    match error {
        RosterError::WrongSize { .. } => ServerMessage::WrongRosterSize { size },
        RosterError::Duplicate(id) => ServerMessage::DuplicateCreature { id: id.clone() },
        RosterError::Unknown(id) => ServerMessage::UnknownCreature { id: id.clone() },
    }
}

/// Prompt until the player submits `size` distinct known ids.
///
/// Each refusal names the problem and re-prompts. With `max_attempts` set,
/// the player is sent `TooManyAttempts` once that many submissions failed.
pub async fn select_roster<S>(
    conn: &mut Connection<S>,
    pokedex: &Pokedex,
    size: usize,
    max_attempts: Option<u32>,
) -> Result<Vec<Creature>, SelectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut attempts = Attempts::new(max_attempts);

    loop {
        let line = conn.prompt(&ServerMessage::ChooseRoster { size }).await?;

        let result = match parse_roster_pick(&line) {
            Ok(ids) => pokedex.resolve_roster(&ids, size),
            Err(_) => Err(RosterError::WrongSize {
                expected: size,
                actual: 0,
            }),
        };

        match result {
            Ok(roster) => {
                let names = roster.iter().map(|c| c.name.clone()).collect();
                conn.send(&ServerMessage::RosterAccepted { names }).await?;
                return Ok(roster);
            }
            Err(e) => {
                tracing::debug!(peer = %conn.peer(), error = %e, "roster refused");
                conn.send(&rejection(&e, size)).await?;
                if !attempts.record_failure() {
                    conn.send(&ServerMessage::TooManyAttempts).await?;
                    return Err(SelectionError::TooManyAttempts(attempts.used()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pokebat_battle::Stats;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

    use super::*;

    fn pokedex() -> Pokedex {
        Pokedex::from_creatures(vec![
            Creature::new("1", "Bulbasaur", Stats::new(45, 49, 49, 45, 65, 65)),
            Creature::new("4", "Charmander", Stats::new(39, 52, 43, 65, 60, 50)),
            Creature::new("7", "Squirtle", Stats::new(44, 48, 65, 43, 50, 64)),
        ])
        .unwrap()
    }

    /// Feed `input` to the selection and collect every line the server wrote
    async fn run(
        input: &'static str,
        max_attempts: Option<u32>,
    ) -> (Result<Vec<Creature>, SelectionError>, Vec<String>) {
        let (client, server) = duplex(8192);
        let mut conn = Connection::new(server, "test", None);
        let (read, mut write) = tokio::io::split(client);
        write.write_all(input.as_bytes()).await.unwrap();
        write.shutdown().await.unwrap();

        let result = select_roster(&mut conn, &pokedex(), 2, max_attempts).await;
        drop(conn);

        let mut lines = BufReader::new(read).lines();
        let mut output = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            output.push(line);
        }
        (result, output)
    }

    #[tokio::test]
    async fn test_accepts_valid_roster() {
        let (result, output) = run("4 7\n", None).await;

        let roster = result.unwrap();
        assert_eq!(roster[0].name, "Charmander");
        assert_eq!(roster[1].name, "Squirtle");
        assert_eq!(
            output,
            vec![
                ServerMessage::ChooseRoster { size: 2 }.to_wire_format(),
                "Your team: Charmander, Squirtle".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_reprompts_with_reason() {
        let (result, output) = run("1\n1 1\n1 99\n\n7 1\n", None).await;

        assert_eq!(result.unwrap().len(), 2);
        let choose = ServerMessage::ChooseRoster { size: 2 }.to_wire_format();
        assert_eq!(
            output,
            vec![
                choose.clone(),
                "Invalid selection. Please select exactly 2 creatures.".to_string(),
                choose.clone(),
                "Creature with ID 1 was chosen more than once. Please try again.".to_string(),
                choose.clone(),
                "Creature with ID 99 not found. Please try again.".to_string(),
                choose.clone(),
                "Invalid selection. Please select exactly 2 creatures.".to_string(),
                choose,
                "Your team: Squirtle, Bulbasaur".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (result, output) = run("1\n2\n1 4\n", Some(2)).await;

        assert!(matches!(result, Err(SelectionError::TooManyAttempts(2))));
        assert_eq!(output.last().unwrap(), "Too many invalid attempts. Goodbye.");
    }

    #[tokio::test]
    async fn test_disconnect_during_selection() {
        let (result, _) = run("1\n", None).await;
        assert!(matches!(
            result,
            Err(SelectionError::Connection(ConnectionError::Closed))
        ));
    }
}
