//! Battle I/O: drives one [`Battle`] over the two players' connections

use pokebat_battle::{AttackReport, Battle, BattleConfig, BattleError, Phase, Side, Slot};
use pokebat_protocol::{Action, ServerMessage, parse_switch_choice};
use rand::Rng;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::attempts::Attempts;
use crate::connection::{Connection, ConnectionError};
use crate::lobby::ReadySession;

/// How a battle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleOutcome {
    Finished {
        winner: String,
        loser: String,
        turns: u32,
    },
    Aborted {
        disconnected: String,
        reason: String,
    },
}

/// Why a player dropped out of a battle
#[derive(Error, Debug)]
enum Dropout {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("too many invalid choices")]
    Stalled,

    #[error(transparent)]
    Rules(#[from] BattleError),
}

#[derive(Debug)]
struct Failure {
    slot: Slot,
    dropout: Dropout,
}

impl Failure {
    fn new(slot: Slot, dropout: impl Into<Dropout>) -> Self {
        Self {
            slot,
            dropout: dropout.into(),
        }
    }
}

struct Arena<S> {
    battle: Battle,
    conns: [Connection<S>; 2],
    max_attempts: Option<u32>,
}

/// Play a battle between two ready sessions to the end.
///
/// The first session is P1. Only a roster that `Battle::new` refuses is
/// an error; a player dropping out is reported as `BattleOutcome::Aborted`.
/// Both connections are shut down before returning.
pub async fn run_battle<S, R>(
    first: ReadySession<S>,
    second: ReadySession<S>,
    config: BattleConfig,
    max_attempts: Option<u32>,
    rng: &mut R,
) -> Result<BattleOutcome, BattleError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: Rng + ?Sized,
{
    let ReadySession {
        lease: first_lease,
        roster: first_roster,
        conn: first_conn,
    } = first;
    let ReadySession {
        lease: second_lease,
        roster: second_roster,
        conn: second_conn,
    } = second;

    let battle = Battle::new(
        Side::new(first_lease.name(), first_roster),
        Side::new(second_lease.name(), second_roster),
        config,
    )?;

    let mut arena = Arena {
        battle,
        conns: [first_conn, second_conn],
        max_attempts,
    };

    let outcome = match arena.play(rng).await {
        Ok(()) => arena.finish().await,
        Err(failure) => arena.abort(failure).await,
    };

    for conn in &mut arena.conns {
        if let Err(e) = conn.shutdown().await {
            tracing::debug!(peer = %conn.peer(), error = %e, "shutdown failed");
        }
    }

    Ok(outcome)
}

impl<S> Arena<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn player(&self, slot: Slot) -> &str {
        &self.battle.side(slot).player
    }

    fn active_name(&self, slot: Slot) -> String {
        self.battle
            .side(slot)
            .active()
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    async fn send(&mut self, slot: Slot, message: &ServerMessage) -> Result<(), Failure> {
        self.conns[slot.index()]
            .send(message)
            .await
            .map_err(|e| Failure::new(slot, e))
    }

    /// Prompt `slot`; lines typed before the prompt went out are dropped
    async fn prompt(&mut self, slot: Slot, message: &ServerMessage) -> Result<String, Failure> {
        let conn = &mut self.conns[slot.index()];
        conn.discard_pending()
            .await
            .map_err(|e| Failure::new(slot, e))?;
        conn.prompt(message).await.map_err(|e| Failure::new(slot, e))
    }

    /// Send without caring whether the peer is still there
    async fn notify(&mut self, slot: Slot, message: &ServerMessage) {
        if let Err(e) = self.conns[slot.index()].send(message).await {
            tracing::debug!(player = %self.player(slot), error = %e, "notice not delivered");
        }
    }

    async fn play<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), Failure> {
        self.announce().await?;

        loop {
            match self.battle.phase() {
                Phase::AwaitingAction(slot) => self.take_turn(slot, rng).await?,
                Phase::AwaitingForcedSwitch(slot) => {
                    let waiting = ServerMessage::WaitForTurn {
                        name: self.player(slot).to_string(),
                    };
                    self.send(slot.other(), &waiting).await?;
                    self.switch(slot).await?;
                }
                Phase::Over { .. } | Phase::Aborted { .. } => return Ok(()),
            }
        }
    }

    async fn announce(&mut self) -> Result<(), Failure> {
        let first = self.player(self.battle.turn_order()[0]).to_string();

        for slot in Slot::BOTH {
            let messages = [
                ServerMessage::PrepareForBattle {
                    name: self.player(slot).to_string(),
                },
                ServerMessage::Opponent {
                    name: self.player(slot.other()).to_string(),
                    lead: self.active_name(slot.other()),
                },
                ServerMessage::TurnOrder {
                    first: first.clone(),
                },
            ];
            for message in &messages {
                self.send(slot, message).await?;
            }
        }
        Ok(())
    }

    async fn take_turn<R: Rng + ?Sized>(&mut self, slot: Slot, rng: &mut R) -> Result<(), Failure> {
        let hp = self.battle.side(slot).active().map_or(0, |c| c.hp());
        let status = ServerMessage::ActiveCreature {
            name: self.active_name(slot),
            hp,
        };
        let waiting = ServerMessage::WaitForTurn {
            name: self.player(slot).to_string(),
        };
        self.send(slot, &status).await?;
        self.send(slot.other(), &waiting).await?;

        match self.choose_action(slot).await? {
            Action::Attack => {
                let report = self
                    .battle
                    .attack(rng)
                    .map_err(|e| Failure::new(slot, e))?;
                self.report_attack(&report).await
            }
            Action::Switch => self.switch(slot).await,
        }
    }

    /// Prompt for an action until a usable one arrives
    async fn choose_action(&mut self, slot: Slot) -> Result<Action, Failure> {
        let mut attempts = Attempts::new(self.max_attempts);

        loop {
            let line = self.prompt(slot, &ServerMessage::ChooseAction).await?;
            match Action::parse(&line) {
                Ok(Action::Switch) if !self.battle.can_switch(slot) => {
                    tracing::debug!(player = %self.player(slot), "nothing to switch to");
                }
                Ok(action) => return Ok(action),
                Err(e) => {
                    tracing::debug!(player = %self.player(slot), error = %e, "invalid action");
                }
            }

            self.send(slot, &ServerMessage::InvalidChoice).await?;
            if !attempts.record_failure() {
                return Err(Failure::new(slot, Dropout::Stalled));
            }
        }
    }

    async fn report_attack(&mut self, report: &AttackReport) -> Result<(), Failure> {
        tracing::debug!(
            turn = self.battle.turn(),
            attacker = %self.player(report.attacker),
            damage = report.damage,
            category = report.category.as_str(),
            defender_hp = report.defender_hp,
            "attack"
        );

        let dealt = ServerMessage::DealtDamage {
            damage: report.damage,
            category: report.category,
        };
        let received = ServerMessage::ReceivedDamage {
            damage: report.damage,
            category: report.category,
        };
        self.send(report.attacker, &dealt).await?;
        self.send(report.defender, &received).await?;

        if report.fainted {
            let name = self.active_name(report.defender);
            self.send(report.defender, &ServerMessage::Fainted { name: name.clone() })
                .await?;
            self.send(report.attacker, &ServerMessage::OpponentFainted { name })
                .await?;
        }
        Ok(())
    }

    /// Switch menu for `slot`, voluntary or forced
    async fn switch(&mut self, slot: Slot) -> Result<(), Failure> {
        let options: Vec<(usize, String)> = self
            .battle
            .side(slot)
            .switch_candidates()
            .map(|(idx, creature)| (idx + 1, creature.name.clone()))
            .collect();
        let menu = ServerMessage::SwitchMenu { options };
        let mut attempts = Attempts::new(self.max_attempts);

        loop {
            let line = self.prompt(slot, &menu).await?;
            let refused = match parse_switch_choice(&line) {
                Ok(index) => match self.battle.switch(slot, index) {
                    Ok(report) => {
                        let name = self.active_name(slot);
                        tracing::debug!(
                            player = %self.player(slot),
                            creature = %name,
                            forced = report.forced,
                            "switched"
                        );
                        self.send(slot, &ServerMessage::SwitchedTo { name: name.clone() })
                            .await?;
                        self.send(slot.other(), &ServerMessage::OpponentSwitched { name })
                            .await?;
                        return Ok(());
                    }
                    Err(e) => e.to_string(),
                },
                Err(e) => e.to_string(),
            };

            tracing::debug!(player = %self.player(slot), reason = %refused, "switch refused");
            self.send(slot, &ServerMessage::InvalidChoice).await?;
            if !attempts.record_failure() {
                return Err(Failure::new(slot, Dropout::Stalled));
            }
        }
    }

    async fn finish(&mut self) -> BattleOutcome {
        let Some(winner) = self.battle.winner() else {
            // play() only returns Ok in a terminal phase, and never Aborted
            let disconnected = self.player(Slot::P1).to_string();
            return BattleOutcome::Aborted {
                disconnected,
                reason: "battle ended without a winner".to_string(),
            };
        };
        let loser = winner.other();

        self.notify(winner, &ServerMessage::Win).await;
        self.notify(loser, &ServerMessage::Lose).await;

        let outcome = BattleOutcome::Finished {
            winner: self.player(winner).to_string(),
            loser: self.player(loser).to_string(),
            turns: self.battle.turn(),
        };
        tracing::info!(
            winner = %self.player(winner),
            loser = %self.player(loser),
            turns = self.battle.turn(),
            "battle over"
        );
        outcome
    }

    async fn abort(&mut self, failure: Failure) -> BattleOutcome {
        let Failure { slot, dropout } = failure;
        self.battle.abort(slot);

        match &dropout {
            Dropout::Connection(ConnectionError::Timeout(_)) => {
                self.notify(slot, &ServerMessage::TimedOut).await;
            }
            Dropout::Stalled => {
                self.notify(slot, &ServerMessage::TooManyAttempts).await;
            }
            Dropout::Rules(e) => {
                tracing::error!(
                    player = %self.player(slot),
                    error = %e,
                    "battle rules refused a validated action"
                );
            }
            Dropout::Connection(_) => {}
        }
        self.notify(slot.other(), &ServerMessage::OpponentDisconnected)
            .await;

        tracing::warn!(
            player = %self.player(slot),
            opponent = %self.player(slot.other()),
            reason = %dropout,
            "battle aborted"
        );
        BattleOutcome::Aborted {
            disconnected: self.player(slot).to_string(),
            reason: dropout.to_string(),
        }
    }
}
