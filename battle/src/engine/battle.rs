//! Battle - the turn-based state machine for one pairing

use rand::Rng;
use thiserror::Error;

use super::damage::{Category, damage, roll_category};
use crate::types::{Side, Slot, SwitchError};

/// Chance that an attack uses the special formula
pub const DEFAULT_SPECIAL_CHANCE: f64 = 0.4;

/// Tunable battle rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleConfig {
    /// Probability (0.0-1.0) that an attack rolls the special category
    pub special_chance: f64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            special_chance: DEFAULT_SPECIAL_CHANCE,
        }
    }
}

/// Where the battle currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for this side to attack or switch
    AwaitingAction(Slot),
    /// This side's active creature fainted and it must switch before acting
    AwaitingForcedSwitch(Slot),
    /// Every creature of the loser is at HP <= 0
    Over { winner: Slot },
    /// A player dropped out (I/O failure, timeout or stalling)
    Aborted { disconnected: Slot },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Over { .. } | Phase::Aborted { .. })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleError {
    #[error("{0} has no creatures")]
    EmptyRoster(Slot),

    #[error("{0} has no creature able to battle")]
    NoAliveCreature(Slot),

    #[error("it is not {0}'s turn")]
    NotYourTurn(Slot),

    #[error("{0} must switch out its fainted creature first")]
    SwitchRequired(Slot),

    #[error("the battle has already finished")]
    Finished,

    #[error("invalid switch: {0}")]
    InvalidSwitch(#[from] SwitchError),
}

/// Result of one attack
#[derive(Debug, Clone, PartialEq)]
pub struct AttackReport {
    pub attacker: Slot,
    pub defender: Slot,
    pub category: Category,
    pub damage: i32,
    /// Defender's active HP after the hit (may be negative)
    pub defender_hp: i32,
    pub fainted: bool,
    /// Phase the battle moved to
    pub phase: Phase,
}

/// Result of a switch
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchReport {
    pub slot: Slot,
    pub from: usize,
    pub to: usize,
    /// Whether this replaced a fainted creature
    pub forced: bool,
    pub phase: Phase,
}

/// A battle between two sides.
///
/// Turn order is fixed when the battle is created: the side whose active
/// creature is strictly faster moves first, ties go to the second side. After
/// that, actions strictly alternate; a forced switch after a faint is part of
/// the attacker's action and the fainted side acts next.
#[derive(Debug, Clone)]
pub struct Battle {
    sides: [Side; 2],
    order: [Slot; 2],
    phase: Phase,
    /// Completed actions
    turn: u32,
    config: BattleConfig,
}

impl Battle {
    /// Pair two sides and resolve turn order
    pub fn new(p1: Side, p2: Side, config: BattleConfig) -> Result<Self, BattleError> {
        for (slot, side) in Slot::BOTH.iter().zip([&p1, &p2]) {
            match side.active() {
                None => return Err(BattleError::EmptyRoster(*slot)),
                Some(active) if active.is_fainted() => {
                    return Err(BattleError::NoAliveCreature(*slot));
                }
                Some(_) => {}
            }
        }

        let p1_speed = p1.active().map_or(0, |c| c.stats.speed);
        let p2_speed = p2.active().map_or(0, |c| c.stats.speed);
        let order = if p1_speed > p2_speed {
            [Slot::P1, Slot::P2]
        } else {
            [Slot::P2, Slot::P1]
        };

        Ok(Self {
            sides: [p1, p2],
            order,
            phase: Phase::AwaitingAction(order[0]),
            turn: 0,
            config,
        })
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// [first mover, second mover]
    pub fn turn_order(&self) -> [Slot; 2] {
        self.order
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of completed actions
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Side whose input is needed, if any
    pub fn awaiting(&self) -> Option<Slot> {
        match self.phase {
            Phase::AwaitingAction(slot) | Phase::AwaitingForcedSwitch(slot) => Some(slot),
            Phase::Over { .. } | Phase::Aborted { .. } => None,
        }
    }

    pub fn side(&self, slot: Slot) -> &Side {
        &self.sides[slot.index()]
    }

    pub fn is_over(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn winner(&self) -> Option<Slot> {
        match self.phase {
            Phase::Over { winner } => Some(winner),
            _ => None,
        }
    }

    /// Whether `slot` has anything to switch to
    pub fn can_switch(&self, slot: Slot) -> bool {
        self.side(slot).can_switch()
    }

    /// The awaited side attacks the opposing active creature
    pub fn attack<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<AttackReport, BattleError> {
        let attacker = match self.phase {
            Phase::AwaitingAction(slot) => slot,
            Phase::AwaitingForcedSwitch(slot) => return Err(BattleError::SwitchRequired(slot)),
            Phase::Over { .. } | Phase::Aborted { .. } => return Err(BattleError::Finished),
        };
        let defender = attacker.other();

        let category = roll_category(rng, self.config.special_chance);
        let dealt = {
            let (Some(atk), Some(def)) = (
                self.side(attacker).active(),
                self.side(defender).active(),
            ) else {
                return Err(BattleError::EmptyRoster(defender));
            };
            damage(category, atk, def)
        };

        let defending = &mut self.sides[defender.index()];
        let (defender_hp, fainted) = match defending.active_mut() {
            Some(creature) => {
                creature.take_damage(dealt);
                (creature.hp(), creature.is_fainted())
            }
            None => return Err(BattleError::EmptyRoster(defender)),
        };

        self.phase = if !fainted {
            self.turn += 1;
            Phase::AwaitingAction(defender)
        } else if defending.all_fainted() {
            self.turn += 1;
            Phase::Over { winner: attacker }
        } else {
            Phase::AwaitingForcedSwitch(defender)
        };

        Ok(AttackReport {
            attacker,
            defender,
            category,
            damage: dealt,
            defender_hp,
            fainted,
            phase: self.phase,
        })
    }

    /// Switch `slot`'s active creature to roster position `index` (0-based).
    ///
    /// Works both as a voluntary action and as the forced replacement of a
    /// fainted creature. A refused switch leaves the battle unchanged.
    pub fn switch(&mut self, slot: Slot, index: usize) -> Result<SwitchReport, BattleError> {
        let forced = match self.phase {
            Phase::AwaitingAction(s) if s == slot => false,
            Phase::AwaitingForcedSwitch(s) if s == slot => true,
            Phase::AwaitingAction(_) | Phase::AwaitingForcedSwitch(_) => {
                return Err(BattleError::NotYourTurn(slot));
            }
            Phase::Over { .. } | Phase::Aborted { .. } => return Err(BattleError::Finished),
        };

        let from = self.sides[slot.index()].set_active(index)?;

        // The fainted side replaces its creature and then takes its own turn
        self.phase = if forced {
            Phase::AwaitingAction(slot)
        } else {
            Phase::AwaitingAction(slot.other())
        };
        self.turn += 1;

        Ok(SwitchReport {
            slot,
            from,
            to: index,
            forced,
            phase: self.phase,
        })
    }

    /// End the battle because `disconnected` dropped out. No-op once finished.
    pub fn abort(&mut self, disconnected: Slot) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Aborted { disconnected };
        }
    }
}
