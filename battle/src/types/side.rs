//! Side (player) state

use thiserror::Error;

use super::creature::Creature;

/// Position of a side in a battle, in pairing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    P1,
    P2,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::P1, Slot::P2];

    pub fn index(&self) -> usize {
        match self {
            Slot::P1 => 0,
            Slot::P2 => 1,
        }
    }

    pub fn other(&self) -> Slot {
        match self {
            Slot::P1 => Slot::P2,
            Slot::P2 => Slot::P1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::P1 => "p1",
            Slot::P2 => "p2",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a switch target was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchError {
    #[error("roster position {index} does not exist (roster has {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("roster position {index} has fainted")]
    Fainted { index: usize },

    #[error("roster position {index} is already active")]
    AlreadyActive { index: usize },
}

/// One player's side of the battle
#[derive(Debug, Clone)]
pub struct Side {
    /// Player identity (account name)
    pub player: String,

    /// Owned creature copies, in selection order
    roster: Vec<Creature>,

    /// Index of the active creature
    active: usize,
}

impl Side {
    /// Create a side; the first roster member starts active
    pub fn new(player: impl Into<String>, roster: Vec<Creature>) -> Self {
        Self {
            player: player.into(),
            roster,
            active: 0,
        }
    }

    pub fn roster(&self) -> &[Creature] {
        &self.roster
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The active creature, `None` only for an empty roster
    pub fn active(&self) -> Option<&Creature> {
        self.roster.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Creature> {
        self.roster.get_mut(self.active)
    }

    pub fn get(&self, index: usize) -> Option<&Creature> {
        self.roster.get(index)
    }

    /// Roster members that can be switched in: alive and not active
    pub fn switch_candidates(&self) -> impl Iterator<Item = (usize, &Creature)> {
        let active = self.active;
        self.roster
            .iter()
            .enumerate()
            .filter(move |(idx, creature)| *idx != active && creature.is_alive())
    }

    pub fn can_switch(&self) -> bool {
        self.switch_candidates().next().is_some()
    }

    /// Count creatures with HP > 0
    pub fn alive_count(&self) -> usize {
        self.roster.iter().filter(|c| c.is_alive()).count()
    }

    /// Check if every creature is at HP <= 0
    pub fn all_fainted(&self) -> bool {
        !self.roster.is_empty() && self.roster.iter().all(Creature::is_fainted)
    }

    /// Check a switch target without changing anything
    pub fn validate_switch(&self, index: usize) -> Result<(), SwitchError> {
        let creature = self.roster.get(index).ok_or(SwitchError::OutOfRange {
            index,
            len: self.roster.len(),
        })?;

        if index == self.active {
            return Err(SwitchError::AlreadyActive { index });
        }
        if creature.is_fainted() {
            return Err(SwitchError::Fainted { index });
        }
        Ok(())
    }

    /// Make a roster member active, returning the previous active index
    pub fn set_active(&mut self, index: usize) -> Result<usize, SwitchError> {
        self.validate_switch(index)?;
        let previous = self.active;
        self.active = index;
        Ok(previous)
    }
}
