//! Creature rosters, damage rules and the battle state machine for Pokebat.
//!
//! # Overview
//!
//! `pokebat-battle` sits between `pokebat-protocol` (wire format) and the
//! network crates:
//!
//! ```text
//! pokebat-protocol (wire format)
//!        │
//!        ▼
//! pokebat-battle (domain types + rules) ← THIS CRATE
//!        │
//!        └─> pokebat-server (sessions, matchmaking, battle I/O)
//! ```
//!
//! Nothing in here does I/O beyond reading the pokedex file. The server
//! drives a [`Battle`] by calling [`Battle::attack`] and [`Battle::switch`]
//! for the side that [`Battle::awaiting`] names and relays the reports.
//!
//! # Main Types
//!
//! - [`Creature`] - a combatant with stats, types and when-attacked multipliers
//! - [`Pokedex`] - read-only roster store, cloned out of for every roster
//! - [`Side`] - one player's roster and active creature
//! - [`Battle`] - turn order, action resolution and the terminal phases
//!
//! # Example Usage
//!
//! ```ignore
//! use pokebat_battle::{Battle, BattleConfig, Pokedex, Side};
//!
//! let dex = Pokedex::load("pokedex.json")?;
//! let ash = Side::new("ash", dex.resolve_roster(&["25", "1", "4"], 3)?);
//! let misty = Side::new("misty", dex.resolve_roster(&["7", "120", "121"], 3)?);
//!
//! let mut battle = Battle::new(ash, misty, BattleConfig::default())?;
//! let report = battle.attack(&mut rand::thread_rng())?;
//! println!("{} dealt {} damage", report.attacker, report.damage);
//! ```

pub mod engine;
pub mod pokedex;
pub mod types;

// Re-export main types at crate root for convenience
pub use engine::{
    AttackReport, Battle, BattleConfig, BattleError, Category, DEFAULT_SPECIAL_CHANCE, Phase,
    SwitchReport,
};
pub use pokedex::{Pokedex, PokedexError, RosterError};
pub use types::{Creature, Side, Slot, Stats, SwitchError};
