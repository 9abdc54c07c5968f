use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pokebat_battle::{BattleConfig, DEFAULT_SPECIAL_CHANCE};

/// Pokebat battle server
#[derive(Parser, Debug, Clone)]
#[command(name = "pokebat-server")]
#[command(about = "TCP battle server for Pokebat", long_about = None)]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "POKEBAT_ADDR", default_value = "0.0.0.0:8081")]
    pub addr: SocketAddr,

    /// Creature records
    #[arg(long, env = "POKEBAT_POKEDEX", default_value = "pokedex.json")]
    pub pokedex: PathBuf,

    /// Known accounts
    #[arg(long, env = "POKEBAT_ACCOUNTS", default_value = "accounts.json")]
    pub accounts: PathBuf,

    /// Saved rosters; may be missing
    #[arg(long, env = "POKEBAT_PLAYER_DATA", default_value = "player_data.json")]
    pub player_data: PathBuf,

    /// Creatures per roster
    #[arg(
        long,
        env = "POKEBAT_ROSTER_SIZE",
        default_value_t = 3,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub roster_size: u16,

    /// Probability (0.0-1.0) that an attack uses the special formula
    #[arg(
        long,
        env = "POKEBAT_SPECIAL_CHANCE",
        default_value_t = DEFAULT_SPECIAL_CHANCE,
        value_parser = parse_chance
    )]
    pub special_chance: f64,

    /// Seconds to wait for each client line; 0 waits forever
    #[arg(long, env = "POKEBAT_READ_TIMEOUT_SECS", default_value_t = 120)]
    pub read_timeout_secs: u64,

    /// Invalid answers allowed per prompt; 0 allows any number
    #[arg(long, env = "POKEBAT_MAX_ATTEMPTS", default_value_t = 10)]
    pub max_attempts: u32,
}

fn parse_chance(s: &str) -> Result<f64, String> {
    let chance: f64 = s.parse().map_err(|_| format!("{} is not a number", s))?;
    if (0.0..=1.0).contains(&chance) {
        Ok(chance)
    } else {
        Err(format!("{} is not between 0.0 and 1.0", chance))
    }
}

/// Per-session settings shared by every connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub roster_size: usize,
    pub read_timeout: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            roster_size: 3,
            read_timeout: Some(Duration::from_secs(120)),
            max_attempts: Some(10),
        }
    }
}

impl Config {
    pub fn battle(&self) -> BattleConfig {
        BattleConfig {
            special_chance: self.special_chance,
        }
    }

    pub fn session(&self) -> SessionSettings {
        SessionSettings {
            roster_size: usize::from(self.roster_size),
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
        }
    }
}
