//! Account and saved-player files written by the launcher and the capture game

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pokebat_protocol::Credentials;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `{"Name": "...", "Password": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Password")]
    pub password: String,
}

/// Known accounts.
///
/// Passwords are stored and compared in plain text, matching the launcher's
/// file format. This is not a security boundary.
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: Vec<Account>,
}

impl AccountStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(read_json(path.as_ref())?))
    }

    /// Exact match on both name and password
    pub fn verify(&self, credentials: &Credentials) -> bool {
        self.accounts
            .iter()
            .any(|a| a.name == credentials.name && a.password == credentials.password)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// A saved creature: either a bare id or a full record carrying one
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SavedCreature {
    Id(String),
    Record { id: String },
}

impl SavedCreature {
    fn into_id(self) -> String {
        match self {
            SavedCreature::Id(id) | SavedCreature::Record { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayerRecord {
    player_name: String,
    #[serde(default)]
    pokemons: Vec<SavedCreature>,
}

/// Saved rosters by player name, as creature ids
#[derive(Debug, Clone, Default)]
pub struct PlayerDataStore {
    rosters: HashMap<String, Vec<String>>,
}

impl PlayerDataStore {
    fn from_records(records: Vec<PlayerRecord>) -> Self {
        // Later records for the same player win
        let rosters = records
            .into_iter()
            .map(|r| {
                let ids = r.pokemons.into_iter().map(SavedCreature::into_id).collect();
                (r.player_name, ids)
            })
            .collect();
        Self { rosters }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<PlayerRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Load the file; a missing file means nobody has saved data
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "no player data file, starting without saved rosters"
            );
            return Ok(Self::default());
        }
        Ok(Self::from_records(read_json(path)?))
    }

    /// Saved creature ids for a player, in saved order
    pub fn saved_roster(&self, player: &str) -> Option<&[String]> {
        self.rosters.get(player).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}
