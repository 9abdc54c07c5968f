use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Login handshake payload: `{"name":"...","password":"..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    /// Parse the JSON handshake line
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyMessage);
        }
        serde_json::from_str(line).map_err(|e| ParseError::InvalidFormat(e.to_string()))
    }
}

/// Turn action chosen from the action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Attack,
    Switch,
}

impl Action {
    /// Accepts the menu number or the action name, case-insensitive
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyMessage);
        }

        match line.to_lowercase().as_str() {
            "1" | "attack" => Ok(Action::Attack),
            "2" | "switch" => Ok(Action::Switch),
            _ => Err(ParseError::InvalidAction(line.to_string())),
        }
    }

    pub fn menu_number(&self) -> u8 {
        match self {
            Action::Attack => 1,
            Action::Switch => 2,
        }
    }
}

/// Split a roster submission into creature ids.
///
/// Count and uniqueness are checked by the roster store, not here.
pub fn parse_roster_pick(line: &str) -> Result<Vec<String>, ParseError> {
    let ids: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if ids.is_empty() {
        return Err(ParseError::EmptyMessage);
    }
    Ok(ids)
}

/// Parse a 1-based roster number from the switch menu into a 0-based index
pub fn parse_switch_choice(line: &str) -> Result<usize, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::EmptyMessage);
    }

    let number = line
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidNumber(line.to_string()))?;

    number
        .checked_sub(1)
        .ok_or_else(|| ParseError::InvalidNumber(line.to_string()))
}

/// Commands that clients can send to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// {"name":NAME,"password":PASSWORD}
    Login(Credentials),

    /// ID ID ID
    PickRoster(Vec<String>),

    /// 1 | 2
    Act(Action),

    /// Switch target as a 0-based roster index, sent 1-based
    SwitchTo(usize),

    /// Raw line for catch-all
    Raw(String),
}

impl ClientCommand {
    /// Serialize command to a single protocol line, without the terminator
    pub fn to_wire_format(&self) -> String {
        match self {
            Self::Login(credentials) => {
                serde_json::to_string(credentials).unwrap_or_else(|_| "{}".to_string())
            }
            Self::PickRoster(ids) => ids.join(" "),
            Self::Act(action) => action.menu_number().to_string(),
            Self::SwitchTo(index) => (index + 1).to_string(),
            Self::Raw(line) => line.clone(),
        }
    }
}
