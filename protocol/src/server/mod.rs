mod tests;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Outcome of the login handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Success,
    Failure,
}

#[derive(Serialize, Deserialize)]
struct AuthReply {
    status: AuthStatus,
}

/// Which damage formula an attack used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageCategory {
    Normal,
    Special,
}

impl DamageCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(DamageCategory::Normal),
            "special" => Some(DamageCategory::Special),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageCategory::Normal => "normal",
            DamageCategory::Special => "special",
        }
    }
}

/// One line sent from the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Auth(AuthStatus),
    Welcome { name: String },
    RosterRestored { names: Vec<String> },

    // === Roster selection ===
    ChooseRoster { size: usize },
    WrongRosterSize { size: usize },
    DuplicateCreature { id: String },
    UnknownCreature { id: String },
    RosterAccepted { names: Vec<String> },
    WaitingForOpponent,

    // === Battle start ===
    PrepareForBattle { name: String },
    Opponent { name: String, lead: String },
    TurnOrder { first: String },

    // === Turns ===
    ActiveCreature { name: String, hp: i32 },
    ChooseAction,
    WaitForTurn { name: String },
    DealtDamage { damage: i32, category: DamageCategory },
    ReceivedDamage { damage: i32, category: DamageCategory },
    OpponentFainted { name: String },
    Fainted { name: String },
    /// Switch candidates as (1-based roster number, name)
    SwitchMenu { options: Vec<(usize, String)> },
    SwitchedTo { name: String },
    OpponentSwitched { name: String },
    InvalidChoice,

    // === Terminal ===
    Win,
    Lose,
    OpponentDisconnected,
    TimedOut,
    TooManyAttempts,

    Raw(String),
}

const ROSTER_RESTORED: &str = "Restored your saved team: ";
const ROSTER_ACCEPTED: &str = "Your team: ";
const WAITING_FOR_OPPONENT: &str = "Waiting for an opponent...";
const CHOOSE_ACTION: &str = "Choose action: 1. Attack 2. Switch creature";
const SWITCH_MENU: &str = "Choose a creature to switch to:";
const INVALID_CHOICE: &str = "Invalid choice. Try again.";
const WIN: &str = "You win!";
const LOSE: &str = "You lose!";
const OPPONENT_DISCONNECTED: &str = "Your opponent disconnected. The battle is over.";
const TIMED_OUT: &str = "You took too long to respond. The battle is over.";
const TOO_MANY_ATTEMPTS: &str = "Too many invalid attempts. Goodbye.";

impl ServerMessage {
    /// Serialize to a single protocol line, without the terminator
    pub fn to_wire_format(&self) -> String {
        match self {
            Self::Auth(status) => serde_json::to_string(&AuthReply { status: *status })
                .unwrap_or_else(|_| String::from(r#"{"status":"failure"}"#)),
            Self::Welcome { name } => format!("Welcome, {}!", name),
            Self::RosterRestored { names } => format!("{}{}", ROSTER_RESTORED, names.join(", ")),
            Self::ChooseRoster { size } => format!(
                "Choose {} creatures by entering their IDs (separated by space):",
                size
            ),
            Self::WrongRosterSize { size } => format!(
                "Invalid selection. Please select exactly {} creatures.",
                size
            ),
            Self::DuplicateCreature { id } => format!(
                "Creature with ID {} was chosen more than once. Please try again.",
                id
            ),
            Self::UnknownCreature { id } => {
                format!("Creature with ID {} not found. Please try again.", id)
            }
            Self::RosterAccepted { names } => format!("{}{}", ROSTER_ACCEPTED, names.join(", ")),
            Self::WaitingForOpponent => WAITING_FOR_OPPONENT.to_string(),
            Self::PrepareForBattle { name } => format!("{}, prepare for battle!", name),
            Self::Opponent { name, lead } => {
                format!("Your opponent is {}, leading with {}.", name, lead)
            }
            Self::TurnOrder { first } => format!("{} moves first.", first),
            Self::ActiveCreature { name, hp } => format!("Active creature: {} (HP {})", name, hp),
            Self::ChooseAction => CHOOSE_ACTION.to_string(),
            Self::WaitForTurn { name } => format!("Waiting for {} to act...", name),
            Self::DealtDamage { damage, category } => {
                format!("You dealt {} damage! ({})", damage, category.as_str())
            }
            Self::ReceivedDamage { damage, category } => {
                format!("You received {} damage! ({})", damage, category.as_str())
            }
            Self::OpponentFainted { name } => format!("The opposing {} fainted!", name),
            Self::Fainted { name } => format!("Your {} fainted!", name),
            Self::SwitchMenu { options } => {
                let entries: Vec<String> = options
                    .iter()
                    .map(|(number, name)| format!("{}. {}", number, name))
                    .collect();
                format!("{} {}", SWITCH_MENU, entries.join(", "))
            }
            Self::SwitchedTo { name } => format!("Switched to {}", name),
            Self::OpponentSwitched { name } => format!("Your opponent switched to {}", name),
            Self::InvalidChoice => INVALID_CHOICE.to_string(),
            Self::Win => WIN.to_string(),
            Self::Lose => LOSE.to_string(),
            Self::OpponentDisconnected => OPPONENT_DISCONNECTED.to_string(),
            Self::TimedOut => TIMED_OUT.to_string(),
            Self::TooManyAttempts => TOO_MANY_ATTEMPTS.to_string(),
            Self::Raw(text) => text.clone(),
        }
    }

    /// Whether the server closes the session after sending this message
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthStatus::Failure)
                | Self::Win
                | Self::Lose
                | Self::OpponentDisconnected
                | Self::TimedOut
                | Self::TooManyAttempts
        )
    }
}

/// Parse a single line from the server into a ServerMessage
pub fn parse_server_message(line: &str) -> Result<ServerMessage, ParseError> {
    let line = line.trim();

    if line.is_empty() {
        return Ok(ServerMessage::Raw(String::new()));
    }

    if line.starts_with('{') {
        let reply: AuthReply = serde_json::from_str(line)
            .map_err(|e| ParseError::InvalidFormat(format!("auth reply: {}", e)))?;
        return Ok(ServerMessage::Auth(reply.status));
    }

    let fixed = match line {
        WAITING_FOR_OPPONENT => Some(ServerMessage::WaitingForOpponent),
        CHOOSE_ACTION => Some(ServerMessage::ChooseAction),
        INVALID_CHOICE => Some(ServerMessage::InvalidChoice),
        WIN => Some(ServerMessage::Win),
        LOSE => Some(ServerMessage::Lose),
        OPPONENT_DISCONNECTED => Some(ServerMessage::OpponentDisconnected),
        TIMED_OUT => Some(ServerMessage::TimedOut),
        TOO_MANY_ATTEMPTS => Some(ServerMessage::TooManyAttempts),
        _ => None,
    };
    if let Some(message) = fixed {
        return Ok(message);
    }

    if let Some(rest) = line.strip_prefix(SWITCH_MENU) {
        return parse_switch_menu(rest);
    }
    if let Some(rest) = line.strip_prefix(ROSTER_RESTORED) {
        return Ok(ServerMessage::RosterRestored {
            names: split_names(rest),
        });
    }
    if let Some(rest) = line.strip_prefix(ROSTER_ACCEPTED) {
        return Ok(ServerMessage::RosterAccepted {
            names: split_names(rest),
        });
    }
    if let Some(rest) = line.strip_prefix("Active creature: ") {
        return parse_active_creature(rest);
    }
    if let Some(rest) = line.strip_prefix("You dealt ") {
        let (damage, category) = parse_damage(rest)?;
        return Ok(ServerMessage::DealtDamage { damage, category });
    }
    if let Some(rest) = line.strip_prefix("You received ") {
        let (damage, category) = parse_damage(rest)?;
        return Ok(ServerMessage::ReceivedDamage { damage, category });
    }
    if let Some(rest) = line.strip_prefix("Your opponent is ") {
        return parse_opponent(rest);
    }
    if let Some(name) = line.strip_prefix("Your opponent switched to ") {
        return Ok(ServerMessage::OpponentSwitched {
            name: name.to_string(),
        });
    }
    if let Some(name) = line.strip_prefix("Switched to ") {
        return Ok(ServerMessage::SwitchedTo {
            name: name.to_string(),
        });
    }
    if let Some(name) = line
        .strip_prefix("The opposing ")
        .and_then(|s| s.strip_suffix(" fainted!"))
    {
        return Ok(ServerMessage::OpponentFainted {
            name: name.to_string(),
        });
    }
    if let Some(name) = line
        .strip_prefix("Your ")
        .and_then(|s| s.strip_suffix(" fainted!"))
    {
        return Ok(ServerMessage::Fainted {
            name: name.to_string(),
        });
    }
    if let Some(name) = line
        .strip_prefix("Waiting for ")
        .and_then(|s| s.strip_suffix(" to act..."))
    {
        return Ok(ServerMessage::WaitForTurn {
            name: name.to_string(),
        });
    }
    if let Some(name) = line
        .strip_prefix("Welcome, ")
        .and_then(|s| s.strip_suffix('!'))
    {
        return Ok(ServerMessage::Welcome {
            name: name.to_string(),
        });
    }
    if let Some(name) = line.strip_suffix(", prepare for battle!") {
        return Ok(ServerMessage::PrepareForBattle {
            name: name.to_string(),
        });
    }
    if let Some(first) = line.strip_suffix(" moves first.") {
        return Ok(ServerMessage::TurnOrder {
            first: first.to_string(),
        });
    }
    if let Some(rest) = line.strip_prefix("Creature with ID ") {
        if let Some(id) = rest.strip_suffix(" not found. Please try again.") {
            return Ok(ServerMessage::UnknownCreature { id: id.to_string() });
        }
        if let Some(id) = rest.strip_suffix(" was chosen more than once. Please try again.") {
            return Ok(ServerMessage::DuplicateCreature { id: id.to_string() });
        }
    }
    if let Some(size) = line
        .strip_prefix("Choose ")
        .and_then(|s| s.strip_suffix(" creatures by entering their IDs (separated by space):"))
    {
        return Ok(ServerMessage::ChooseRoster {
            size: parse_number(size)?,
        });
    }
    if let Some(size) = line
        .strip_prefix("Invalid selection. Please select exactly ")
        .and_then(|s| s.strip_suffix(" creatures."))
    {
        return Ok(ServerMessage::WrongRosterSize {
            size: parse_number(size)?,
        });
    }

    Ok(ServerMessage::Raw(line.to_string()))
}

fn split_names(s: &str) -> Vec<String> {
    s.split(", ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, ParseError> {
    s.trim()
        .parse::<T>()
        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

fn parse_switch_menu(rest: &str) -> Result<ServerMessage, ParseError> {
    // Choose a creature to switch to: 2. Ivysaur, 3. Venusaur
    let mut options = Vec::new();
    for entry in rest.split(", ").map(str::trim).filter(|e| !e.is_empty()) {
        let (number, name) = entry
            .split_once(". ")
            .ok_or_else(|| ParseError::InvalidFormat(format!("switch option: {}", entry)))?;
        options.push((parse_number(number)?, name.to_string()));
    }
    Ok(ServerMessage::SwitchMenu { options })
}

fn parse_active_creature(rest: &str) -> Result<ServerMessage, ParseError> {
    // NAME (HP N)
    let (name, hp) = rest
        .rsplit_once(" (HP ")
        .ok_or_else(|| ParseError::MissingField("hp".to_string()))?;
    let hp = hp
        .strip_suffix(')')
        .ok_or_else(|| ParseError::InvalidFormat("active creature hp".to_string()))?;

    Ok(ServerMessage::ActiveCreature {
        name: name.to_string(),
        hp: parse_number(hp)?,
    })
}

fn parse_damage(rest: &str) -> Result<(i32, DamageCategory), ParseError> {
    // N damage! (CATEGORY)
    let (damage, category) = rest
        .split_once(" damage! (")
        .ok_or_else(|| ParseError::InvalidFormat("damage report".to_string()))?;
    let category = category
        .strip_suffix(')')
        .and_then(DamageCategory::parse)
        .ok_or_else(|| ParseError::MissingField("damage category".to_string()))?;

    Ok((parse_number(damage)?, category))
}

fn parse_opponent(rest: &str) -> Result<ServerMessage, ParseError> {
    // NAME, leading with LEAD.
    let (name, lead) = rest
        .split_once(", leading with ")
        .ok_or_else(|| ParseError::MissingField("opponent lead".to_string()))?;
    let lead = lead.strip_suffix('.').unwrap_or(lead);

    Ok(ServerMessage::Opponent {
        name: name.to_string(),
        lead: lead.to_string(),
    })
}
