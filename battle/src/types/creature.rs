//! Creature records and their damage-multiplier tables

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, de};

use super::stats::{Stats, numeric_or_zero};

/// A combatant as stored in the pokedex
///
/// Battles never mutate the pokedex entry; every roster member is an
/// independent clone, so `stats.hp` doubles as current HP during a battle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Creature {
    /// Pokedex identifier (e.g. "25")
    pub id: String,

    /// Display name
    pub name: String,

    /// Elemental types, lower-cased, in listed order
    #[serde(deserialize_with = "lowercase_list")]
    pub types: Vec<String>,

    /// Base stats; `hp` is decremented as the creature takes damage
    pub stats: Stats,

    /// Experience yield
    #[serde(default, deserialize_with = "numeric_or_zero")]
    pub exp: u32,

    /// Damage multiplier by attacking element, keys lower-cased
    #[serde(default, deserialize_with = "multiplier_table")]
    pub when_attacked: HashMap<String, f64>,
}

impl Creature {
    /// Create a creature with no types and an empty multiplier table
    pub fn new(id: impl Into<String>, name: impl Into<String>, stats: Stats) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            types: Vec::new(),
            stats,
            exp: 0,
            when_attacked: HashMap::new(),
        }
    }

    /// Builder-style type list (lower-cased)
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.types = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Builder-style multiplier entry
    pub fn with_multiplier(mut self, element: &str, multiplier: f64) -> Self {
        self.when_attacked
            .insert(element.trim().to_lowercase(), multiplier);
        self
    }

    /// First listed type, used as the element of special attacks
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    /// Multiplier this creature takes from an attacking element (1.0 if unlisted)
    pub fn multiplier_against(&self, element: &str) -> f64 {
        self.when_attacked
            .get(&element.to_lowercase())
            .copied()
            .unwrap_or(1.0)
    }

    /// Current HP; may be negative after a finishing blow
    pub fn hp(&self) -> i32 {
        self.stats.hp
    }

    pub fn is_fainted(&self) -> bool {
        self.stats.hp <= 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_fainted()
    }

    /// Subtract damage from HP without flooring
    pub fn take_damage(&mut self, damage: i32) {
        self.stats.hp = self.stats.hp.saturating_sub(damage);
    }
}

/// Parse a when-attacked multiplier such as "2x", "0.5x", "½x" or "0"
pub fn parse_multiplier(raw: &str) -> Option<f64> {
    let value = raw.trim();
    let value = value
        .strip_suffix(['x', 'X', '×'])
        .unwrap_or(value)
        .trim();

    match value {
        "" => None,
        "½" => Some(0.5),
        "¼" => Some(0.25),
        _ => value.parse::<f64>().ok().filter(|m| m.is_finite() && *m >= 0.0),
    }
}

fn lowercase_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect())
}

fn multiplier_table<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, f64>, D::Error> {
    let raw = Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default();

    raw.into_iter()
        .map(|(element, multiplier)| {
            let value = parse_multiplier(&multiplier).ok_or_else(|| {
                de::Error::custom(format!(
                    "invalid multiplier {:?} for element {:?}",
                    multiplier, element
                ))
            })?;
            Ok((element.trim().to_lowercase(), value))
        })
        .collect()
}
