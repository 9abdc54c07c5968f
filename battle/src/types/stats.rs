//! Base stats and the numeric-string fields of the pokedex format

use serde::{Deserialize, Deserializer, de};

/// Base combat stats
///
/// The pokedex stores every stat as a numeric string (`"HP": "45"`);
/// plain JSON numbers are accepted as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Stats {
    #[serde(rename = "HP", deserialize_with = "numeric")]
    pub hp: i32,

    #[serde(rename = "Attack", deserialize_with = "numeric")]
    pub attack: i32,

    #[serde(rename = "Defense", deserialize_with = "numeric")]
    pub defense: i32,

    #[serde(rename = "Speed", deserialize_with = "numeric")]
    pub speed: i32,

    #[serde(rename = "Sp Atk", deserialize_with = "numeric")]
    pub special_attack: i32,

    #[serde(rename = "Sp Def", deserialize_with = "numeric")]
    pub special_defense: i32,
}

impl Stats {
    /// Create stats in pokedex order: HP, Attack, Defense, Speed, Sp Atk, Sp Def
    pub fn new(
        hp: i32,
        attack: i32,
        defense: i32,
        speed: i32,
        special_attack: i32,
        special_defense: i32,
    ) -> Self {
        Self {
            hp,
            attack,
            defense,
            speed,
            special_attack,
            special_defense,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

fn to_i32<E: de::Error>(raw: RawNumber) -> Result<Option<i32>, E> {
    let value = match raw {
        RawNumber::Int(n) => n,
        RawNumber::Float(f) => f.round() as i64,
        RawNumber::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<i64>()
                .map_err(|_| E::custom(format!("expected a numeric string, got {:?}", s)))?
        }
    };

    i32::try_from(value)
        .map(Some)
        .map_err(|_| E::custom(format!("number out of range: {}", value)))
}

/// Numeric string or number; an empty string is an error
pub(crate) fn numeric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    to_i32(RawNumber::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("expected a numeric string, got an empty string"))
}

/// Numeric string or number; empty strings and nulls read as zero
pub(crate) fn numeric_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    let value = match raw {
        Some(raw) => to_i32(raw)?.unwrap_or(0),
        None => 0,
    };
    u32::try_from(value).map_err(|_| de::Error::custom(format!("negative value: {}", value)))
}
