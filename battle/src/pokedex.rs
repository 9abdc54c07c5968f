//! Read-only roster store loaded from `pokedex.json`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::Creature;

#[derive(Error, Debug)]
pub enum PokedexError {
    #[error("failed to read pokedex {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse pokedex: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate creature id {0} in pokedex")]
    DuplicateId(String),
}

/// Why a roster submission was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("expected exactly {expected} creatures, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    #[error("creature {0} was chosen more than once")]
    Duplicate(String),

    #[error("creature {0} not found")]
    Unknown(String),
}

/// Creature lookup by id
///
/// Nothing writes to a `Pokedex` after construction, so it is shared between
/// connections behind an `Arc` with no locking.
#[derive(Debug, Clone, Default)]
pub struct Pokedex {
    creatures: Vec<Creature>,
    by_id: HashMap<String, usize>,
}

impl Pokedex {
    /// Build from records, rejecting duplicate ids
    pub fn from_creatures(creatures: Vec<Creature>) -> Result<Self, PokedexError> {
        let mut by_id = HashMap::with_capacity(creatures.len());
        for (idx, creature) in creatures.iter().enumerate() {
            if by_id.insert(creature.id.clone(), idx).is_some() {
                return Err(PokedexError::DuplicateId(creature.id.clone()));
            }
        }
        Ok(Self { creatures, by_id })
    }

    /// Parse the JSON array written by the scraper
    pub fn from_json(json: &str) -> Result<Self, PokedexError> {
        let creatures: Vec<Creature> = serde_json::from_str(json)?;
        Self::from_creatures(creatures)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PokedexError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PokedexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn lookup(&self, id: &str) -> Option<&Creature> {
        self.by_id.get(id.trim()).map(|&idx| &self.creatures[idx])
    }

    /// Independent copy of a stored creature, safe to mutate in battle
    pub fn instantiate(&self, id: &str) -> Option<Creature> {
        self.lookup(id).cloned()
    }

    /// Turn a submitted id list into a roster of exactly `size` distinct copies.
    ///
    /// A single bad id rejects the whole submission.
    pub fn resolve_roster<S: AsRef<str>>(
        &self,
        ids: &[S],
        size: usize,
    ) -> Result<Vec<Creature>, RosterError> {
        if ids.len() != size {
            return Err(RosterError::WrongSize {
                expected: size,
                actual: ids.len(),
            });
        }

        let mut roster: Vec<Creature> = Vec::with_capacity(size);
        for id in ids {
            let id = id.as_ref().trim();
            if roster.iter().any(|c| c.id == id) {
                return Err(RosterError::Duplicate(id.to_string()));
            }
            let creature = self
                .instantiate(id)
                .ok_or_else(|| RosterError::Unknown(id.to_string()))?;
            roster.push(creature);
        }

        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    /// Iterate in file order
    pub fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const POKEDEX: &str = r#"[
        {"id":"1","name":"Bulbasaur","types":["grass","poison"],
         "stats":{"HP":"45","Attack":"49","Defense":"49","Speed":"45","Sp Atk":"65","Sp Def":"65"},
         "exp":"64","when_attacked":{"fire":"2x","water":"0.5x"}},
        {"id":"4","name":"Charmander","types":["fire"],
         "stats":{"HP":"39","Attack":"52","Defense":"43","Speed":"65","Sp Atk":"60","Sp Def":"50"},
         "exp":"62","when_attacked":{"water":"2x","grass":"0.5x"}},
        {"id":"7","name":"Squirtle","types":["water"],
         "stats":{"HP":"44","Attack":"48","Defense":"65","Speed":"43","Sp Atk":"50","Sp Def":"64"},
         "exp":"63","when_attacked":{"grass":"2x","fire":"0.5x"}},
        {"id":"25","name":"Pikachu","types":["electric"],
         "stats":{"HP":"35","Attack":"55","Defense":"40","Speed":"90","Sp Atk":"50","Sp Def":"50"},
         "exp":"112","when_attacked":{"ground":"2x"}}
    ]"#;

    #[test]
    fn test_from_json() {
        let dex = Pokedex::from_json(POKEDEX).unwrap();
        assert_eq!(dex.len(), 4);
        assert!(!dex.is_empty());
        assert_eq!(dex.lookup("25").unwrap().name, "Pikachu");
        assert!(dex.lookup("150").is_none());

        let names: Vec<&str> = dex.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bulbasaur", "Charmander", "Squirtle", "Pikachu"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id":"1","name":"A","types":[],"stats":{"HP":"1","Attack":"1","Defense":"1","Speed":"1","Sp Atk":"1","Sp Def":"1"}},
            {"id":"1","name":"B","types":[],"stats":{"HP":"1","Attack":"1","Defense":"1","Speed":"1","Sp Atk":"1","Sp Def":"1"}}
        ]"#;
        assert!(matches!(
            Pokedex::from_json(json),
            Err(PokedexError::DuplicateId(id)) if id == "1"
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Pokedex::from_json("{not json"),
            Err(PokedexError::Parse(_))
        ));
    }

    #[test]
    fn test_instantiate_is_an_independent_copy() {
        let dex = Pokedex::from_json(POKEDEX).unwrap();

        let mut copy = dex.instantiate("4").unwrap();
        copy.take_damage(100);

        assert!(copy.is_fainted());
        assert_eq!(dex.lookup("4").unwrap().hp(), 39);
    }

    #[test]
    fn test_resolve_roster() {
        let dex = Pokedex::from_json(POKEDEX).unwrap();

        let roster = dex.resolve_roster(&["25", "1", "7"], 3).unwrap();
        let ids: Vec<&str> = roster.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["25", "1", "7"]);
    }

    #[test]
    fn test_resolve_roster_rejects_whole_set() {
        let dex = Pokedex::from_json(POKEDEX).unwrap();

        assert_eq!(
            dex.resolve_roster(&["1", "4"], 3),
            Err(RosterError::WrongSize {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            dex.resolve_roster(&["1", "4", "7", "25"], 3),
            Err(RosterError::WrongSize {
                expected: 3,
                actual: 4
            })
        );
        assert_eq!(
            dex.resolve_roster(&["1", "999", "7"], 3),
            Err(RosterError::Unknown("999".to_string()))
        );
        assert_eq!(
            dex.resolve_roster(&["1", "4", "1"], 3),
            Err(RosterError::Duplicate("1".to_string()))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(POKEDEX.as_bytes()).unwrap();

        let dex = Pokedex::load(file.path()).unwrap();
        assert_eq!(dex.len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pokedex::load(dir.path().join("pokedex.json"));
        assert!(matches!(result, Err(PokedexError::Io { .. })));
    }
}
