//! Battle rules: damage resolution and the turn state machine

mod battle;
pub mod damage;

pub use battle::{
    AttackReport, Battle, BattleConfig, BattleError, DEFAULT_SPECIAL_CHANCE, Phase, SwitchReport,
};
pub use damage::Category;
