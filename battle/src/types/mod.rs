//! Domain types for battles

mod creature;
mod side;
mod stats;

pub use creature::{Creature, parse_multiplier};
pub use side::{Side, Slot, SwitchError};
pub use stats::Stats;
