//! Damage formulas

use rand::Rng;

use crate::types::Creature;

pub use pokebat_protocol::DamageCategory as Category;

/// Pick the attack category: special with probability `special_chance`
pub fn roll_category<R: Rng + ?Sized>(rng: &mut R, special_chance: f64) -> Category {
    let chance = if special_chance.is_nan() {
        0.0
    } else {
        special_chance.clamp(0.0, 1.0)
    };

    if rng.gen_bool(chance) {
        Category::Special
    } else {
        Category::Normal
    }
}

/// max(0, Attack - Defense)
pub fn normal_damage(attacker: &Creature, defender: &Creature) -> i32 {
    attacker
        .stats
        .attack
        .saturating_sub(defender.stats.defense)
        .max(0)
}

/// Multiplier the defender takes from the attacker's first type
pub fn element_multiplier(attacker: &Creature, defender: &Creature) -> f64 {
    attacker
        .primary_type()
        .map(|element| defender.multiplier_against(element))
        .unwrap_or(1.0)
}

/// max(0, round(Sp Atk * multiplier) - Sp Def)
pub fn special_damage(attacker: &Creature, defender: &Creature) -> i32 {
    let multiplier = element_multiplier(attacker, defender);
    let boosted = (f64::from(attacker.stats.special_attack) * multiplier).round() as i32;
    boosted.saturating_sub(defender.stats.special_defense).max(0)
}

pub fn damage(category: Category, attacker: &Creature, defender: &Creature) -> i32 {
    match category {
        Category::Normal => normal_damage(attacker, defender),
        Category::Special => special_damage(attacker, defender),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::types::Stats;

    fn attacker() -> Creature {
        Creature::new("4", "Charmander", Stats::new(39, 50, 43, 65, 60, 50)).with_types(["Fire"])
    }

    fn defender() -> Creature {
        Creature::new("1", "Bulbasaur", Stats::new(45, 49, 20, 45, 65, 25))
            .with_types(["grass", "poison"])
            .with_multiplier("fire", 2.0)
    }

    #[test]
    fn test_normal_damage() {
        assert_eq!(normal_damage(&attacker(), &defender()), 30);
    }

    #[test]
    fn test_special_damage_uses_element_multiplier() {
        // round(60 * 2.0) - 25
        assert_eq!(special_damage(&attacker(), &defender()), 95);
    }

    #[test]
    fn test_damage_is_never_negative() {
        let weak = Creature::new("10", "Caterpie", Stats::new(45, 5, 35, 45, 5, 20));
        let wall = Creature::new("213", "Shuckle", Stats::new(20, 10, 230, 5, 10, 230));

        assert_eq!(normal_damage(&weak, &wall), 0);
        assert_eq!(special_damage(&weak, &wall), 0);
        assert_eq!(damage(Category::Special, &weak, &wall), 0);
    }

    #[test]
    fn test_multiplier_defaults_to_one() {
        // No entry for electric
        let sparky = Creature::new("25", "Pikachu", Stats::new(35, 55, 40, 90, 50, 50))
            .with_types(["electric"]);
        assert_eq!(element_multiplier(&sparky, &defender()), 1.0);
        assert_eq!(special_damage(&sparky, &defender()), 25);

        // Typeless attacker
        let blank = Creature::new("0", "Blank", Stats::new(1, 1, 1, 1, 50, 1));
        assert_eq!(element_multiplier(&blank, &defender()), 1.0);
    }

    #[test]
    fn test_special_damage_rounds_multiplied_attack() {
        let attacker =
            Creature::new("a", "A", Stats::new(1, 1, 1, 1, 45, 1)).with_types(["water"]);
        let defender =
            Creature::new("d", "D", Stats::new(1, 1, 1, 1, 1, 0)).with_multiplier("water", 0.5);
        // 22.5 rounds away from zero
        assert_eq!(special_damage(&attacker, &defender), 23);
    }

    #[test]
    fn test_roll_category_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(roll_category(&mut rng, 0.0), Category::Normal);
            assert_eq!(roll_category(&mut rng, 1.0), Category::Special);
        }
        // Out of range chances are clamped rather than panicking
        assert_eq!(roll_category(&mut rng, 3.0), Category::Special);
        assert_eq!(roll_category(&mut rng, -1.0), Category::Normal);
        assert_eq!(roll_category(&mut rng, f64::NAN), Category::Normal);
    }

    #[test]
    fn test_roll_category_is_weighted() {
        let mut rng = StdRng::seed_from_u64(42);
        let special = (0..10_000)
            .filter(|_| roll_category(&mut rng, 0.4) == Category::Special)
            .count();
        assert!((3_500..4_500).contains(&special), "special = {}", special);
    }
}
