use rand::Rng;

use crate::core::constants::{SPAWN_WEIGHT_BASE, SPAWN_WEIGHT_PER_DIFF};
use crate::monsters::{Monster, MonsterTemplate};
use crate::zones::{eligible_monsters, pick_weighted};

/// Group size for a party of `party_size`: anywhere in
/// [max(1, size - spread), size + spread], weighted 5 / 3 / 1 ... by
/// distance from the party size (floor 1).
pub fn roll_enemy_count(party_size: usize, spread: u32, rng: &mut impl Rng) -> usize {
    let party_size = party_size.max(1);
    let spread = spread as usize;
    let min = party_size.saturating_sub(spread).max(1);
    let max = party_size + spread;

    let weights: Vec<(usize, u32)> = (min..=max)
        .map(|count| {
            let diff = count.abs_diff(party_size) as i32;
            let weight = (SPAWN_WEIGHT_BASE - diff * SPAWN_WEIGHT_PER_DIFF).max(1);
            (count, weight as u32)
        })
        .collect();

    let total: u32 = weights.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (count, weight) in &weights {
        if roll < *weight {
            return *count;
        }
        roll -= weight;
    }
    party_size
}

/// Draw `count` monsters from the level-banded pool. Empty when the pool
/// is empty.
pub fn spawn_group(
    pool: &[MonsterTemplate],
    party_level: u32,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<Monster> {
    let eligible = eligible_monsters(pool, party_level);
    (0..count)
        .filter_map(|_| pick_weighted(&eligible, rng).map(MonsterTemplate::spawn))
        .collect()
}
