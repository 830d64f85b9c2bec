//! Zone entry checks and spawn-pool selection.

use rand::Rng;

use super::data::Zone;
use crate::core::{BattleError, Result};
use crate::monsters::MonsterTemplate;

/// Level window around the party level used to filter a zone's pool.
pub const SPAWN_LEVEL_WINDOW: u32 = 2;

/// Whether a character of `level` (and optional faction) may enter `zone`.
pub fn check_zone_access(zone: &Zone, level: u32, faction: Option<&str>) -> Result<()> {
    if level < zone.min_level {
        return Err(BattleError::LevelTooLow {
            zone_id: zone.id.clone(),
            min_level: zone.min_level,
        });
    }
    if level > zone.max_level {
        return Err(BattleError::LevelTooHigh {
            zone_id: zone.id.clone(),
            max_level: zone.max_level,
        });
    }
    if let Some(required) = zone.faction.as_deref() {
        if faction != Some(required) {
            return Err(BattleError::InvalidInput(format!(
                "zone '{}' is restricted to the {} faction",
                zone.id, required
            )));
        }
    }
    Ok(())
}

/// Templates within the level window of `party_level`, or the whole pool
/// when none are.
pub fn eligible_monsters(pool: &[MonsterTemplate], party_level: u32) -> Vec<&MonsterTemplate> {
    let low = party_level.saturating_sub(SPAWN_LEVEL_WINDOW);
    let high = party_level + SPAWN_LEVEL_WINDOW;
    let banded: Vec<&MonsterTemplate> = pool
        .iter()
        .filter(|t| (low..=high).contains(&t.level))
        .collect();
    if banded.is_empty() {
        pool.iter().collect()
    } else {
        banded
    }
}

/// Weighted draw; weights ≤ 0 count as 1. `None` only for an empty pool.
pub fn pick_weighted<'a>(
    pool: &[&'a MonsterTemplate],
    rng: &mut impl Rng,
) -> Option<&'a MonsterTemplate> {
    let total: u32 = pool.iter().map(|t| t.effective_weight()).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for template in pool {
        let weight = template.effective_weight();
        if roll < weight {
            return Some(template);
        }
        roll -= weight;
    }
    pool.last().copied()
}
