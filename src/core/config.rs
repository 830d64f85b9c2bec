//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`BattleManager`](crate::battle::BattleManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of entries kept in each session's rolling log
    pub log_capacity: usize,

    /// Rest seconds per missing percent of HP or resource
    pub rest_seconds_per_percent: f64,

    /// Percent of max HP/resource restored per second while resting
    pub rest_regen_percent_per_second: f64,

    /// Shortest rest window when anything is missing
    pub min_rest_seconds: f64,

    /// Enemy group size spread around the party size
    pub party_size_spread: u32,

    /// Exp-to-next multiplier applied on every level-up
    pub exp_curve_multiplier: f64,

    /// Rage pool size for rage users
    pub rage_max: i32,

    /// Rage gained per landed hit
    pub rage_on_hit: i32,

    /// Rage gained per landed critical hit
    pub rage_on_crit: i32,

    /// Rage gained when hit = damage / max_hp * this, minimum 1
    pub rage_from_damage_scale: f64,

    /// Zone used when a session starts without one
    pub default_zone_id: Option<String>,

    /// Seed for session RNGs (None = entropy)
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_capacity: 200,
            rest_seconds_per_percent: 0.5,
            rest_regen_percent_per_second: 2.0,
            min_rest_seconds: 1.0,
            party_size_spread: 2,
            exp_curve_multiplier: 1.5,
            rage_max: 100,
            rage_on_hit: 5,
            rage_on_crit: 10,
            rage_from_damage_scale: 50.0,
            default_zone_id: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Deterministic sessions, otherwise default tunables
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// No rest delay between fights (tests and headless runs)
    pub fn fast_rest() -> Self {
        Self {
            rest_seconds_per_percent: 0.0,
            min_rest_seconds: 0.0,
            ..Default::default()
        }
    }

    pub fn with_default_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.default_zone_id = Some(zone_id.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
