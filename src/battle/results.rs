use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{BattleLogEntry, BattleSession};
use super::stats::BattleStats;
use crate::monsters::Monster;

/// What one call to
/// [`execute_tick`](crate::battle::BattleManager::execute_tick) produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleTickResult {
    /// Log entries written during this tick only
    pub logs: Vec<BattleLogEntry>,
    pub enemies: Vec<Monster>,
    pub is_running: bool,
    pub is_resting: bool,
    pub rest_until: Option<DateTime<Utc>>,
    pub round: u32,
    pub battle_count: u32,
    pub session_kills: u64,
    pub session_exp: i64,
    pub session_gold: i64,
    /// Current battle, or the last one while resting
    pub battle_stats: BattleStats,
}

impl BattleTickResult {
    /// Snapshot the session, draining its fresh log entries.
    pub(crate) fn from_session(session: &mut BattleSession) -> Self {
        Self {
            logs: session.log.take_fresh(),
            enemies: session.enemies.clone(),
            is_running: session.state.is_running(),
            is_resting: session.is_resting(),
            rest_until: session.rest_until,
            round: session.round,
            battle_count: session.battle_count,
            session_kills: session.session_kills,
            session_exp: session.session_exp,
            session_gold: session.session_gold,
            battle_stats: session.stats.clone(),
        }
    }
}

/// Read-only view of a session for status polling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleStatus {
    pub is_running: bool,
    pub is_resting: bool,
    pub zone_id: Option<String>,
    pub enemies: Vec<Monster>,
    pub round: u32,
    pub battle_count: u32,
    pub session_kills: u64,
    pub session_exp: i64,
    pub session_gold: i64,
    pub rest_until: Option<DateTime<Utc>>,
    pub battle_stats: BattleStats,
}

impl From<&BattleSession> for BattleStatus {
    fn from(session: &BattleSession) -> Self {
        Self {
            is_running: session.state.is_running(),
            is_resting: session.is_resting(),
            zone_id: session.zone_id.clone(),
            enemies: session.enemies.clone(),
            round: session.round,
            battle_count: session.battle_count,
            session_kills: session.session_kills,
            session_exp: session.session_exp,
            session_gold: session.session_gold,
            rest_until: session.rest_until,
            battle_stats: session.stats.clone(),
        }
    }
}
