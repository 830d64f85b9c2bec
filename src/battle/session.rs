//! Per-player battle session state and its rolling log.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::stats::BattleStats;
use super::threat::ThreatTable;
use super::turn_order::TurnSlot;
use crate::character::{CharacterId, UserId};
use crate::combat::DamageType;
use crate::monsters::Monster;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Resting,
}

impl SessionState {
    /// Resting counts as running: the session resumes on its own.
    pub fn is_running(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Combat,
    Heal,
    Buff,
    Resource,
    Loot,
    Levelup,
    Death,
    System,
    Encounter,
    Summary,
    Error,
}

/// One player-facing log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleLogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
}

/// Rolling log capped at a fixed number of entries; the oldest entries
/// fall off first. Entries pushed since the last drain are also kept
/// aside so a tick can report exactly what it produced.
#[derive(Debug, Clone)]
pub struct BattleLog {
    entries: VecDeque<BattleLogEntry>,
    fresh: Vec<BattleLogEntry>,
    capacity: usize,
}

impl BattleLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            fresh: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: BattleLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.fresh.push(entry.clone());
        self.entries.push_back(entry);
    }

    /// Last `limit` entries, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<BattleLogEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take_fresh(&mut self) -> Vec<BattleLogEntry> {
        std::mem::take(&mut self.fresh)
    }

    pub fn clear_fresh(&mut self) {
        self.fresh.clear();
    }
}

/// Everything the engine remembers about one player's auto-battle.
#[derive(Debug)]
pub struct BattleSession {
    pub user_id: UserId,
    pub state: SessionState,
    pub zone_id: Option<String>,
    pub enemies: Vec<Monster>,

    // ── Turn tracking ───────────────────────────────────────────
    pub turn_order: Vec<TurnSlot>,
    pub turn_index: usize,
    pub round: u32,
    /// Set on spawn; the following tick only shows the encounter
    pub just_encountered: bool,
    pub threat: ThreatTable,
    /// Characters whose survival passive already fired this battle
    pub survival_used: HashSet<CharacterId>,

    // ── Counters ────────────────────────────────────────────────
    pub battle_count: u32,
    pub battle_kills: u32,
    pub battle_exp: i64,
    pub battle_gold: i64,
    pub battle_started_at: Option<DateTime<Utc>>,
    pub session_kills: u64,
    pub session_exp: i64,
    pub session_gold: i64,
    pub stats: BattleStats,

    // ── Rest window ─────────────────────────────────────────────
    pub rest_started_at: Option<DateTime<Utc>>,
    pub rest_until: Option<DateTime<Utc>>,
    pub last_rest_tick: Option<DateTime<Utc>>,

    pub log: BattleLog,
    pub(crate) rng: StdRng,
}

impl BattleSession {
    pub fn new(user_id: UserId, log_capacity: usize, rng: StdRng) -> Self {
        Self {
            user_id,
            state: SessionState::Idle,
            zone_id: None,
            enemies: Vec::new(),
            turn_order: Vec::new(),
            turn_index: 0,
            round: 0,
            just_encountered: false,
            threat: ThreatTable::default(),
            survival_used: HashSet::new(),
            battle_count: 0,
            battle_kills: 0,
            battle_exp: 0,
            battle_gold: 0,
            battle_started_at: None,
            session_kills: 0,
            session_exp: 0,
            session_gold: 0,
            stats: BattleStats::default(),
            rest_started_at: None,
            rest_until: None,
            last_rest_tick: None,
            log: BattleLog::new(log_capacity),
            rng,
        }
    }

    pub fn is_resting(&self) -> bool {
        self.state == SessionState::Resting
    }

    pub fn has_live_enemies(&self) -> bool {
        self.enemies.iter().any(|e| e.is_alive())
    }

    pub fn enemy_index(&self, enemy_id: &str) -> Option<usize> {
        self.enemies.iter().position(|e| e.id == enemy_id)
    }

    pub fn add_log(&mut self, kind: LogKind, message: impl Into<String>) {
        self.add_log_at(kind, message, None);
    }

    pub fn add_combat_log(&mut self, message: impl Into<String>, damage_type: DamageType) {
        self.add_log_at(LogKind::Combat, message, Some(damage_type));
    }

    fn add_log_at(&mut self, kind: LogKind, message: impl Into<String>, damage_type: Option<DamageType>) {
        self.log.push(BattleLogEntry {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            damage_type,
        });
    }

    /// Zero the per-battle counters before a new engagement.
    pub fn reset_battle_counters(&mut self) {
        self.battle_kills = 0;
        self.battle_exp = 0;
        self.battle_gold = 0;
        self.round = 0;
        self.battle_started_at = None;
        self.survival_used.clear();
    }

    /// Credit one kill to both the battle and the session totals.
    pub fn record_kill(&mut self, exp: i64, gold: i64) {
        self.battle_kills += 1;
        self.battle_exp += exp;
        self.battle_gold += gold;
        self.session_kills += 1;
        self.session_exp += exp;
        self.session_gold += gold;
    }

    pub fn begin_rest(&mut self, now: DateTime<Utc>, until: DateTime<Utc>) {
        self.state = SessionState::Resting;
        self.rest_started_at = Some(now);
        self.rest_until = Some(until);
        self.last_rest_tick = Some(now);
    }

    pub fn end_rest(&mut self) {
        self.rest_started_at = None;
        self.rest_until = None;
        self.last_rest_tick = None;
    }

    /// Drop the current engagement: enemies, queue and threat.
    pub fn clear_engagement(&mut self) {
        self.enemies.clear();
        self.turn_order.clear();
        self.turn_index = 0;
        self.just_encountered = false;
        self.threat.reset();
    }
}
