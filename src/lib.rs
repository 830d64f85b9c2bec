//! Autobattle - turn-based idle auto-battle engine.
//!
//! A [`BattleManager`](battle::BattleManager) keeps one session per player.
//! Each tick advances a single actor: characters follow their battle
//! strategy (or a built-in fallback), monsters follow their AI profile,
//! and the party rests between fights. Definitions and character
//! persistence come from the traits in [`repository`].

pub mod battle;
pub mod buffs;
pub mod build_info;
pub mod character;
pub mod combat;
pub mod core;
pub mod monsters;
pub mod passives;
pub mod repository;
pub mod skills;
pub mod strategy;
pub mod zones;
