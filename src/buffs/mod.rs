//! Timed buffs, debuffs and periodic damage/healing.

#![allow(unused_imports)]

pub mod manager;
pub mod types;

pub use manager::*;
pub use types::*;
