//! Combat math and the combatant abstraction.

#![allow(unused_imports)]

pub mod calculator;
pub mod types;

pub use calculator::*;
pub use types::*;
