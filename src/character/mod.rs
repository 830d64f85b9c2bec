//! Player characters and their derived combat stats.

#![allow(unused_imports)]

pub mod derived_stats;
pub mod types;

pub use derived_stats::*;
pub use types::*;
