//! Player battle strategies: ordered rules, skill priorities, targeting.

#![allow(unused_imports)]

pub mod executor;
pub mod types;

pub use executor::*;
pub use types::*;
