//! Monster templates, live instances and their AI.

#![allow(unused_imports)]

pub mod ai;
pub mod types;

pub use ai::*;
pub use types::*;
