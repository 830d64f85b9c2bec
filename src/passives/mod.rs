//! Always-on, level-scaled passive modifiers.

#![allow(unused_imports)]

pub mod data;
pub mod manager;
pub mod types;

pub use data::*;
pub use manager::*;
pub use types::*;
