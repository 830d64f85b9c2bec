//! Battle sessions, turn order, rest and the engine that drives them.

#![allow(unused_imports)]

mod enemy_turn;
pub mod manager;
mod player_turn;
pub mod rest;
pub mod results;
pub mod rewards;
pub mod session;
pub mod spawn;
pub mod stats;
pub mod threat;
pub mod turn_order;

pub use manager::*;
pub use rest::*;
pub use results::*;
pub use rewards::*;
pub use session::*;
pub use spawn::*;
pub use stats::*;
pub use threat::*;
pub use turn_order::*;
