//! Persistence contracts and in-memory implementations.

#![allow(unused_imports)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::*;
pub use memory::*;
pub use traits::*;
