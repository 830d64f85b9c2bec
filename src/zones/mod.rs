//! Level-banded zones and their monster pools.

mod data;
mod progression;

#[allow(unused_imports)]
pub use data::*;
#[allow(unused_imports)]
pub use progression::*;
