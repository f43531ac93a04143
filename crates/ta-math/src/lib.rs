//! Traffic anomaly math utilities.

pub mod math;

pub use math::isolation::*;
pub use math::robust::*;
pub use math::scale::*;
