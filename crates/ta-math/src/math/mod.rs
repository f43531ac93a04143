//! Core math modules.

pub mod isolation;
pub mod robust;
pub mod scale;
