//! Core types and constants for the range-finding engine

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
