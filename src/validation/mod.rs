//! Error taxonomy shared by every engine component

pub mod error;

pub use error::{RangeError, RangeResult};
