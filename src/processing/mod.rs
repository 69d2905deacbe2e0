//! Tide correction, statistics and measurement assembly

pub mod stats;
pub mod tide;
pub mod assembler;

pub use tide::{TideSample, TideSeries};
pub use assembler::{compute, Measurement, MeasurementRequest, Method};
