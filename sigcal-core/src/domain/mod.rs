//! Domain types shared across the calibration engine.

pub mod bar;

pub use bar::{is_strictly_ordered, Bar};
