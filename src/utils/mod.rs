//! Utility Module
//!
//! - [`FrameClock`]: frame delta, elapsed time and frame rate for the draw loop

pub mod time;

pub use time::FrameClock;
