//! GPU-aware ffmpeg front end.
//!
//! [`gpu`] finds the graphics hardware on the host, [`engine`] turns the
//! primary GPU into an ffmpeg command line and runs it with software
//! fallbacks, and [`player`] offers to play the result.

pub mod config;
pub mod engine;
pub mod gpu;
pub mod log;
pub mod player;
