//! Deterministic streaming tile-world engine
//!
//! Generates an unbounded 2D tile world around a moving observer: noise
//! fields drive weighted terrain selection per cell, multi-cell presets are
//! stamped under spacing and priority rules, and a throttled streaming
//! manager keeps the chunks near the observer pushed to an external
//! render/collision surface. Re-exports modules for use by the demo binary
//! and downstream crates.

pub mod chunk;
pub mod config;
pub mod export;
pub mod generation;
pub mod noise_field;
pub mod presets;
pub mod seeds;
pub mod streaming;
pub mod surface;
pub mod terrain;
