//! promptreel library crate.
//!
//! Text-to-video generation across queue-based backends with ordered
//! fallback, plus the configuration that wires providers together.

pub mod config;
pub mod generate;
