//! Shared types for the vital-sign monitor
//!
//! This crate contains the configuration and data types exchanged between the
//! filter pipeline, the sample sources and the monitor daemon.

pub mod config;
pub mod data;

// Re-export commonly used types
pub use config::*;
pub use data::*;
