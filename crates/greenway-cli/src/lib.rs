//! Greenway CLI library.
//!
//! Command handlers and output formatting for the `greenway-cli` binary.

pub mod commands;
pub mod output;
