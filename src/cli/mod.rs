//! Command line interface module
//!
//! Parses arguments, applies environment overrides and hands the resulting
//! configuration to the sync pipeline.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
