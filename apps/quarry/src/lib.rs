//! # quarry
//!
//! Application layer around `quarry-core`: command line, configuration file,
//! HTTP query sources and terminal progress.

pub mod cli;
pub mod config;
pub mod progress;
pub mod remote;
