//! Verforge - on-demand builder for versioned binaries
//!
//! This library builds binaries of a source repository at specific versions
//! for many concurrent callers, typically test processes that each need a
//! set of historical releases. Each version is built at most once per
//! resolution cycle, on a single background worker, and every caller waiting
//! on it receives the outcome.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Build coordination, release selection, configuration
//! - [`infra`] - Infrastructure layer (git, processes, HTTP, directories)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
