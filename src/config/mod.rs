//! Configuration constants
//!
//! - [`defaults`] - Default values for tunables
//! - [`urls`] - Default service URLs

pub mod defaults;
pub mod urls;
