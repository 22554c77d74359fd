//! # Fleet Common Library
//!
//! Shared code for the fleet import tooling:
//! - Error type used at the record-store boundary
//! - TOML bootstrap configuration and path resolution
//! - Date helpers shared by matchers and the commit path

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
