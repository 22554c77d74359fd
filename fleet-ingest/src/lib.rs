//! # fleet-ingest
//!
//! Reconciles extracted equipment records against a fleet registry and
//! commits the result.
//!
//! **Flow:**
//! normalize → match → detect duplicates / group fragments → merge →
//! session overrides → three-pass commit → record store
//!
//! The record store is a trait ([`store::RecordStore`]); [`db`] provides a
//! SQLite implementation.

pub mod commit;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod store;

pub use commit::CommitExecutor;
pub use config::{CommitOptions, MatchPolicy};
pub use error::{IngestError, IngestResult};
pub use session::ImportSession;
pub use store::RecordStore;
