//! Core bootstrap engine for the store rating database.
//!
//! This crate brings a MySQL-compatible database to a known-good state:
//! required tables, indexes, and baseline rows all exist afterwards, and
//! running it again is always safe. It is consumed by the `storeseed-init`
//! CLI.
//!
//! # Guarantees
//! - Idempotent: statements and seed rows that already exist are skipped,
//!   detected by structured MySQL error number rather than message text
//! - Sequential: statements run strictly in source order on one connection
//! - Credentials are bcrypt-hashed before storage and redacted from all
//!   log and error output
//! - The connection is released on every exit path, including failures
//!
//! # Architecture
//! - [`config::DatabaseConfig`] - explicit, validated connection parameters
//! - [`script::SqlScript`] - quote-aware statement splitting
//! - [`bootstrap::Bootstrapper`] - the idempotent execution engine
//! - [`seed::SeedPlan`] - baseline rows with hashed credentials

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod script;
pub mod seed;

// Re-export commonly used types
pub use bootstrap::{BootstrapOutcome, Bootstrapper, MARKER_TABLE, RunState, ScriptReport};
pub use config::{ConfigSource, DatabaseConfig, DEFAULT_DATABASE};
pub use error::{BootstrapError, Result};
pub use logging::init_logging;
pub use script::{SqlScript, Statement};
pub use seed::{ADMIN_EMAIL, Role, SeedPlan, SeedReport, SeedStore, SeedUser};
