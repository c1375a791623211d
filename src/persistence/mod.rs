//! Persistence module for login history and network-block lookups
//!
//! This module provides the narrow storage interface the detection pipeline
//! runs against: persist a login attempt, resolve an IP to a geographic
//! location, and rank a user's time-adjacent attempts.

pub mod sqlite_store;

pub use sqlite_store::SqliteLocationStore;

use crate::models::{GeoLocation, LoginAttempt};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

/// Trait for login/location storage backends
///
/// Implementations must give read-your-writes semantics: a `find_adjacent`
/// call issued after `persist` returns must observe that write. An
/// eventually-consistent backend would silently break neighbor detection.
pub trait LocationStore: Send + Sync {
    /// Record a login attempt.
    ///
    /// Returns `Ok(false)` when the underlying write reports no rows
    /// affected. Writes are never retried.
    fn persist(&self, login: &LoginAttempt) -> Result<bool, StoreError>;

    /// Resolve an IP address (or CIDR range) to the geographic location of
    /// the most specific network block containing it.
    ///
    /// No containing block is not an error: the zero-value `GeoLocation` is
    /// returned, and callers must treat it as "location unknown".
    fn locate(&self, ip_address: &str) -> Result<GeoLocation, StoreError>;

    /// Find the chronologically nearest prior and subsequent login attempts
    /// for `username`, excluding any attempt from `current_ip` itself.
    ///
    /// Attempts are ranked by timestamp descending; the two rows adjacent in
    /// rank to the row matching `current_ip` are classified by whether they
    /// fall before or after `current_timestamp`. If the current attempt is
    /// not present in the ranked window, both sides are `None`.
    fn find_adjacent(
        &self,
        username: &str,
        current_ip: &str,
        current_timestamp: i64,
    ) -> Result<(Option<LoginAttempt>, Option<LoginAttempt>), StoreError>;
}
