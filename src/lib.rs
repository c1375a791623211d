pub mod api;
pub mod config;
pub mod detection;
pub mod models;
pub mod persistence;

// Re-export commonly used types
pub use detection::{BuildError, TravelAnomalyBuilder, SUSPICIOUS_SPEED_MPH};
pub use models::{GeoLocation, LoginAttempt, TravelResponse};
pub use persistence::{LocationStore, SqliteLocationStore, StoreError};
