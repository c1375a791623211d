pub mod builder;
pub mod speed;

pub use builder::{BuildError, TravelAnomalyBuilder};
pub use speed::{haversine_miles, implied_speed_mph, SUSPICIOUS_SPEED_MPH};
