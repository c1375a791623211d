pub mod login;

pub use login::{GeoLocation, LoginAttempt, TravelResponse};
