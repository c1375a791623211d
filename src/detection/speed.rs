//! Implied travel speed between geolocated login attempts

use crate::models::{GeoLocation, LoginAttempt};

/// Travel speed above which a login pair is considered geographically
/// suspicious, in mph. Roughly commercial-flight cruising speed; the
/// builder accepts an override, this is the default policy.
pub const SUSPICIOUS_SPEED_MPH: i64 = 500;

const EARTH_RADIUS_MI: f64 = 3959.0;

/// Great-circle distance between two locations using the Haversine formula
/// on a spherical Earth approximation. Returns distance in miles.
pub fn haversine_miles(from: &GeoLocation, to: &GeoLocation) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_MI * c
}

/// Implied travel speed between two logins, in whole mph.
///
/// Elapsed time is the timestamp difference truncated to whole hours. Two
/// logins inside the same whole hour have no finite implied speed: distinct
/// locations saturate to `i64::MAX` (travel in zero time), coincident
/// locations evaluate to 0 mph. Callers pass the logins in chronological
/// order.
pub fn implied_speed_mph(
    from: &LoginAttempt,
    to: &LoginAttempt,
    from_location: &GeoLocation,
    to_location: &GeoLocation,
) -> i64 {
    let elapsed_hours = (to.unix_timestamp - from.unix_timestamp) / 3600;
    let distance_mi = haversine_miles(from_location, to_location);

    if elapsed_hours == 0 {
        return if distance_mi > 0.0 { i64::MAX } else { 0 };
    }

    (distance_mi / elapsed_hours as f64) as i64
}
