use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single login submission: who logged in, when, and from where.
///
/// One row is persisted per submission. Duplicates are permitted by design;
/// there is no uniqueness constraint on the stored history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub username: String,
    #[serde(rename = "unixTimestamp")]
    pub unix_timestamp: i64,
    #[serde(rename = "eventUUID")]
    pub event_uuid: Uuid,
    /// Source address, dotted-quad or CIDR
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
}

/// Geographic centroid and uncertainty radius of a network block.
///
/// The zero value means "location unknown", never a real position at (0,0).
/// The optional fields are attached to neighbor locations after lookup and
/// speed evaluation, and are omitted from JSON when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in kilometers
    pub radius: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(rename = "timeStamp", skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<i64>,
    /// Implied travel speed relative to the current attempt, in mph
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
}

impl GeoLocation {
    /// Whether this is the zero-value "no block matched" outcome.
    pub fn is_unknown(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0 && self.radius == 0
    }
}

/// Response for one login attempt: the current location plus the
/// chronologically adjacent logins and their suspicion verdicts.
///
/// `previous_location` and `future_location` are omitted entirely when the
/// user has no neighbor on that side of the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelResponse {
    #[serde(rename = "currentGeo")]
    pub current_geo: GeoLocation,
    #[serde(rename = "previousLocation", skip_serializing_if = "Option::is_none")]
    pub previous_location: Option<GeoLocation>,
    #[serde(rename = "futureLocation", skip_serializing_if = "Option::is_none")]
    pub future_location: Option<GeoLocation>,
    #[serde(rename = "travelToCurrentGeoSuspicious")]
    pub travel_to_current_geo_suspicious: bool,
    #[serde(rename = "travelFromCurrentGeoSuspicious")]
    pub travel_from_current_geo_suspicious: bool,
}
