//! Travel anomaly pipeline
//!
//! Orchestrates one login check end to end: persist the attempt, locate the
//! current IP, rank the user's time-adjacent attempts, geolocate them, and
//! attach implied travel speeds with suspicion verdicts.

use std::sync::Arc;

use thiserror::Error;

use crate::detection::speed::{implied_speed_mph, SUSPICIOUS_SPEED_MPH};
use crate::models::{GeoLocation, LoginAttempt, TravelResponse};
use crate::persistence::{LocationStore, StoreError};

/// Errors that abort the travel response pipeline
///
/// Only the persist step and the current-location lookup are fatal; neighbor
/// resolution degrades the response instead of failing it.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("login could not be saved")]
    SaveRejected,

    #[error("failed to persist login: {0}")]
    Persistence(#[source] StoreError),

    #[error("could not retrieve location: {0}")]
    Location(#[source] StoreError),
}

/// Builds a [`TravelResponse`] for each incoming login attempt
pub struct TravelAnomalyBuilder {
    store: Arc<dyn LocationStore>,
    suspicious_speed_mph: i64,
}

impl TravelAnomalyBuilder {
    /// Create a builder with the default suspicion threshold.
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        TravelAnomalyBuilder {
            store,
            suspicious_speed_mph: SUSPICIOUS_SPEED_MPH,
        }
    }

    /// Create a builder with a custom suspicion threshold in mph.
    pub fn with_threshold(store: Arc<dyn LocationStore>, suspicious_speed_mph: i64) -> Self {
        TravelAnomalyBuilder {
            store,
            suspicious_speed_mph,
        }
    }

    /// Run the detection pipeline for one login attempt.
    pub fn build(&self, request: &LoginAttempt) -> Result<TravelResponse, BuildError> {
        match self.store.persist(request) {
            Ok(true) => {}
            Ok(false) => return Err(BuildError::SaveRejected),
            Err(e) => return Err(BuildError::Persistence(e)),
        }

        let current = self
            .store
            .locate(&request.ip_address)
            .map_err(BuildError::Location)?;

        // Everything below is best-effort enrichment: no step aborts the
        // response. Missing neighbors are the normal edge of history.
        let (previous, future) = match self.store.find_adjacent(
            &request.username,
            &request.ip_address,
            request.unix_timestamp,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!(
                    "Adjacent login lookup failed for '{}': {}",
                    request.username,
                    e
                );
                (None, None)
            }
        };

        let (previous_location, travel_from_suspicious) = match previous {
            Some(ref login) => {
                let (location, suspicious) = self.neighbor_location(login, request, &current);
                (Some(location), suspicious)
            }
            None => (None, false),
        };

        let (future_location, travel_to_suspicious) = match future {
            Some(ref login) => {
                let (location, suspicious) = self.neighbor_location(login, request, &current);
                (Some(location), suspicious)
            }
            None => (None, false),
        };

        Ok(TravelResponse {
            current_geo: current,
            previous_location,
            future_location,
            travel_to_current_geo_suspicious: travel_to_suspicious,
            travel_from_current_geo_suspicious: travel_from_suspicious,
        })
    }

    /// Resolve a neighbor's location and its implied speed relative to the
    /// current attempt, in chronological order.
    ///
    /// A lookup fault is absorbed: the neighbor keeps the zero-value
    /// location. Speed is attached only when both endpoints are known;
    /// computing a distance against the zero value would fabricate travel
    /// from (0,0).
    fn neighbor_location(
        &self,
        neighbor: &LoginAttempt,
        request: &LoginAttempt,
        current: &GeoLocation,
    ) -> (GeoLocation, bool) {
        let mut location = match self.store.locate(&neighbor.ip_address) {
            Ok(location) => location,
            Err(e) => {
                log::warn!(
                    "Location lookup failed for neighbor IP {}: {}",
                    neighbor.ip_address,
                    e
                );
                GeoLocation::default()
            }
        };

        location.ip = Some(neighbor.ip_address.clone());
        location.time_stamp = Some(neighbor.unix_timestamp);

        if location.is_unknown() || current.is_unknown() {
            return (location, false);
        }

        let speed = if neighbor.unix_timestamp < request.unix_timestamp {
            implied_speed_mph(neighbor, request, &location, current)
        } else {
            implied_speed_mph(request, neighbor, current, &location)
        };

        location.speed = Some(speed);
        (location, speed > self.suspicious_speed_mph)
    }
}
