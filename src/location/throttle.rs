use std::time::Duration;

use tokio::time::Instant;

use crate::models::Coordinates;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters (haversine).
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Coarse delivery filter for continuous tracking: a reading passes when the device
/// moved at least `min_distance_m` or `min_interval` elapsed since the last delivery.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    min_distance_m: f64,
    last: Option<(Coordinates, Instant)>,
}

impl Throttle {
    pub fn new(min_interval: Duration, min_distance_m: f64) -> Self {
        Self {
            min_interval,
            min_distance_m,
            last: None,
        }
    }

    pub fn admit(&mut self, coords: Coordinates, now: Instant) -> bool {
        let pass = match self.last {
            None => true,
            Some((previous, at)) => {
                distance_meters(previous, coords) >= self.min_distance_m
                    || now.saturating_duration_since(at) >= self.min_interval
            }
        };
        if pass {
            self.last = Some((coords, now));
        }
        pass
    }
}
