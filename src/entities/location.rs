use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 point. Latitude in [-90, 90], longitude in [-180, 180]; ranges are
/// a caller contract, not validated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` via the haversine formula, in
    /// kilometres rounded to two decimal places.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1 = self.lat.to_radians();
        let lng1 = self.lng.to_radians();
        let lat2 = other.lat.to_radians();
        let lng2 = other.lng.to_radians();

        let dlat = lat2 - lat1;
        let dlng = lng2 - lng1;

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        let distance = EARTH_RADIUS_KM * c;
        (distance * 100.0).round() / 100.0
    }
}

#[test]
fn distance_is_symmetric_and_zero_on_self() {
    let a = Coordinates::new(10.762622, 106.660172);
    let b = Coordinates::new(10.771513, 106.698660);

    assert_eq!(a.distance_km(&b), b.distance_km(&a));
    assert_eq!(a.distance_km(&a), 0.0);
}

#[test]
fn distance_matches_ho_chi_minh_city_fixture() {
    let pickup = Coordinates::new(10.762622, 106.660172);
    let dropoff = Coordinates::new(10.771513, 106.698660);

    let distance = pickup.distance_km(&dropoff);
    assert!(
        distance >= 3.82 && distance <= 3.84,
        "unexpected distance: {}",
        distance
    );
}

#[test]
fn distance_is_rounded_to_two_decimals() {
    let a = Coordinates::new(10.0, 106.0);
    let b = Coordinates::new(10.5, 106.5);

    let distance = a.distance_km(&b);
    assert_eq!((distance * 100.0).round() / 100.0, distance);
}
