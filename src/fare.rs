use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, VehicleType};

/// Hours (24h, local time) during which surge pricing applies.
const RUSH_HOURS: [(u32, u32); 2] = [(7, 9), (17, 19)];

/// Distance below which only the base fare is charged, in km.
const MIN_BILLABLE_DISTANCE_KM: f64 = 2.0;

/// Minutes included in the base fare before the per-minute rate kicks in.
const FREE_TIME_MINUTES: i64 = 10;

/// Assumed average urban speed for trip time estimation.
const AVG_SPEED_KMH: f64 = 30.0;

/// Per-vehicle-type pricing, in whole VND.
struct Rates {
    base_fare: i64,
    distance_rate: i64,
    time_rate: i64,
}

fn rates_for(vehicle_type: VehicleType) -> Rates {
    match vehicle_type {
        VehicleType::Bike => Rates {
            base_fare: 10_000,
            distance_rate: 3_000,
            time_rate: 500,
        },
        VehicleType::Car4Seats => Rates {
            base_fare: 20_000,
            distance_rate: 8_000,
            time_rate: 1_000,
        },
        VehicleType::Car7Seats => Rates {
            base_fare: 30_000,
            distance_rate: 12_000,
            time_rate: 1_500,
        },
    }
}

/// The itemized price of a trip. All amounts are whole VND; money never
/// touches binary floating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub distance_km: f64,
    pub base_fare: i64,
    pub distance_fare: i64,
    pub time_fare: i64,
    pub surge_fare: i64,
    pub subtotal: i64,
    pub total_fare: i64,
    pub is_rush_hour: bool,
}

/// Computes trip prices. Stateless and infallible: every input produces a
/// breakdown. Constructed explicitly and injected into the engine.
#[derive(Debug, Clone, Default)]
pub struct FareEngine;

impl FareEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn is_rush_hour(&self, check_time: DateTime<Local>) -> bool {
        let hour = check_time.hour();

        RUSH_HOURS
            .iter()
            .any(|&(start, end)| hour >= start && hour < end)
    }

    /// Estimated travel time in whole minutes, from an average-speed model.
    /// Ties round to even, the same convention as the surge charge.
    pub fn estimate_trip_time(&self, distance_km: f64) -> i64 {
        // Work in hundredths of a minute so the tie check is exact.
        let centi_minutes = (distance_km / AVG_SPEED_KMH * 6000.0).round() as i64;

        let minutes = centi_minutes / 100;
        let remainder = centi_minutes % 100;

        if remainder > 50 || (remainder == 50 && minutes % 2 != 0) {
            minutes + 1
        } else {
            minutes
        }
    }

    /// Full breakdown for a pickup/dropoff pair at `check_time`.
    pub fn calculate_fare(
        &self,
        pickup: Coordinates,
        dropoff: Coordinates,
        vehicle_type: VehicleType,
        estimated_minutes: i64,
        check_time: DateTime<Local>,
    ) -> FareBreakdown {
        let distance_km = pickup.distance_km(&dropoff);
        self.fare_for_distance(distance_km, vehicle_type, estimated_minutes, check_time)
    }

    /// Breakdown for an already-known distance. Distance carries at most two
    /// decimal places, so the per-km charge below is exact integer math.
    pub fn fare_for_distance(
        &self,
        distance_km: f64,
        vehicle_type: VehicleType,
        estimated_minutes: i64,
        check_time: DateTime<Local>,
    ) -> FareBreakdown {
        let rates = rates_for(vehicle_type);

        let base_fare = rates.base_fare;
        let distance_fare = distance_fare(distance_km, rates.distance_rate);
        let time_fare = time_fare(estimated_minutes, rates.time_rate);

        let subtotal = base_fare + distance_fare + time_fare;

        let is_rush_hour = self.is_rush_hour(check_time);
        let surge_fare = if is_rush_hour {
            half_rounded_to_even(subtotal)
        } else {
            0
        };

        // Totals are settled down to the nearest 1000 VND.
        let total_fare = (subtotal + surge_fare) / 1000 * 1000;

        FareBreakdown {
            distance_km,
            base_fare,
            distance_fare,
            time_fare,
            surge_fare,
            subtotal,
            total_fare,
            is_rush_hour,
        }
    }
}

fn distance_fare(distance_km: f64, rate: i64) -> i64 {
    if distance_km <= MIN_BILLABLE_DISTANCE_KM {
        return 0;
    }

    // Work in hundredths of a km so the multiplication stays integral.
    let billable_centi_km = ((distance_km - MIN_BILLABLE_DISTANCE_KM) * 100.0).round() as i64;
    billable_centi_km * rate / 100
}

fn time_fare(estimated_minutes: i64, rate: i64) -> i64 {
    if estimated_minutes <= FREE_TIME_MINUTES {
        return 0;
    }

    (estimated_minutes - FREE_TIME_MINUTES) * rate
}

/// Surge is half the subtotal, rounded to the nearest whole VND with ties to
/// even (the convention the billing side already settles with).
fn half_rounded_to_even(n: i64) -> i64 {
    let half = n / 2;
    if n % 2 == 0 || half % 2 == 0 {
        half
    } else {
        half + 1
    }
}

#[cfg(test)]
use chrono::TimeZone;

#[cfg(test)]
fn at_hour(hour: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 1, 6, hour, 0, 0).unwrap()
}

#[test]
fn short_bike_trip_charges_base_fare_only() {
    let engine = FareEngine::new();
    let fare = engine.fare_for_distance(1.0, VehicleType::Bike, 0, at_hour(14));

    assert_eq!(fare.base_fare, 10_000);
    assert_eq!(fare.distance_fare, 0);
    assert_eq!(fare.time_fare, 0);
    assert_eq!(fare.surge_fare, 0);
    assert!(!fare.is_rush_hour);
    assert_eq!(fare.total_fare, 10_000);
}

#[test]
fn car_trip_in_rush_hour_applies_surge_and_rounds_down() {
    let engine = FareEngine::new();
    let fare = engine.fare_for_distance(5.0, VehicleType::Car4Seats, 15, at_hour(8));

    assert_eq!(fare.base_fare, 20_000);
    assert_eq!(fare.distance_fare, 24_000); // (5.0 - 2.0) * 8000
    assert_eq!(fare.time_fare, 5_000); // (15 - 10) * 1000
    assert_eq!(fare.subtotal, 49_000);
    assert!(fare.is_rush_hour);
    assert_eq!(fare.surge_fare, 24_500);
    assert_eq!(fare.total_fare, 73_000); // 73500 settled down to 1000s
}

#[test]
fn fractional_distance_charge_is_exact() {
    let engine = FareEngine::new();
    let fare = engine.fare_for_distance(3.17, VehicleType::Bike, 0, at_hour(14));

    // 1.17 km over the minimum at 3000 VND/km
    assert_eq!(fare.distance_fare, 3_510);
    assert_eq!(fare.subtotal, 13_510);
    assert_eq!(fare.total_fare, 13_000);
}

#[test]
fn rush_hour_windows_are_half_open() {
    let engine = FareEngine::new();

    assert!(engine.is_rush_hour(at_hour(7)));
    assert!(engine.is_rush_hour(at_hour(8)));
    assert!(!engine.is_rush_hour(at_hour(9)));
    assert!(engine.is_rush_hour(at_hour(17)));
    assert!(engine.is_rush_hour(at_hour(18)));
    assert!(!engine.is_rush_hour(at_hour(19)));
    assert!(!engine.is_rush_hour(at_hour(0)));
}

#[test]
fn trip_time_uses_average_speed_model() {
    let engine = FareEngine::new();

    assert_eq!(engine.estimate_trip_time(3.83), 8); // 7.66 min
    assert_eq!(engine.estimate_trip_time(30.0), 60);
    assert_eq!(engine.estimate_trip_time(0.0), 0);
}

#[test]
fn trip_time_ties_round_to_even() {
    let engine = FareEngine::new();

    assert_eq!(engine.estimate_trip_time(3.25), 6); // 6.5 min
    assert_eq!(engine.estimate_trip_time(3.75), 8); // 7.5 min
    assert_eq!(engine.estimate_trip_time(0.25), 0); // 0.5 min
}

#[test]
fn fare_from_coordinates_uses_haversine_distance() {
    let engine = FareEngine::new();
    let pickup = Coordinates::new(10.762622, 106.660172);
    let dropoff = Coordinates::new(10.771513, 106.698660);

    let fare = engine.calculate_fare(pickup, dropoff, VehicleType::Bike, 0, at_hour(14));

    assert!(fare.distance_km >= 3.82 && fare.distance_km <= 3.84);
    assert!(fare.distance_fare > 0);
}

#[test]
fn surge_ties_round_to_even() {
    assert_eq!(half_rounded_to_even(49_000), 24_500);
    assert_eq!(half_rounded_to_even(10_001), 5_000); // 5000.5 -> 5000
    assert_eq!(half_rounded_to_even(10_003), 5_002); // 5001.5 -> 5002
}
