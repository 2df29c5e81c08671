use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Role, User};
use crate::entities::Coordinates;
use crate::error::{authorization_error, invalid_state_error, validation_error, Error};
use crate::fare::FareBreakdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "bike")]
    Bike,
    #[serde(rename = "car_4seats")]
    Car4Seats,
    #[serde(rename = "car_7seats")]
    Car7Seats,
}

impl VehicleType {
    /// Parses a wire name. Unrecognized names fall back to `bike`, mirroring
    /// the pricing table's default rate. Known quirk, kept on purpose.
    pub fn from_name(name: &str) -> Self {
        match name {
            "car_4seats" => Self::Car4Seats,
            "car_7seats" => Self::Car7Seats,
            _ => Self::Bike,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bike => "bike",
            Self::Car4Seats => "car_4seats",
            Self::Car7Seats => "car_7seats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    FindingDriver,
    DriverAssigned,
    DriverArriving,
    PassengerPickedUp,
    Completed,
    CancelledByPassenger,
    CancelledByDriver,
    CancelledBySystem,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FindingDriver => "finding_driver",
            Self::DriverAssigned => "driver_assigned",
            Self::DriverArriving => "driver_arriving",
            Self::PassengerPickedUp => "passenger_picked_up",
            Self::Completed => "completed",
            Self::CancelledByPassenger => "cancelled_by_passenger",
            Self::CancelledByDriver => "cancelled_by_driver",
            Self::CancelledBySystem => "cancelled_by_system",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::CancelledByPassenger
                | Self::CancelledByDriver
                | Self::CancelledBySystem
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::CancelledByPassenger | Self::CancelledByDriver | Self::CancelledBySystem
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Wallet,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Who may drive a trip into a given target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Authority {
    OwningPassenger,
    AssignedDriver,
    System,
}

/// Every non-terminal status; cancellations branch off from any of these.
const CANCELLABLE: &[Status] = &[
    Status::FindingDriver,
    Status::DriverAssigned,
    Status::DriverArriving,
    Status::PassengerPickedUp,
];

/// The transition table: target status -> (legal source statuses, required
/// authority). Checked centrally by `Trip::transition` and
/// `Trip::assign_driver`; there are no per-endpoint role checks.
const TRANSITIONS: &[(Status, &[Status], Authority)] = &[
    (
        Status::DriverAssigned,
        &[Status::FindingDriver],
        Authority::System,
    ),
    (
        Status::DriverArriving,
        &[Status::DriverAssigned],
        Authority::AssignedDriver,
    ),
    (
        Status::PassengerPickedUp,
        &[Status::DriverArriving],
        Authority::AssignedDriver,
    ),
    (
        Status::Completed,
        &[Status::PassengerPickedUp],
        Authority::AssignedDriver,
    ),
    (
        Status::CancelledByPassenger,
        CANCELLABLE,
        Authority::OwningPassenger,
    ),
    (
        Status::CancelledByDriver,
        CANCELLABLE,
        Authority::AssignedDriver,
    ),
    (Status::CancelledBySystem, CANCELLABLE, Authority::System),
];

fn transition_rule(target: Status) -> Option<(&'static [Status], Authority)> {
    TRANSITIONS
        .iter()
        .find(|(t, _, _)| *t == target)
        .map(|(_, sources, authority)| (*sources, *authority))
}

/// Inbound payload for creating a trip. Field names match the wire contract
/// of the surrounding platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: String,
    #[serde(default)]
    pub pickup_note: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub dropoff_address: String,
    #[serde(default)]
    pub dropoff_note: String,
    pub vehicle_type: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl TripRequest {
    pub fn pickup(&self) -> Coordinates {
        Coordinates::new(self.pickup_lat, self.pickup_lng)
    }

    pub fn dropoff(&self) -> Coordinates {
        Coordinates::new(self.dropoff_lat, self.dropoff_lng)
    }

    pub fn vehicle(&self) -> VehicleType {
        VehicleType::from_name(&self.vehicle_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: Status,

    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: String,
    pub pickup_note: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub dropoff_address: String,
    pub dropoff_note: String,

    pub vehicle_type: VehicleType,

    pub distance_km: f64,
    pub base_fare: i64,
    pub distance_fare: i64,
    pub time_fare: i64,
    pub estimated_fare: i64,
    pub actual_fare: Option<i64>,

    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,

    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub driver_accepted_at: Option<DateTime<Utc>>,
    pub driver_arrived_at: Option<DateTime<Utc>>,
    pub trip_started_at: Option<DateTime<Utc>>,
    pub trip_completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Trip {
    pub fn new(passenger_id: Uuid, request: TripRequest, fare: FareBreakdown) -> Self {
        let vehicle_type = request.vehicle();

        Self {
            id: Uuid::new_v4(),
            passenger_id,
            driver_id: None,
            status: Status::FindingDriver,
            pickup_lat: request.pickup_lat,
            pickup_lng: request.pickup_lng,
            pickup_address: request.pickup_address,
            pickup_note: request.pickup_note,
            dropoff_lat: request.dropoff_lat,
            dropoff_lng: request.dropoff_lng,
            dropoff_address: request.dropoff_address,
            dropoff_note: request.dropoff_note,
            vehicle_type,
            distance_km: fare.distance_km,
            base_fare: fare.base_fare,
            distance_fare: fare.distance_fare,
            time_fare: fare.time_fare,
            estimated_fare: fare.total_fare,
            actual_fare: None,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Pending,
            cancelled_by: None,
            cancellation_reason: None,
            created_at: Utc::now(),
            driver_accepted_at: None,
            driver_arrived_at: None,
            trip_started_at: None,
            trip_completed_at: None,
            cancelled_at: None,
        }
    }

    pub fn pickup(&self) -> Coordinates {
        Coordinates::new(self.pickup_lat, self.pickup_lng)
    }

    pub fn is_finding_driver(&self) -> bool {
        self.status == Status::FindingDriver
    }

    /// Only the trip's passenger, its assigned driver, or system may read it.
    pub fn authorize_read(&self, user: &User) -> Result<(), Error> {
        if user.is_system() || user.id == self.passenger_id || Some(user.id) == self.driver_id {
            return Ok(());
        }

        Err(authorization_error())
    }

    /// Assigns a driver, transitioning `finding_driver -> driver_assigned`.
    ///
    /// Callers must hold exclusive access to the trip for the whole
    /// read-check-write; under a race the first writer wins and the second
    /// observes `invalid state` here.
    #[tracing::instrument(skip(self), fields(trip_id = %self.id))]
    pub fn assign_driver(&mut self, user: &User, driver_id: Uuid) -> Result<(), Error> {
        self.check_authority(user, Authority::System)?;

        if self.status != Status::FindingDriver {
            return Err(invalid_state_error());
        }

        // A driver id, once set, never changes or clears.
        if self.driver_id.is_some() {
            return Err(invalid_state_error());
        }

        self.driver_id = Some(driver_id);
        self.status = Status::DriverAssigned;
        self.driver_accepted_at = Some(Utc::now());

        Ok(())
    }

    /// Applies a lifecycle transition after checking the transition table.
    ///
    /// Authorization is checked before the source status, so an actor with no
    /// claim on the trip always sees an authorization error rather than
    /// learning about its state.
    #[tracing::instrument(skip(self, reason), fields(trip_id = %self.id))]
    pub fn transition(
        &mut self,
        user: &User,
        target: Status,
        reason: Option<String>,
    ) -> Result<(), Error> {
        if target == Status::DriverAssigned || target == Status::FindingDriver {
            // assignment goes through assign_driver; finding_driver is
            // creation-only
            return Err(validation_error());
        }

        let (sources, authority) = transition_rule(target).ok_or_else(validation_error)?;

        self.check_authority(user, authority)?;

        if !sources.contains(&self.status) {
            return Err(invalid_state_error());
        }

        let now = Utc::now();
        match target {
            Status::DriverArriving => self.driver_arrived_at = Some(now),
            Status::PassengerPickedUp => self.trip_started_at = Some(now),
            Status::Completed => {
                self.trip_completed_at = Some(now);
                // settled at the estimate; adjustments are a billing concern
                self.actual_fare = Some(self.estimated_fare);
            }
            Status::CancelledByPassenger
            | Status::CancelledByDriver
            | Status::CancelledBySystem => {
                self.cancelled_by = Some(user.id);
                self.cancelled_at = Some(now);
                self.cancellation_reason = reason;
            }
            Status::FindingDriver | Status::DriverAssigned => unreachable!(),
        }

        self.status = target;

        Ok(())
    }

    fn check_authority(&self, user: &User, authority: Authority) -> Result<(), Error> {
        let permitted = match authority {
            Authority::System => user.role == Role::System,
            Authority::OwningPassenger => {
                user.role == Role::Passenger && user.id == self.passenger_id
            }
            Authority::AssignedDriver => {
                user.role == Role::Driver && Some(user.id) == self.driver_id
            }
        };

        if permitted {
            Ok(())
        } else {
            Err(authorization_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fare::FareEngine;
    use chrono::{Local, TimeZone};

    fn request() -> TripRequest {
        TripRequest {
            pickup_lat: 10.762622,
            pickup_lng: 106.660172,
            pickup_address: "UIT, Linh Trung".into(),
            pickup_note: String::new(),
            dropoff_lat: 10.771513,
            dropoff_lng: 106.698660,
            dropoff_address: "Ben Thanh Market".into(),
            dropoff_note: String::new(),
            vehicle_type: "bike".into(),
            payment_method: Some(PaymentMethod::Cash),
        }
    }

    fn new_trip(passenger: &User) -> Trip {
        let req = request();
        let fare = FareEngine::new().calculate_fare(
            req.pickup(),
            req.dropoff(),
            req.vehicle(),
            0,
            Local.with_ymd_and_hms(2025, 1, 6, 14, 0, 0).unwrap(),
        );

        Trip::new(passenger.id, req, fare)
    }

    #[test]
    fn unknown_vehicle_type_falls_back_to_bike() {
        assert_eq!(VehicleType::from_name("limousine"), VehicleType::Bike);
        assert_eq!(VehicleType::from_name("car_7seats"), VehicleType::Car7Seats);
    }

    #[test]
    fn full_lifecycle_sets_each_timestamp_once() {
        let passenger = User::passenger(Uuid::new_v4());
        let system = User::new_system_user();
        let mut trip = new_trip(&passenger);
        let driver = User::driver(Uuid::new_v4());

        assert_eq!(trip.status, Status::FindingDriver);
        assert!(trip.driver_id.is_none());

        trip.assign_driver(&system, driver.id).unwrap();
        assert_eq!(trip.status, Status::DriverAssigned);
        assert_eq!(trip.driver_id, Some(driver.id));
        assert!(trip.driver_accepted_at.is_some());

        trip.transition(&driver, Status::DriverArriving, None).unwrap();
        trip.transition(&driver, Status::PassengerPickedUp, None)
            .unwrap();
        trip.transition(&driver, Status::Completed, None).unwrap();

        assert_eq!(trip.status, Status::Completed);
        assert!(trip.driver_arrived_at.is_some());
        assert!(trip.trip_started_at.is_some());
        assert!(trip.trip_completed_at.is_some());
        assert_eq!(trip.actual_fare, Some(trip.estimated_fare));
        assert!(trip.cancelled_at.is_none());

        assert!(trip.driver_accepted_at <= trip.driver_arrived_at);
        assert!(trip.driver_arrived_at <= trip.trip_started_at);
        assert!(trip.trip_started_at <= trip.trip_completed_at);
    }

    #[test]
    fn assignment_is_rejected_outside_finding_driver() {
        let passenger = User::passenger(Uuid::new_v4());
        let system = User::new_system_user();
        let mut trip = new_trip(&passenger);

        trip.assign_driver(&system, Uuid::new_v4()).unwrap();

        let err = trip.assign_driver(&system, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, invalid_state_error());
    }

    #[test]
    fn only_system_may_assign() {
        let passenger = User::passenger(Uuid::new_v4());
        let mut trip = new_trip(&passenger);

        let err = trip.assign_driver(&passenger, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, authorization_error());
    }

    #[test]
    fn non_assigned_driver_cannot_complete() {
        let passenger = User::passenger(Uuid::new_v4());
        let system = User::new_system_user();
        let mut trip = new_trip(&passenger);

        trip.assign_driver(&system, Uuid::new_v4()).unwrap();

        let stranger = User::driver(Uuid::new_v4());
        let err = trip
            .transition(&stranger, Status::Completed, None)
            .unwrap_err();
        assert_eq!(err, authorization_error());
    }

    #[test]
    fn passenger_cannot_cancel_someone_elses_trip() {
        let passenger = User::passenger(Uuid::new_v4());
        let mut trip = new_trip(&passenger);

        let other = User::passenger(Uuid::new_v4());
        let err = trip
            .transition(&other, Status::CancelledByPassenger, None)
            .unwrap_err();
        assert_eq!(err, authorization_error());
    }

    #[test]
    fn cancellation_records_actor_reason_and_time() {
        let passenger = User::passenger(Uuid::new_v4());
        let mut trip = new_trip(&passenger);

        trip.transition(
            &passenger,
            Status::CancelledByPassenger,
            Some("changed my mind".into()),
        )
        .unwrap();

        assert_eq!(trip.status, Status::CancelledByPassenger);
        assert!(trip.status.is_cancelled());
        assert_eq!(trip.cancelled_by, Some(passenger.id));
        assert_eq!(trip.cancellation_reason.as_deref(), Some("changed my mind"));
        assert!(trip.cancelled_at.is_some());
    }

    #[test]
    fn transitions_are_not_reapplied() {
        let passenger = User::passenger(Uuid::new_v4());
        let system = User::new_system_user();
        let mut trip = new_trip(&passenger);
        let driver = User::driver(Uuid::new_v4());

        trip.assign_driver(&system, driver.id).unwrap();
        trip.transition(&driver, Status::DriverArriving, None).unwrap();

        let before = trip.driver_arrived_at;
        let err = trip
            .transition(&driver, Status::DriverArriving, None)
            .unwrap_err();
        assert_eq!(err, invalid_state_error());
        assert_eq!(trip.driver_arrived_at, before);
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        let passenger = User::passenger(Uuid::new_v4());
        let mut trip = new_trip(&passenger);

        trip.transition(&passenger, Status::CancelledByPassenger, None)
            .unwrap();
        assert!(trip.status.is_terminal());

        let system = User::new_system_user();
        let err = trip
            .transition(&system, Status::CancelledBySystem, None)
            .unwrap_err();
        assert_eq!(err, invalid_state_error());

        let err = trip.assign_driver(&system, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, invalid_state_error());
    }

    #[test]
    fn driver_cannot_skip_ahead_in_the_chain() {
        let passenger = User::passenger(Uuid::new_v4());
        let system = User::new_system_user();
        let mut trip = new_trip(&passenger);
        let driver = User::driver(Uuid::new_v4());

        trip.assign_driver(&system, driver.id).unwrap();

        let err = trip
            .transition(&driver, Status::Completed, None)
            .unwrap_err();
        assert_eq!(err, invalid_state_error());
    }

    #[test]
    fn status_updates_cannot_target_assignment() {
        let passenger = User::passenger(Uuid::new_v4());
        let system = User::new_system_user();
        let mut trip = new_trip(&passenger);

        let err = trip
            .transition(&system, Status::DriverAssigned, None)
            .unwrap_err();
        assert_eq!(err, validation_error());
    }

    #[test]
    fn status_wire_names_are_stable() {
        assert_eq!(Status::FindingDriver.name(), "finding_driver");
        assert_eq!(
            serde_json::to_value(Status::PassengerPickedUp).unwrap(),
            serde_json::json!("passenger_picked_up")
        );
        assert_eq!(
            serde_json::to_value(Status::CancelledBySystem).unwrap(),
            serde_json::json!("cancelled_by_system")
        );
        assert_eq!(
            serde_json::to_value(VehicleType::Car4Seats).unwrap(),
            serde_json::json!("car_4seats")
        );
    }
}
