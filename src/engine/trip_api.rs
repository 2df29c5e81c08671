use super::Engine;

use async_trait::async_trait;
use chrono::Local;
use uuid::Uuid;

use crate::{
    api::TripAPI,
    auth::{Role, User},
    entities::{Status, Trip, TripRequest},
    error::{authorization_error, invalid_state_error, not_found_error, Error},
};

#[async_trait]
impl TripAPI for Engine {
    #[tracing::instrument(skip(self, request))]
    async fn create_trip(&self, user: User, request: TripRequest) -> Result<Trip, Error> {
        if user.role != Role::Passenger {
            return Err(authorization_error());
        }

        let distance_km = request.pickup().distance_km(&request.dropoff());
        let estimated_minutes = self.fare.estimate_trip_time(distance_km);

        // the estimate is computed once here and never mutated afterwards
        let fare = self.fare.fare_for_distance(
            distance_km,
            request.vehicle(),
            estimated_minutes,
            Local::now(),
        );

        let trip = Trip::new(user.id, request, fare);

        tracing::info!(
            trip_id = %trip.id,
            estimated_fare = trip.estimated_fare,
            "created trip, finding driver"
        );

        self.trips.write().await.insert(trip.id, trip.clone());

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip(&self, user: User, id: Uuid) -> Result<Trip, Error> {
        let trips = self.trips.read().await;
        let trip = trips.get(&id).ok_or_else(not_found_error)?;

        trip.authorize_read(&user)?;

        Ok(trip.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn list_available_trips(&self, user: User) -> Result<Vec<Trip>, Error> {
        if !user.is_system() {
            return Err(authorization_error());
        }

        let trips = self.trips.read().await;
        let mut available: Vec<Trip> = trips
            .values()
            .filter(|t| t.is_finding_driver())
            .cloned()
            .collect();

        available.sort_by_key(|t| t.created_at);

        Ok(available)
    }

    #[tracing::instrument(skip(self))]
    async fn request_driver(&self, user: User, id: Uuid) -> Result<Option<Trip>, Error> {
        if !user.is_system() {
            return Err(authorization_error());
        }

        // snapshot outside the write lock; matching is read-only and slow
        let (pickup, vehicle_type) = {
            let trips = self.trips.read().await;
            let trip = trips.get(&id).ok_or_else(not_found_error)?;

            if !trip.is_finding_driver() {
                tracing::info!("trip is no longer finding a driver, returning early");
                return Err(invalid_state_error());
            }

            (trip.pickup(), trip.vehicle_type)
        };

        let best = match self.matcher.assign_best(pickup, vehicle_type).await {
            Some(best) => best,
            None => {
                tracing::warn!("no drivers in range");
                return Ok(None);
            }
        };

        tracing::info!(
            driver_id = %best.driver_id,
            distance_km = best.distance_km,
            "matched driver, attempting assignment"
        );

        // re-check under the write lock: another matcher may have won the
        // race since the snapshot above
        let mut trips = self.trips.write().await;
        let trip = trips.get_mut(&id).ok_or_else(not_found_error)?;

        trip.assign_driver(&user, best.driver_id)?;

        Ok(Some(trip.clone()))
    }

    #[tracing::instrument(skip(self))]
    async fn assign_driver(&self, user: User, id: Uuid, driver_id: Uuid) -> Result<Trip, Error> {
        let mut trips = self.trips.write().await;
        let trip = trips.get_mut(&id).ok_or_else(not_found_error)?;

        trip.assign_driver(&user, driver_id)?;

        tracing::info!(trip_id = %id, %driver_id, "assigned driver");

        Ok(trip.clone())
    }

    #[tracing::instrument(skip(self, reason))]
    async fn update_status(
        &self,
        user: User,
        id: Uuid,
        target: Status,
        reason: Option<String>,
    ) -> Result<Trip, Error> {
        let mut trips = self.trips.write().await;
        let trip = trips.get_mut(&id).ok_or_else(not_found_error)?;

        trip.transition(&user, target, reason)?;

        tracing::info!(trip_id = %id, status = trip.status.name(), "trip status updated");

        Ok(trip.clone())
    }
}
