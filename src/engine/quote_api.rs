use super::Engine;

use async_trait::async_trait;
use chrono::Local;

use crate::{
    api::QuoteAPI,
    auth::User,
    entities::{Quote, QuoteRequest},
    error::Error,
};

#[async_trait]
impl QuoteAPI for Engine {
    #[tracing::instrument(skip(self, request))]
    async fn create_quote(&self, user: User, request: QuoteRequest) -> Result<Quote, Error> {
        let vehicle_type = request.vehicle();
        let distance_km = request.pickup().distance_km(&request.dropoff());

        // when the caller has no traffic estimate, fall back to the
        // average-speed model
        let estimated_minutes = request
            .estimated_minutes
            .unwrap_or_else(|| self.fare.estimate_trip_time(distance_km));

        let fare = self.fare.fare_for_distance(
            distance_km,
            vehicle_type,
            estimated_minutes,
            Local::now(),
        );

        tracing::info!(total_fare = fare.total_fare, "quoted fare");

        Ok(Quote::new(vehicle_type, estimated_minutes, fare))
    }
}
