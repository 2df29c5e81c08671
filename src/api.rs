use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Quote, QuoteRequest, Status, Trip, TripRequest};
use crate::error::Error;

#[async_trait]
pub trait QuoteAPI {
    async fn create_quote(&self, user: User, request: QuoteRequest) -> Result<Quote, Error>;
}

#[async_trait]
pub trait TripAPI {
    async fn create_trip(&self, user: User, request: TripRequest) -> Result<Trip, Error>;

    async fn find_trip(&self, user: User, id: Uuid) -> Result<Trip, Error>;

    /// Trips still searching for a driver, for the dispatch loop.
    async fn list_available_trips(&self, user: User) -> Result<Vec<Trip>, Error>;

    /// Runs matching against the directory and assigns the best candidate.
    /// `None` when no driver is in range.
    async fn request_driver(&self, user: User, id: Uuid) -> Result<Option<Trip>, Error>;

    /// Assigns a specific driver (a driver accepting a broadcast trip).
    async fn assign_driver(&self, user: User, id: Uuid, driver_id: Uuid) -> Result<Trip, Error>;

    async fn update_status(
        &self,
        user: User,
        id: Uuid,
        target: Status,
        reason: Option<String>,
    ) -> Result<Trip, Error>;
}

pub trait API: QuoteAPI + TripAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
