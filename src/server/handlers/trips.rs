use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{Status, Trip, TripRequest};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct AssignDriverParams {
    driver_id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateStatusParams {
    status: Status,
    #[serde(default)]
    cancellation_reason: Option<String>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(request): Json<TripRequest>,
) -> Result<Json<Trip>, Error> {
    let trip = api.create_trip(user, request).await?;

    Ok(trip.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, Error> {
    let trip = api.find_trip(user, id).await?;

    Ok(trip.into())
}

pub async fn available(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<Vec<Trip>>, Error> {
    let trips = api.list_available_trips(user).await?;

    Ok(trips.into())
}

pub async fn request_driver(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Trip>>, Error> {
    let trip = api.request_driver(user, id).await?;

    Ok(trip.into())
}

pub async fn assign_driver(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<AssignDriverParams>,
) -> Result<Json<Trip>, Error> {
    let trip = api.assign_driver(user, id, params.driver_id).await?;

    Ok(trip.into())
}

pub async fn update_status(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateStatusParams>,
) -> Result<Json<Trip>, Error> {
    let trip = api
        .update_status(user, id, params.status, params.cancellation_reason)
        .await?;

    Ok(trip.into())
}
