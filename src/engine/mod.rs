mod quote_api;
mod trip_api;

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::API;
use crate::entities::Trip;
use crate::fare::FareEngine;
use crate::matching::DriverMatcher;

/// The dispatch engine: fare computation, driver matching, and the trip
/// lifecycle behind the API traits.
///
/// Trips live in an in-memory store. The write lock serializes every
/// read-check-write on trip state, which is what makes assignment a true
/// compare-and-set: the first writer wins and the loser observes an invalid
/// state. A persistent deployment would put the same guard on a row lock.
pub struct Engine {
    fare: FareEngine,
    matcher: DriverMatcher,
    trips: RwLock<HashMap<Uuid, Trip>>,
}

impl Engine {
    pub fn new(fare: FareEngine, matcher: DriverMatcher) -> Self {
        Self {
            fare,
            matcher,
            trips: RwLock::new(HashMap::new()),
        }
    }
}

impl API for Engine {}
