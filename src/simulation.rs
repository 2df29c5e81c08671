//! Load simulation against an in-memory driver directory: seeds drivers
//! around the city center, spawns passenger trips, and drives every trip to a
//! terminal state through the same API the HTTP layer uses.
//!
//! Run with `cargo run -- simulate`.

use std::collections::HashSet;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use rand_distr::{Binomial, Distribution, Normal, Uniform};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::TripAPI;
use crate::auth::User;
use crate::directory::{DriverCandidate, InMemoryDriverDirectory};
use crate::engine::Engine;
use crate::entities::{Coordinates, Status, TripRequest};
use crate::entities::VehicleType;
use crate::error::Error;
use crate::fare::FareEngine;
use crate::matching::DriverMatcher;

// Ho Chi Minh City
const CITY_CENTER: Coordinates = Coordinates {
    lat: 10.7769,
    lng: 106.7009,
};

const DRIVER_COUNT: usize = 200;
const TRIP_COUNT: usize = 50;
const WORKER_COUNT: usize = 8;

fn sample_point() -> Coordinates {
    let spread = Normal::new(0.0, 0.03).unwrap();
    let mut rng = rand::thread_rng();

    Coordinates::new(
        CITY_CENTER.lat + spread.sample(&mut rng),
        CITY_CENTER.lng + spread.sample(&mut rng),
    )
}

fn sample_vehicle_type() -> VehicleType {
    let die = Uniform::from(0..3);

    match die.sample(&mut rand::thread_rng()) {
        0 => VehicleType::Bike,
        1 => VehicleType::Car4Seats,
        _ => VehicleType::Car7Seats,
    }
}

fn flip(probability: f64) -> bool {
    let coin = Binomial::new(1, probability).unwrap();
    coin.sample(&mut rand::thread_rng()) > 0
}

/// Concurrent lifecycle steps lose races on purpose; everything except an
/// invalid-state rejection is a bug in the simulation.
fn handle_invocation_error<T>(result: Result<T, Error>) {
    match result {
        Ok(_) => {}
        Err(err) => {
            if err.code != 100 {
                panic!("unexpected error: {:?}", err);
            }

            tracing::warn!("lost a lifecycle race");
        }
    }
}

struct Simulation {
    engine: Arc<Engine>,
    system: User,
    trip_ids: Mutex<HashSet<Uuid>>,
}

impl Simulation {
    #[tracing::instrument(skip(self))]
    async fn add_trip(&self) {
        let passenger = User::passenger(Uuid::new_v4());
        let pickup = sample_point();
        let dropoff = sample_point();

        let request = TripRequest {
            pickup_lat: pickup.lat,
            pickup_lng: pickup.lng,
            pickup_address: "simulated pickup".into(),
            pickup_note: String::new(),
            dropoff_lat: dropoff.lat,
            dropoff_lng: dropoff.lng,
            dropoff_address: "simulated dropoff".into(),
            dropoff_note: String::new(),
            vehicle_type: sample_vehicle_type().name().into(),
            payment_method: None,
        };

        let trip = self.engine.create_trip(passenger, request).await.unwrap();

        tracing::info!(trip_id = %trip.id, "created trip");

        self.trip_ids.lock().await.insert(trip.id);
    }

    /// Advances one trip by one lifecycle step.
    #[tracing::instrument(skip(self))]
    async fn step_trip(&self, trip_id: Uuid) {
        let trip = self
            .engine
            .find_trip(self.system.clone(), trip_id)
            .await
            .unwrap();

        match trip.status {
            Status::FindingDriver => {
                let result = self
                    .engine
                    .request_driver(self.system.clone(), trip_id)
                    .await;

                match result {
                    Ok(Some(_)) => tracing::info!("assigned a driver"),
                    Ok(None) => {
                        tracing::warn!("no drivers in range, cancelling");
                        handle_invocation_error(
                            self.engine
                                .update_status(
                                    self.system.clone(),
                                    trip_id,
                                    Status::CancelledBySystem,
                                    Some("no drivers available".into()),
                                )
                                .await,
                        );
                    }
                    Err(err) => handle_invocation_error(Err::<(), Error>(err)),
                }
            }
            Status::DriverAssigned => {
                let driver = User::driver(trip.driver_id.unwrap());

                if flip(0.05) {
                    handle_invocation_error(
                        self.engine
                            .update_status(
                                driver,
                                trip_id,
                                Status::CancelledByDriver,
                                Some("vehicle trouble".into()),
                            )
                            .await,
                    );
                } else {
                    handle_invocation_error(
                        self.engine
                            .update_status(driver, trip_id, Status::DriverArriving, None)
                            .await,
                    );
                }
            }
            Status::DriverArriving => {
                if flip(0.1) {
                    let passenger = User::passenger(trip.passenger_id);
                    handle_invocation_error(
                        self.engine
                            .update_status(
                                passenger,
                                trip_id,
                                Status::CancelledByPassenger,
                                Some("waited too long".into()),
                            )
                            .await,
                    );
                } else {
                    let driver = User::driver(trip.driver_id.unwrap());
                    handle_invocation_error(
                        self.engine
                            .update_status(driver, trip_id, Status::PassengerPickedUp, None)
                            .await,
                    );
                }
            }
            Status::PassengerPickedUp => {
                let driver = User::driver(trip.driver_id.unwrap());
                handle_invocation_error(
                    self.engine
                        .update_status(driver, trip_id, Status::Completed, None)
                        .await,
                );
            }
            _ => {
                self.trip_ids.lock().await.remove(&trip_id);
            }
        }
    }
}

async fn seed_drivers(directory: &InMemoryDriverDirectory) {
    for _ in 0..DRIVER_COUNT {
        directory
            .upsert(DriverCandidate {
                driver_id: Uuid::new_v4(),
                coordinates: Some(sample_point()),
                vehicle_type: sample_vehicle_type(),
                rating: None,
            })
            .await;
    }

    tracing::info!("seeded {} drivers", DRIVER_COUNT);
}

pub async fn run() {
    let directory = Arc::new(InMemoryDriverDirectory::new());
    seed_drivers(&directory).await;

    let matcher = DriverMatcher::new(directory.clone());
    let engine = Arc::new(Engine::new(FareEngine::new(), matcher));

    let simulation = Arc::new(Simulation {
        engine,
        system: User::new_system_user(),
        trip_ids: Mutex::new(HashSet::new()),
    });

    for _ in 0..TRIP_COUNT {
        simulation.add_trip().await;
    }

    let (tx, rx): (Sender<Uuid>, Receiver<Uuid>) = async_channel::unbounded();

    let mut handles = vec![];
    for _ in 0..WORKER_COUNT {
        let rx = rx.clone();
        let s = simulation.clone();

        handles.push(tokio::spawn(async move {
            while let Ok(trip_id) = rx.recv().await {
                s.step_trip(trip_id).await;
            }
        }));
    }

    let s = simulation.clone();
    handles.push(tokio::spawn(async move {
        loop {
            let pending: Vec<Uuid> = s.trip_ids.lock().await.iter().copied().collect();
            if pending.is_empty() {
                break;
            }

            for trip_id in pending {
                tx.send(trip_id).await.unwrap();
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }

        tx.close();
    }));

    futures::future::join_all(handles).await;

    tracing::info!("simulation finished, all trips reached a terminal state");
}
