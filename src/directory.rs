use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entities::{Coordinates, VehicleType};
use crate::error::{upstream_error, Error};

/// Upper bound on a directory round trip; past this the matcher treats the
/// upstream as unavailable.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// A driver as reported by the directory: a read-only snapshot valid for the
/// duration of one matching call. Candidates without a known position are
/// skipped by the matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverCandidate {
    pub driver_id: Uuid,
    pub coordinates: Option<Coordinates>,
    pub vehicle_type: VehicleType,
    pub rating: Option<f64>,
}

/// Source of matchable drivers. The contract is fixed: implementations return
/// only online, approved drivers of the requested vehicle type. Backed by the
/// user service over HTTP in production and by [`InMemoryDriverDirectory`] in
/// tests and the simulation.
#[async_trait]
pub trait DriverDirectory: Send + Sync {
    async fn query(&self, vehicle_type: VehicleType) -> Result<Vec<DriverCandidate>, Error>;
}

pub type DynDriverDirectory = Arc<dyn DriverDirectory>;

/// Directory backed by the platform's user service.
pub struct HttpDriverDirectory {
    client: reqwest::Client,
    base_url: String,
    service_token: String,
}

#[derive(Deserialize)]
struct DriversEnvelope {
    data: Option<DriversData>,
}

#[derive(Deserialize)]
struct DriversData {
    #[serde(default)]
    drivers: Vec<DriverRecord>,
}

#[derive(Deserialize)]
struct DriverRecord {
    id: Option<Uuid>,
    user_id: Option<Uuid>,
    current_lat: Option<f64>,
    current_lng: Option<f64>,
    vehicle_type: Option<String>,
    rating: Option<f64>,
}

impl HttpDriverDirectory {
    pub fn new(base_url: String, service_token: String) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            service_token,
        })
    }
}

#[async_trait]
impl DriverDirectory for HttpDriverDirectory {
    #[tracing::instrument(skip(self))]
    async fn query(&self, vehicle_type: VehicleType) -> Result<Vec<DriverCandidate>, Error> {
        let url = format!("{}/api/drivers/", self.base_url);

        let res = self
            .client
            .get(url)
            .header("X-Service-Token", &self.service_token)
            .query(&[
                ("is_online", "true"),
                ("vehicle_type", vehicle_type.name()),
                ("approval_status", "approved"),
            ])
            .send()
            .await?;

        if res.status().as_u16() != 200 {
            return Err(upstream_error(res.status()));
        }

        let envelope: DriversEnvelope = res.json().await?;
        let records = envelope.data.map(|d| d.drivers).unwrap_or_default();

        let candidates = records
            .into_iter()
            .filter_map(|record| {
                // some deployments report the driver under user_id
                let driver_id = record.id.or(record.user_id)?;

                let coordinates = match (record.current_lat, record.current_lng) {
                    (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
                    _ => None,
                };

                Some(DriverCandidate {
                    driver_id,
                    coordinates,
                    vehicle_type: record
                        .vehicle_type
                        .as_deref()
                        .map(VehicleType::from_name)
                        .unwrap_or(vehicle_type),
                    rating: record.rating,
                })
            })
            .collect();

        Ok(candidates)
    }
}

/// Directory held in memory, in insertion order. Every entry counts as online
/// and approved.
#[derive(Default)]
pub struct InMemoryDriverDirectory {
    drivers: RwLock<Vec<DriverCandidate>>,
}

impl InMemoryDriverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, candidate: DriverCandidate) {
        let mut drivers = self.drivers.write().await;

        match drivers
            .iter_mut()
            .find(|d| d.driver_id == candidate.driver_id)
        {
            Some(existing) => *existing = candidate,
            None => drivers.push(candidate),
        }
    }

    pub async fn remove(&self, driver_id: Uuid) {
        self.drivers.write().await.retain(|d| d.driver_id != driver_id);
    }
}

#[async_trait]
impl DriverDirectory for InMemoryDriverDirectory {
    async fn query(&self, vehicle_type: VehicleType) -> Result<Vec<DriverCandidate>, Error> {
        let drivers = self.drivers.read().await;

        Ok(drivers
            .iter()
            .filter(|d| d.vehicle_type == vehicle_type)
            .cloned()
            .collect())
    }
}

#[tokio::test]
async fn in_memory_directory_filters_by_vehicle_type() {
    let directory = InMemoryDriverDirectory::new();

    directory
        .upsert(DriverCandidate {
            driver_id: Uuid::new_v4(),
            coordinates: Some(Coordinates::new(10.76, 106.66)),
            vehicle_type: VehicleType::Bike,
            rating: None,
        })
        .await;
    directory
        .upsert(DriverCandidate {
            driver_id: Uuid::new_v4(),
            coordinates: Some(Coordinates::new(10.77, 106.67)),
            vehicle_type: VehicleType::Car4Seats,
            rating: Some(4.8),
        })
        .await;

    let bikes = directory.query(VehicleType::Bike).await.unwrap();
    assert_eq!(bikes.len(), 1);
    assert_eq!(bikes[0].vehicle_type, VehicleType::Bike);

    let cars = directory.query(VehicleType::Car7Seats).await.unwrap();
    assert!(cars.is_empty());
}

#[tokio::test]
async fn upsert_replaces_in_place() {
    let directory = InMemoryDriverDirectory::new();
    let id = Uuid::new_v4();

    for lng in [106.66, 106.70] {
        directory
            .upsert(DriverCandidate {
                driver_id: id,
                coordinates: Some(Coordinates::new(10.76, lng)),
                vehicle_type: VehicleType::Bike,
                rating: None,
            })
            .await;
    }

    let drivers = directory.query(VehicleType::Bike).await.unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0].coordinates.unwrap().lng, 106.70);
}
