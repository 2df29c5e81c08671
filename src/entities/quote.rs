use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, VehicleType};
use crate::fare::FareBreakdown;

/// Inbound payload for a fare estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub vehicle_type: String,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
}

impl QuoteRequest {
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

/// A fare estimate shown to the passenger before a trip is created. Not
/// stored; the authoritative breakdown is recomputed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub vehicle_type: VehicleType,
    pub estimated_minutes: i64,
    #[serde(flatten)]
    pub fare: FareBreakdown,
}

impl Quote {
    pub fn new(vehicle_type: VehicleType, estimated_minutes: i64, fare: FareBreakdown) -> Self {
        Self {
            vehicle_type,
            estimated_minutes,
            fare,
        }
    }
}
