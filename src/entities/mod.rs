mod location;
mod quote;
mod trip;

pub use location::Coordinates;
pub use quote::{Quote, QuoteRequest};
pub use trip::{PaymentMethod, PaymentStatus, Status, Trip, TripRequest, VehicleType};
