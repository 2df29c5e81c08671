use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{validation_error, Error};

/// The capacity in which an actor invokes the core. A real deployment derives
/// this from the authentication layer; the core only trusts what it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Passenger,
    Driver,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
}

impl User {
    pub fn new_system_user() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::System,
        }
    }

    pub fn passenger(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Passenger,
        }
    }

    pub fn driver(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Driver,
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// Extracts the actor the API gateway forwarded. Token verification happens
/// at the gateway; by the time a request reaches the core only the resolved
/// identity travels with it.
#[async_trait]
impl<B: Send> FromRequest<B> for User {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let headers = req.headers();

        let id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(validation_error)?;

        let role = match headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
            Some("passenger") => Role::Passenger,
            Some("driver") => Role::Driver,
            Some("system") => Role::System,
            _ => return Err(validation_error()),
        };

        Ok(User { id, role })
    }
}
