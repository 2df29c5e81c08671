use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::Debug;

/// Error taxonomy of the dispatch core.
///
/// Codes 1..=99 are internal faults and are never shown to callers verbatim;
/// codes >= 100 describe a caller-visible rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        upstream_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            100 => (StatusCode::CONFLICT, self.message.as_str()),
            102 => (StatusCode::FORBIDDEN, self.message.as_str()),
            103 => (StatusCode::NOT_FOUND, self.message.as_str()),
            104 => (StatusCode::SERVICE_UNAVAILABLE, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

/// Transition not legal from the trip's current status, including a lost
/// assignment race or a re-applied transition.
pub fn invalid_state_error() -> Error {
    Error {
        code: 100,
        message: "invalid state".into(),
    }
}

pub fn validation_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

/// Actor is not permitted to perform the requested transition or read.
pub fn authorization_error() -> Error {
    Error {
        code: 102,
        message: "not authorized".into(),
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: 103,
        message: "not found".into(),
    }
}

/// The driver directory (or another upstream) was unreachable. The matcher
/// absorbs this into an empty candidate list; it only surfaces from
/// operations that cannot degrade.
pub fn upstream_error<T: Debug>(_: T) -> Error {
    Error {
        code: 104,
        message: "upstream unavailable".into(),
    }
}
