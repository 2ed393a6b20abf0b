use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use rsvp_shared::errors::{ConfigError, DispatchError, RsvpError, StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{message}")]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self { status, message }
    }

    pub fn bad_request(message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: String) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn service_unavailable(message: String) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn bad_gateway(message: String) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed with {}: {}", self.status, self.message);
        } else {
            warn!("Request rejected with {}: {}", self.status, self.message);
        }
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::service_unavailable(format!("Messaging API not configured: {err}"))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::internal_server_error(format!("Storage error: {err}"))
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Config(e) => e.into(),
            DispatchError::Validation(e) => e.into(),
            other => AppError::bad_gateway(other.to_string()),
        }
    }
}

impl From<RsvpError> for AppError {
    fn from(err: RsvpError) -> Self {
        match err {
            RsvpError::Store(e) => e.into(),
            RsvpError::Validation(e) => e.into(),
            RsvpError::Config(e) => e.into(),
            RsvpError::Dispatch(e) => e.into(),
        }
    }
}
