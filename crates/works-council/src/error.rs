use crate::config::ConfigError;
use crate::council::RosterImportError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Roster(RosterImportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Roster(err) => write!(f, "roster error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Roster(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Roster(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RosterImportError> for AppError {
    fn from(value: RosterImportError) -> Self {
        Self::Roster(value)
    }
}
