use crate::admissions::merit::MeritError;
use crate::admissions::staging::StagingError;
use crate::admissions::LifecycleError;
use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::telemetry::TelemetryError;
use crate::tuition::TuitionError;
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
    Storage(StorageError),
    Lifecycle(LifecycleError),
    Staging(StagingError),
    Merit(MeritError),
    Tuition(TuitionError),
    Export(csv::Error),
    Worker(tokio::task::JoinError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Lifecycle(err) => write!(f, "{}", err),
            AppError::Staging(err) => write!(f, "upload error: {}", err),
            AppError::Merit(err) => write!(f, "merit error: {}", err),
            AppError::Tuition(err) => write!(f, "tuition error: {}", err),
            AppError::Export(err) => write!(f, "csv export error: {}", err),
            AppError::Worker(err) => write!(f, "blocking task failed: {}", err),
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
            AppError::Storage(err) => Some(err),
            AppError::Lifecycle(err) => Some(err),
            AppError::Staging(err) => Some(err),
            AppError::Merit(err) => Some(err),
            AppError::Tuition(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Worker(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Lifecycle(LifecycleError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Lifecycle(LifecycleError::Submission(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Lifecycle(LifecycleError::Upload(err)) => staging_status(err),
            AppError::Lifecycle(_) => StatusCode::CONFLICT,
            AppError::Staging(err) => staging_status(err),
            AppError::Merit(_) | AppError::Tuition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Storage(_)
            | AppError::Export(_)
            | AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn staging_status(err: &StagingError) -> StatusCode {
    match err {
        StagingError::Read { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        StagingError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        StagingError::Encoding { .. } | StagingError::MediaType { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
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

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<LifecycleError> for AppError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

impl From<StagingError> for AppError {
    fn from(value: StagingError) -> Self {
        Self::Staging(value)
    }
}

impl From<MeritError> for AppError {
    fn from(value: MeritError) -> Self {
        Self::Merit(value)
    }
}

impl From<TuitionError> for AppError {
    fn from(value: TuitionError) -> Self {
        Self::Tuition(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Export(value)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Worker(value)
    }
}
