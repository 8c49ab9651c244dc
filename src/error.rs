use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

/// Message returned to clients whenever the dataset cannot be loaded.
pub const LOAD_FAILURE_MESSAGE: &str = "Could not load contract data";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Duplicate column after trimming: {0}")]
    DuplicateColumn(String),

    #[error("Contract data has not been loaded")]
    NotLoaded,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid value for {param}: '{value}' is not a number")]
    InvalidNumber { param: &'static str, value: String },
}

impl FilterError {
    /// Name of the query parameter that failed to parse.
    pub fn param(&self) -> &'static str {
        match self {
            FilterError::InvalidNumber { param, .. } => param,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Could not load contract data: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    #[error("{0}")]
    Processing(String),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Processing(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Processing(err.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Load(err) => {
                tracing::error!(error = %err, "contract data unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILURE_MESSAGE.to_string())
            }
            ApiError::InvalidFilter(err) => {
                tracing::info!(param = err.param(), "rejected filter parameter");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Processing(msg) => {
                tracing::error!(error = %msg, "request processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
