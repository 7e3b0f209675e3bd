use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{dashboard::DashboardError, store::StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{0}")]
    Validation(String),

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Voting is unavailable without a user identity")]
    IdentityUnavailable,

    #[error("A vote for this category is already being processed")]
    VoteInFlight,

    #[error("Dashboard unavailable: {0}")]
    Dashboard(#[from] DashboardError),

    #[error("Internal error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::CategoryNotFound => StatusCode::NOT_FOUND,
            AppError::IdentityUnavailable => StatusCode::FORBIDDEN,
            AppError::VoteInFlight => StatusCode::CONFLICT,
            AppError::Dashboard(DashboardError::Malformed(_)) => StatusCode::BAD_GATEWAY,
            AppError::Dashboard(DashboardError::Store(_)) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!("{self}");
        }

        (status, self.to_string()).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Environment misconfigured: {0}")]
    Config(#[from] ConfigError),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Server failed: {0}")]
    Io(#[from] std::io::Error),
}
