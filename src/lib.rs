//! A personal-finance ledger server.
//!
//! The library exposes the domain model and persistence layer ([models],
//! [db]), access control ([policy]), the recurring-transaction sweep
//! ([sweep]), backup and restore ([backup]), and a JSON API ([routes]).
//! The `server` binary wires these together.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

pub use config::AppConfig;
pub use routes::build_router;

use crate::db::DbError;

pub mod auth;
pub mod backup;
mod config;
pub mod db;
pub mod models;
pub mod policy;
pub mod routes;
pub mod sweep;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors a request handler can surface to a client.
///
/// Database details are logged server-side and never echoed in responses.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AppError {
    /// The request body or parameters failed validation.
    #[error("{0}")]
    Validation(String),
    /// The request lacked valid authentication.
    #[error("invalid credentials or token")]
    Unauthorized,
    /// The caller is authenticated but not allowed to do this.
    #[error("insufficient permissions")]
    Forbidden,
    /// The requested resource was not found. The client should check that the parameters (e.g., ID) are correct and that the resource has been created.
    #[error("the requested resource could not be found")]
    NotFound,
    /// The supplied password is too easy to guess.
    #[error("the password is too weak: {0}")]
    WeakPassword(String),
    /// An error occurred while hashing or verifying a password.
    #[error("error hashing password: {0}")]
    HashingError(String),
    /// The client asked for an export format the server does not produce.
    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),
    /// An error occurred while accessing the application's database.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(description) => (StatusCode::BAD_REQUEST, description),
            AppError::WeakPassword(description) => (StatusCode::BAD_REQUEST, description),
            AppError::UnsupportedFormat(format) => (
                StatusCode::BAD_REQUEST,
                format!("unsupported export format '{format}'"),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "invalid credentials or token".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "insufficient permissions".to_string(),
            ),
            AppError::NotFound | AppError::Database(DbError::NotFound) => (
                StatusCode::NOT_FOUND,
                "the requested resource could not be found".to_string(),
            ),
            AppError::HashingError(description) => {
                tracing::error!("Error hashing password: {description}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod app_error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::db::DbError;

    use super::AppError;

    #[test]
    fn errors_map_to_expected_status_codes() {
        let cases = [
            (
                AppError::Validation("bad input".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (
                AppError::Database(DbError::NotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::UnsupportedFormat("csv".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Database(DbError::InvalidForeignKey),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in cases {
            assert_eq!(error.into_response().status(), expected_status);
        }
    }
}
