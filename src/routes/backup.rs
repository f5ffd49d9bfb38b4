//! Route handlers for downloading, restoring and exporting backups.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};

use crate::{
    auth::Claims,
    backup::{export_user, restore_user, BackupDocument},
    config::AppConfig,
    models::ActivityLog,
    AppError,
};

use super::authenticated_user;

/// A route handler for downloading a backup of the calling user's records.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_backup(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<BackupDocument>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let document = export_user(user.id(), &connection)?;

    Ok(Json(document))
}

/// A route handler for restoring a previously downloaded backup into the
/// calling user's account.
///
/// The document is validated in full before any insert happens, and all
/// inserts share one SQL transaction. A bad document leaves the account
/// untouched.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn restore_backup(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(document): Json<BackupDocument>,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    restore_user(user.id(), &document, &connection)?;
    ActivityLog::record(user.id(), "restored backup", &connection)?;

    Ok(StatusCode::OK)
}

/// A route handler for exporting the calling user's records in a named
/// format.
///
/// Only `json` is supported; other formats are rejected with a validation
/// error rather than a 404 so the client can tell a bad format from a bad
/// route.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn export_backup(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(format): Path<String>,
) -> Result<Json<BackupDocument>, AppError> {
    if format != "json" {
        return Err(AppError::UnsupportedFormat(format));
    }

    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let document = export_user(user.id(), &connection)?;

    Ok(Json(document))
}
