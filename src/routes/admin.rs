//! Route handlers for audit trails and admin-only operations.

use axum::extract::{Json, State};
use serde_json::json;

use crate::{
    auth::Claims,
    config::AppConfig,
    models::ActivityLog,
    policy::{self, Action, Decision, Principal, Resource},
    sweep,
    AppError,
};

use super::authenticated_user;

/// A route handler for reading the calling user's audit trail.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_activity(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<Vec<ActivityLog>>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let entries = ActivityLog::select_by_user(user.id(), &connection)?;

    Ok(Json(entries))
}

/// A route handler for reading every user's audit trail. Admin only.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_all_activity(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<Vec<ActivityLog>>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let principal = Principal {
        user_id: user.id(),
        role: user.role(),
    };

    if policy::evaluate(&principal, Action::Administer, &Resource::System) == Decision::Deny {
        return Err(AppError::Forbidden);
    }

    let entries = ActivityLog::select_all(&connection)?;

    Ok(Json(entries))
}

/// A route handler for sweeping due recurring transactions on demand. Admin
/// only.
///
/// Returns the number of transactions created, or `null` when a sweep was
/// already running and this one was skipped.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn trigger_sweep(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let connection = state.db_connection().lock().unwrap();
        let user = authenticated_user(&claims, &connection)?;

        let principal = Principal {
            user_id: user.id(),
            role: user.role(),
        };

        if policy::evaluate(&principal, Action::Administer, &Resource::System) == Decision::Deny {
            return Err(AppError::Forbidden);
        }
    }

    // The sweep takes the connection lock itself, so the guard above must be
    // released first.
    let created = sweep::sweep_once(&state)?;

    Ok(Json(json!({ "created": created })))
}
