//! Route handlers for recurring transaction definitions.
//!
//! Definitions have no update handler: `next_date` is advanced only by the
//! sweep, so editing a definition means deleting it and creating a new one.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::{
    auth::Claims,
    config::AppConfig,
    models::{ActivityLog, DatabaseID, Interval, RecurringTransaction},
    policy::{self, Action, Decision, Principal, Resource},
    AppError,
};

use super::authenticated_user;

#[derive(Deserialize)]
pub struct NewRecurringTransaction {
    pub amount: f64,
    pub category: String,
    pub interval: Interval,
    pub next_date: NaiveDateTime,
}

/// A route handler for creating a new recurring transaction definition.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_recurring_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(new_definition): Json<NewRecurringTransaction>,
) -> Result<(StatusCode, Json<RecurringTransaction>), AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let definition = RecurringTransaction::insert(
        new_definition.amount,
        new_definition.category,
        new_definition.interval,
        new_definition.next_date,
        user.id(),
        &connection,
    )?;

    ActivityLog::record(user.id(), "created recurring transaction", &connection)?;

    Ok((StatusCode::OK, Json(definition)))
}

/// A route handler for listing the calling user's recurring transaction
/// definitions.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_recurring_transactions(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<Vec<RecurringTransaction>>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let definitions = RecurringTransaction::select_by_user(user.id(), &connection)?;

    Ok(Json(definitions))
}

/// A route handler for deleting a recurring transaction definition.
///
/// Returns 404 when the definition does not exist or belongs to another
/// user. Transactions already materialized from the definition are kept.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_recurring_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(recurring_transaction_id): Path<DatabaseID>,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let definition = RecurringTransaction::select(recurring_transaction_id, &connection)?;

    let principal = Principal {
        user_id: user.id(),
        role: user.role(),
    };

    if policy::evaluate(
        &principal,
        Action::Modify,
        &Resource::Owned(definition.user_id()),
    ) == Decision::Deny
    {
        return Err(AppError::NotFound);
    }

    RecurringTransaction::delete(recurring_transaction_id, &connection)?;
    ActivityLog::record(user.id(), "deleted recurring transaction", &connection)?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod recurring_route_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        models::{Interval, RecurringTransaction},
        routes::{endpoints, testing::create_app_with_user},
    };

    #[tokio::test]
    async fn create_and_list_definitions() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .post(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -100.0,
                "category": "Utilities",
                "interval": "monthly",
                "next_date": "2024-02-01T00:00:00",
            }))
            .await;

        response.assert_status_ok();
        let created = response.json::<RecurringTransaction>();
        assert_eq!(created.interval(), Interval::Monthly);

        let definitions = server
            .get(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<RecurringTransaction>>();

        assert_eq!(definitions, vec![created]);
    }

    #[tokio::test]
    async fn create_rejects_unknown_interval() {
        let (server, token) = create_app_with_user().await;

        server
            .post(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -100.0,
                "category": "Utilities",
                "interval": "fortnightly",
                "next_date": "2024-02-01T00:00:00",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn delete_definition_removes_it() {
        let (server, token) = create_app_with_user().await;

        let created = server
            .post(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -100.0,
                "category": "Utilities",
                "interval": "monthly",
                "next_date": "2024-02-01T00:00:00",
            }))
            .await
            .json::<RecurringTransaction>();

        server
            .delete(&format!("/recurring_transactions/{}", created.id()))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let definitions = server
            .get(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<RecurringTransaction>>();

        assert!(definitions.is_empty());
    }
}
