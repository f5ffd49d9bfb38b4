//! Route handlers for creating, reading, updating, deleting and searching
//! transactions.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::{
    auth::Claims,
    config::AppConfig,
    models::{ActivityLog, DatabaseID, Transaction, TransactionFilter},
    policy::{self, Action, Decision, Principal, Resource},
    AppError,
};

use super::authenticated_user;

#[derive(Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    pub category: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_path: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTransaction {
    pub amount: f64,
    pub category: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub end_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A route handler for creating a new transaction.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let transaction = Transaction::build(
        new_transaction.amount,
        new_transaction.category,
        new_transaction.date,
        user.id(),
    )
    .description(new_transaction.description)
    .receipt_path(new_transaction.receipt_path)
    .insert(&connection)?;

    ActivityLog::record(user.id(), "created transaction", &connection)?;

    Ok((StatusCode::OK, Json(transaction)))
}

/// A route handler for getting a transaction by its database ID.
///
/// Returns 404 when the transaction does not exist or belongs to another
/// user, so callers cannot probe for other users' records.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<Transaction>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let transaction = Transaction::select(transaction_id, &connection)?;

    let principal = Principal {
        user_id: user.id(),
        role: user.role(),
    };

    match policy::evaluate(
        &principal,
        Action::Read,
        &Resource::Owned(transaction.user_id()),
    ) {
        Decision::Allow => Ok(Json(transaction)),
        Decision::Deny => Err(AppError::NotFound),
    }
}

/// A route handler for searching the calling user's transactions.
///
/// Accepts optional `start_date`, `end_date` and `category` query
/// parameters; dates are inclusive bounds in ISO-8601 format.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn search_transactions(
    State(state): State<AppConfig>,
    claims: Claims,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let filter = TransactionFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        category: query.category,
    };

    let transactions = Transaction::search(user.id(), &filter, &connection)?;

    Ok(Json(transactions))
}

/// A route handler for overwriting a transaction's editable fields.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
    Json(update): Json<UpdateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let transaction = Transaction::select(transaction_id, &connection)?;

    let principal = Principal {
        user_id: user.id(),
        role: user.role(),
    };

    if policy::evaluate(
        &principal,
        Action::Modify,
        &Resource::Owned(transaction.user_id()),
    ) == Decision::Deny
    {
        return Err(AppError::NotFound);
    }

    Transaction::update(
        transaction_id,
        update.amount,
        &update.category,
        update.date,
        update.description.as_deref(),
        &connection,
    )?;

    ActivityLog::record(user.id(), "updated transaction", &connection)?;

    let updated = Transaction::select(transaction_id, &connection)?;

    Ok(Json(updated))
}

/// A route handler for deleting a transaction.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let transaction = Transaction::select(transaction_id, &connection)?;

    let principal = Principal {
        user_id: user.id(),
        role: user.role(),
    };

    if policy::evaluate(
        &principal,
        Action::Modify,
        &Resource::Owned(transaction.user_id()),
    ) == Decision::Deny
    {
        return Err(AppError::NotFound);
    }

    Transaction::delete(transaction_id, &connection)?;
    ActivityLog::record(user.id(), "deleted transaction", &connection)?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod transaction_route_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        models::Transaction,
        routes::{endpoints, testing::create_app_with_user},
    };

    #[tokio::test]
    async fn create_and_get_transaction() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -42.5,
                "category": "Groceries",
                "date": "2024-01-15T00:00:00",
                "description": "Weekly shop",
            }))
            .await;

        response.assert_status_ok();
        let created = response.json::<Transaction>();
        assert_eq!(created.amount(), -42.5);
        assert_eq!(created.category(), "Groceries");

        let fetched = server
            .get(&format!("/transactions/{}", created.id()))
            .authorization_bearer(&token)
            .await
            .json::<Transaction>();

        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn get_transaction_of_other_user_returns_not_found() {
        let (server, token) = create_app_with_user().await;

        let created = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -42.5,
                "category": "Groceries",
                "date": "2024-01-15T00:00:00",
            }))
            .await
            .json::<Transaction>();

        server
            .post(endpoints::USERS)
            .content_type("application/json")
            .json(&json!({
                "username": "mallory",
                "email": "mallory@test.com",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status_ok();

        let other_token = server
            .post(endpoints::SIGN_IN)
            .content_type("application/json")
            .json(&json!({
                "username": "mallory",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .json::<String>();

        server
            .get(&format!("/transactions/{}", created.id()))
            .authorization_bearer(&other_token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_filters_by_date_and_category() {
        let (server, token) = create_app_with_user().await;

        for (amount, category, date) in [
            (-42.5, "Groceries", "2024-01-15T00:00:00"),
            (-9.0, "Coffee", "2024-02-01T08:30:00"),
            (-55.0, "Groceries", "2024-03-10T00:00:00"),
        ] {
            server
                .post(endpoints::TRANSACTIONS)
                .authorization_bearer(&token)
                .content_type("application/json")
                .json(&json!({
                    "amount": amount,
                    "category": category,
                    "date": date,
                }))
                .await
                .assert_status_ok();
        }

        let all = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<Transaction>>();
        assert_eq!(all.len(), 3);

        let groceries = server
            .get("/transactions?category=Groceries")
            .authorization_bearer(&token)
            .await
            .json::<Vec<Transaction>>();
        assert_eq!(groceries.len(), 2);

        let early = server
            .get("/transactions?start_date=2024-01-01&end_date=2024-02-15")
            .authorization_bearer(&token)
            .await
            .json::<Vec<Transaction>>();
        assert_eq!(early.len(), 2);

        let early_groceries = server
            .get("/transactions?start_date=2024-01-01&end_date=2024-02-15&category=Groceries")
            .authorization_bearer(&token)
            .await
            .json::<Vec<Transaction>>();
        assert_eq!(early_groceries.len(), 1);
        assert_eq!(early_groceries[0].amount(), -42.5);
    }

    #[tokio::test]
    async fn update_transaction_overwrites_fields() {
        let (server, token) = create_app_with_user().await;

        let created = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -42.5,
                "category": "Groceries",
                "date": "2024-01-15T00:00:00",
            }))
            .await
            .json::<Transaction>();

        let updated = server
            .put(&format!("/transactions/{}", created.id()))
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -45.0,
                "category": "Food",
                "date": "2024-01-16T00:00:00",
                "description": "Corrected amount",
            }))
            .await
            .json::<Transaction>();

        assert_eq!(updated.amount(), -45.0);
        assert_eq!(updated.category(), "Food");
        assert_eq!(updated.description(), Some("Corrected amount"));
    }

    #[tokio::test]
    async fn delete_transaction_removes_it() {
        let (server, token) = create_app_with_user().await;

        let created = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "amount": -42.5,
                "category": "Groceries",
                "date": "2024-01-15T00:00:00",
            }))
            .await
            .json::<Transaction>();

        server
            .delete(&format!("/transactions/{}", created.id()))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        server
            .get(&format!("/transactions/{}", created.id()))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
