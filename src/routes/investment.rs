//! Route handlers for creating, listing and deleting investments.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    auth::Claims,
    config::AppConfig,
    models::{ActivityLog, DatabaseID, Investment},
    policy::{self, Action, Decision, Principal, Resource},
    AppError,
};

use super::authenticated_user;

#[derive(Deserialize)]
pub struct NewInvestment {
    pub name: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// A route handler for recording a new investment.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_investment(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(new_investment): Json<NewInvestment>,
) -> Result<(StatusCode, Json<Investment>), AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let investment = Investment::insert(
        new_investment.name,
        new_investment.amount,
        new_investment.date,
        user.id(),
        &connection,
    )?;

    ActivityLog::record(user.id(), "created investment", &connection)?;

    Ok((StatusCode::OK, Json(investment)))
}

/// A route handler for listing the calling user's investments.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_investments(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<Vec<Investment>>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let investments = Investment::select_by_user(user.id(), &connection)?;

    Ok(Json(investments))
}

/// A route handler for deleting an investment.
///
/// Returns 404 when the investment does not exist or belongs to another
/// user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_investment(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(investment_id): Path<DatabaseID>,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let investment = Investment::select(investment_id, &connection)?;

    let principal = Principal {
        user_id: user.id(),
        role: user.role(),
    };

    if policy::evaluate(
        &principal,
        Action::Modify,
        &Resource::Owned(investment.user_id()),
    ) == Decision::Deny
    {
        return Err(AppError::NotFound);
    }

    Investment::delete(investment_id, &connection)?;
    ActivityLog::record(user.id(), "deleted investment", &connection)?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod investment_route_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        models::Investment,
        routes::{endpoints, testing::create_app_with_user},
    };

    #[tokio::test]
    async fn create_and_list_investments() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .post(endpoints::INVESTMENTS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "name": "Index fund",
                "amount": 1500.0,
                "date": "2024-06-01",
            }))
            .await;

        response.assert_status_ok();
        let created = response.json::<Investment>();
        assert_eq!(created.name(), "Index fund");

        let investments = server
            .get(endpoints::INVESTMENTS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<Investment>>();

        assert_eq!(investments, vec![created]);
    }

    #[tokio::test]
    async fn delete_investment_removes_it() {
        let (server, token) = create_app_with_user().await;

        let created = server
            .post(endpoints::INVESTMENTS)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "name": "Index fund",
                "amount": 1500.0,
                "date": "2024-06-01",
            }))
            .await
            .json::<Investment>();

        server
            .delete(&format!("/investments/{}", created.id()))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let investments = server
            .get(endpoints::INVESTMENTS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<Investment>>();

        assert!(investments.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_investment_returns_not_found() {
        let (server, token) = create_app_with_user().await;

        server
            .delete("/investments/999")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
