//! This module defines the JSON API's routes and their handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use rusqlite::Connection;

use crate::{
    auth::{self, Claims},
    config::AppConfig,
    db::DbError,
    models::User,
    AppError,
};

mod admin;
mod backup;
pub mod endpoints;
mod investment;
mod recurring;
mod transaction;
mod user;

/// Return a router with all the app's routes.
pub fn build_router() -> Router<AppConfig> {
    Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::USERS, post(user::create_user))
        .route(endpoints::SIGN_IN, post(auth::sign_in))
        .route(endpoints::PROFILE, get(user::get_profile))
        .route(endpoints::PROFILE, put(user::update_profile))
        .route(endpoints::PASSWORD, put(user::change_password))
        .route(endpoints::TWO_FACTOR, post(user::enable_two_factor))
        .route(endpoints::TWO_FACTOR, delete(user::disable_two_factor))
        .route(endpoints::ACCOUNT, delete(user::delete_account))
        .route(endpoints::TRANSACTIONS, post(transaction::create_transaction))
        .route(endpoints::TRANSACTIONS, get(transaction::search_transactions))
        .route(endpoints::TRANSACTION, get(transaction::get_transaction))
        .route(endpoints::TRANSACTION, put(transaction::update_transaction))
        .route(
            endpoints::TRANSACTION,
            delete(transaction::delete_transaction),
        )
        .route(endpoints::INVESTMENTS, post(investment::create_investment))
        .route(endpoints::INVESTMENTS, get(investment::get_investments))
        .route(endpoints::INVESTMENT, delete(investment::delete_investment))
        .route(
            endpoints::RECURRING_TRANSACTIONS,
            post(recurring::create_recurring_transaction),
        )
        .route(
            endpoints::RECURRING_TRANSACTIONS,
            get(recurring::get_recurring_transactions),
        )
        .route(
            endpoints::RECURRING_TRANSACTION,
            delete(recurring::delete_recurring_transaction),
        )
        .route(endpoints::BACKUP, get(backup::get_backup))
        .route(endpoints::RESTORE, post(backup::restore_backup))
        .route(endpoints::EXPORT, get(backup::export_backup))
        .route(endpoints::ACTIVITY, get(admin::get_activity))
        .route(endpoints::ADMIN_ACTIVITY, get(admin::get_all_activity))
        .route(endpoints::ADMIN_SWEEP, post(admin::trigger_sweep))
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    StatusCode::IM_A_TEAPOT.into_response()
}

/// Look up the user the token was issued to.
///
/// A token whose user has since been deleted is treated the same as an
/// invalid token.
fn authenticated_user(claims: &Claims, connection: &Connection) -> Result<User, AppError> {
    User::select_by_id(claims.sub, connection).map_err(|e| match e {
        DbError::NotFound => AppError::Unauthorized,
        other => AppError::Database(other),
    })
}


#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;

    use super::{endpoints, testing::get_test_server};

    #[tokio::test]
    async fn coffee_is_a_teapot() {
        let server = get_test_server();

        server
            .get(endpoints::COFFEE)
            .await
            .assert_status(StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn protected_route_rejects_anonymous_caller() {
        let server = get_test_server();

        server
            .get(endpoints::PROFILE)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
