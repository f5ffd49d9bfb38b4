//! Route handlers for account registration and self-service account management.

use std::str::FromStr;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{self, Claims},
    config::AppConfig,
    db::DbError,
    models::{ActivityLog, PasswordHash, Role, User, UserID, ValidatedPassword},
    AppError,
};

use super::authenticated_user;

/// The view of a user returned by the API.
///
/// The password hash and two-factor secret are never serialized.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserID,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub currency: String,
    pub two_factor_enabled: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            role: user.role(),
            currency: user.currency().to_string(),
            two_factor_enabled: user.two_factor_secret().is_some(),
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub currency: String,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
}

/// The freshly generated base32 secret handed to the user during two-factor
/// enrolment.
#[derive(Serialize, Deserialize)]
pub struct TwoFactorSecret {
    pub secret: String,
}

fn parse_email(raw_email: &str) -> Result<EmailAddress, AppError> {
    EmailAddress::from_str(raw_email)
        .map_err(|e| AppError::Validation(format!("invalid email address: {e}")))
}

/// A route handler for registering a new user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_user(
    State(state): State<AppConfig>,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let email = parse_email(&form.email)?;
    let validated_password = ValidatedPassword::new(&form.password)?;
    let password_hash = PasswordHash::new(validated_password, state.hash_cost())?;

    let connection = state.db_connection().lock().unwrap();

    let mut builder = User::build(form.username, email, password_hash);

    if let Some(currency) = form.currency {
        builder = builder.currency(currency);
    }

    let user = builder.insert(&connection).map_err(|e| match e {
        DbError::DuplicateUsername => {
            AppError::Validation("the username is already taken".to_string())
        }
        DbError::DuplicateEmail => {
            AppError::Validation("the email address is already registered".to_string())
        }
        other => AppError::Database(other),
    })?;

    ActivityLog::record(user.id(), "registered", &connection)?;

    Ok((StatusCode::OK, Json(UserProfile::from(&user))))
}

/// A route handler for reading the calling user's profile.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_profile(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<UserProfile>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    Ok(Json(UserProfile::from(&user)))
}

/// A route handler for updating the calling user's username, email and
/// preferred currency.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_profile(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(form): Json<ProfileForm>,
) -> Result<Json<UserProfile>, AppError> {
    let email = parse_email(&form.email)?;

    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    User::update_profile(user.id(), &form.username, &email, &form.currency, &connection).map_err(
        |e| match e {
            DbError::DuplicateUsername => {
                AppError::Validation("the username is already taken".to_string())
            }
            DbError::DuplicateEmail => {
                AppError::Validation("the email address is already registered".to_string())
            }
            other => AppError::Database(other),
        },
    )?;

    ActivityLog::record(user.id(), "updated profile", &connection)?;

    let updated_user = User::select_by_id(user.id(), &connection)?;

    Ok(Json(UserProfile::from(&updated_user)))
}

/// A route handler for changing the calling user's password.
///
/// The current password must be supplied and verified before the new one is
/// accepted.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn change_password(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(form): Json<PasswordForm>,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let current_password_is_correct = user
        .password_hash()
        .verify(&form.current_password)
        .map_err(|e| AppError::HashingError(e.to_string()))?;

    if !current_password_is_correct {
        return Err(AppError::Unauthorized);
    }

    let validated_password = ValidatedPassword::new(&form.new_password)?;
    let password_hash = PasswordHash::new(validated_password, state.hash_cost())?;

    User::update_password(user.id(), &password_hash, &connection)?;
    ActivityLog::record(user.id(), "changed password", &connection)?;

    Ok(StatusCode::OK)
}

/// A route handler for enabling two-factor authentication.
///
/// Returns the generated base32 secret exactly once; subsequent sign-ins
/// require a valid TOTP code.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn enable_two_factor(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<TwoFactorSecret>, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    let secret = auth::generate_totp_secret();

    User::set_two_factor_secret(user.id(), Some(&secret), &connection)?;
    ActivityLog::record(user.id(), "enabled two-factor authentication", &connection)?;

    Ok(Json(TwoFactorSecret { secret }))
}

/// A route handler for disabling two-factor authentication.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn disable_two_factor(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    User::set_two_factor_secret(user.id(), None, &connection)?;
    ActivityLog::record(user.id(), "disabled two-factor authentication", &connection)?;

    Ok(StatusCode::OK)
}

/// A route handler for deleting the calling user's account.
///
/// Foreign key cascades remove every record the user owns, including their
/// audit trail.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_account(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<StatusCode, AppError> {
    let connection = state.db_connection().lock().unwrap();
    let user = authenticated_user(&claims, &connection)?;

    User::delete(user.id(), &connection)?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod user_route_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        models::Role,
        routes::{
            endpoints,
            testing::{create_app_with_user, get_test_server},
        },
    };

    use super::{TwoFactorSecret, UserProfile};

    #[tokio::test]
    async fn create_user_returns_profile_without_secrets() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "email": "test@test.com",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status_ok();

        let profile = response.json::<UserProfile>();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "test@test.com");
        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.currency, "USD");
        assert!(!profile.two_factor_enabled);

        let body = response.text();
        assert!(!body.contains("password"));
        assert!(!body.contains("secret"));
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_username() {
        let server = get_test_server();

        for (email, expected_status) in [
            ("test@test.com", StatusCode::OK),
            ("other@test.com", StatusCode::BAD_REQUEST),
        ] {
            server
                .post(endpoints::USERS)
                .content_type("application/json")
                .json(&json!({
                    "username": "alice",
                    "email": email,
                    "password": "averysafeandsecurepassword",
                }))
                .await
                .assert_status(expected_status);
        }
    }

    #[tokio::test]
    async fn create_user_rejects_weak_password() {
        let server = get_test_server();

        server
            .post(endpoints::USERS)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "email": "test@test.com",
                "password": "hunter2",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_user_rejects_invalid_email() {
        let server = get_test_server();

        server
            .post(endpoints::USERS)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "email": "not an email",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_profile_round_trips() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .put(endpoints::PROFILE)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "username": "alice2",
                "email": "new@test.com",
                "currency": "NZD",
            }))
            .await;

        response.assert_status_ok();

        let profile = server
            .get(endpoints::PROFILE)
            .authorization_bearer(&token)
            .await
            .json::<UserProfile>();

        assert_eq!(profile.username, "alice2");
        assert_eq!(profile.email, "new@test.com");
        assert_eq!(profile.currency, "NZD");
    }

    #[tokio::test]
    async fn change_password_requires_correct_current_password() {
        let (server, token) = create_app_with_user().await;

        server
            .put(endpoints::PASSWORD)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "current_password": "wrongpassword",
                "new_password": "anequallysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_allows_sign_in_with_new_password() {
        let (server, token) = create_app_with_user().await;

        server
            .put(endpoints::PASSWORD)
            .authorization_bearer(&token)
            .content_type("application/json")
            .json(&json!({
                "current_password": "averysafeandsecurepassword",
                "new_password": "anequallysafeandsecurepassword",
            }))
            .await
            .assert_status_ok();

        server
            .post(endpoints::SIGN_IN)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "password": "anequallysafeandsecurepassword",
            }))
            .await
            .assert_status_ok();

        server
            .post(endpoints::SIGN_IN)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn enable_two_factor_requires_code_on_next_sign_in() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .post(endpoints::TWO_FACTOR)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let secret = response.json::<TwoFactorSecret>().secret;
        assert!(!secret.is_empty());

        server
            .post(endpoints::SIGN_IN)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .delete(endpoints::TWO_FACTOR)
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        server
            .post(endpoints::SIGN_IN)
            .content_type("application/json")
            .json(&json!({
                "username": "alice",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn delete_account_invalidates_outstanding_tokens() {
        let (server, token) = create_app_with_user().await;

        server
            .delete(endpoints::ACCOUNT)
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        server
            .get(endpoints::PROFILE)
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
