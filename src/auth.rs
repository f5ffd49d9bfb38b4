//! Sign-in, JSON Web Tokens and time-based one-time passwords.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, Json, State},
    http::request::Parts,
    http::{Response, StatusCode},
    response::IntoResponse,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::{
    config::AppConfig,
    db::DbError,
    models::{ActivityLog, User, UserID},
};

// Code in this module is adapted from https://github.com/ezesundayeze/axum--auth and https://github.com/tokio-rs/axum/blob/main/examples/jwt/src/main.rs

/// The contents of a JSON Web Token.
///
/// Tokens carry the user's ID rather than their username or email, since both
/// of those are editable and a profile update must not invalidate
/// outstanding tokens.
#[derive(Serialize, Deserialize)]
pub struct Claims {
    /// The expiry time of the token.
    pub exp: usize,
    /// The time the token was issued.
    pub iat: usize,
    /// The ID of the user the token was issued to.
    pub sub: UserID,
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        let app_config = parts
            .extract_with_state::<AppConfig, _>(state)
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        let token_data = decode_jwt(bearer.token(), app_config.decoding_key())?;

        Ok(token_data.claims)
    }
}

#[derive(Deserialize)]
pub struct Credentials {
    /// Username entered during sign-in.
    pub username: String,
    /// Password entered during sign-in.
    pub password: String,
    /// Six-digit one-time password, required when the account has two-factor
    /// authentication enabled.
    #[serde(default)]
    pub totp_code: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    WrongCredentials,
    TwoFactorRequired,
    TokenCreation,
    InvalidToken,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response<Body> {
        let (status, error_message) = match self {
            AuthError::WrongCredentials => (StatusCode::UNAUTHORIZED, "Wrong credentials"),
            AuthError::TwoFactorRequired => {
                (StatusCode::UNAUTHORIZED, "Two-factor code required")
            }
            AuthError::TokenCreation => (StatusCode::INTERNAL_SERVER_ERROR, "Token creation error"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Handler for sign-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The username does not belong to a registered user.
/// - The password is not correct.
/// - Two-factor authentication is enabled and the one-time password is
///   missing or wrong.
/// - An internal error occurred when verifying the password.
pub async fn sign_in(
    State(state): State<AppConfig>,
    Json(user_data): Json<Credentials>,
) -> Result<Json<String>, AuthError> {
    let connection = state.db_connection().lock().map_err(|_| {
        tracing::error!("Database connection lock was poisoned");
        AuthError::InternalError
    })?;

    let user =
        User::select_by_username(&user_data.username, &connection).map_err(|e| match e {
            DbError::NotFound => AuthError::WrongCredentials,
            _ => {
                tracing::error!("Error matching user: {e:?}");
                AuthError::InternalError
            }
        })?;

    let password_is_correct = user.password_hash().verify(&user_data.password).map_err(|e| {
        tracing::error!("Error verifying password: {}", e);
        AuthError::InternalError
    })?;

    if !password_is_correct {
        return Err(AuthError::WrongCredentials);
    }

    if let Some(secret) = user.two_factor_secret() {
        let code = user_data
            .totp_code
            .as_deref()
            .ok_or(AuthError::TwoFactorRequired)?;

        if !verify_totp_code(secret, code)? {
            return Err(AuthError::WrongCredentials);
        }
    }

    ActivityLog::record(user.id(), "signed in", &connection).map_err(|e| {
        tracing::error!("Error recording sign-in: {e:?}");
        AuthError::InternalError
    })?;

    let token = encode_jwt(user.id(), state.encoding_key())?;

    Ok(Json(token))
}

pub fn encode_jwt(user_id: UserID, encoding_key: &EncodingKey) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = (now + Duration::minutes(15)).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claim = Claims {
        exp,
        iat,
        sub: user_id,
    };

    encode(&Header::default(), &claim, encoding_key).map_err(|_| AuthError::TokenCreation)
}

fn decode_jwt(jwt_token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, AuthError> {
    decode(jwt_token, decoding_key, &Validation::default()).map_err(|_| AuthError::InvalidToken)
}

/// Generate a fresh base32-encoded secret for two-factor enrolment.
pub fn generate_totp_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

/// Check a six-digit one-time password against a base32-encoded secret.
pub fn verify_totp_code(secret: &str, code: &str) -> Result<bool, AuthError> {
    let secret_bytes = Secret::Encoded(secret.to_string()).to_bytes().map_err(|e| {
        tracing::error!("Stored two-factor secret is malformed: {e:?}");
        AuthError::InternalError
    })?;

    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret_bytes).map_err(|e| {
        tracing::error!("Error building TOTP generator: {e:?}");
        AuthError::InternalError
    })?;

    totp.check_current(code).map_err(|e| {
        tracing::error!("Error reading system time: {e:?}");
        AuthError::InternalError
    })
}
