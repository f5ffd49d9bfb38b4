//! This file defines the application state shared across request handlers.

use std::sync::{Arc, Mutex};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;

use crate::{auth::AuthError, models::PasswordHash};

#[derive(Clone)]
struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// The state shared by the request handlers and the background sweep.
///
/// The JWT secret must come from configuration: generating one at start-up
/// would invalidate every outstanding token on restart.
#[derive(Clone)]
pub struct AppConfig {
    db_connection: Arc<Mutex<Connection>>,
    jwt_keys: JwtKeys,
    hash_cost: u32,
    sweep_lock: Arc<Mutex<()>>,
}

impl AppConfig {
    pub fn new(db_connection: Connection, jwt_secret: &str) -> AppConfig {
        AppConfig {
            db_connection: Arc::new(Mutex::new(db_connection)),
            jwt_keys: JwtKeys {
                encoding_key: EncodingKey::from_secret(jwt_secret.as_ref()),
                decoding_key: DecodingKey::from_secret(jwt_secret.as_ref()),
            },
            hash_cost: PasswordHash::DEFAULT_COST,
            sweep_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Override the bcrypt cost. Tests use a low cost to stay fast.
    pub fn with_hash_cost(mut self, hash_cost: u32) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    pub fn db_connection(&self) -> &Mutex<Connection> {
        &self.db_connection
    }

    /// The encoding key for JWTs.
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.jwt_keys.encoding_key
    }

    /// The decoding key for JWTs.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.jwt_keys.decoding_key
    }

    /// The bcrypt cost used when hashing new passwords.
    pub fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    /// The lock that keeps sweep runs mutually exclusive.
    ///
    /// A contended `try_lock` means a sweep is already running and the new
    /// run should be skipped, not queued.
    pub fn sweep_lock(&self) -> &Mutex<()> {
        &self.sweep_lock
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AppConfig
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(_: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}
