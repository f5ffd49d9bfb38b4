//! This file defines a user of the application and its supporting types.

use std::fmt::Display;
use std::str::FromStr;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db::{CreateTable, DbError, MapRow},
    models::PasswordHash,
};

/// A newtype wrapper for integer user IDs.
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The access level of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Error)]
#[error("{0:?} is not a valid role")]
pub struct RoleError(String);

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(RoleError(other.to_string())),
        }
    }
}

/// A user of the application.
///
/// To create a `User` call [User::build], otherwise use one of the select
/// functions to retrieve an existing user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserID,
    username: String,
    email: EmailAddress,
    password_hash: PasswordHash,
    role: Role,
    currency: String,
    two_factor_secret: Option<String>,
}

impl User {
    /// Build a new user.
    ///
    /// Shortcut for [UserBuilder::new] for discoverability.
    pub fn build(username: String, email: EmailAddress, password_hash: PasswordHash) -> UserBuilder {
        UserBuilder::new(username, email, password_hash)
    }

    /// The user's ID in the database.
    pub fn id(&self) -> UserID {
        self.id
    }

    /// The unique name the user signs in with.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The email address associated with the user.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// The user's password hash.
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The user's preferred currency code (e.g., "USD").
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// The TOTP secret, present if and only if two-factor authentication is enabled.
    pub fn two_factor_secret(&self) -> Option<&str> {
        self.two_factor_secret.as_deref()
    }

    /// Get the user with the specified `id`, or return [DbError::NotFound] if no such user exists.
    pub fn select_by_id(id: UserID, connection: &Connection) -> Result<Self, DbError> {
        connection
            .prepare(
                "SELECT id, username, email, password_hash, role, currency, two_factor_secret
                FROM user WHERE id = :id",
            )?
            .query_row(&[(":id", &id.as_i64())], User::map_row)
            .map_err(|e| e.into())
    }

    /// Get the user with the specified `username`, or return [DbError::NotFound] if no such user exists.
    pub fn select_by_username(username: &str, connection: &Connection) -> Result<Self, DbError> {
        connection
            .prepare(
                "SELECT id, username, email, password_hash, role, currency, two_factor_secret
                FROM user WHERE username = :username",
            )?
            .query_row(&[(":username", &username)], User::map_row)
            .map_err(|e| e.into())
    }

    /// Update the user's username, email, and preferred currency.
    ///
    /// # Errors
    /// Returns [DbError::DuplicateUsername] or [DbError::DuplicateEmail] if the new values are
    /// already taken by another user, or [DbError::NotFound] if `id` does not refer to a user.
    pub fn update_profile(
        id: UserID,
        username: &str,
        email: &EmailAddress,
        currency: &str,
        connection: &Connection,
    ) -> Result<(), DbError> {
        let rows_changed = connection.execute(
            "UPDATE user SET username = ?1, email = ?2, currency = ?3 WHERE id = ?4",
            (username, email.to_string(), currency, id.as_i64()),
        )?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// Replace the user's password hash.
    pub fn update_password(
        id: UserID,
        password_hash: &PasswordHash,
        connection: &Connection,
    ) -> Result<(), DbError> {
        let rows_changed = connection.execute(
            "UPDATE user SET password_hash = ?1 WHERE id = ?2",
            (password_hash.to_string(), id.as_i64()),
        )?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// Store or clear the user's TOTP secret. A secret of `None` disables two-factor authentication.
    pub fn set_two_factor_secret(
        id: UserID,
        secret: Option<&str>,
        connection: &Connection,
    ) -> Result<(), DbError> {
        let rows_changed = connection.execute(
            "UPDATE user SET two_factor_secret = ?1 WHERE id = ?2",
            (secret, id.as_i64()),
        )?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// Delete the user and, through foreign key cascades, every record they own.
    pub fn delete(id: UserID, connection: &Connection) -> Result<(), DbError> {
        let rows_changed =
            connection.execute("DELETE FROM user WHERE id = ?1", (id.as_i64(),))?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

impl MapRow for User {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let raw_id = row.get(offset)?;
        let username = row.get(offset + 1)?;
        let raw_email: String = row.get(offset + 2)?;
        let raw_password_hash: String = row.get(offset + 3)?;
        let raw_role: String = row.get(offset + 4)?;
        let currency = row.get(offset + 5)?;
        let two_factor_secret = row.get(offset + 6)?;

        let role = Role::from_str(&raw_role).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(Self {
            id: UserID::new(raw_id),
            username,
            email: EmailAddress::new_unchecked(raw_email),
            password_hash: PasswordHash::new_unchecked(&raw_password_hash),
            role,
            currency,
            two_factor_secret,
        })
    }
}

impl CreateTable for User {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                    id INTEGER PRIMARY KEY,
                    username TEXT UNIQUE NOT NULL,
                    email TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'user',
                    currency TEXT NOT NULL DEFAULT 'USD',
                    two_factor_secret TEXT
                    )",
            (),
        )?;

        Ok(())
    }
}

/// Builder for creating new [User]s.
///
/// The function for finalizing the builder is [UserBuilder::insert].
pub struct UserBuilder {
    username: String,
    email: EmailAddress,
    password_hash: PasswordHash,
    role: Role,
    currency: String,
}

impl UserBuilder {
    pub fn new(username: String, email: EmailAddress, password_hash: PasswordHash) -> Self {
        Self {
            username,
            email,
            password_hash,
            role: Role::User,
            currency: "USD".to_string(),
        }
    }

    /// Set the role of the user. Defaults to [Role::User].
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the preferred currency of the user. Defaults to "USD".
    pub fn currency(mut self, currency: String) -> Self {
        self.currency = currency;
        self
    }

    /// Insert the user into the application database and return the built user.
    /// Note that this function will consume the builder.
    ///
    /// # Errors
    ///
    /// This function will return a:
    /// - [DbError::DuplicateUsername] if the given username is already in use,
    /// - [DbError::DuplicateEmail] if the given email address is already in use,
    /// - [DbError::SqlError] if there was an unexpected SQL error.
    pub fn insert(self, connection: &Connection) -> Result<User, DbError> {
        connection.execute(
            "INSERT INTO user (username, email, password_hash, role, currency) VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &self.username,
                self.email.to_string(),
                self.password_hash.to_string(),
                self.role.as_str(),
                &self.currency,
            ),
        )?;

        let id = UserID::new(connection.last_insert_rowid());

        Ok(User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            currency: self.currency,
            two_factor_secret: None,
        })
    }
}
