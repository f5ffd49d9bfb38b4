//! This file defines the activity log, an append-only audit trail of user actions.
//!
//! Entries are only written after a state-changing operation has succeeded,
//! and are never updated or deleted except by the cascade when their owner is
//! deleted.

use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    db::{CreateTable, DbError, MapRow},
    models::{DatabaseID, UserID},
};

/// One audit entry: who did what, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    id: DatabaseID,
    user_id: UserID,
    action: String,
    timestamp: NaiveDateTime,
}

impl ActivityLog {
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn timestamp(&self) -> &NaiveDateTime {
        &self.timestamp
    }

    /// Append an entry recording that `user_id` performed `action` just now.
    pub fn record(
        user_id: UserID,
        action: &str,
        connection: &Connection,
    ) -> Result<Self, DbError> {
        let timestamp = Utc::now().naive_utc();

        connection.execute(
            "INSERT INTO activity_log (user_id, action, timestamp) VALUES (?1, ?2, ?3)",
            (user_id.as_i64(), action, timestamp),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Self {
            id,
            user_id,
            action: action.to_string(),
            timestamp,
        })
    }

    /// Retrieve a user's audit entries, oldest first.
    pub fn select_by_user(user_id: UserID, connection: &Connection) -> Result<Vec<Self>, DbError> {
        connection
            .prepare(
                "SELECT id, user_id, action, timestamp FROM activity_log
                WHERE user_id = :user_id ORDER BY id",
            )?
            .query_map(&[(":user_id", &user_id.as_i64())], ActivityLog::map_row)?
            .map(|maybe_entry| maybe_entry.map_err(DbError::SqlError))
            .collect()
    }

    /// Retrieve every user's audit entries, oldest first.
    pub fn select_all(connection: &Connection) -> Result<Vec<Self>, DbError> {
        connection
            .prepare("SELECT id, user_id, action, timestamp FROM activity_log ORDER BY id")?
            .query_map([], ActivityLog::map_row)?
            .map(|maybe_entry| maybe_entry.map_err(DbError::SqlError))
            .collect()
    }
}

impl MapRow for ActivityLog {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            action: row.get(offset + 2)?,
            timestamp: row.get(offset + 3)?,
        })
    }
}

impl CreateTable for ActivityLog {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS activity_log (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    action TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}
