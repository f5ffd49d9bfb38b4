//! This file defines an investment, a named holding recorded against a user.

use chrono::NaiveDate;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    db::{CreateTable, DbError, MapRow},
    models::{DatabaseID, UserID},
};

/// A named investment holding belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    id: DatabaseID,
    name: String,
    amount: f64,
    date: NaiveDate,
    user_id: UserID,
}

impl Investment {
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn date(&self) -> &NaiveDate {
        &self.date
    }

    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// Insert a new investment for `user_id`.
    ///
    /// # Errors
    /// Returns [DbError::InvalidForeignKey] if `user_id` does not refer to a valid user.
    pub fn insert(
        name: String,
        amount: f64,
        date: NaiveDate,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<Self, DbError> {
        connection.execute(
            "INSERT INTO investment (name, amount, date, user_id) VALUES (?1, ?2, ?3, ?4)",
            (&name, amount, date, user_id.as_i64()),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Self {
            id,
            name,
            amount,
            date,
            user_id,
        })
    }

    /// Retrieve an investment by its `id`.
    pub fn select(id: DatabaseID, connection: &Connection) -> Result<Self, DbError> {
        connection
            .prepare("SELECT id, name, amount, date, user_id FROM investment WHERE id = :id")?
            .query_row(&[(":id", &id)], Investment::map_row)
            .map_err(|e| e.into())
    }

    /// Retrieve all of a user's investments, ordered by id.
    pub fn select_by_user(user_id: UserID, connection: &Connection) -> Result<Vec<Self>, DbError> {
        connection
            .prepare(
                "SELECT id, name, amount, date, user_id FROM investment
                WHERE user_id = :user_id ORDER BY id",
            )?
            .query_map(&[(":user_id", &user_id.as_i64())], Investment::map_row)?
            .map(|maybe_investment| maybe_investment.map_err(DbError::SqlError))
            .collect()
    }

    /// Delete the investment with `id`.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if `id` does not refer to an investment.
    pub fn delete(id: DatabaseID, connection: &Connection) -> Result<(), DbError> {
        let rows_changed = connection.execute("DELETE FROM investment WHERE id = ?1", (id,))?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

impl MapRow for Investment {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            amount: row.get(offset + 2)?,
            date: row.get(offset + 3)?,
            user_id: UserID::new(row.get(offset + 4)?),
        })
    }
}

impl CreateTable for Investment {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS investment (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    amount REAL NOT NULL,
                    date TEXT NOT NULL,
                    user_id INTEGER NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod investment_tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        db::{initialize, DbError},
        models::{Investment, PasswordHash, User},
    };

    fn create_database_and_insert_test_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let test_user = User::build(
            "alice".to_string(),
            EmailAddress::from_str("foo@bar.baz").unwrap(),
            PasswordHash::new_unchecked("hunter2"),
        )
        .insert(&conn)
        .unwrap();

        (conn, test_user)
    }

    #[test]
    fn insert_and_select_round_trips() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let inserted = Investment::insert(
            "Index fund".to_string(),
            1500.0,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            test_user.id(),
            &conn,
        )
        .unwrap();

        let selected = Investment::select(inserted.id(), &conn).unwrap();

        assert_eq!(inserted, selected);
    }

    #[test]
    fn select_by_user_returns_only_owned_rows() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let other_user = User::build(
            "bob".to_string(),
            EmailAddress::from_str("bob@bar.baz").unwrap(),
            PasswordHash::new_unchecked("hunter3"),
        )
        .insert(&conn)
        .unwrap();

        let owned = Investment::insert(
            "Index fund".to_string(),
            1500.0,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            test_user.id(),
            &conn,
        )
        .unwrap();

        Investment::insert(
            "Bonds".to_string(),
            500.0,
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            other_user.id(),
            &conn,
        )
        .unwrap();

        let investments = Investment::select_by_user(test_user.id(), &conn).unwrap();

        assert_eq!(investments, vec![owned]);
    }

    #[test]
    fn delete_removes_row() {
        let (conn, test_user) = create_database_and_insert_test_user();

        let investment = Investment::insert(
            "Index fund".to_string(),
            1500.0,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            test_user.id(),
            &conn,
        )
        .unwrap();

        Investment::delete(investment.id(), &conn).unwrap();

        assert_eq!(
            Investment::select(investment.id(), &conn),
            Err(DbError::NotFound)
        );
    }
}
