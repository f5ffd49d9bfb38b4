//! This file defines a transaction, a single dated entry in a user's ledger.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};

use crate::{
    db::{CreateTable, DbError, MapRow},
    models::{DatabaseID, UserID},
};

/// A single income or expense entry belonging to one user.
///
/// Amounts are signed: negative values are expenses, positive values income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: DatabaseID,
    amount: f64,
    category: String,
    date: NaiveDateTime,
    description: Option<String>,
    receipt_path: Option<String>,
    user_id: UserID,
}

impl Transaction {
    /// Build a new transaction for `user_id`.
    ///
    /// Shortcut for [TransactionBuilder::new] for discoverability.
    pub fn build(
        amount: f64,
        category: String,
        date: NaiveDateTime,
        user_id: UserID,
    ) -> TransactionBuilder {
        TransactionBuilder::new(amount, category, date, user_id)
    }

    pub fn id(&self) -> DatabaseID {
        self.id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn date(&self) -> &NaiveDateTime {
        &self.date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn receipt_path(&self) -> Option<&str> {
        self.receipt_path.as_deref()
    }

    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// Retrieve a transaction in the database by its `id`.
    pub fn select(id: DatabaseID, connection: &Connection) -> Result<Self, DbError> {
        connection
            .prepare(
                "SELECT id, amount, category, date, description, receipt_path, user_id
                FROM ledger_transaction WHERE id = :id",
            )?
            .query_row(&[(":id", &id)], Transaction::map_row)
            .map_err(|e| e.into())
    }

    /// Retrieve all of a user's transactions, ordered by id.
    pub fn select_by_user(user_id: UserID, connection: &Connection) -> Result<Vec<Self>, DbError> {
        connection
            .prepare(
                "SELECT id, amount, category, date, description, receipt_path, user_id
                FROM ledger_transaction WHERE user_id = :user_id ORDER BY id",
            )?
            .query_map(&[(":user_id", &user_id.as_i64())], Transaction::map_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(DbError::SqlError))
            .collect()
    }

    /// Retrieve a user's transactions matching `filter`, ordered by id.
    ///
    /// Filters that are `None` do not constrain the result.
    pub fn search(
        user_id: UserID,
        filter: &TransactionFilter,
        connection: &Connection,
    ) -> Result<Vec<Self>, DbError> {
        let mut sql = String::from(
            "SELECT id, amount, category, date, description, receipt_path, user_id
            FROM ledger_transaction WHERE user_id = ?1",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.as_i64())];

        if let Some(start_date) = filter.start_date {
            params.push(Box::new(start_date));
            sql.push_str(&format!(" AND date(date) >= date(?{})", params.len()));
        }

        if let Some(end_date) = filter.end_date {
            params.push(Box::new(end_date));
            sql.push_str(&format!(" AND date(date) <= date(?{})", params.len()));
        }

        if let Some(ref category) = filter.category {
            params.push(Box::new(category.clone()));
            sql.push_str(&format!(" AND category = ?{}", params.len()));
        }

        sql.push_str(" ORDER BY id");

        connection
            .prepare(&sql)?
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|param| param.as_ref() as &dyn ToSql)),
                Transaction::map_row,
            )?
            .map(|maybe_transaction| maybe_transaction.map_err(DbError::SqlError))
            .collect()
    }

    /// Overwrite the transaction's editable fields.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if `id` does not refer to a transaction.
    pub fn update(
        id: DatabaseID,
        amount: f64,
        category: &str,
        date: NaiveDateTime,
        description: Option<&str>,
        connection: &Connection,
    ) -> Result<(), DbError> {
        let rows_changed = connection.execute(
            "UPDATE ledger_transaction SET amount = ?1, category = ?2, date = ?3, description = ?4
            WHERE id = ?5",
            (amount, category, date, description, id),
        )?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    /// Delete the transaction with `id`.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if `id` does not refer to a transaction.
    pub fn delete(id: DatabaseID, connection: &Connection) -> Result<(), DbError> {
        let rows_changed =
            connection.execute("DELETE FROM ledger_transaction WHERE id = ?1", (id,))?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            amount: row.get(offset + 1)?,
            category: row.get(offset + 2)?,
            date: row.get(offset + 3)?,
            description: row.get(offset + 4)?,
            receipt_path: row.get(offset + 5)?,
            user_id: UserID::new(row.get(offset + 6)?),
        })
    }
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS ledger_transaction (
                    id INTEGER PRIMARY KEY,
                    amount REAL NOT NULL,
                    category TEXT NOT NULL,
                    date TEXT NOT NULL,
                    description TEXT,
                    receipt_path TEXT,
                    user_id INTEGER NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

/// Optional constraints for [Transaction::search].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
}

/// Builder for creating new [Transaction]s.
///
/// The function for finalizing the builder is [TransactionBuilder::insert].
pub struct TransactionBuilder {
    amount: f64,
    category: String,
    date: NaiveDateTime,
    description: Option<String>,
    receipt_path: Option<String>,
    user_id: UserID,
}

impl TransactionBuilder {
    pub fn new(amount: f64, category: String, date: NaiveDateTime, user_id: UserID) -> Self {
        Self {
            amount,
            category,
            date,
            description: None,
            receipt_path: None,
            user_id,
        }
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn receipt_path(mut self, receipt_path: Option<String>) -> Self {
        self.receipt_path = receipt_path;
        self
    }

    /// Insert the transaction into the application database and return the built transaction.
    ///
    /// # Errors
    /// Returns [DbError::InvalidForeignKey] if `user_id` does not refer to a valid user.
    pub fn insert(self, connection: &Connection) -> Result<Transaction, DbError> {
        connection.execute(
            "INSERT INTO ledger_transaction (amount, category, date, description, receipt_path, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                self.amount,
                &self.category,
                self.date,
                &self.description,
                &self.receipt_path,
                self.user_id.as_i64(),
            ),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Transaction {
            id,
            amount: self.amount,
            category: self.category,
            date: self.date,
            description: self.description,
            receipt_path: self.receipt_path,
            user_id: self.user_id,
        })
    }
}
