//! This file defines recurring transactions, templates that the sweep turns
//! into concrete ledger entries each time they fall due.

use std::str::FromStr;

use chrono::{Days, Months, NaiveDateTime};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db::{CreateTable, DbError, MapRow},
    models::{DatabaseID, UserID},
};

#[derive(Debug, Error)]
#[error("{0:?} is not a valid interval")]
pub struct IntervalError(String);

/// How often a recurring transaction happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    /// A calendar month of variable length.
    Monthly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }

    /// The next due date after `date`.
    ///
    /// Monthly advancement is calendar-correct: the day of month is clamped
    /// to the length of the target month, so the 31st of January advances to
    /// the 29th of February in a leap year.
    pub fn advance(&self, date: NaiveDateTime) -> NaiveDateTime {
        let advanced = match self {
            Interval::Daily => date.checked_add_days(Days::new(1)),
            Interval::Weekly => date.checked_add_days(Days::new(7)),
            Interval::Monthly => date.checked_add_months(Months::new(1)),
        };

        // Addition only fails past the year 262143. Saturate rather than
        // return the input unchanged, which would leave the definition due
        // on every sweep.
        advanced.unwrap_or(NaiveDateTime::MAX)
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            other => Err(IntervalError(other.to_string())),
        }
    }
}

/// A template for regenerating ledger entries on an interval.
///
/// `next_date` is only ever advanced by the sweep; user edits go through
/// delete-and-recreate so the due schedule cannot be silently rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    id: DatabaseID,
    amount: f64,
    category: String,
    interval: Interval,
    next_date: NaiveDateTime,
    user_id: UserID,
}

impl RecurringTransaction {
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn next_date(&self) -> &NaiveDateTime {
        &self.next_date
    }

    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// Insert a new recurring transaction definition.
    ///
    /// # Errors
    /// Returns [DbError::InvalidForeignKey] if `user_id` does not refer to a valid user.
    pub fn insert(
        amount: f64,
        category: String,
        interval: Interval,
        next_date: NaiveDateTime,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<Self, DbError> {
        connection.execute(
            "INSERT INTO recurring_transaction (amount, category, interval, next_date, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                amount,
                &category,
                interval.as_str(),
                next_date,
                user_id.as_i64(),
            ),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Self {
            id,
            amount,
            category,
            interval,
            next_date,
            user_id,
        })
    }

    /// Retrieve a recurring transaction by its `id`.
    pub fn select(id: DatabaseID, connection: &Connection) -> Result<Self, DbError> {
        connection
            .prepare(
                "SELECT id, amount, category, interval, next_date, user_id
                FROM recurring_transaction WHERE id = :id",
            )?
            .query_row(&[(":id", &id)], RecurringTransaction::map_row)
            .map_err(|e| e.into())
    }

    /// Retrieve all of a user's recurring transactions, ordered by id.
    pub fn select_by_user(user_id: UserID, connection: &Connection) -> Result<Vec<Self>, DbError> {
        connection
            .prepare(
                "SELECT id, amount, category, interval, next_date, user_id
                FROM recurring_transaction WHERE user_id = :user_id ORDER BY id",
            )?
            .query_map(
                &[(":user_id", &user_id.as_i64())],
                RecurringTransaction::map_row,
            )?
            .map(|maybe_recurring| maybe_recurring.map_err(DbError::SqlError))
            .collect()
    }

    /// Retrieve every definition whose `next_date` is at or before `now`, across all users.
    pub fn select_due(
        now: NaiveDateTime,
        connection: &Connection,
    ) -> Result<Vec<Self>, DbError> {
        connection
            .prepare(
                "SELECT id, amount, category, interval, next_date, user_id
                FROM recurring_transaction WHERE next_date <= :now ORDER BY id",
            )?
            .query_map(&[(":now", &now)], RecurringTransaction::map_row)?
            .map(|maybe_recurring| maybe_recurring.map_err(DbError::SqlError))
            .collect()
    }

    /// Delete the recurring transaction with `id`.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if `id` does not refer to a recurring transaction.
    pub fn delete(id: DatabaseID, connection: &Connection) -> Result<(), DbError> {
        let rows_changed =
            connection.execute("DELETE FROM recurring_transaction WHERE id = ?1", (id,))?;

        if rows_changed == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

impl MapRow for RecurringTransaction {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self, rusqlite::Error> {
        let raw_interval: String = row.get(offset + 3)?;
        let interval = Interval::from_str(&raw_interval).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 3,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(Self {
            id: row.get(offset)?,
            amount: row.get(offset + 1)?,
            category: row.get(offset + 2)?,
            interval,
            next_date: row.get(offset + 4)?,
            user_id: UserID::new(row.get(offset + 5)?),
        })
    }
}

impl CreateTable for RecurringTransaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS recurring_transaction (
                    id INTEGER PRIMARY KEY,
                    amount REAL NOT NULL,
                    category TEXT NOT NULL,
                    interval TEXT NOT NULL,
                    next_date TEXT NOT NULL,
                    user_id INTEGER NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod interval_tests {
    use chrono::NaiveDate;

    use super::Interval;

    fn datetime(year: i32, month: u32, day: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn advance_daily_adds_one_day() {
        assert_eq!(
            Interval::Daily.advance(datetime(2024, 2, 28)),
            datetime(2024, 2, 29)
        );
    }

    #[test]
    fn advance_weekly_adds_seven_days() {
        assert_eq!(
            Interval::Weekly.advance(datetime(2024, 12, 30)),
            datetime(2025, 1, 6)
        );
    }

    #[test]
    fn advance_monthly_clamps_to_leap_february() {
        assert_eq!(
            Interval::Monthly.advance(datetime(2024, 1, 31)),
            datetime(2024, 2, 29)
        );
    }

    #[test]
    fn advance_monthly_clamps_to_short_february() {
        assert_eq!(
            Interval::Monthly.advance(datetime(2023, 1, 31)),
            datetime(2023, 2, 28)
        );
    }

    #[test]
    fn advance_monthly_keeps_day_when_it_fits() {
        assert_eq!(
            Interval::Monthly.advance(datetime(2024, 4, 15)),
            datetime(2024, 5, 15)
        );
    }

    #[test]
    fn advance_saturates_at_end_of_calendar() {
        use chrono::NaiveDateTime;

        // A date that cannot be advanced must not stay due, so it saturates
        // instead of being returned unchanged.
        assert_eq!(Interval::Daily.advance(NaiveDateTime::MAX), NaiveDateTime::MAX);
        assert_eq!(
            Interval::Monthly.advance(NaiveDateTime::MAX),
            NaiveDateTime::MAX
        );
    }
}
