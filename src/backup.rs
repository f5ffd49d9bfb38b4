//! Backup and restore of a user's financial records.
//!
//! The export is a deterministic document with three named arrays; dates are
//! ISO-8601 strings so the document round-trips across locales. Restore
//! validates the whole document shape before touching the database and
//! inserts everything inside a single SQL transaction, so a malformed
//! document leaves the ledger untouched.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    db::DbError,
    models::{Interval, Investment, RecurringTransaction, Transaction, UserID},
};

/// One ledger entry in a backup document.
///
/// Surrogate keys and the owning user are deliberately absent: a document can
/// be restored into any account, and the round-trip law holds modulo key
/// reassignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRecord {
    pub amount: f64,
    pub category: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_path: Option<String>,
}

/// One investment in a backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvestmentRecord {
    pub name: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// One recurring transaction definition in a backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecurringTransactionRecord {
    pub amount: f64,
    pub category: String,
    pub interval: Interval,
    pub next_date: NaiveDateTime,
}

/// A complete export of one user's financial records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupDocument {
    pub transactions: Vec<TransactionRecord>,
    pub investments: Vec<InvestmentRecord>,
    pub recurring_transactions: Vec<RecurringTransactionRecord>,
}

/// Export every financial record owned by `user_id`, ordered by id so the
/// output is deterministic.
pub fn export_user(user_id: UserID, connection: &Connection) -> Result<BackupDocument, DbError> {
    let transactions = Transaction::select_by_user(user_id, connection)?
        .into_iter()
        .map(|transaction| TransactionRecord {
            amount: transaction.amount(),
            category: transaction.category().to_string(),
            date: *transaction.date(),
            description: transaction.description().map(str::to_string),
            receipt_path: transaction.receipt_path().map(str::to_string),
        })
        .collect();

    let investments = Investment::select_by_user(user_id, connection)?
        .into_iter()
        .map(|investment| InvestmentRecord {
            name: investment.name().to_string(),
            amount: investment.amount(),
            date: *investment.date(),
        })
        .collect();

    let recurring_transactions = RecurringTransaction::select_by_user(user_id, connection)?
        .into_iter()
        .map(|recurring| RecurringTransactionRecord {
            amount: recurring.amount(),
            category: recurring.category().to_string(),
            interval: recurring.interval(),
            next_date: *recurring.next_date(),
        })
        .collect();

    Ok(BackupDocument {
        transactions,
        investments,
        recurring_transactions,
    })
}

/// Insert every record in `document` for `user_id`.
///
/// All-or-nothing: every insert happens inside one SQL transaction, and any
/// failure rolls the whole restore back.
pub fn restore_user(
    user_id: UserID,
    document: &BackupDocument,
    connection: &Connection,
) -> Result<(), DbError> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    for record in &document.transactions {
        Transaction::build(
            record.amount,
            record.category.clone(),
            record.date,
            user_id,
        )
        .description(record.description.clone())
        .receipt_path(record.receipt_path.clone())
        .insert(&sql_transaction)?;
    }

    for record in &document.investments {
        Investment::insert(
            record.name.clone(),
            record.amount,
            record.date,
            user_id,
            &sql_transaction,
        )?;
    }

    for record in &document.recurring_transactions {
        RecurringTransaction::insert(
            record.amount,
            record.category.clone(),
            record.interval,
            record.next_date,
            user_id,
            &sql_transaction,
        )?;
    }

    sql_transaction.commit()?;

    Ok(())
}
