//! The sweep turns due recurring transactions into concrete ledger entries.
//!
//! Each due definition is materialized inside its own SQL transaction: the
//! due date is claimed with a compare-and-set on `next_date`, the ledger
//! entry is inserted only when the claim succeeds, and any insert failure
//! rolls the claim back. A second sweep running at the same instant loses
//! every compare-and-set and therefore creates nothing.

use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    config::AppConfig,
    db::DbError,
    models::{RecurringTransaction, Transaction},
};

/// Materialize every definition due at `now`.
///
/// A definition overdue by several periods is advanced one period per call;
/// repeated sweeps converge on the schedule. Claims lost to a concurrent
/// sweep are skipped silently.
///
/// Returns the number of ledger entries created.
pub fn materialize_due(connection: &Connection, now: NaiveDateTime) -> Result<usize, DbError> {
    let due_definitions = RecurringTransaction::select_due(now, connection)?;
    let mut created = 0;

    for definition in due_definitions {
        if materialize(&definition, connection)? {
            created += 1;
        }
    }

    Ok(created)
}

/// Materialize a single due occurrence of `definition`.
///
/// Returns `false` if another sweep claimed the occurrence first.
fn materialize(
    definition: &RecurringTransaction,
    connection: &Connection,
) -> Result<bool, DbError> {
    let due_date = *definition.next_date();
    let advanced_date = definition.interval().advance(due_date);

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    // Claim the occurrence: the update only matches while next_date still
    // holds the value we read, so exactly one sweep wins per due date.
    let claimed = sql_transaction.execute(
        "UPDATE recurring_transaction SET next_date = ?1 WHERE id = ?2 AND next_date = ?3",
        (advanced_date, definition.id(), due_date),
    )?;

    if claimed == 0 {
        // Lost the race; the winner already created the ledger entry.
        return Ok(false);
    }

    Transaction::build(
        definition.amount(),
        definition.category().to_string(),
        due_date,
        definition.user_id(),
    )
    .insert(&sql_transaction)?;

    sql_transaction.commit()?;

    Ok(true)
}

/// Run one sweep at the current time, unless a sweep is already in progress.
///
/// Returns `None` when the run was skipped because the lock was contended.
pub fn sweep_once(state: &AppConfig) -> Result<Option<usize>, DbError> {
    let Ok(_guard) = state.sweep_lock().try_lock() else {
        return Ok(None);
    };

    let connection = state
        .db_connection()
        .lock()
        .expect("database connection mutex was poisoned");

    materialize_due(&connection, Utc::now().naive_utc()).map(Some)
}

/// An async task that sweeps on a timer for the lifetime of the server.
///
/// Runs that would overlap a still-running sweep are skipped rather than
/// queued, so a slow database cannot pile up duplicate materializations.
pub async fn run(state: AppConfig, period: std::time::Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match sweep_once(&state) {
            Ok(Some(created)) if created > 0 => {
                tracing::info!("sweep materialized {} recurring transaction(s)", created);
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!("previous sweep still running, skipping this run");
            }
            Err(e) => {
                tracing::error!("sweep failed: {}", e);
            }
        }
    }
}
