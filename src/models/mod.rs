//! This module defines the domain data types and their persistence.

/// Alias for the type used for database row IDs.
pub type DatabaseID = i64;

pub use activity_log::ActivityLog;
pub use investment::Investment;
pub use password::{PasswordHash, ValidatedPassword};
pub use recurring_transaction::{Interval, IntervalError, RecurringTransaction};
pub use transaction::{Transaction, TransactionBuilder, TransactionFilter};
pub use user::{Role, RoleError, User, UserBuilder, UserID};

mod activity_log;
mod investment;
mod password;
mod recurring_transaction;
mod transaction;
mod user;
