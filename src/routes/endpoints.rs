//! The API endpoint URIs.

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/coffee";
/// The route for registering a new user.
pub const USERS: &str = "/users";
/// The route for exchanging credentials for a JWT.
pub const SIGN_IN: &str = "/sign_in";
/// The route for reading and updating the calling user's profile.
pub const PROFILE: &str = "/profile";
/// The route for changing the calling user's password.
pub const PASSWORD: &str = "/password";
/// The route for enabling and disabling two-factor authentication.
pub const TWO_FACTOR: &str = "/two_factor";
/// The route for deleting the calling user's account.
pub const ACCOUNT: &str = "/account";
/// The route for creating and searching transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route for a single transaction.
pub const TRANSACTION: &str = "/transactions/:transaction_id";
/// The route for creating and listing investments.
pub const INVESTMENTS: &str = "/investments";
/// The route for a single investment.
pub const INVESTMENT: &str = "/investments/:investment_id";
/// The route for creating and listing recurring transaction definitions.
pub const RECURRING_TRANSACTIONS: &str = "/recurring_transactions";
/// The route for a single recurring transaction definition.
pub const RECURRING_TRANSACTION: &str = "/recurring_transactions/:recurring_transaction_id";
/// The route for downloading a backup of the calling user's records.
pub const BACKUP: &str = "/backup";
/// The route for restoring a previously downloaded backup.
pub const RESTORE: &str = "/restore";
/// The route for exporting the calling user's records in a named format.
pub const EXPORT: &str = "/export/:format";
/// The route for the calling user's audit trail.
pub const ACTIVITY: &str = "/activity";
/// The route for every user's audit trail (admin only).
pub const ADMIN_ACTIVITY: &str = "/admin/activity";
/// The route for triggering a sweep of due recurring transactions (admin only).
pub const ADMIN_SWEEP: &str = "/admin/sweep";
