//! Access control for the application.
//!
//! Every handler routes its permission question through [evaluate] rather
//! than checking roles inline, so the rules live in one place and can be
//! tested without HTTP plumbing.

use crate::models::{Role, UserID};

/// The authenticated caller a permission question is asked about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Principal {
    pub user_id: UserID,
    pub role: Role,
}

/// What the principal is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Modify,
    /// Server-wide operations such as triggering a sweep or reading every
    /// user's audit trail.
    Administer,
}

/// The thing the principal is trying to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A record owned by a single user.
    Owned(UserID),
    /// The application itself.
    System,
}

/// The outcome of a permission question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Decide whether `principal` may perform `action` on `resource`.
///
/// Owners may read and modify their own records. Admins may do anything,
/// including [Action::Administer] on the system itself; nobody else may
/// administer anything.
pub fn evaluate(principal: &Principal, action: Action, resource: &Resource) -> Decision {
    if principal.role == Role::Admin {
        return Decision::Allow;
    }

    match (action, resource) {
        (Action::Administer, _) => Decision::Deny,
        (_, Resource::Owned(owner)) if *owner == principal.user_id => Decision::Allow,
        _ => Decision::Deny,
    }
}
