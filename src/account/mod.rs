// SPDX-License-Identifier: MIT
//! User records — reconciliation against identity-provider subjects,
//! role parsing, and onboarding completion.
//!
//! Reconciliation is lazy: nothing on the request path creates records until
//! an authenticated caller hits an operation that needs one (session
//! introspection or onboarding). The storage layer's unique constraint on
//! `external_id` makes creation race-safe without application locking.

use thiserror::Error;

use crate::identity::Session;
use crate::storage::{Storage, UserRow};

// ─── Roles ────────────────────────────────────────────────────────────────────

/// Roles a user can hold. `Admin` is required for `/admin` routes; `Staff`
/// exists for internal tooling and carries no extra route access today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

impl Role {
    /// Parse a role from its stored string form.
    ///
    /// Unknown values fall back to `User` — the least-privileged role — so a
    /// corrupted row can never grant admin access.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "staff" => Role::Staff,
            _ => Role::User,
        }
    }
}

// ─── UserRecord ───────────────────────────────────────────────────────────────

/// Domain view of a stored user row, with the role parsed.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub external_id: String,
    pub role: Role,
    pub onboarding_completed_at: Option<String>,
    pub last_seen_at: Option<String>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            role: Role::from_str(&row.role),
            id: row.id,
            external_id: row.external_id,
            onboarding_completed_at: row.onboarding_completed_at,
            last_seen_at: row.last_seen_at,
        }
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("authentication required")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Ensure a user record exists for the identity provider's subject and
/// return it.
///
/// Idempotent: the first resolution for a new external id creates the record
/// with role `user` and no onboarding completion; every later call returns
/// the same record. Safe under concurrent invocation for one external id.
pub async fn ensure_user_record(
    storage: &Storage,
    external_id: &str,
) -> Result<UserRecord, AccountError> {
    let row = storage.ensure_user(external_id).await?;
    Ok(row.into())
}

/// Complete onboarding for the authenticated caller.
///
/// Reconciles the record, then unconditionally overwrites
/// `onboarding_completed_at` with the current time — re-running onboarding
/// moves the timestamp, it never duplicates the record.
pub async fn complete_onboarding(
    storage: &Storage,
    session: &Session,
) -> Result<UserRecord, AccountError> {
    if !session.is_authenticated {
        return Err(AccountError::Unauthorized);
    }
    let Some(external_id) = session.user_id.as_deref() else {
        return Err(AccountError::Unauthorized);
    };

    let record = ensure_user_record(storage, external_id).await?;
    let row = storage.set_onboarding_completed(&record.id).await?;
    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_parses_to_least_privilege() {
        assert_eq!(Role::from_str("admin"), Role::Admin);
        assert_eq!(Role::from_str("staff"), Role::Staff);
        assert_eq!(Role::from_str("user"), Role::User);
        assert_eq!(Role::from_str("superuser"), Role::User);
        assert_eq!(Role::from_str(""), Role::User);
    }
}
