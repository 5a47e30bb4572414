// SPDX-License-Identifier: MIT
//! SQLite persistence — user records, subscriptions, and captured leads.
//!
//! Schema is bootstrapped with `CREATE TABLE IF NOT EXISTS` on startup; later
//! column additions are applied as idempotent `ALTER TABLE` statements (SQLite
//! has no `ALTER TABLE IF NOT EXISTS`, so the "duplicate column" error is
//! swallowed).

use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// A local user record, keyed by the identity provider's subject identifier.
///
/// Exactly one row exists per `external_id`; creation is an atomic
/// create-if-absent and rows are never deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub external_id: String,
    /// `user` | `staff` | `admin` — parsed by `account::Role`.
    pub role: String,
    /// RFC 3339 timestamp of onboarding completion. NULL until the user
    /// finishes onboarding; overwritten on every re-completion.
    pub onboarding_completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Last session introspection that saw this user. NULL for legacy rows.
    pub last_seen_at: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRow {
    pub id: String,
    pub user_id: String,
    /// The payment provider's customer identifier.
    pub customer_ref: String,
    pub plan: String,
    /// `active` | `trialing` | `past_due` | `canceled` — provider vocabulary,
    /// stored verbatim.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// Which page or campaign produced the lead, e.g. `"pricing"`.
    pub source: Option<String>,
    pub created_at: String,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("campusd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a reference to the connection pool (Arc-backed, cheap to clone).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id                      TEXT PRIMARY KEY,
                external_id             TEXT NOT NULL UNIQUE,
                role                    TEXT NOT NULL DEFAULT 'user',
                onboarding_completed_at TEXT,
                created_at              TEXT NOT NULL,
                updated_at              TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("create users table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS subscriptions (
                id           TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL UNIQUE REFERENCES users(id),
                customer_ref TEXT NOT NULL,
                plan         TEXT NOT NULL,
                status       TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("create subscriptions table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS leads (
                id         TEXT PRIMARY KEY,
                email      TEXT NOT NULL,
                name       TEXT,
                source     TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("create leads table")?;

        // Idempotent column additions (ALTER TABLE IF NOT EXISTS is not
        // supported in SQLite, so we attempt the ALTER and ignore the
        // "duplicate column name" error).
        let alter_stmts = ["ALTER TABLE users ADD COLUMN last_seen_at TEXT"];
        for stmt in alter_stmts {
            let result = sqlx::query(stmt).execute(pool).await;
            if let Err(e) = result {
                let msg = e.to_string();
                if !msg.contains("duplicate column") {
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    /// Create the user record for `external_id` if none exists, then return it.
    ///
    /// The insert is `ON CONFLICT DO NOTHING`, so two concurrent calls for the
    /// same external id both land on the single surviving row — the loser of
    /// the race reads the winner's record rather than erroring.
    pub async fn ensure_user(&self, external_id: &str) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, external_id, role, created_at, updated_at)
             VALUES (?, ?, 'user', ?, ?)
             ON CONFLICT(external_id) DO NOTHING",
        )
        .bind(&id)
        .bind(external_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("insert user")?;

        self.get_user_by_external_id(external_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after upsert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_user_by_external_id(&self, external_id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Overwrite `onboarding_completed_at` with the current time and return
    /// the updated row. Re-invocation moves the timestamp forward; it never
    /// creates a second record.
    pub async fn set_onboarding_completed(&self, user_id: &str) -> Result<UserRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET onboarding_completed_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("set onboarding completion")?;

        self.get_user(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after update"))
    }

    /// Stamp `last_seen_at` for the user. Failures here are non-fatal to the
    /// caller — introspection must not 500 over a bookkeeping write.
    pub async fn touch_last_seen(&self, user_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET last_seen_at = ? WHERE id = ?")
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("touch last_seen_at")?;
        Ok(())
    }

    // ─── Subscriptions ──────────────────────────────────────────────────────

    /// Upsert the subscription state reported by the payment provider's
    /// webhook. One subscription per user; repeated callbacks update in place.
    pub async fn record_subscription(
        &self,
        user_id: &str,
        customer_ref: &str,
        plan: &str,
        status: &str,
    ) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO subscriptions (id, user_id, customer_ref, plan, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                customer_ref = excluded.customer_ref,
                plan         = excluded.plan,
                status       = excluded.status,
                updated_at   = excluded.updated_at",
        )
        .bind(&id)
        .bind(user_id)
        .bind(customer_ref)
        .bind(plan)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("upsert subscription")?;
        Ok(())
    }

    /// The user's subscription, if it is in a state that grants portal access.
    pub async fn active_subscription(&self, user_id: &str) -> Result<Option<SubscriptionRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM subscriptions
              WHERE user_id = ? AND status IN ('active', 'trialing', 'past_due')",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    // ─── Leads ──────────────────────────────────────────────────────────────

    pub async fn insert_lead(
        &self,
        email: &str,
        name: Option<&str>,
        source: Option<&str>,
    ) -> Result<LeadRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO leads (id, email, name, source, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(name)
            .bind(source)
            .bind(&now)
            .execute(&self.pool)
            .await
            .context("insert lead")?;

        Ok(sqlx::query_as("SELECT * FROM leads WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await?)
    }
}
