//! # Audit Repository
//!
//! Append-only trail of ledger operations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE products ... / INSERT INTO sales ...    ← the change          │
//! │    INSERT INTO audit_log (action, before, after)  ← written alongside   │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A rolled-back change leaves no audit row; a committed one always has   │
//! │  exactly one.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockroom_core::DEFAULT_AUDIT_LIMIT;

// =============================================================================
// Actions
// =============================================================================

pub const SALE_CREATE: &str = "sale.create";
pub const SALE_VOID: &str = "sale.void";
pub const PAYMENT_CREATE: &str = "payment.create";
pub const STOCK_IN: &str = "stock.in";
pub const STOCK_OUT: &str = "stock.out";
pub const STOCK_CORRECT: &str = "stock.correct";
pub const PRODUCT_CREATE: &str = "product.create";
pub const PRODUCT_UPDATE: &str = "product.update";
pub const PRODUCT_DELETE: &str = "product.delete";

// =============================================================================
// Types
// =============================================================================

/// A stored audit entry. Snapshots are JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub user_id: Option<String>,
    pub before_data: Option<String>,
    pub after_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Parsed `before_data`.
    pub fn before(&self) -> DbResult<Option<Value>> {
        parse_snapshot(self.before_data.as_deref())
    }

    /// Parsed `after_data`.
    pub fn after(&self) -> DbResult<Option<Value>> {
        parse_snapshot(self.after_data.as_deref())
    }
}

fn parse_snapshot(raw: Option<&str>) -> DbResult<Option<Value>> {
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        None => Ok(None),
    }
}

/// An audit entry about to be written.
#[derive(Debug, Clone)]
pub(crate) struct AuditEvent<'a> {
    pub action: &'static str,
    pub target_type: &'static str,
    pub target_id: &'a str,
    pub user_id: Option<&'a str>,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl<'a> AuditEvent<'a> {
    pub fn new(action: &'static str, target_type: &'static str, target_id: &'a str) -> Self {
        AuditEvent {
            action,
            target_type,
            target_id,
            user_id: None,
            before: None,
            after: None,
        }
    }

    pub fn by(mut self, user_id: Option<&'a str>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn before<T: Serialize>(mut self, value: &T) -> DbResult<Self> {
        self.before = Some(serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn after<T: Serialize>(mut self, value: &T) -> DbResult<Self> {
        self.after = Some(serde_json::to_value(value)?);
        Ok(self)
    }
}

/// Writes an audit entry on the caller's connection (normally the open
/// transaction of the change being recorded).
pub(crate) async fn write_entry(
    conn: &mut SqliteConnection,
    event: AuditEvent<'_>,
    at: DateTime<Utc>,
) -> DbResult<()> {
    debug!(action = event.action, target_id = %event.target_id, "Writing audit entry");

    let before = event.before.map(|v| v.to_string());
    let after = event.after.map(|v| v.to_string());

    sqlx::query(
        r#"
        INSERT INTO audit_log (
            id, action, target_type, target_id, user_id,
            before_data, after_data, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(event.action)
    .bind(event.target_type)
    .bind(event.target_id)
    .bind(event.user_id)
    .bind(before)
    .bind(after)
    .bind(at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to the audit trail.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Lists entries newest first.
    ///
    /// ## Arguments
    /// * `limit` - Maximum rows, defaults to 50
    /// * `offset` - Rows to skip
    pub async fn list(&self, limit: Option<u32>, offset: u32) -> DbResult<Vec<AuditEntry>> {
        let limit = limit.unwrap_or(DEFAULT_AUDIT_LIMIT);

        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, action, target_type, target_id, user_id,
                   before_data, after_data, created_at
            FROM audit_log
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists every entry about one record, oldest first.
    pub async fn list_for_target(&self, target_type: &str, target_id: &str) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, action, target_type, target_id, user_id,
                   before_data, after_data, created_at
            FROM audit_log
            WHERE target_type = ?1 AND target_id = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
