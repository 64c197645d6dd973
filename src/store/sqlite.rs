use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar};
use super::{RuleSnapshot, RuleStore};
use crate::db::models::{Rule, RuleKind};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

pub struct SqliteRuleStore {
    db: DbPool,
}

impl SqliteRuleStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn list_active(&self, kind: RuleKind) -> AppResult<Vec<String>> {
        let rows: Vec<String> = query_scalar(
            "SELECT pattern FROM ip_rules WHERE kind = ? AND is_active = 1"
        )
        .bind(kind.as_str())
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list(&self, kind: Option<RuleKind>) -> AppResult<Vec<Rule>> {
        let rows = query_as::<_, Rule>(
            "SELECT id, pattern, kind, label, is_active, created_at, updated_at
             FROM ip_rules
             WHERE ?1 IS NULL OR kind = ?1
             ORDER BY id ASC"
        )
        .bind(kind.map(RuleKind::as_str))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, pattern: &str, kind: RuleKind) -> AppResult<Option<Rule>> {
        let row = query_as::<_, Rule>(
            "SELECT id, pattern, kind, label, is_active, created_at, updated_at
             FROM ip_rules WHERE pattern = ? AND kind = ?"
        )
        .bind(pattern)
        .bind(kind.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn upsert(&self, pattern: &str, kind: RuleKind, label: Option<&str>) -> AppResult<Rule> {
        let now = Utc::now().to_rfc3339();

        let rule = query_as::<_, Rule>(
            "INSERT INTO ip_rules (pattern, kind, label, is_active, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?)
             ON CONFLICT (pattern, kind) DO UPDATE SET
                label = excluded.label,
                is_active = 1,
                updated_at = excluded.updated_at
             RETURNING id, pattern, kind, label, is_active, created_at, updated_at"
        )
        .bind(pattern)
        .bind(kind.as_str())
        .bind(label)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!("Upserted {} rule {} (id {})", kind, pattern, rule.id);
        Ok(rule)
    }

    async fn remove_one(&self, pattern: &str, kind: RuleKind) -> AppResult<bool> {
        let result = query("DELETE FROM ip_rules WHERE pattern = ? AND kind = ?")
            .bind(pattern)
            .bind(kind.as_str())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_all(&self, kind: Option<RuleKind>) -> AppResult<u64> {
        let result = query("DELETE FROM ip_rules WHERE ?1 IS NULL OR kind = ?1")
            .bind(kind.map(RuleKind::as_str))
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn toggle(&self, id: i64) -> AppResult<Rule> {
        let now = Utc::now().to_rfc3339();

        query_as::<_, Rule>(
            "UPDATE ip_rules SET is_active = NOT is_active, updated_at = ?
             WHERE id = ?
             RETURNING id, pattern, kind, label, is_active, created_at, updated_at"
        )
        .bind(&now)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rule {} not found", id)))
    }

    async fn count_active(&self, kind: RuleKind) -> AppResult<u64> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM ip_rules WHERE kind = ? AND is_active = 1"
        )
        .bind(kind.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(count as u64)
    }

    async fn count_all(&self) -> AppResult<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM ip_rules")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }

    async fn count_inactive(&self) -> AppResult<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM ip_rules WHERE is_active = 0")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }

    /// Both lists from one statement, so a decision never sees half of a change.
    async fn snapshot(&self) -> AppResult<RuleSnapshot> {
        let rows: Vec<(String, String)> = query_as(
            "SELECT pattern, kind FROM ip_rules WHERE is_active = 1"
        )
        .fetch_all(&self.db)
        .await?;

        let mut snapshot = RuleSnapshot::default();
        for (pattern, kind) in rows {
            match kind.parse::<RuleKind>() {
                Ok(RuleKind::Allow) => snapshot.allow.push(pattern),
                Ok(RuleKind::Deny) => snapshot.deny.push(pattern),
                Err(_) => tracing::warn!("Skipping rule {} with unknown kind {:?}", pattern, kind),
            }
        }
        Ok(snapshot)
    }
}
