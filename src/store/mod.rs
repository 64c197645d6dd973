//! Rule storage.
//!
//! The gate only ever reads a [`RuleSnapshot`]; administration goes through
//! the rest of the [`RuleStore`] contract. Two backends implement it:
//! [`SqliteRuleStore`] for persistent rules and [`StaticRuleStore`] for rules
//! taken from configuration (also used as the fallback when the database
//! cannot be read).

use async_trait::async_trait;
use crate::db::models::{Rule, RuleKind};
use crate::error::AppResult;

pub mod memory;
pub mod sqlite;

pub use memory::StaticRuleStore;
pub use sqlite::SqliteRuleStore;

/// Active patterns of both kinds, read together for one decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSnapshot {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

impl RuleSnapshot {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Patterns of active rules of one kind, in no particular order.
    async fn list_active(&self, kind: RuleKind) -> AppResult<Vec<String>>;

    /// All rules, active or not, optionally restricted to one kind. Ordered by id.
    async fn list(&self, kind: Option<RuleKind>) -> AppResult<Vec<Rule>>;

    async fn find(&self, pattern: &str, kind: RuleKind) -> AppResult<Option<Rule>>;

    /// Insert, or update the label and re-activate the existing `(pattern, kind)` rule.
    async fn upsert(&self, pattern: &str, kind: RuleKind, label: Option<&str>) -> AppResult<Rule>;

    /// Returns `true` iff a rule was deleted.
    async fn remove_one(&self, pattern: &str, kind: RuleKind) -> AppResult<bool>;

    /// Delete every rule of `kind`, or every rule when `kind` is `None`.
    async fn remove_all(&self, kind: Option<RuleKind>) -> AppResult<u64>;

    /// Flip `is_active`. `AppError::NotFound` for an unknown id.
    async fn toggle(&self, id: i64) -> AppResult<Rule>;

    async fn count_active(&self, kind: RuleKind) -> AppResult<u64>;

    async fn count_all(&self) -> AppResult<u64>;

    async fn count_inactive(&self) -> AppResult<u64>;

    async fn snapshot(&self) -> AppResult<RuleSnapshot> {
        Ok(RuleSnapshot {
            allow: self.list_active(RuleKind::Allow).await?,
            deny: self.list_active(RuleKind::Deny).await?,
        })
    }
}
