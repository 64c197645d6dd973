use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use super::{RuleSnapshot, RuleStore};
use crate::db::models::{Rule, RuleKind};
use crate::error::{AppError, AppResult};

/// In-process rule store. Seeded from the configured lists; nothing survives a restart.
pub struct StaticRuleStore {
    rules: RwLock<Vec<Rule>>,
    next_id: AtomicI64,
}

impl StaticRuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn from_lists(allow: &[String], deny: &[String]) -> Self {
        let now = Utc::now().to_rfc3339();
        let mut rules = Vec::with_capacity(allow.len() + deny.len());
        let mut id = 0;

        let seeded = allow.iter().map(|p| (p, RuleKind::Allow))
            .chain(deny.iter().map(|p| (p, RuleKind::Deny)));
        for (pattern, kind) in seeded {
            if rules.iter().any(|r: &Rule| r.pattern == *pattern && r.kind == kind) {
                continue;
            }
            id += 1;
            rules.push(Rule {
                id,
                pattern: pattern.clone(),
                kind,
                label: None,
                is_active: true,
                created_at: now.clone(),
                updated_at: now.clone(),
            });
        }

        Self {
            rules: RwLock::new(rules),
            next_id: AtomicI64::new(id + 1),
        }
    }
}

impl Default for StaticRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for StaticRuleStore {
    async fn list_active(&self, kind: RuleKind) -> AppResult<Vec<String>> {
        let rules = self.rules.read().await;
        Ok(rules.iter()
            .filter(|r| r.kind == kind && r.is_active)
            .map(|r| r.pattern.clone())
            .collect())
    }

    async fn list(&self, kind: Option<RuleKind>) -> AppResult<Vec<Rule>> {
        let rules = self.rules.read().await;
        Ok(rules.iter()
            .filter(|r| kind.map_or(true, |k| r.kind == k))
            .cloned()
            .collect())
    }

    async fn find(&self, pattern: &str, kind: RuleKind) -> AppResult<Option<Rule>> {
        let rules = self.rules.read().await;
        Ok(rules.iter().find(|r| r.pattern == pattern && r.kind == kind).cloned())
    }

    async fn upsert(&self, pattern: &str, kind: RuleKind, label: Option<&str>) -> AppResult<Rule> {
        let now = Utc::now().to_rfc3339();
        let mut rules = self.rules.write().await;

        if let Some(rule) = rules.iter_mut().find(|r| r.pattern == pattern && r.kind == kind) {
            rule.label = label.map(str::to_string);
            rule.is_active = true;
            rule.updated_at = now;
            return Ok(rule.clone());
        }

        let rule = Rule {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            pattern: pattern.to_string(),
            kind,
            label: label.map(str::to_string),
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        rules.push(rule.clone());
        Ok(rule)
    }

    async fn remove_one(&self, pattern: &str, kind: RuleKind) -> AppResult<bool> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|r| !(r.pattern == pattern && r.kind == kind));
        Ok(rules.len() < before)
    }

    async fn remove_all(&self, kind: Option<RuleKind>) -> AppResult<u64> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|r| kind.map_or(false, |k| r.kind != k));
        Ok((before - rules.len()) as u64)
    }

    async fn toggle(&self, id: i64) -> AppResult<Rule> {
        let mut rules = self.rules.write().await;
        let rule = rules.iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Rule {} not found", id)))?;
        rule.is_active = !rule.is_active;
        rule.updated_at = Utc::now().to_rfc3339();
        Ok(rule.clone())
    }

    async fn count_active(&self, kind: RuleKind) -> AppResult<u64> {
        let rules = self.rules.read().await;
        Ok(rules.iter().filter(|r| r.kind == kind && r.is_active).count() as u64)
    }

    async fn count_all(&self) -> AppResult<u64> {
        Ok(self.rules.read().await.len() as u64)
    }

    async fn count_inactive(&self) -> AppResult<u64> {
        let rules = self.rules.read().await;
        Ok(rules.iter().filter(|r| !r.is_active).count() as u64)
    }

    /// Both lists under one read guard.
    async fn snapshot(&self) -> AppResult<RuleSnapshot> {
        let rules = self.rules.read().await;
        let mut snapshot = RuleSnapshot::default();
        for rule in rules.iter().filter(|r| r.is_active) {
            match rule.kind {
                RuleKind::Allow => snapshot.allow.push(rule.pattern.clone()),
                RuleKind::Deny => snapshot.deny.push(rule.pattern.clone()),
            }
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lists() -> StaticRuleStore {
        StaticRuleStore::from_lists(
            &["10.0.0.0/8".to_string(), "192.168.1.*".to_string()],
            &["10.0.0.5".to_string()],
        )
    }

    #[tokio::test]
    async fn test_from_lists_seeds_active_rules() {
        let store = lists();
        let snap = store.snapshot().await.unwrap();
        assert_eq!(snap.allow, vec!["10.0.0.0/8", "192.168.1.*"]);
        assert_eq!(snap.deny, vec!["10.0.0.5"]);
        assert_eq!(store.count_all().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_from_lists_drops_duplicates() {
        let store = StaticRuleStore::from_lists(
            &["1.2.3.4".to_string(), "1.2.3.4".to_string()],
            &["1.2.3.4".to_string()],
        );
        // Same pattern in both lists is two rules; repeated within a list is one.
        assert_eq!(store.count_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_reactivates() {
        let store = StaticRuleStore::new();
        let first = store.upsert("1.1.1.1", RuleKind::Deny, Some("spam")).await.unwrap();
        store.toggle(first.id).await.unwrap();
        assert_eq!(store.count_inactive().await.unwrap(), 1);

        let second = store.upsert("1.1.1.1", RuleKind::Deny, Some("abuse")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.is_active);
        assert_eq!(second.label.as_deref(), Some("abuse"));
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = lists();
        assert!(store.remove_one("10.0.0.5", RuleKind::Deny).await.unwrap());
        assert!(!store.remove_one("10.0.0.5", RuleKind::Deny).await.unwrap());
        assert!(!store.remove_one("10.0.0.0/8", RuleKind::Deny).await.unwrap());

        assert_eq!(store.remove_all(Some(RuleKind::Allow)).await.unwrap(), 2);
        assert_eq!(store.count_all().await.unwrap(), 0);

        store.upsert("2.2.2.2", RuleKind::Deny, None).await.unwrap();
        store.upsert("3.3.3.3", RuleKind::Allow, None).await.unwrap();
        assert_eq!(store.remove_all(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_toggle_unknown_is_not_found() {
        let store = lists();
        let err = store.toggle(999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_snapshot_is_consistent_under_concurrent_writes() {
        let store = std::sync::Arc::new(StaticRuleStore::new());
        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    let ip = format!("10.0.{}.{}", i / 250, i % 250);
                    store.upsert(&ip, RuleKind::Allow, None).await.unwrap();
                    store.upsert(&ip, RuleKind::Deny, None).await.unwrap();
                }
            })
        };

        // Each address goes to the allow list, then the deny list: a consistent
        // snapshot holds as many denies as allows, or one fewer.
        for _ in 0..200 {
            let snap = store.snapshot().await.unwrap();
            assert!(snap.allow.len() == snap.deny.len() || snap.allow.len() == snap.deny.len() + 1);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        let snap = store.snapshot().await.unwrap();
        assert_eq!(snap.allow.len(), 200);
        assert_eq!(snap.deny, snap.allow);
    }

    #[tokio::test]
    async fn test_inactive_rules_leave_snapshot() {
        let store = lists();
        let rule = store.find("10.0.0.5", RuleKind::Deny).await.unwrap().unwrap();
        store.toggle(rule.id).await.unwrap();

        let snap = store.snapshot().await.unwrap();
        assert!(snap.deny.is_empty());
        assert_eq!(store.count_active(RuleKind::Deny).await.unwrap(), 0);
        assert_eq!(store.list(Some(RuleKind::Deny)).await.unwrap().len(), 1);
    }
}
