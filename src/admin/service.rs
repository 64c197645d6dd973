use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use crate::db::models::{Rule, RuleKind};
use crate::error::{AppError, AppResult};
use crate::guard::{Acl, Decision, DecisionReason};
use crate::store::RuleStore;
use crate::validators::{PatternValidator, ValidationError, Validator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardStats {
    pub whitelist_count: u64,
    pub blacklist_count: u64,
    pub total_active: u64,
    pub total_inactive: u64,
}

/// Outcome of adding many patterns at once.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub added: usize,
    pub skipped: Vec<ValidationError>,
}

/// Rule administration over any [`RuleStore`].
#[derive(Clone)]
pub struct IpGuard {
    store: Arc<dyn RuleStore>,
}

impl IpGuard {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    /// Validate and store `pattern`. An existing rule gets the new label and
    /// is re-activated.
    pub async fn add(&self, kind: RuleKind, pattern: &str, label: Option<&str>) -> AppResult<Rule> {
        let pattern = pattern.trim();
        PatternValidator::new().validate(pattern)?;
        let label = label.map(str::trim).filter(|l| !l.is_empty());

        let rule = self.store.upsert(pattern, kind, label).await?;
        tracing::info!("Added {} to {} (id {})", rule.pattern, kind, rule.id);
        Ok(rule)
    }

    pub async fn add_to_whitelist(&self, pattern: &str, label: Option<&str>) -> AppResult<Rule> {
        self.add(RuleKind::Allow, pattern, label).await
    }

    pub async fn add_to_blacklist(&self, pattern: &str, label: Option<&str>) -> AppResult<Rule> {
        self.add(RuleKind::Deny, pattern, label).await
    }

    /// Returns `false` when there was no such rule.
    pub async fn remove(&self, kind: RuleKind, pattern: &str) -> AppResult<bool> {
        let removed = self.store.remove_one(pattern.trim(), kind).await?;
        if removed {
            tracing::info!("Removed {} from {}", pattern.trim(), kind);
        }
        Ok(removed)
    }

    pub async fn remove_from_whitelist(&self, pattern: &str) -> AppResult<bool> {
        self.remove(RuleKind::Allow, pattern).await
    }

    pub async fn remove_from_blacklist(&self, pattern: &str) -> AppResult<bool> {
        self.remove(RuleKind::Deny, pattern).await
    }

    pub async fn ips_by_kind(&self, kind: RuleKind) -> AppResult<Vec<String>> {
        self.store.list_active(kind).await
    }

    pub async fn whitelist_ips(&self) -> AppResult<Vec<String>> {
        self.ips_by_kind(RuleKind::Allow).await
    }

    pub async fn blacklist_ips(&self) -> AppResult<Vec<String>> {
        self.ips_by_kind(RuleKind::Deny).await
    }

    /// Every rule, active or not, for listing.
    pub async fn rules(&self, kind: Option<RuleKind>) -> AppResult<Vec<Rule>> {
        self.store.list(kind).await
    }

    /// Active rules grouped by kind. Both kinds are always present.
    pub async fn all_rules(&self) -> AppResult<BTreeMap<RuleKind, Vec<Rule>>> {
        let mut grouped: BTreeMap<RuleKind, Vec<Rule>> =
            RuleKind::ALL.iter().map(|k| (*k, Vec::new())).collect();

        for rule in self.store.list(None).await? {
            if rule.is_active {
                grouped.entry(rule.kind).or_default().push(rule);
            }
        }
        Ok(grouped)
    }

    /// `true` iff an active whitelist rule has exactly this pattern.
    pub async fn is_whitelisted(&self, ip: &str) -> AppResult<bool> {
        self.is_listed(RuleKind::Allow, ip).await
    }

    /// `true` iff an active blacklist rule has exactly this pattern.
    pub async fn is_blacklisted(&self, ip: &str) -> AppResult<bool> {
        self.is_listed(RuleKind::Deny, ip).await
    }

    async fn is_listed(&self, kind: RuleKind, ip: &str) -> AppResult<bool> {
        Ok(self.store
            .find(ip.trim(), kind)
            .await?
            .map_or(false, |r| r.is_active))
    }

    pub async fn toggle(&self, id: i64) -> AppResult<Rule> {
        let rule = self.store.toggle(id).await?;
        tracing::info!(
            "Rule {} ({} {}) is now {}",
            rule.id,
            rule.kind,
            rule.pattern,
            if rule.is_active { "active" } else { "inactive" },
        );
        Ok(rule)
    }

    /// Like [`toggle`](Self::toggle), but an unknown id is `Ok(false)`.
    pub async fn toggle_status(&self, id: i64) -> AppResult<bool> {
        match self.toggle(id).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn clear_kind(&self, kind: RuleKind) -> AppResult<u64> {
        let removed = self.store.remove_all(Some(kind)).await?;
        tracing::info!("Cleared {} {} rules", removed, kind);
        Ok(removed)
    }

    pub async fn clear_all(&self) -> AppResult<u64> {
        let removed = self.store.remove_all(None).await?;
        tracing::info!("Cleared {} rules", removed);
        Ok(removed)
    }

    /// Add every valid pattern; invalid ones are skipped. Returns how many were stored.
    pub async fn bulk_add<I, S>(&self, kind: RuleKind, patterns: I, label: Option<&str>) -> AppResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = patterns.into_iter().enumerate().map(|(i, p)| (i + 1, p));
        Ok(self.add_many(kind, lines, label).await?.added)
    }

    /// Import an allow/deny list file: one pattern per line, blank lines and
    /// `#` comments ignored. Skipped entries carry their line number.
    pub async fn import(&self, kind: RuleKind, contents: &str, label: Option<&str>) -> AppResult<ImportReport> {
        let lines = contents
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));
        self.add_many(kind, lines, label).await
    }

    async fn add_many<I, S>(&self, kind: RuleKind, lines: I, label: Option<&str>) -> AppResult<ImportReport>
    where
        I: IntoIterator<Item = (usize, S)>,
        S: AsRef<str>,
    {
        let validator = PatternValidator::new();
        let label = label.map(str::trim).filter(|l| !l.is_empty());
        let mut report = ImportReport::default();

        for (line, pattern) in lines {
            let pattern = pattern.as_ref().trim();
            if let Err(e) = validator.validate(pattern) {
                tracing::warn!("Skipping {:?} (line {}): {}", pattern, line, e.message);
                report.skipped.push(e.at_line(line));
                continue;
            }
            self.store.upsert(pattern, kind, label).await?;
            report.added += 1;
        }

        tracing::info!("Imported {} {} rules, skipped {}", report.added, kind, report.skipped.len());
        Ok(report)
    }

    pub async fn stats(&self) -> AppResult<GuardStats> {
        let total = self.store.count_all().await?;
        let inactive = self.store.count_inactive().await?;

        Ok(GuardStats {
            whitelist_count: self.store.count_active(RuleKind::Allow).await?,
            blacklist_count: self.store.count_active(RuleKind::Deny).await?,
            total_active: total.saturating_sub(inactive),
            total_inactive: inactive,
        })
    }

    /// Dry run: what the gate would decide for `ip` with the current active rules.
    pub async fn check(&self, ip: &str) -> AppResult<Decision> {
        Ok(self.explain(ip).await?.0)
    }

    pub async fn explain(&self, ip: &str) -> AppResult<(Decision, DecisionReason)> {
        let ip = ip.trim();
        if ip.parse::<IpAddr>().is_err() {
            return Err(AppError::Validation("Invalid IP address format".to_string()));
        }
        let snapshot = self.store.snapshot().await?;
        Ok(Acl::from_snapshot(&snapshot).evaluate(ip))
    }
}
