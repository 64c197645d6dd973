use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use super::acl::Acl;
use crate::store::{RuleSnapshot, RuleStore};

/// Where the gate gets its rules from: a primary store, an optional
/// fallback used while the primary is failing, and an optional short-lived
/// cache of the compiled lists.
pub struct RuleSource {
    primary: Arc<dyn RuleStore>,
    fallback: Option<Arc<dyn RuleStore>>,
    cache: Option<Cache<(), Arc<Acl>>>,
}

impl RuleSource {
    pub fn new(primary: Arc<dyn RuleStore>) -> Self {
        Self {
            primary,
            fallback: None,
            cache: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn RuleStore>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Reuse compiled rules for `ttl`. A zero TTL disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1)
                .time_to_live(ttl)
                .build()
        });
        self
    }

    pub fn primary(&self) -> &Arc<dyn RuleStore> {
        &self.primary
    }

    /// Active rules right now. Never fails: a broken primary store yields
    /// the fallback rules, and without a fallback an empty snapshot.
    pub async fn snapshot(&self) -> RuleSnapshot {
        self.load().await.0
    }

    /// Compiled rules for one decision.
    pub async fn acl(&self) -> Arc<Acl> {
        if let Some(cache) = &self.cache {
            if let Some(acl) = cache.get(&()).await {
                return acl;
            }
        }

        let (snapshot, fresh) = self.load().await;
        let acl = Arc::new(Acl::from_snapshot(&snapshot));

        // Fallback rules are not cached so recovery is picked up on the next request.
        if fresh {
            if let Some(cache) = &self.cache {
                cache.insert((), acl.clone()).await;
            }
        }
        acl
    }

    async fn load(&self) -> (RuleSnapshot, bool) {
        match self.primary.snapshot().await {
            Ok(snapshot) => (snapshot, true),
            Err(e) => {
                tracing::warn!("Rule store unavailable, using fallback rules: {}", e);
                let snapshot = match &self.fallback {
                    Some(fallback) => fallback.snapshot().await.unwrap_or_else(|e| {
                        tracing::warn!("Fallback rules unavailable, admitting all: {}", e);
                        RuleSnapshot::default()
                    }),
                    None => RuleSnapshot::default(),
                };
                (snapshot, false)
            }
        }
    }
}
