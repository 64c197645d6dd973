//! Request gating by client address.
//!
//! [`decide`] is the whole policy: deny list first, then the allow list if
//! any allow rule is active, otherwise admit. Everything else in this module
//! feeds it: patterns, configured lists, the client address, and the response
//! sent back on rejection.

use std::sync::Arc;
use std::time::Duration;
use crate::config::GuardConfig;
use crate::store::{RuleStore, StaticRuleStore};

pub mod acl;
pub mod client_ip;
pub mod normalize;
pub mod pattern;
pub mod response;
pub mod source;

pub use acl::{decide, Acl, Decision, DecisionReason};
pub use client_ip::resolve_client_ip;
pub use normalize::{normalize_list, RawList};
pub use pattern::{matches, Pattern};
pub use response::DenyResponse;
pub use source::RuleSource;
pub use crate::api::middleware::guard::{ip_guard, protect};

/// Fixed per-process settings of the gate.
#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub enabled: bool,
    pub ip_header: Option<String>,
    pub deny: DenyResponse,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ip_header: None,
            deny: DenyResponse::default(),
        }
    }
}

/// Everything the middleware needs for one request.
pub struct GuardState {
    pub settings: GuardSettings,
    pub rules: RuleSource,
}

impl GuardState {
    pub fn new(settings: GuardSettings, rules: RuleSource) -> Self {
        Self { settings, rules }
    }

    /// Build the gate from configuration.
    ///
    /// With a `primary` store (the database) the configured lists become the
    /// fallback used while it is unavailable. Without one they are the rules.
    pub fn from_config(cfg: &GuardConfig, primary: Option<Arc<dyn RuleStore>>) -> Self {
        let configured: Arc<dyn RuleStore> = Arc::new(StaticRuleStore::from_lists(
            &cfg.whitelist(),
            &cfg.blacklist(),
        ));

        let rules = match primary {
            Some(store) => RuleSource::new(store).with_fallback(configured),
            None => RuleSource::new(configured),
        }
        .with_cache_ttl(Duration::from_secs(cfg.cache_ttl_secs));

        let settings = GuardSettings {
            enabled: cfg.enabled,
            ip_header: cfg.trusted_header().map(str::to_string),
            deny: cfg.error.clone(),
        };

        tracing::info!(
            "IP guard {}: {} whitelist / {} blacklist patterns configured, header {:?}",
            if settings.enabled { "enabled" } else { "disabled" },
            cfg.whitelist().len(),
            cfg.blacklist().len(),
            settings.ip_header,
        );

        Self::new(settings, rules)
    }
}
