use super::pattern::PatternSet;
use crate::store::RuleSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Reject,
}

impl Decision {
    pub fn is_admit(self) -> bool {
        self == Decision::Admit
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Admit => "ADMIT",
            Decision::Reject => "REJECT",
        }
    }
}

/// Which step of the policy produced a decision. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    Denylisted,
    Allowlisted,
    NotAllowlisted,
    NoRules,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::Denylisted => "matched blacklist",
            DecisionReason::Allowlisted => "matched whitelist",
            DecisionReason::NotAllowlisted => "not in whitelist",
            DecisionReason::NoRules => "no whitelist configured",
        }
    }
}

/// Compiled allow/deny lists for one decision (or one refresh interval).
#[derive(Debug, Clone, Default)]
pub struct Acl {
    allowed: PatternSet,
    denied: PatternSet,
}

impl Acl {
    pub fn new<A: AsRef<str>, D: AsRef<str>>(allowed: &[A], denied: &[D]) -> Self {
        Self {
            allowed: PatternSet::compile(allowed),
            denied: PatternSet::compile(denied),
        }
    }

    pub fn from_snapshot(snapshot: &RuleSnapshot) -> Self {
        Self::new(&snapshot.allow, &snapshot.deny)
    }

    /// Deny list first, then the allow list if there is one, else open.
    pub fn evaluate(&self, ip: &str) -> (Decision, DecisionReason) {
        if self.denied.matches(ip) {
            return (Decision::Reject, DecisionReason::Denylisted);
        }
        if self.allowed.is_empty() {
            return (Decision::Admit, DecisionReason::NoRules);
        }
        if self.allowed.matches(ip) {
            (Decision::Admit, DecisionReason::Allowlisted)
        } else {
            (Decision::Reject, DecisionReason::NotAllowlisted)
        }
    }

    pub fn is_allowed(&self, ip: &str) -> bool {
        self.evaluate(ip).0.is_admit()
    }
}

/// Decide a single request from raw pattern lists.
pub fn decide<A: AsRef<str>, D: AsRef<str>>(client_ip: &str, allow: &[A], deny: &[D]) -> Decision {
    Acl::new(allow, deny).evaluate(client_ip).0
}
