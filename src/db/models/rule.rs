use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::AppError;

/// Which list a rule belongs to. Stored as `whitelist` / `blacklist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    #[serde(rename = "whitelist", alias = "allow")]
    Allow,
    #[serde(rename = "blacklist", alias = "deny")]
    Deny,
}

impl RuleKind {
    pub const ALL: [RuleKind; 2] = [RuleKind::Allow, RuleKind::Deny];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Allow => "whitelist",
            RuleKind::Deny => "blacklist",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whitelist" | "allow" => Ok(RuleKind::Allow),
            "blacklist" | "deny" => Ok(RuleKind::Deny),
            _ => Err(AppError::Validation(
                "Type must be either whitelist or blacklist".to_string(),
            )),
        }
    }
}

impl TryFrom<String> for RuleKind {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rule {
    pub id: i64,
    pub pattern: String,
    #[sqlx(try_from = "String")]
    pub kind: RuleKind,
    pub label: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}
