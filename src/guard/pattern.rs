//! Address pattern parser and matcher.
//!
//! Supported syntax:
//!   `*`                 matches every address
//!   `203.0.113.10`      exact IPv4 or IPv6 literal
//!   `192.168.*.*`       glob, `*` matches any run of characters
//!   `10.0.0.0/8`        IPv4 CIDR block
//!
//! A pattern that fits none of these never matches and never errors.

use ipnet::{Ipv4Net, Ipv6Net};
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The match-everything token.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone)]
pub enum Pattern {
    Any,
    /// Literal address, compared byte-for-byte with the client address.
    Exact(String),
    Glob(Regex),
    Cidr(Ipv4Net),
    /// Parsed but not matched: IPv6 blocks are not part of the matching rules yet.
    CidrV6(Ipv6Net),
    Invalid,
}

impl Pattern {
    pub fn parse(raw: &str) -> Self {
        if raw == WILDCARD {
            return Pattern::Any;
        }

        if raw.parse::<IpAddr>().is_ok() {
            return Pattern::Exact(raw.to_string());
        }

        if raw.contains('*') {
            return match glob_to_regex(raw) {
                Some(re) => Pattern::Glob(re),
                None => Pattern::Invalid,
            };
        }

        if let Some((subnet, prefix)) = raw.split_once('/') {
            return parse_cidr(subnet, prefix);
        }

        Pattern::Invalid
    }

    /// Returns `true` if `ip` is covered by this pattern.
    pub fn matches(&self, ip: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Exact(literal) => literal == ip,
            Pattern::Glob(re) => re.is_match(ip),
            Pattern::Cidr(net) => ip
                .parse::<Ipv4Addr>()
                .map(|addr| net.contains(&addr))
                .unwrap_or(false),
            Pattern::CidrV6(_) | Pattern::Invalid => false,
        }
    }
}

/// Translate a glob into an anchored regex. Only `*` is special.
fn glob_to_regex(glob: &str) -> Option<Regex> {
    let body = glob
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).ok()
}

fn parse_cidr(subnet: &str, prefix: &str) -> Pattern {
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Pattern::Invalid;
    }
    let Ok(prefix_len) = prefix.parse::<u8>() else {
        return Pattern::Invalid;
    };

    if let Ok(addr) = subnet.parse::<Ipv4Addr>() {
        return Ipv4Net::new(addr, prefix_len)
            .map(Pattern::Cidr)
            .unwrap_or(Pattern::Invalid);
    }

    if let Ok(addr) = subnet.parse::<Ipv6Addr>() {
        return Ipv6Net::new(addr, prefix_len)
            .map(Pattern::CidrV6)
            .unwrap_or(Pattern::Invalid);
    }

    Pattern::Invalid
}

/// Pre-parsed pattern list.
///
/// Inert entries are kept, so `is_empty` reflects how many patterns were
/// configured rather than how many can match.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            patterns: raw.iter().map(|p| Pattern::parse(p.as_ref())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn matches(&self, ip: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(ip))
    }
}

/// Returns `true` if the list is non-empty and any pattern in it covers `ip`.
pub fn matches<S: AsRef<str>>(ip: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| Pattern::parse(p.as_ref()).matches(ip))
}
