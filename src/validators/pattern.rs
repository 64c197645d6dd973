use crate::guard::pattern::{Pattern, WILDCARD};
use crate::validators::{ValidationError, Validator};

/// Accepts what the matcher can use: `*`, an IP literal, a glob over
/// address characters, or an IPv4 CIDR block.
pub struct PatternValidator;

impl PatternValidator {
    pub fn new() -> Self {
        Self
    }

    fn error(code: &str, message: String, suggestion: &str) -> ValidationError {
        ValidationError {
            code: code.to_string(),
            message,
            field: "ip".to_string(),
            line: None,
            column: None,
            suggestion: Some(suggestion.to_string()),
        }
    }

    fn is_glob_char(c: char) -> bool {
        c.is_ascii_hexdigit() || matches!(c, '.' | ':' | '*')
    }
}

impl Default for PatternValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for PatternValidator {
    fn validate(&self, input: &str) -> Result<(), ValidationError> {
        let s = input.trim();

        // E001: Empty pattern
        if s.is_empty() {
            return Err(Self::error(
                "E001",
                "IP address cannot be empty".to_string(),
                "Provide an address, a CIDR block or a wildcard pattern",
            ));
        }

        match Pattern::parse(s) {
            Pattern::Any | Pattern::Exact(_) | Pattern::Cidr(_) => Ok(()),
            Pattern::CidrV6(_) => Err(Self::error(
                "E004",
                format!("IPv6 CIDR blocks are not supported: {}", s),
                "List IPv6 addresses individually",
            )),
            Pattern::Glob(_) => {
                // E005: glob with characters no address can contain
                if let Some((col, c)) = s.char_indices().find(|(_, c)| !Self::is_glob_char(*c)) {
                    return Err(ValidationError {
                        column: Some(col + 1),
                        ..Self::error(
                            "E005",
                            format!("Invalid character '{}' in wildcard pattern: {}", c, s),
                            "Wildcard patterns look like 192.168.*.* or 2001:db8:*",
                        )
                    });
                }
                Ok(())
            }
            Pattern::Invalid => {
                // E003: looks like CIDR, bad prefix or subnet
                if s.contains('/') {
                    return Err(Self::error(
                        "E003",
                        format!("Invalid CIDR block: {}", s),
                        "Use subnet/prefix with a prefix from 0 to 32, e.g. 10.0.0.0/8",
                    ));
                }
                // E002: Invalid format
                Err(Self::error(
                    "E002",
                    "Invalid IP address format".to_string(),
                    &format!("Use an address (e.g. 192.168.1.1), a CIDR block (10.0.0.0/8), a wildcard (192.168.*.*) or {}", WILDCARD),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_every_pattern_form() {
        let validator = PatternValidator::new();
        for ok in ["*", "192.168.1.1", "::1", "2001:db8::1", "10.0.0.0/8", "0.0.0.0/0",
                   "192.168.*.*", "10.*", " 172.16.0.1 ", "fe80:*"] {
            assert!(validator.validate(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn test_empty_pattern() {
        let err = PatternValidator::new().validate("   ").unwrap_err();
        assert_eq!(err.code, "E001");
    }

    #[test]
    fn test_invalid_format() {
        let err = PatternValidator::new().validate("not-an-ip").unwrap_err();
        assert_eq!(err.code, "E002");
        assert_eq!(err.message, "Invalid IP address format");

        assert_eq!(PatternValidator::new().validate("192.168.1.256").unwrap_err().code, "E002");
    }

    #[test]
    fn test_invalid_cidr() {
        let validator = PatternValidator::new();
        assert_eq!(validator.validate("10.0.0.0/33").unwrap_err().code, "E003");
        assert_eq!(validator.validate("10.0.0.0/").unwrap_err().code, "E003");
        assert_eq!(validator.validate("banana/8").unwrap_err().code, "E003");
    }

    #[test]
    fn test_ipv6_cidr_is_rejected() {
        let err = PatternValidator::new().validate("2001:db8::/32").unwrap_err();
        assert_eq!(err.code, "E004");
    }

    #[test]
    fn test_glob_with_foreign_characters() {
        let err = PatternValidator::new().validate("evil.*.com").unwrap_err();
        assert_eq!(err.code, "E005");
        assert_eq!(err.column, Some(2));
    }

    #[test]
    fn test_converts_to_app_error() {
        let err: crate::error::AppError = PatternValidator::new().validate("x").unwrap_err().into();
        assert_eq!(err.to_string(), "Validation error: Invalid IP address format");
    }
}
