//! Error-code patterns from `%rest:error(...)`.
//!
//! Codes are `prefix:local` names. A pattern is either the exact code,
//! a partial wildcard (`prefix:*`, `*:local`) or `*`.

use std::fmt;

/// A single error-code test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPattern {
    /// `*`
    Any,
    /// `prefix:*`
    Prefix(String),
    /// `*:local`
    Local(String),
    /// `prefix:local` (or an unprefixed `local`)
    Exact(String),
}

impl ErrorPattern {
    /// Parse a pattern string.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("empty error code".to_string());
        }
        if raw == "*" {
            return Ok(ErrorPattern::Any);
        }
        let pattern = match raw.split_once(':') {
            Some(("*", local)) => ErrorPattern::Local(local.to_string()),
            Some((prefix, "*")) => ErrorPattern::Prefix(prefix.to_string()),
            _ => ErrorPattern::Exact(raw.to_string()),
        };
        let valid = match &pattern {
            ErrorPattern::Local(part) | ErrorPattern::Prefix(part) => {
                !part.is_empty() && !part.contains([':', '*'])
            }
            ErrorPattern::Exact(code) => !code.contains('*'),
            ErrorPattern::Any => true,
        };
        if valid {
            Ok(pattern)
        } else {
            Err(format!("invalid error code '{}'", raw))
        }
    }

    /// Returns `true` if the pattern accepts `code`.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        let (prefix, local) = code.split_once(':').unwrap_or(("", code));
        match self {
            ErrorPattern::Any => true,
            ErrorPattern::Prefix(p) => p == prefix,
            ErrorPattern::Local(l) => l == local,
            ErrorPattern::Exact(c) => c == code,
        }
    }

    /// Specificity rank; lower is more specific.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            ErrorPattern::Exact(_) => 0,
            ErrorPattern::Prefix(_) | ErrorPattern::Local(_) => 1,
            ErrorPattern::Any => 2,
        }
    }
}

impl fmt::Display for ErrorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPattern::Any => f.write_str("*"),
            ErrorPattern::Prefix(p) => write!(f, "{}:*", p),
            ErrorPattern::Local(l) => write!(f, "*:{}", l),
            ErrorPattern::Exact(c) => f.write_str(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_kinds() {
        assert_eq!(ErrorPattern::parse("*").unwrap(), ErrorPattern::Any);
        assert_eq!(
            ErrorPattern::parse("err:*").unwrap(),
            ErrorPattern::Prefix("err".into())
        );
        assert_eq!(
            ErrorPattern::parse("*:FOER0000").unwrap(),
            ErrorPattern::Local("FOER0000".into())
        );
        assert_eq!(
            ErrorPattern::parse("err:FOER0000").unwrap(),
            ErrorPattern::Exact("err:FOER0000".into())
        );
        assert!(ErrorPattern::parse("").is_err());
        assert!(ErrorPattern::parse("e*r:x").is_err());
    }

    #[test]
    fn test_pattern_matching() {
        let code = "err:FOER0000";
        assert!(ErrorPattern::parse("*").unwrap().matches(code));
        assert!(ErrorPattern::parse("err:*").unwrap().matches(code));
        assert!(ErrorPattern::parse("*:FOER0000").unwrap().matches(code));
        assert!(ErrorPattern::parse("err:FOER0000").unwrap().matches(code));
        assert!(!ErrorPattern::parse("app:*").unwrap().matches(code));
        assert!(!ErrorPattern::parse("err:XPTY0004").unwrap().matches(code));
    }

    #[test]
    fn test_ranks() {
        let exact = ErrorPattern::parse("err:A").unwrap();
        let partial = ErrorPattern::parse("err:*").unwrap();
        let any = ErrorPattern::Any;
        assert!(exact.rank() < partial.rank());
        assert!(partial.rank() < any.rank());
    }
}
