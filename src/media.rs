//! # Media Type Module
//!
//! Parsing and matching of media types as they appear in `Accept`,
//! `Content-Type`, and `%rest:consumes` / `%rest:produces` annotations.
//!
//! Quality factors are read from parameters: `q` on the client side
//! (`Accept: text/xml;q=0.5`) and `qs` on the server side
//! (`%rest:produces("text/xml;qs=0.8")`). Both default to `1.0`.

use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Client-side quality parameter name
pub const CLIENT_QUALITY: &str = "q";
/// Server-side quality parameter name
pub const SERVER_QUALITY: &str = "qs";

/// A parsed media type such as `application/json;qs=0.8`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    kind: String,
    subtype: String,
    params: Vec<(String, String)>,
}

/// Error returned for strings that are not media types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMediaType(pub String);

impl fmt::Display for InvalidMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid media type '{}'", self.0)
    }
}

impl std::error::Error for InvalidMediaType {}

impl MediaType {
    /// The `*/*` media type.
    #[must_use]
    pub fn any() -> Self {
        Self {
            kind: "*".to_string(),
            subtype: "*".to_string(),
            params: Vec::new(),
        }
    }

    /// Main type (e.g. `text`)
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Subtype (e.g. `xml`)
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Look up a parameter by (case-insensitive) name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Type and subtype without parameters, e.g. `text/xml`.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    /// Returns `true` if both types are compatible, honouring `*` wildcards
    /// on either side.
    #[must_use]
    pub fn matches(&self, other: &MediaType) -> bool {
        let kind = self.kind == "*" || other.kind == "*" || self.kind == other.kind;
        let subtype =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        kind && subtype
    }

    /// Quality factor stored under `name`.
    ///
    /// Missing or unparsable values yield `1.0`; values are clamped to `0..=1`.
    #[must_use]
    pub fn quality(&self, name: &str) -> f64 {
        match self.param(name).map(str::parse::<f64>) {
            Some(Ok(q)) if q.is_finite() => q.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    /// Parse a comma-separated header value such as an `Accept` header.
    ///
    /// Entries that cannot be parsed are skipped.
    pub fn parse_list(header: &str) -> Vec<MediaType> {
        header
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|entry| match entry.parse::<MediaType>() {
                Ok(mt) => Some(mt),
                Err(e) => {
                    debug!(entry = entry, error = %e, "Skipping unparsable media type");
                    None
                }
            })
            .collect()
    }
}

impl FromStr for MediaType {
    type Err = InvalidMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMediaType(s.to_string());
        let mut parts = s.split(';');
        let essence = parts.next().map(str::trim).unwrap_or_default();

        let (kind, subtype) = if essence == "*" {
            ("*", "*")
        } else {
            let (kind, subtype) = essence.split_once('/').ok_or_else(invalid)?;
            (kind.trim(), subtype.trim())
        };
        let token = |t: &str| {
            !t.is_empty()
                && t.chars()
                    .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-*".contains(c))
        };
        if !token(kind) || !token(subtype) || (kind == "*" && subtype != "*") {
            return Err(invalid());
        }

        let mut params = Vec::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param.split_once('=').ok_or_else(invalid)?;
            let value = value.trim().trim_matches('"');
            params.push((name.trim().to_ascii_lowercase(), value.to_string()));
        }

        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, ";{}={}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(s: &str) -> MediaType {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_with_params() {
        let m = mt("Text/XML; charset=utf-8; q=0.5");
        assert_eq!(m.kind(), "text");
        assert_eq!(m.subtype(), "xml");
        assert_eq!(m.param("charset"), Some("utf-8"));
        assert_eq!(m.quality(CLIENT_QUALITY), 0.5);
    }

    #[test]
    fn test_bare_star_is_any() {
        assert_eq!(mt("*"), MediaType::any());
    }

    #[test]
    fn test_invalid_media_types() {
        assert!("json".parse::<MediaType>().is_err());
        assert!("text/".parse::<MediaType>().is_err());
        assert!("*/xml".parse::<MediaType>().is_err());
        assert!("text/xml;q".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_wildcard_matching() {
        assert!(mt("text/xml").matches(&mt("text/*")));
        assert!(mt("text/xml").matches(&mt("*/*")));
        assert!(mt("*/*").matches(&mt("application/json")));
        assert!(!mt("text/xml").matches(&mt("application/xml")));
        assert!(!mt("text/xml").matches(&mt("text/html")));
    }

    #[test]
    fn test_quality_defaults_and_clamping() {
        assert_eq!(mt("text/xml").quality(SERVER_QUALITY), 1.0);
        assert_eq!(mt("text/xml;qs=abc").quality(SERVER_QUALITY), 1.0);
        assert_eq!(mt("text/xml;q=3").quality(CLIENT_QUALITY), 1.0);
        assert_eq!(mt("text/xml;q=0").quality(CLIENT_QUALITY), 0.0);
    }

    #[test]
    fn test_parse_list_skips_garbage() {
        let list = MediaType::parse_list("application/json;q=0.5, nonsense, text/xml");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].essence(), "application/json");
        assert_eq!(list[1].essence(), "text/xml");
    }

    #[test]
    fn test_display_round_trips_params() {
        assert_eq!(mt("text/xml; qs=0.8").to_string(), "text/xml;qs=0.8");
    }
}
