//! Path templates such as `/items/{$id}` or `/files/{$name=[a-z]+\.xml}`.
//!
//! Templates are split into `/`-separated segments. A segment is either a
//! literal or a whole-segment variable with an optional regular expression.

use super::ParamVec;
use regex::Regex;
use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::sync::Arc;

/// A single template segment
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text, compared against the decoded request segment
    Literal(String),
    /// Template variable, optionally constrained by an anchored regex
    Variable {
        name: Arc<str>,
        pattern: Option<Regex>,
    },
}

impl Segment {
    fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == value,
            Segment::Variable { pattern: None, .. } => true,
            Segment::Variable {
                pattern: Some(re), ..
            } => re.is_match(value),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Variable { .. } => 1,
        }
    }
}

/// Ordering key for template specificity: deeper templates first, then
/// literal before variable, segment by segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PathRank {
    depth: Reverse<usize>,
    ranks: Vec<u8>,
}

/// A parsed path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template string.
    ///
    /// Returns a description of the problem for malformed templates
    /// (unbalanced braces, partial-segment variables, bad regexes,
    /// duplicate variable names).
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut names: Vec<Arc<str>> = Vec::new();

        for part in raw.split('/').filter(|s| !s.is_empty()) {
            if let Some(inner) = part.strip_prefix('{') {
                let inner = inner
                    .strip_suffix('}')
                    .ok_or_else(|| format!("unterminated variable in segment '{}'", part))?;
                let (name, pattern) = match inner.split_once('=') {
                    Some((name, re)) => (name.trim(), Some(re.trim())),
                    None => (inner.trim(), None),
                };
                let name = name.strip_prefix('$').unwrap_or(name);
                if name.is_empty()
                    || !name
                        .chars()
                        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
                {
                    return Err(format!("invalid variable name in segment '{}'", part));
                }
                if names.iter().any(|n| n.as_ref() == name) {
                    return Err(format!("duplicate variable '${}'", name));
                }
                let pattern = match pattern {
                    Some(re) => Some(
                        Regex::new(&format!("^(?:{})$", re))
                            .map_err(|e| format!("invalid pattern for '${}': {}", name, e))?,
                    ),
                    None => None,
                };
                let name: Arc<str> = Arc::from(name);
                names.push(Arc::clone(&name));
                segments.push(Segment::Variable { name, pattern });
            } else if part.contains('{') || part.contains('}') {
                return Err(format!(
                    "variables must span a whole segment: '{}'",
                    part
                ));
            } else {
                let literal = urlencoding::decode(part)
                    .map_err(|_| format!("segment '{}' is not valid UTF-8", part))?;
                segments.push(Segment::Literal(literal.into_owned()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Template text as written in the annotation
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of all template variables, in order of appearance
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable { name, .. } => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns `true` if the template matches the request segments exactly.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        self.segments.len() == segments.len()
            && self
                .segments
                .iter()
                .zip(segments)
                .all(|(t, s)| t.matches(s.as_ref()))
    }

    /// Returns `true` if the template matches the leading request segments.
    #[must_use]
    pub fn is_prefix_of<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        self.segments.len() <= segments.len()
            && self
                .segments
                .iter()
                .zip(segments)
                .all(|(t, s)| t.matches(s.as_ref()))
    }

    /// Bind template variables against matching request segments.
    ///
    /// Returns `None` if the template does not match.
    #[must_use]
    pub fn bind<S: AsRef<str>>(&self, segments: &[S]) -> Option<ParamVec> {
        if !self.matches(segments) {
            return None;
        }
        let params = self
            .segments
            .iter()
            .zip(segments)
            .filter_map(|(t, s)| match t {
                Segment::Variable { name, .. } => Some((Arc::clone(name), s.as_ref().to_string())),
                Segment::Literal(_) => None,
            })
            .collect();
        Some(params)
    }

    /// Specificity key; lower sorts first.
    #[must_use]
    pub fn rank(&self) -> PathRank {
        PathRank {
            depth: Reverse(self.segments.len()),
            ranks: self.segments.iter().map(Segment::rank).collect(),
        }
    }

    /// Compare specificity: `Less` means `self` is more specific.
    #[must_use]
    pub fn cmp_specificity(&self, other: &PathTemplate) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
