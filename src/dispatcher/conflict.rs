use crate::function::WebFunction;
use std::fmt;
use std::sync::Arc;

/// What the tied candidates were competing for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictTarget {
    /// Path template of the leading candidate
    Path(String),
    /// Raised error code
    Error(String),
}

/// Several functions remained after all tie-breaking.
///
/// Displays as
///
/// ```text
/// Several functions assigned to path "/items/{$id}":
/// - local:a($id) [/web/a.xqm:3]
/// - local:b($id) [/web/b.xqm:7]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    target: ConflictTarget,
    candidates: Vec<String>,
}

impl Conflict {
    pub fn new<T: WebFunction>(target: ConflictTarget, funcs: &[Arc<T>]) -> Self {
        Self {
            target,
            candidates: funcs.iter().map(|f| f.display_signature()).collect(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &ConflictTarget {
        &self.target
    }

    /// Display signatures of the tied functions, most specific first
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ConflictTarget::Path(path) => write!(f, "Several functions assigned to path \"{}\":", path)?,
            ConflictTarget::Error(code) => {
                write!(f, "Several functions assigned to error \"{}\":", code)?
            }
        }
        for candidate in &self.candidates {
            write!(f, "\n- {}", candidate)?;
        }
        Ok(())
    }
}
