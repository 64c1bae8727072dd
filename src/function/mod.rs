//! # Function Module
//!
//! Web functions declared by source modules, and the pieces they are built from.
//!
//! - [`HttpFunction`] - handlers for request paths, error codes and permission checks
//! - [`WsFunction`] - handlers for WebSocket lifecycle events
//! - [`PathTemplate`] - `/items/{$id}` style templates with specificity ranking
//! - [`ErrorPattern`] - `%rest:error` code tests
//!
//! Functions are immutable once parsed and shared as `Arc`s between
//! snapshots, so resolution results can be handed out without copying.

mod error_code;
mod rest;
mod path;
mod ws;

pub use error_code::ErrorPattern;
pub use rest::{HttpFunction, ParamBinding, ParamSource, PermissionCheck, Route};
pub use path::{PathRank, PathTemplate, Segment};
pub use ws::{WsEvent, WsFunction};

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Maximum number of bound parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated `(name, value)` parameter storage.
///
/// Names are `Arc<str>` because they come from parsed templates and are
/// shared by every binding; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Where a function is declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 1-based line of the `declare` keyword
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Behaviour shared by HTTP and WebSocket functions.
pub trait WebFunction {
    /// Declared function name, e.g. `local:item`
    fn name(&self) -> &str;

    /// Declared parameter variables, e.g. `["$id"]`
    fn params(&self) -> &[String];

    fn location(&self) -> &SourceLocation;

    /// Total specificity order; `Less` means `self` is more specific.
    fn specificity(&self, other: &Self) -> Ordering;

    /// Human-readable signature used in conflict reports:
    /// `local:item($id) [/web/items.xqm:12]`.
    fn display_signature(&self) -> String {
        format!(
            "{}({}) [{}]",
            self.name(),
            self.params().join(", "),
            self.location()
        )
    }
}
