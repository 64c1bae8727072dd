//! # Error Module
//!
//! Typed failures surfaced by the module store and the dispatcher.
//!
//! None of these are retried internally. The surrounding server decides which
//! response to emit based on the variant:
//!
//! - [`DispatchError::ConfigurationMissing`] - the module root does not exist
//! - [`DispatchError::Io`] - a directory or file could not be read during a rescan
//! - [`DispatchError::Parse`] - a module failed to parse; the whole rescan is aborted
//! - [`DispatchError::Ambiguous`] - several functions remain after all tie-breaking

use crate::dispatcher::Conflict;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// A module that could not be turned into web functions.
///
/// Carries the offending file and the 1-based line of the declaration
/// (0 when the failure is not tied to a declaration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// File that failed to parse
    pub file: PathBuf,
    /// Line of the offending declaration
    pub line: usize,
    /// Human-readable reason
    pub message: String,
}

impl ParseError {
    pub fn new(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.file.display(), self.message)
        } else {
            write!(f, "{}:{}: {}", self.file.display(), self.line, self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// Failure raised while rescanning modules or resolving a request.
#[derive(Debug)]
pub enum DispatchError {
    /// The module root directory does not exist
    ConfigurationMissing {
        /// Root directory that was looked up
        path: PathBuf,
    },
    /// A directory or file could not be read during a rescan
    Io {
        /// Path being read when the failure occurred
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// A source module failed to parse
    Parse(ParseError),
    /// More than one function remains after tie-breaking
    Ambiguous(Conflict),
}

impl DispatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DispatchError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::ConfigurationMissing { path } => {
                write!(f, "Module directory not found: {}", path.display())
            }
            DispatchError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            DispatchError::Parse(err) => write!(f, "Failed to parse module {}", err),
            DispatchError::Ambiguous(conflict) => write!(f, "{}", conflict),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Io { source, .. } => Some(source),
            DispatchError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for DispatchError {
    fn from(err: ParseError) -> Self {
        DispatchError::Parse(err)
    }
}
