//! # Module Module
//!
//! A module is one source file plus the web functions it declares.
//!
//! ## Lifecycle
//!
//! - Created on the first successful parse of a file that declares at least
//!   one relevant function
//! - Replaced by a freshly parsed module (a new `Arc`) when its fingerprint changes
//! - Dropped from the next snapshot when the file disappears, fails to parse,
//!   or no longer declares relevant functions
//!
//! Modules are immutable after construction apart from the "touch" timestamp,
//! which only records when a rescan last saw the module.
//!
//! ## Parsing
//!
//! Turning a file into a [`Module`] goes through the [`ModuleParser`] trait.
//! [`AnnotationParser`] is the bundled implementation; it scans annotated
//! function declarations and never looks at function bodies.

mod parser;

pub use parser::AnnotationParser;

use crate::error::DispatchError;
use crate::function::{HttpFunction, WsFunction};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cheap change detector for a source file: modification time and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    /// Read the fingerprint of the file at `path`.
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// A parsed source file and its web functions.
#[derive(Debug)]
pub struct Module {
    path: PathBuf,
    fingerprint: Fingerprint,
    functions: Vec<Arc<HttpFunction>>,
    ws_functions: Vec<Arc<WsFunction>>,
    /// Milliseconds since the Unix epoch of the last rescan that kept this module
    touched: AtomicU64,
}

impl Module {
    #[must_use]
    pub fn new(
        path: PathBuf,
        fingerprint: Fingerprint,
        functions: Vec<HttpFunction>,
        ws_functions: Vec<WsFunction>,
    ) -> Self {
        Self {
            path,
            fingerprint,
            functions: functions.into_iter().map(Arc::new).collect(),
            ws_functions: ws_functions.into_iter().map(Arc::new).collect(),
            touched: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// HTTP, error and permission functions, in declaration order
    #[must_use]
    pub fn functions(&self) -> &[Arc<HttpFunction>] {
        &self.functions
    }

    /// WebSocket functions, in declaration order
    #[must_use]
    pub fn ws_functions(&self) -> &[Arc<WsFunction>] {
        &self.ws_functions
    }

    /// Returns `true` if the module declares at least one web function.
    #[must_use]
    pub fn is_relevant(&self) -> bool {
        !self.functions.is_empty() || !self.ws_functions.is_empty()
    }

    /// Record that a rescan kept this module.
    pub fn touch(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.touched.store(now, Ordering::Relaxed);
    }

    /// When a rescan last kept this module, if ever.
    #[must_use]
    pub fn last_touched(&self) -> Option<SystemTime> {
        match self.touched.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(UNIX_EPOCH + Duration::from_millis(ms)),
        }
    }
}

/// Turns source files into modules.
///
/// Implementations must be thread-safe: the store calls them from whichever
/// request thread triggers a rescan.
pub trait ModuleParser: Send + Sync {
    /// Parse the file at `path`.
    ///
    /// Returns a module even if it declares no web functions; the store
    /// decides whether to keep it. Read failures map to
    /// [`DispatchError::Io`], malformed declarations to [`DispatchError::Parse`].
    fn parse(&self, path: &Path) -> Result<Module, DispatchError>;

    /// Returns `true` if `module` still reflects the file on disk.
    fn is_up_to_date(&self, module: &Module) -> bool {
        Fingerprint::of(module.path())
            .map(|fp| fp == *module.fingerprint())
            .unwrap_or(false)
    }
}
