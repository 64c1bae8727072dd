use crate::error::DispatchError;
use crate::function::{HttpFunction, WsFunction};
use crate::module::{Module, ModuleParser};
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A directory containing a file with this name is excluded from scanning,
/// together with everything below it.
pub const IGNORE_MARKER: &str = ".ignore";

/// How long a published snapshot stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Rescan on every snapshot request
    Disabled,
    /// Rescan once the store has not been accessed for the given duration
    Expiring(Duration),
    /// Rescan only after a manual invalidation
    Permanent,
}

impl CachePolicy {
    /// Map a rescan interval in milliseconds to a policy.
    ///
    /// `0` disables caching, a negative value caches until invalidated.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => CachePolicy::Disabled,
            ms if ms < 0 => CachePolicy::Permanent,
            ms => CachePolicy::Expiring(Duration::from_millis(ms.unsigned_abs())),
        }
    }
}

/// Immutable view of all cached modules, keyed by path.
#[derive(Debug)]
pub struct Snapshot {
    modules: BTreeMap<PathBuf, Arc<Module>>,
    built_at: Option<SystemTime>,
    generation: u64,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            modules: BTreeMap::new(),
            built_at: None,
            generation: 0,
        }
    }

    /// Look up the module parsed from `path`.
    #[must_use]
    pub fn module(&self, path: &Path) -> Option<&Arc<Module>> {
        self.modules.get(path)
    }

    /// Modules in path order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values()
    }

    /// HTTP functions of all modules, in path and declaration order
    pub fn functions(&self) -> impl Iterator<Item = &Arc<HttpFunction>> {
        self.modules.values().flat_map(|m| m.functions().iter())
    }

    /// WebSocket functions of all modules, in path and declaration order
    pub fn ws_functions(&self) -> impl Iterator<Item = &Arc<WsFunction>> {
        self.modules.values().flat_map(|m| m.ws_functions().iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of the rescan that produced this snapshot; `0` before the first one.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the rescan that produced this snapshot finished
    #[must_use]
    pub fn built_at(&self) -> Option<SystemTime> {
        self.built_at
    }
}

/// Owns the module tree below a root directory.
///
/// Readers call [`snapshot`](Self::snapshot); at most one rescan runs at a
/// time and other callers wait for it.
pub struct ModuleStore {
    root: PathBuf,
    extensions: Vec<String>,
    policy: CachePolicy,
    parser: Arc<dyn ModuleParser>,
    snapshot: ArcSwap<Snapshot>,
    /// Bumped by every invalidation
    invalidations: AtomicU64,
    /// Value of `invalidations` the published snapshot was scanned at
    scanned_at: AtomicU64,
    /// Milliseconds since `epoch` of the last snapshot request
    last_access: AtomicU64,
    epoch: Instant,
    rescan_lock: Mutex<()>,
    rescans: AtomicU64,
}

impl std::fmt::Debug for ModuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleStore")
            .field("root", &self.root)
            .field("extensions", &self.extensions)
            .field("policy", &self.policy)
            .field("stale", &self.is_stale())
            .field("rescans", &self.rescans.load(Ordering::Relaxed))
            .finish()
    }
}

impl ModuleStore {
    /// Create a store. Nothing is read until the first snapshot request.
    ///
    /// Extensions are compared case-insensitively and without the leading dot.
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: &[String],
        policy: CachePolicy,
        parser: Arc<dyn ModuleParser>,
    ) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            policy,
            parser,
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            invalidations: AtomicU64::new(1),
            scanned_at: AtomicU64::new(0),
            last_access: AtomicU64::new(0),
            epoch: Instant::now(),
            rescan_lock: Mutex::new(()),
            rescans: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the current snapshot, rescanning first if the store is stale.
    ///
    /// On failure the previously published snapshot stays in place and the
    /// store remains stale, so the next request retries.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, DispatchError> {
        let snapshot = if self.policy == CachePolicy::Disabled || self.is_stale() {
            self.rescan()?
        } else {
            self.snapshot.load_full()
        };
        self.record_access();
        Ok(snapshot)
    }

    /// Last published snapshot, without checking staleness.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Mark the store stale; the next snapshot request rescans.
    ///
    /// An invalidation that arrives while a rescan is walking the tree keeps
    /// the store stale after that rescan publishes.
    pub fn invalidate(&self) {
        let was_stale = self.is_stale();
        self.invalidations.fetch_add(1, Ordering::AcqRel);
        if !was_stale {
            debug!(root = %self.root.display(), "Module cache invalidated");
        }
    }

    /// `true` until a rescan has published a snapshot that reflects every
    /// invalidation so far. A new store is stale.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.scanned_at.load(Ordering::Acquire) != self.invalidations.load(Ordering::Acquire)
    }

    /// Number of completed rescans
    #[must_use]
    pub fn rescan_count(&self) -> u64 {
        self.rescans.load(Ordering::Relaxed)
    }

    /// Mark the store stale if it has been idle for longer than the
    /// [`CachePolicy::Expiring`] interval. Returns `true` if it did.
    ///
    /// Never touches the filesystem.
    pub fn expire_idle(&self) -> bool {
        let CachePolicy::Expiring(interval) = self.policy else {
            return false;
        };
        if self.is_stale() {
            return false;
        }
        let idle = self
            .elapsed_ms()
            .saturating_sub(self.last_access.load(Ordering::Acquire));
        if u128::from(idle) >= interval.as_millis() {
            self.invalidate();
            return true;
        }
        false
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn record_access(&self) {
        self.last_access.store(self.elapsed_ms(), Ordering::Release);
    }

    fn rescan(&self) -> Result<Arc<Snapshot>, DispatchError> {
        // a poisoned lock only means another rescan panicked; the snapshot is still whole
        let _guard = self
            .rescan_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // another thread may have finished a rescan while we waited
        if self.policy != CachePolicy::Disabled && !self.is_stale() {
            return Ok(self.snapshot.load_full());
        }

        let seen = self.invalidations.load(Ordering::Acquire);
        let started = Instant::now();
        let previous = self.snapshot.load_full();
        match self.scan(&previous) {
            Ok((modules, reused)) => {
                let generation = previous.generation + 1;
                let snapshot = Arc::new(Snapshot {
                    modules,
                    built_at: Some(SystemTime::now()),
                    generation,
                });
                self.snapshot.store(Arc::clone(&snapshot));
                self.scanned_at.store(seen, Ordering::Release);
                self.rescans.fetch_add(1, Ordering::Relaxed);
                info!(
                    root = %self.root.display(),
                    generation,
                    modules = snapshot.len(),
                    reused,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Module rescan complete"
                );
                Ok(snapshot)
            }
            Err(err) => {
                warn!(
                    root = %self.root.display(),
                    error = %err,
                    "Module rescan failed; keeping previous snapshot"
                );
                Err(err)
            }
        }
    }

    fn scan(
        &self,
        previous: &Snapshot,
    ) -> Result<(BTreeMap<PathBuf, Arc<Module>>, usize), DispatchError> {
        if !self.root.is_dir() {
            return Err(DispatchError::ConfigurationMissing {
                path: self.root.clone(),
            });
        }
        let root = std::fs::canonicalize(&self.root).map_err(|e| DispatchError::io(&self.root, e))?;

        let mut modules = BTreeMap::new();
        let mut reused = 0;
        let walker = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let skip =
                    entry.file_type().is_dir() && entry.path().join(IGNORE_MARKER).exists();
                if skip {
                    debug!(dir = %entry.path().display(), "Skipping ignored directory");
                }
                !skip
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                DispatchError::io(path, io::Error::from(e))
            })?;
            if !entry.file_type().is_file() || !self.is_source(entry.path()) {
                continue;
            }
            // keys are canonical so symlinked copies of one file stay one module
            let path = std::fs::canonicalize(entry.path())
                .map_err(|e| DispatchError::io(entry.path(), e))?;
            if modules.contains_key(&path) {
                continue;
            }

            if let Some(existing) = previous.module(&path) {
                if self.parser.is_up_to_date(existing) {
                    existing.touch();
                    modules.insert(path, Arc::clone(existing));
                    reused += 1;
                    continue;
                }
            }

            let module = self.parser.parse(&path)?;
            if module.is_relevant() {
                module.touch();
                modules.insert(path, Arc::new(module));
            }
        }
        Ok((modules, reused))
    }

    /// Returns `true` if `path` has one of the recognized module extensions.
    #[must_use]
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}
