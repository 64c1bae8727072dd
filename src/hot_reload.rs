//! # Hot Reload Module
//!
//! Invalidates the module cache as soon as source files change, instead of
//! waiting for the idle interval to expire.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modroute::hot_reload::watch_modules;
//!
//! let dispatcher = Dispatcher::new(&config)?;
//! let _watcher = watch_modules(dispatcher.store())?;
//! // keep the watcher alive for as long as changes should be picked up
//! ```
//!
//! ## What Triggers Invalidation
//!
//! Creating, modifying or removing a file below the root whose extension is
//! recognized by the store, or an ignore marker file. Other files are
//! ignored.
//!
//! The watcher never rescans. It only marks the store stale, so the next
//! request performs one rescan no matter how many events arrived in between.
//! This makes editor save bursts cheap without debouncing.
//!
//! If the modified module fails to parse, the rescan fails and the previous
//! snapshot stays active until the file is fixed.

use crate::store::{ModuleStore, IGNORE_MARKER};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Watch the store's root directory and invalidate the store on relevant changes.
///
/// The returned watcher stops when dropped. It holds only a weak reference
/// to the store.
pub fn watch_modules(store: &Arc<ModuleStore>) -> notify::Result<RecommendedWatcher> {
    let weak: Weak<ModuleStore> = Arc::downgrade(store);
    let root = store.root().to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                let Some(store) = weak.upgrade() else {
                    return;
                };
                if let Some(path) = event.paths.iter().find(|p| is_relevant(&store, p)) {
                    info!(
                        path = %path.display(),
                        kind = ?event.kind,
                        "hot-reload: module change detected"
                    );
                    store.invalidate();
                } else {
                    debug!(paths = ?event.paths, "hot-reload: ignoring change");
                }
            }
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "hot-reload: watching module directory");
    Ok(watcher)
}

fn is_relevant(store: &ModuleStore, path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == IGNORE_MARKER) || store.is_source(path)
}
