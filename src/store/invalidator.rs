use super::{CachePolicy, ModuleStore};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

/// Default period of the staleness check
pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// Background ticker that expires an idle [`ModuleStore`].
///
/// Each tick calls [`ModuleStore::expire_idle`], which only flips the
/// staleness flag. The thread holds a weak reference and exits on its own
/// once the store is dropped. [`stop`](Self::stop) or dropping the
/// invalidator cancels it and waits for the thread to finish.
#[derive(Debug)]
pub struct CacheInvalidator {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheInvalidator {
    /// Start ticking with [`DEFAULT_TICK`].
    ///
    /// Returns `None` unless the store uses [`CachePolicy::Expiring`].
    pub fn start(store: &Arc<ModuleStore>) -> std::io::Result<Option<Self>> {
        Self::with_tick(store, DEFAULT_TICK)
    }

    /// Start ticking every `tick`.
    pub fn with_tick(store: &Arc<ModuleStore>, tick: Duration) -> std::io::Result<Option<Self>> {
        let CachePolicy::Expiring(interval) = store.policy() else {
            return Ok(None);
        };
        let (cancel, cancelled) = mpsc::channel::<()>();
        let weak: Weak<ModuleStore> = Arc::downgrade(store);

        let handle = std::thread::Builder::new()
            .name("modroute-invalidator".to_string())
            .spawn(move || loop {
                match cancelled.recv_timeout(tick) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                let Some(store) = weak.upgrade() else {
                    break;
                };
                if store.expire_idle() {
                    debug!(root = %store.root().display(), "Idle module cache expired");
                }
            })?;

        info!(
            interval_ms = interval.as_millis() as u64,
            tick_ms = tick.as_millis() as u64,
            "Started module cache invalidator"
        );
        Ok(Some(Self {
            cancel: Some(cancel),
            handle: Some(handle),
        }))
    }

    /// Stop the ticker and wait for its thread to exit.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            if cancel.send(()).is_err() {
                debug!("Invalidator thread already exited");
            }
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("Module cache invalidator thread panicked");
            }
            debug!("Stopped module cache invalidator");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CacheInvalidator {
    fn drop(&mut self) {
        self.stop();
    }
}
