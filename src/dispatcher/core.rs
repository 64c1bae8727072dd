use super::conflict::{Conflict, ConflictTarget};
use super::negotiate;
use crate::config::DispatchConfig;
use crate::describe::ApiDescription;
use crate::error::DispatchError;
use crate::function::{HttpFunction, WebFunction, WsEvent, WsFunction};
use crate::media::MediaType;
use crate::module::{AnnotationParser, ModuleParser};
use crate::request::{split_path, RequestView};
use crate::store::{CacheInvalidator, ModuleStore};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Function dispatch service over a module tree.
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<ModuleStore>,
    invalidator: Option<CacheInvalidator>,
}

impl Dispatcher {
    /// Create a dispatcher using the bundled [`AnnotationParser`].
    ///
    /// Starts the cache invalidator when the configured interval is positive.
    pub fn new(config: &DispatchConfig) -> std::io::Result<Self> {
        Self::with_parser(config, Arc::new(AnnotationParser::new()))
    }

    /// Create a dispatcher with a custom module parser.
    pub fn with_parser(
        config: &DispatchConfig,
        parser: Arc<dyn ModuleParser>,
    ) -> std::io::Result<Self> {
        let store = ModuleStore::new(config.root(), &config.extensions, config.policy(), parser);
        Self::from_store(Arc::new(store), config.tick())
    }

    /// Wrap an existing store, ticking its invalidator every `tick`.
    pub fn from_store(store: Arc<ModuleStore>, tick: Duration) -> std::io::Result<Self> {
        let invalidator = CacheInvalidator::with_tick(&store, tick)?;
        Ok(Self { store, invalidator })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ModuleStore> {
        &self.store
    }

    /// Find the function that serves `req`, or the error function for `error`.
    ///
    /// Returns `Ok(None)` if nothing matches and
    /// [`DispatchError::Ambiguous`] if several functions remain after
    /// specificity narrowing and content negotiation.
    pub fn resolve(
        &self,
        req: &RequestView,
        error: Option<&str>,
    ) -> Result<Option<Arc<HttpFunction>>, DispatchError> {
        let accepts = req.accepts();
        let funcs = leading_class(self.collect(req, &accepts, error, false)?);
        if funcs.len() <= 1 {
            return Ok(funcs.into_iter().next());
        }

        // the report names the leading candidate's template, not a negotiated one
        let target = match error {
            Some(code) => ConflictTarget::Error(code.to_string()),
            None => ConflictTarget::Path(
                funcs[0]
                    .path()
                    .map_or_else(|| req.path().to_string(), ToString::to_string),
            ),
        };

        let best = negotiate::best_quality(&funcs, &accepts);
        if best.len() == 1 {
            return Ok(best.into_iter().next());
        }
        let tied = if best.is_empty() { funcs } else { best };

        let conflict = Conflict::new(target, &tied);
        warn!(
            method = %req.method(),
            path = req.path(),
            error_code = error,
            candidates = tied.len(),
            "Ambiguous function dispatch"
        );
        Err(DispatchError::Ambiguous(conflict))
    }

    /// Permission functions guarding `req`, most specific first.
    pub fn checks(&self, req: &RequestView) -> Result<Vec<Arc<HttpFunction>>, DispatchError> {
        self.collect(req, &req.accepts(), None, true)
    }

    /// All WebSocket functions for `event` on `path`, most specific first.
    pub fn find_ws(
        &self,
        path: &str,
        event: WsEvent,
    ) -> Result<Vec<Arc<WsFunction>>, DispatchError> {
        let segments = split_path(path);
        let snapshot = self.store.snapshot()?;
        let mut funcs: Vec<Arc<WsFunction>> = snapshot
            .ws_functions()
            .filter(|f| f.matches(event, &segments))
            .map(Arc::clone)
            .collect();
        funcs.sort_by(|a, b| a.specificity(b));
        Ok(funcs)
    }

    /// Find the single WebSocket function for `event` on `path`.
    ///
    /// Any second candidate is a conflict, whatever its specificity.
    pub fn websocket(
        &self,
        path: &str,
        event: WsEvent,
    ) -> Result<Option<Arc<WsFunction>>, DispatchError> {
        let funcs = self.find_ws(path, event)?;
        match funcs.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(Arc::clone(only))),
            [first, ..] => {
                warn!(
                    path,
                    event = %event,
                    candidates = funcs.len(),
                    "Ambiguous WebSocket dispatch"
                );
                Err(DispatchError::Ambiguous(Conflict::new(
                    ConflictTarget::Path(first.path().to_string()),
                    &funcs,
                )))
            }
        }
    }

    /// Describe every function in the current snapshot.
    pub fn describe(&self) -> Result<ApiDescription, DispatchError> {
        let snapshot = self.store.snapshot()?;
        Ok(ApiDescription::from_snapshot(&snapshot))
    }

    /// Force a rescan on the next request.
    pub fn invalidate(&self) {
        self.store.invalidate();
    }

    /// Stop the background invalidator. Resolution keeps working; the cache
    /// then only expires through [`invalidate`](Self::invalidate).
    pub fn shutdown(&mut self) {
        if let Some(mut invalidator) = self.invalidator.take() {
            invalidator.stop();
        }
    }

    fn collect(
        &self,
        req: &RequestView,
        accepts: &[MediaType],
        error: Option<&str>,
        permission: bool,
    ) -> Result<Vec<Arc<HttpFunction>>, DispatchError> {
        let snapshot = self.store.snapshot()?;
        let mut funcs: Vec<Arc<HttpFunction>> = snapshot
            .functions()
            .filter(|f| f.matches_accepting(req, accepts, error, permission))
            .map(Arc::clone)
            .collect();
        funcs.sort_by(|a, b| a.specificity(b));
        debug!(
            method = %req.method(),
            path = req.path(),
            error_code = error,
            permission,
            matched = funcs.len(),
            "Collected candidate functions"
        );
        Ok(funcs)
    }
}

/// Keep the leading run of functions that tie with the first one.
fn leading_class<T: WebFunction>(mut funcs: Vec<Arc<T>>) -> Vec<Arc<T>> {
    let end = match funcs.first() {
        Some(first) => funcs
            .iter()
            .position(|f| first.specificity(f) != Ordering::Equal)
            .unwrap_or(funcs.len()),
        None => 0,
    };
    funcs.truncate(end);
    funcs
}
