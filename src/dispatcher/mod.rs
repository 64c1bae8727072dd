//! # Dispatcher Module
//!
//! Selects the single function that should serve a request.
//!
//! ## Overview
//!
//! [`Dispatcher`] is the service handle. It owns the [`ModuleStore`] and, for
//! an expiring cache, the background [`CacheInvalidator`]. Construct one per
//! server; there is no global instance.
//!
//! ## HTTP Resolution
//!
//! 1. **Collect** - every function in the current snapshot whose constraints
//!    match the request (path, error code or permission mode; method;
//!    consumed and produced types), stably sorted by specificity
//! 2. **Narrow** - keep the leading run of functions that compare equal to
//!    the most specific one
//! 3. **Negotiate** - if several remain, keep those reaching the best client
//!    quality `q` of the `Accept` header, then those also reaching the best
//!    server quality `qs` of their produced types
//! 4. **Report** - more than one survivor is a [`Conflict`]
//!
//! ## WebSocket Resolution
//!
//! WebSocket functions are collected and sorted the same way, but there is
//! neither narrowing nor negotiation: two or more candidates are a conflict
//! even when one of them is strictly more specific.
//!
//! ## Concurrency
//!
//! Resolution works on an immutable snapshot and takes no locks. Only a
//! rescan is serialized, inside the store.
//!
//! [`ModuleStore`]: crate::store::ModuleStore
//! [`CacheInvalidator`]: crate::store::CacheInvalidator

mod conflict;
mod core;
mod negotiate;

pub use conflict::{Conflict, ConflictTarget};
pub use core::Dispatcher;
