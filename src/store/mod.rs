//! # Store Module
//!
//! Filesystem-backed cache of parsed modules.
//!
//! ## Overview
//!
//! [`ModuleStore`] owns the module tree below a root directory and publishes
//! immutable [`Snapshot`]s of it. A snapshot is only ever produced by a full
//! rescan and is swapped in atomically, so request threads read it without
//! taking any lock.
//!
//! ## Rescans
//!
//! A rescan walks the tree depth-first in file-name order:
//!
//! - Directories containing an [`IGNORE_MARKER`] file are skipped with all
//!   their descendants
//! - Files with a recognized extension whose fingerprint is unchanged keep
//!   their existing `Arc<Module>`
//! - Changed or new files are parsed; modules without web functions are dropped
//!
//! A missing root fails with [`DispatchError::ConfigurationMissing`]. Any I/O
//! or parse failure aborts the rescan and the previous snapshot stays active.
//! One broken module therefore takes the whole rescan down with it.
//!
//! ## Staleness
//!
//! | Policy | When the store rescans |
//! |--------|------------------------|
//! | [`CachePolicy::Disabled`] | on every snapshot request |
//! | [`CachePolicy::Expiring`] | after [`CacheInvalidator`] finds the store idle for the interval |
//! | [`CachePolicy::Permanent`] | only after [`ModuleStore::invalidate`] |
//!
//! The invalidator only flips the staleness flag. The walk itself always
//! happens on the next snapshot request.
//!
//! [`DispatchError::ConfigurationMissing`]: crate::error::DispatchError::ConfigurationMissing

mod core;
mod invalidator;

pub use core::{CachePolicy, ModuleStore, Snapshot, IGNORE_MARKER};
pub use invalidator::{CacheInvalidator, DEFAULT_TICK};
