//! # CLI Module
//!
//! Command-line access to a module tree, for inspecting dispatch decisions
//! without running a server.
//!
//! ## Commands
//!
//! ### `describe`
//!
//! Print the JSON description of every function:
//!
//! ```bash
//! modroute --root webapp describe
//! ```
//!
//! ### `resolve`
//!
//! Show the function that serves a request, with its bound path variables:
//!
//! ```bash
//! modroute --root webapp resolve --method GET --path /items/42 --accept 'text/xml'
//! modroute --root webapp resolve --path /items/42 --error err:NOT_FOUND
//! ```
//!
//! ### `checks`
//!
//! List permission checks guarding a request, most specific first.
//!
//! ### `ws`
//!
//! Show the function handling a WebSocket event:
//!
//! ```bash
//! modroute --root webapp ws --path /chat/lobby --event message
//! ```
//!
//! ### `watch`
//!
//! Rescan whenever module files change and report the result.
//!
//! ## Configuration
//!
//! `--config <FILE>` loads a `.toml`, `.yaml` or `.json` file; `MODROUTE_*`
//! variables override it and `--root` overrides both. Ambiguous dispatch and
//! parse failures exit with an error.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands, EventArg};
