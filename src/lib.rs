//! # modroute
//!
//! **modroute** maps incoming HTTP and WebSocket requests to annotated handler
//! functions discovered by scanning a directory of source modules.
//!
//! ## Overview
//!
//! Handler functions are declared with RESTXQ-style annotations:
//!
//! ```text
//! declare %rest:path("/items/{$id}") %rest:GET %rest:produces("application/json")
//!   function local:item($id) { ... };
//! ```
//!
//! modroute never executes or compiles function bodies. It keeps a cache of
//! parsed modules, selects the single best function for a request and
//! reports unresolved ties as structured errors. Running the selected
//! function is up to the surrounding server.
//!
//! ## Architecture
//!
//! - **[`module`]** - source files, their fingerprints and the annotation parser
//! - **[`function`]** - HTTP and WebSocket functions, path templates, error patterns
//! - **[`store`]** - filesystem-backed module cache with atomic snapshots and idle expiry
//! - **[`dispatcher`]** - specificity narrowing, content negotiation and conflict reporting
//! - **[`describe`]** - serializable description of all cached functions
//! - **[`hot_reload`]** - filesystem watcher that invalidates the cache on change
//! - **[`config`]** / **[`logging`]** - environment and file configuration, tracing setup
//! - **[`cli`]** - the `modroute` command
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modroute::{DispatchConfig, Dispatcher, RequestView};
//! use http::Method;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig {
//!     web_path: "webapp".into(),
//!     ..DispatchConfig::default()
//! };
//! let dispatcher = Dispatcher::new(&config)?;
//!
//! let req = RequestView::new(Method::GET, "/items/42").with_header("Accept", "application/json");
//! match dispatcher.resolve(&req, None)? {
//!     Some(func) => println!("serve with {}", func.path().map(|p| p.as_str()).unwrap_or("?")),
//!     None => println!("404"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Caching
//!
//! `parse_interval_ms` selects how long parsed modules stay valid: `0`
//! rescans on every request, a positive value rescans after the cache has
//! been idle that long, and a negative value caches until
//! [`Dispatcher::invalidate`] is called. Unchanged files always keep their
//! parsed module across rescans.
//!
//! ## Error Handling
//!
//! All failures surface as [`DispatchError`]. A missing module directory, an
//! unreadable file or a module that fails to parse aborts the rescan and
//! leaves the previous snapshot active.

pub mod cli;
pub mod config;
pub mod describe;
pub mod dispatcher;
pub mod error;
pub mod function;
pub mod hot_reload;
pub mod logging;
pub mod media;
pub mod module;
pub mod request;
pub mod store;

pub use config::DispatchConfig;
pub use describe::ApiDescription;
pub use dispatcher::{Conflict, ConflictTarget, Dispatcher};
pub use error::{DispatchError, ParseError};
pub use function::{HttpFunction, WebFunction, WsEvent, WsFunction};
pub use media::MediaType;
pub use module::{AnnotationParser, Module, ModuleParser};
pub use request::RequestView;
pub use store::{CachePolicy, ModuleStore, Snapshot};
