use crate::config::DispatchConfig;
use crate::describe::ApiDescription;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::function::{WebFunction, WsEvent};
use crate::hot_reload::watch_modules;
use crate::request::RequestView;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use http::Method;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Command-line interface for modroute
#[derive(Debug, Parser)]
#[command(name = "modroute")]
#[command(about = "Resolve requests against annotated function modules", long_about = None)]
pub struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Module directory, overriding the configured web and endpoint paths
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a JSON description of every function
    Describe {
        /// Single-line JSON
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Show which function serves a request
    Resolve {
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Accept header
        #[arg(long)]
        accept: Option<String>,

        /// Content-Type header
        #[arg(long)]
        content_type: Option<String>,

        /// Resolve the error function for this code (`prefix:local`) instead
        #[arg(long)]
        error: Option<String>,
    },
    /// List the permission checks guarding a request
    Checks {
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path
        #[arg(short, long)]
        path: String,
    },
    /// Show which function handles a WebSocket event
    Ws {
        /// WebSocket path
        #[arg(short, long)]
        path: String,

        /// Lifecycle event
        #[arg(short, long, value_enum, default_value_t = EventArg::Message)]
        event: EventArg,
    },
    /// Rescan whenever module files change, until interrupted
    Watch,
}

/// WebSocket lifecycle event argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventArg {
    Connect,
    Message,
    Close,
    Error,
}

impl From<EventArg> for WsEvent {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Connect => WsEvent::Connect,
            EventArg::Message => WsEvent::Message,
            EventArg::Close => WsEvent::Close,
            EventArg::Error => WsEvent::Error,
        }
    }
}

impl Cli {
    /// Effective configuration: file, then `MODROUTE_*` variables, then `--root`.
    ///
    /// The CLI scans once per command, so the cache never expires on its own.
    pub fn dispatch_config(&self) -> Result<DispatchConfig> {
        let mut config = match &self.config {
            Some(path) => DispatchConfig::load(path)?,
            None => DispatchConfig::default(),
        };
        config.apply_env();
        if let Some(root) = &self.root {
            config.web_path = root.clone();
            config.endpoint_path = PathBuf::from(".");
        }
        config.parse_interval_ms = -1;
        Ok(config)
    }
}

/// Run a parsed command, writing results to `out`.
pub fn run_cli(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = cli.dispatch_config()?;
    let dispatcher = Dispatcher::new(&config).context("Failed to start dispatcher")?;

    match cli.command {
        Commands::Describe { compact } => {
            let description = dispatcher.describe()?;
            let json = if compact {
                serde_json::to_string(&description)?
            } else {
                serde_json::to_string_pretty(&description)?
            };
            writeln!(out, "{}", json)?;
        }
        Commands::Resolve {
            method,
            path,
            accept,
            content_type,
            error,
        } => {
            let mut req = RequestView::new(parse_method(&method)?, &path);
            if let Some(accept) = &accept {
                req = req.with_header("Accept", accept);
            }
            if let Some(content_type) = &content_type {
                req = req.with_header("Content-Type", content_type);
            }
            match dispatcher.resolve(&req, error.as_deref())? {
                Some(func) => {
                    writeln!(out, "{}", func.display_signature())?;
                    for (name, value) in func.bind(&req) {
                        writeln!(out, "  ${} = {}", name, value)?;
                    }
                }
                None => writeln!(out, "No function matches {} {}", req.method(), req.path())?,
            }
        }
        Commands::Checks { method, path } => {
            let req = RequestView::new(parse_method(&method)?, &path);
            let checks = dispatcher.checks(&req)?;
            if checks.is_empty() {
                writeln!(out, "No permission checks for {}", req.path())?;
            }
            for check in checks {
                writeln!(out, "{}", check.display_signature())?;
            }
        }
        Commands::Ws { path, event } => {
            let event = WsEvent::from(event);
            match dispatcher.websocket(&path, event)? {
                Some(func) => writeln!(out, "{}", func.display_signature())?,
                None => writeln!(out, "No function handles {} on {}", event, path)?,
            }
        }
        Commands::Watch => watch(&dispatcher, &config, out)?,
    }
    Ok(())
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", method))
}

fn watch(dispatcher: &Dispatcher, config: &DispatchConfig, out: &mut impl Write) -> Result<()> {
    let store = dispatcher.store();
    let snapshot = store.snapshot()?;
    writeln!(
        out,
        "Watching {} ({} modules)",
        store.root().display(),
        snapshot.len()
    )?;
    let _watcher = watch_modules(store).context("Failed to watch module directory")?;

    let mut last_failure = None;
    loop {
        std::thread::sleep(config.tick());
        if !store.is_stale() {
            continue;
        }
        report_rescan(dispatcher.describe(), &mut last_failure, out)?;
        out.flush()?;
    }
}

/// Print the outcome of a rescan. A failure is printed once until it
/// changes or a rescan succeeds.
pub(crate) fn report_rescan(
    result: std::result::Result<ApiDescription, DispatchError>,
    last_failure: &mut Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    match result {
        Ok(description) => {
            *last_failure = None;
            info!(
                generation = description.generation,
                functions = description.function_count(),
                "Modules rescanned"
            );
            writeln!(
                out,
                "Rescanned: {} modules, {} functions",
                description.modules,
                description.function_count()
            )?;
        }
        Err(e) => {
            let message = e.to_string();
            if last_failure.as_deref() != Some(message.as_str()) {
                writeln!(out, "Rescan failed: {}", message)?;
                *last_failure = Some(message);
            }
        }
    }
    Ok(())
}
