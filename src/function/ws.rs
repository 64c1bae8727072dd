use super::{PathTemplate, SourceLocation, WebFunction};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// WebSocket lifecycle event a function is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WsEvent {
    Connect,
    Message,
    Close,
    Error,
}

impl WsEvent {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WsEvent::Connect => "connect",
            WsEvent::Message => "message",
            WsEvent::Close => "close",
            WsEvent::Error => "error",
        }
    }
}

impl FromStr for WsEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "connect" => Ok(WsEvent::Connect),
            "message" => Ok(WsEvent::Message),
            "close" => Ok(WsEvent::Close),
            "error" => Ok(WsEvent::Error),
            other => Err(format!("unknown WebSocket event '{}'", other)),
        }
    }
}

impl fmt::Display for WsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An annotated function bound to a WebSocket lifecycle event on a path.
#[derive(Debug, Clone)]
pub struct WsFunction {
    name: String,
    params: Vec<String>,
    location: SourceLocation,
    event: WsEvent,
    path: PathTemplate,
}

impl WsFunction {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        params: Vec<String>,
        location: SourceLocation,
        event: WsEvent,
        path: PathTemplate,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            location,
            event,
            path,
        }
    }

    #[must_use]
    pub fn event(&self) -> WsEvent {
        self.event
    }

    #[must_use]
    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    /// Returns `true` if the function handles `event` on the given path segments.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, event: WsEvent, segments: &[S]) -> bool {
        self.event == event && self.path.matches(segments)
    }
}

impl WebFunction for WsFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[String] {
        &self.params
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn specificity(&self, other: &Self) -> Ordering {
        self.path.cmp_specificity(&other.path)
    }
}
