//! # Describe Module
//!
//! Machine-readable description of every cached function, for API
//! documentation endpoints and the `modroute describe` command.
//!
//! Path functions are grouped into resources by template; error handlers,
//! permission checks and WebSocket functions are listed separately. Entries
//! follow snapshot order (module path, then declaration order).

use crate::function::{HttpFunction, ParamBinding, Route, WebFunction, WsFunction};
use crate::store::Snapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a described function lives
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FunctionRef {
    pub function: String,
    pub params: Vec<String>,
    pub file: String,
    pub line: usize,
}

impl FunctionRef {
    fn of<F: WebFunction>(f: &F) -> Self {
        Self {
            function: f.name().to_string(),
            params: f.params().to_vec(),
            file: f.location().file.display().to_string(),
            line: f.location().line,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiDescription {
    /// Generation of the described snapshot
    pub generation: u64,
    pub modules: usize,
    pub resources: Vec<ResourceDescription>,
    pub errors: Vec<ErrorDescription>,
    pub permissions: Vec<PermissionDescription>,
    pub websockets: Vec<WebSocketDescription>,
}

/// All path functions sharing one template
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescription {
    pub path: String,
    /// Template variable names, in path order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
    pub methods: Vec<MethodDescription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodDescription {
    /// Accepted methods; empty means any
    pub methods: Vec<String>,
    #[serde(flatten)]
    pub function: FunctionRef,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub bindings: Vec<BindingDescription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingDescription {
    pub source: &'static str,
    pub name: String,
    pub variable: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<String>,
}

impl From<&ParamBinding> for BindingDescription {
    fn from(b: &ParamBinding) -> Self {
        Self {
            source: b.source.as_str(),
            name: b.name.clone(),
            variable: b.variable.clone(),
            defaults: b.defaults.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescription {
    pub codes: Vec<String>,
    #[serde(flatten)]
    pub function: FunctionRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionDescription {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(flatten)]
    pub function: FunctionRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebSocketDescription {
    pub event: &'static str,
    pub path: String,
    #[serde(flatten)]
    pub function: FunctionRef,
}

impl ApiDescription {
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut resources: BTreeMap<String, ResourceDescription> = BTreeMap::new();
        let mut errors = Vec::new();
        let mut permissions = Vec::new();

        for f in snapshot.functions() {
            match f.route() {
                Route::Path(tpl) => resources
                    .entry(tpl.to_string())
                    .or_insert_with(|| ResourceDescription {
                        path: tpl.to_string(),
                        variables: tpl.variables().map(str::to_string).collect(),
                        methods: Vec::new(),
                    })
                    .methods
                    .push(describe_method(f)),
                Route::Error(patterns) => errors.push(ErrorDescription {
                    codes: patterns.iter().map(ToString::to_string).collect(),
                    function: FunctionRef::of(&**f),
                }),
                Route::Permission(check) => permissions.push(PermissionDescription {
                    path: check.path.to_string(),
                    variable: check.variable.clone(),
                    function: FunctionRef::of(&**f),
                }),
            }
        }

        Self {
            generation: snapshot.generation(),
            modules: snapshot.len(),
            resources: resources.into_values().collect(),
            errors,
            permissions,
            websockets: snapshot
                .ws_functions()
                .map(|f| describe_ws(f))
                .collect(),
        }
    }

    /// Number of described functions of all kinds
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.resources.iter().map(|r| r.methods.len()).sum::<usize>()
            + self.errors.len()
            + self.permissions.len()
            + self.websockets.len()
    }
}

fn describe_method(f: &HttpFunction) -> MethodDescription {
    MethodDescription {
        methods: f.methods().iter().map(ToString::to_string).collect(),
        function: FunctionRef::of(f),
        consumes: f.consumes().iter().map(ToString::to_string).collect(),
        produces: f.produces().iter().map(ToString::to_string).collect(),
        bindings: f.bindings().iter().map(BindingDescription::from).collect(),
    }
}

fn describe_ws(f: &WsFunction) -> WebSocketDescription {
    WebSocketDescription {
        event: f.event().as_str(),
        path: f.path().to_string(),
        function: FunctionRef::of(f),
    }
}
