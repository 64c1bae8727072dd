use super::{ErrorPattern, ParamVec, PathRank, PathTemplate, SourceLocation, WebFunction};
use crate::media::{MediaType, CLIENT_QUALITY};
use crate::request::RequestView;
use http::Method;
use std::cmp::Ordering;
use std::fmt;

/// What an HTTP function is dispatched on
#[derive(Debug, Clone)]
pub enum Route {
    /// `%rest:path(...)`: serves requests whose path matches the template
    Path(PathTemplate),
    /// `%rest:error(...)`: serves raised error codes
    Error(Vec<ErrorPattern>),
    /// `%perm:check(...)`: guards every request below a path prefix
    Permission(PermissionCheck),
}

/// Permission check declared with `%perm:check(path, "{$var}")`
#[derive(Debug, Clone)]
pub struct PermissionCheck {
    pub path: PathTemplate,
    /// Variable receiving permission details, if declared
    pub variable: Option<String>,
}

/// Source of a declared request parameter binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Query,
    Form,
    Header,
    Cookie,
    /// `%rest:error-param`: details of the error being handled
    Error,
}

impl ParamSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamSource::Query => "query",
            ParamSource::Form => "form",
            ParamSource::Header => "header",
            ParamSource::Cookie => "cookie",
            ParamSource::Error => "error",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `%rest:query-param("name", "{$var}", "default")` style binding.
///
/// Bindings do not take part in matching; they are kept for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub source: ParamSource,
    pub name: String,
    pub variable: String,
    pub defaults: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Specificity {
    Path(PathRank),
    Error(u8),
    Permission(PathRank),
}

impl Specificity {
    fn of(route: &Route) -> Self {
        match route {
            Route::Path(tpl) => Specificity::Path(tpl.rank()),
            Route::Error(patterns) => {
                Specificity::Error(patterns.iter().map(ErrorPattern::rank).min().unwrap_or(2))
            }
            Route::Permission(check) => Specificity::Permission(check.path.rank()),
        }
    }
}

/// An annotated function that handles HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpFunction {
    name: String,
    params: Vec<String>,
    location: SourceLocation,
    route: Route,
    specificity: Specificity,
    methods: Vec<Method>,
    consumes: Vec<MediaType>,
    produces: Vec<MediaType>,
    bindings: Vec<ParamBinding>,
}

impl HttpFunction {
    /// Create a function accepting any method and media type.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        params: Vec<String>,
        location: SourceLocation,
        route: Route,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            location,
            specificity: Specificity::of(&route),
            route,
            methods: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Restrict the accepted methods; an empty list accepts any method.
    #[must_use]
    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = methods;
        self
    }

    #[must_use]
    pub fn with_consumes(mut self, consumes: Vec<MediaType>) -> Self {
        self.consumes = consumes;
        self
    }

    #[must_use]
    pub fn with_produces(mut self, produces: Vec<MediaType>) -> Self {
        self.produces = produces;
        self
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: Vec<ParamBinding>) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Template of a path function
    #[must_use]
    pub fn path(&self) -> Option<&PathTemplate> {
        match &self.route {
            Route::Path(tpl) => Some(tpl),
            _ => None,
        }
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    #[must_use]
    pub fn bindings(&self) -> &[ParamBinding] {
        &self.bindings
    }

    /// Check whether this function applies to the request.
    ///
    /// In permission mode only permission checks whose path prefixes the
    /// request path match. With an error code only error functions whose
    /// patterns accept the code match. Otherwise only path functions whose
    /// template matches. Method, consumed and produced types are checked in
    /// every mode.
    #[must_use]
    pub fn matches(&self, req: &RequestView, error: Option<&str>, permission: bool) -> bool {
        self.matches_accepting(req, &req.accepts(), error, permission)
    }

    /// [`matches`](Self::matches) against an already parsed `Accept` list,
    /// so one request can be checked against many functions without
    /// reparsing its headers.
    #[must_use]
    pub fn matches_accepting(
        &self,
        req: &RequestView,
        accepts: &[MediaType],
        error: Option<&str>,
        permission: bool,
    ) -> bool {
        let route = match (&self.route, permission, error) {
            (Route::Permission(check), true, _) => check.path.is_prefix_of(req.segments()),
            (Route::Error(patterns), false, Some(code)) => {
                patterns.iter().any(|p| p.matches(code))
            }
            (Route::Path(tpl), false, None) => tpl.matches(req.segments()),
            _ => false,
        };
        route
            && self.accepts_method(req.method())
            && self.consumes_request(req)
            && self.produces_acceptable(accepts)
    }

    /// Bind path template variables for a matching request.
    ///
    /// Returns an empty list for error and permission functions.
    #[must_use]
    pub fn bind(&self, req: &RequestView) -> ParamVec {
        match &self.route {
            Route::Path(tpl) => tpl.bind(req.segments()).unwrap_or_default(),
            Route::Permission(check) => {
                let depth = check.path.segments().len().min(req.segments().len());
                check.path.bind(&req.segments()[..depth]).unwrap_or_default()
            }
            Route::Error(_) => ParamVec::new(),
        }
    }

    fn accepts_method(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    fn consumes_request(&self, req: &RequestView) -> bool {
        if self.consumes.is_empty() {
            return true;
        }
        match req.content_type() {
            Some(ct) => self.consumes.iter().any(|c| c.matches(&ct)),
            None => self
                .consumes
                .iter()
                .any(|c| c.kind() == "*" && c.subtype() == "*"),
        }
    }

    fn produces_acceptable(&self, accepts: &[MediaType]) -> bool {
        self.produces.is_empty()
            || accepts
                .iter()
                .filter(|a| a.quality(CLIENT_QUALITY) > 0.0)
                .any(|a| self.produces.iter().any(|p| p.matches(a)))
    }
}

impl WebFunction for HttpFunction {
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
        self.specificity.cmp(&other.specificity)
    }
}
