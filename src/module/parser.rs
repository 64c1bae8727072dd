use super::{Fingerprint, Module, ModuleParser};
use crate::error::{DispatchError, ParseError};
use crate::function::{
    ErrorPattern, HttpFunction, ParamBinding, ParamSource, PathTemplate, PermissionCheck, Route,
    SourceLocation, WsEvent, WsFunction,
};
use crate::media::MediaType;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

// `declare %a:b("x") %c:d function prefix:name(`; the parameter list is
// read by `parameter_list` since its types may nest parentheses
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\bdeclare((?:\s*%[^\s(%]+(?:\s*\((?:[^()"']|"[^"]*"|'[^']*')*\))?)+)\s*function\s+([^\s(]+)\s*\("#,
    )
    .expect("Failed to compile declaration regex")
});

static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"%([^\s(%]+)(?:\s*\(((?:[^()"']|"[^"]*"|'[^']*')*)\))?"#)
        .expect("Failed to compile annotation regex")
});

static LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""((?:[^"]|"")*)"|'((?:[^']|'')*)'"#).expect("Failed to compile literal regex")
});

static PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([\w.-]+(?::[\w.-]+)?)").expect("Failed to compile parameter regex")
});

const METHOD_ANNOTATIONS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

/// Scans RESTXQ-style annotated function declarations.
///
/// Only the `rest`, `perm` and `ws` annotation namespaces are interpreted;
/// everything else (`%output:method`, `%updating`, ...) is ignored, and
/// function bodies are never inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationParser;

impl AnnotationParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract web functions from module source text.
    ///
    /// `file` is only used for source locations and error messages.
    pub fn parse_source(
        &self,
        file: &Path,
        source: &str,
    ) -> Result<(Vec<HttpFunction>, Vec<WsFunction>), ParseError> {
        let source = blank_comments(source);

        let mut functions = Vec::new();
        let mut ws_functions = Vec::new();
        for caps in DECLARATION.captures_iter(&source) {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let location = SourceLocation {
                file: file.to_path_buf(),
                line: source[..start].matches('\n').count() + 1,
            };
            let name = caps[2].to_string();
            let list_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let list = parameter_list(&source[list_start..]).ok_or_else(|| {
                ParseError::new(
                    file,
                    location.line,
                    format!("{}: unbalanced parameter list", name),
                )
            })?;
            let params = PARAM
                .captures_iter(list)
                .map(|p| format!("${}", &p[1]))
                .collect();

            let mut draft = Draft::default();
            for ann in ANNOTATION.captures_iter(&caps[1]) {
                let args = ann.get(2).map(|m| m.as_str());
                draft
                    .apply(&ann[1], args)
                    .map_err(|msg| ParseError::new(file, location.line, format!("{}: {}", name, msg)))?;
            }

            match draft
                .finish(name.clone(), params, location.clone())
                .map_err(|msg| ParseError::new(file, location.line, format!("{}: {}", name, msg)))?
            {
                Some(Declared::Http(f)) => functions.push(f),
                Some(Declared::Ws(f)) => ws_functions.push(f),
                None => {}
            }
        }
        Ok((functions, ws_functions))
    }
}

impl ModuleParser for AnnotationParser {
    fn parse(&self, path: &Path) -> Result<Module, DispatchError> {
        let fingerprint = Fingerprint::of(path).map_err(|e| DispatchError::io(path, e))?;
        let bytes = std::fs::read(path).map_err(|e| DispatchError::io(path, e))?;
        let source = String::from_utf8(bytes)
            .map_err(|_| ParseError::new(path, 0, "module is not valid UTF-8"))?;
        let (functions, ws_functions) = self.parse_source(path, &source)?;
        debug!(
            module = %path.display(),
            http_functions = functions.len(),
            ws_functions = ws_functions.len(),
            "Parsed module"
        );
        Ok(Module::new(
            path.to_path_buf(),
            fingerprint,
            functions,
            ws_functions,
        ))
    }
}

enum Declared {
    Http(HttpFunction),
    Ws(WsFunction),
}

/// Annotations collected for one declaration
#[derive(Default)]
struct Draft {
    rest: bool,
    path: Option<PathTemplate>,
    errors: Option<Vec<ErrorPattern>>,
    permission: Option<PermissionCheck>,
    methods: Vec<Method>,
    consumes: Vec<MediaType>,
    produces: Vec<MediaType>,
    bindings: Vec<ParamBinding>,
    ws: Option<(WsEvent, PathTemplate)>,
}

impl Draft {
    fn apply(&mut self, annotation: &str, args: Option<&str>) -> Result<(), String> {
        let (prefix, local) = match annotation.split_once(':') {
            Some((p, l)) => (p, l),
            None => return Ok(()),
        };
        let values = match args {
            Some(a) => literals(a).ok_or_else(|| {
                format!("arguments of %{} must be string literals", annotation)
            })?,
            None => Vec::new(),
        };
        let arity = |min: usize, max: usize| {
            if values.len() < min || values.len() > max {
                Err(format!(
                    "%{} expects {} argument(s), found {}",
                    annotation,
                    if min == max {
                        min.to_string()
                    } else if max == usize::MAX {
                        format!("at least {}", min)
                    } else {
                        format!("{} to {}", min, max)
                    },
                    values.len()
                ))
            } else {
                Ok(())
            }
        };

        match (prefix, local) {
            ("rest", "path") => {
                arity(1, 1)?;
                if self.path.is_some() {
                    return Err("%rest:path declared twice".to_string());
                }
                self.path = Some(PathTemplate::parse(&values[0])?);
            }
            ("rest", "error") => {
                arity(1, usize::MAX)?;
                if self.errors.is_some() {
                    return Err("%rest:error declared twice".to_string());
                }
                let patterns = values
                    .iter()
                    .map(|v| ErrorPattern::parse(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let rank = patterns[0].rank();
                if patterns.iter().any(|p| p.rank() != rank) {
                    return Err("error codes must have the same specificity".to_string());
                }
                self.errors = Some(patterns);
            }
            ("rest", m) if METHOD_ANNOTATIONS.contains(&m) => {
                arity(0, 0)?;
                self.add_method(m)?;
            }
            ("rest", "method") => {
                arity(1, 1)?;
                self.add_method(&values[0].to_ascii_uppercase())?;
            }
            ("rest", "consumes") => {
                arity(1, usize::MAX)?;
                self.consumes.extend(media_types(&values)?);
            }
            ("rest", "produces") => {
                arity(1, usize::MAX)?;
                self.produces.extend(media_types(&values)?);
            }
            (
                "rest",
                kind @ ("query-param" | "form-param" | "header-param" | "cookie-param"
                | "error-param"),
            ) => {
                arity(2, usize::MAX)?;
                let source = match kind {
                    "query-param" => ParamSource::Query,
                    "form-param" => ParamSource::Form,
                    "header-param" => ParamSource::Header,
                    "error-param" => ParamSource::Error,
                    _ => ParamSource::Cookie,
                };
                self.bindings.push(ParamBinding {
                    source,
                    name: values[0].clone(),
                    variable: template_variable(&values[1])?,
                    defaults: values[2..].to_vec(),
                });
            }
            ("rest", "single") => {
                arity(0, 1)?;
                return Ok(());
            }
            ("rest", other) => return Err(format!("unknown annotation %rest:{}", other)),
            ("perm", "check") => {
                arity(0, 2)?;
                if self.permission.is_some() {
                    return Err("%perm:check declared twice".to_string());
                }
                let path = PathTemplate::parse(values.first().map(String::as_str).unwrap_or("/"))?;
                let variable = values.get(1).map(|v| template_variable(v)).transpose()?;
                self.permission = Some(PermissionCheck { path, variable });
                return Ok(());
            }
            ("perm", other) => return Err(format!("unknown annotation %perm:{}", other)),
            ("ws", "header-param") => return Ok(()),
            ("ws", event) => {
                let event: WsEvent = event.parse()?;
                arity(1, 1)?;
                if self.ws.is_some() {
                    return Err("only one %ws lifecycle annotation is allowed".to_string());
                }
                self.ws = Some((event, PathTemplate::parse(&values[0])?));
                return Ok(());
            }
            _ => return Ok(()),
        }
        self.rest = true;
        Ok(())
    }

    fn add_method(&mut self, name: &str) -> Result<(), String> {
        let method = Method::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid HTTP method '{}'", name))?;
        if self.methods.contains(&method) {
            return Err(format!("method {} declared twice", method));
        }
        self.methods.push(method);
        Ok(())
    }

    fn finish(
        self,
        name: String,
        params: Vec<String>,
        location: SourceLocation,
    ) -> Result<Option<Declared>, String> {
        if let Some((event, path)) = self.ws {
            if self.rest || self.permission.is_some() {
                return Err("WebSocket functions cannot carry %rest or %perm annotations".to_string());
            }
            return Ok(Some(Declared::Ws(WsFunction::new(
                name, params, location, event, path,
            ))));
        }

        let route = match (self.path, self.errors, self.permission) {
            (Some(path), None, None) => Route::Path(path),
            (None, Some(errors), None) => Route::Error(errors),
            (None, None, Some(check)) => Route::Permission(check),
            (None, None, None) if self.rest => {
                return Err("%rest:path or %rest:error annotation missing".to_string())
            }
            (None, None, None) => return Ok(None),
            _ => {
                return Err(
                    "%rest:path, %rest:error and %perm:check cannot be combined".to_string(),
                )
            }
        };

        Ok(Some(Declared::Http(
            HttpFunction::new(name, params, location, route)
                .with_methods(self.methods)
                .with_consumes(self.consumes)
                .with_produces(self.produces)
                .with_bindings(self.bindings),
        )))
    }
}

/// Replace `(: ... :)` comments, which may nest, by a single space each.
///
/// Line breaks inside comments are kept so line numbers stay right. An
/// unterminated comment runs to the end of the source.
fn blank_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut depth = 0usize;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('(', Some(':')) => {
                chars.next();
                depth += 1;
            }
            (':', Some(')')) if depth > 0 => {
                chars.next();
                depth -= 1;
                if depth == 0 {
                    out.push(' ');
                }
            }
            ('\n', _) => out.push('\n'),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Text of a parameter list up to its balancing `)`, given the text right
/// after the opening `(`.
fn parameter_list(rest: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(&rest[..i]),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// String literals of an annotation argument list, or `None` if anything
/// other than literals, commas and whitespace appears.
fn literals(args: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    let mut last = 0;
    for caps in LITERAL.captures_iter(args) {
        let whole = caps.get(0)?;
        if !args[last..whole.start()]
            .chars()
            .all(|c| c.is_whitespace() || c == ',')
        {
            return None;
        }
        last = whole.end();
        let value = match (caps.get(1), caps.get(2)) {
            (Some(d), _) => d.as_str().replace("\"\"", "\""),
            (_, Some(s)) => s.as_str().replace("''", "'"),
            _ => return None,
        };
        values.push(value);
    }
    args[last..]
        .chars()
        .all(|c| c.is_whitespace() || c == ',')
        .then_some(values)
}

fn media_types(values: &[String]) -> Result<Vec<MediaType>, String> {
    values
        .iter()
        .map(|v| v.parse::<MediaType>().map_err(|e| e.to_string()))
        .collect()
}

/// `{$name}` -> `name`
fn template_variable(raw: &str) -> Result<String, String> {
    raw.trim()
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .map(str::trim)
        .and_then(|r| r.strip_prefix('$'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("'{}' is not a variable template like {{$name}}", raw))
}
