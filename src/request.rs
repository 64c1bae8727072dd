//! Request facade consumed by function matching.
//!
//! [`RequestView`] carries exactly what dispatch needs from an inbound HTTP
//! request: method, decoded path segments, headers and query parameters.
//! Connection handling and bodies stay with the surrounding server.

use crate::function::ParamVec;
use crate::media::MediaType;
use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Maximum inline path segments before heap allocation
pub const MAX_INLINE_SEGMENTS: usize = 8;

/// Stack-allocated header storage (`name`, `value`); names are compared case-insensitively
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Percent-decoded, non-empty path segments
pub type Segments = SmallVec<[String; MAX_INLINE_SEGMENTS]>;

/// Split a request path into percent-decoded segments.
///
/// Empty segments (leading, trailing or doubled slashes) are dropped, so
/// `/a//b/` and `/a/b` are the same path. Segments that do not decode to
/// UTF-8 are kept verbatim.
#[must_use]
pub fn split_path(path: &str) -> Segments {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match urlencoding::decode(s) {
            Ok(Cow::Borrowed(b)) => b.to_string(),
            Ok(Cow::Owned(o)) => o,
            Err(_) => s.to_string(),
        })
        .collect()
}

/// The parts of an HTTP request that function matching looks at.
#[derive(Debug, Clone)]
pub struct RequestView {
    method: Method,
    path: String,
    segments: Segments,
    headers: HeaderVec,
    query_params: ParamVec,
}

impl RequestView {
    /// Create a view for `method` and `path`.
    ///
    /// A query string in `path` is split off and decoded into query parameters.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        Self {
            method,
            path: path.to_string(),
            segments: split_path(path),
            headers: HeaderVec::new(),
            query_params: query.map(parse_query).unwrap_or_default(),
        }
    }

    /// Build a view from an `http::Request`. Headers that are not valid
    /// visible ASCII are ignored.
    #[must_use]
    pub fn from_http<B>(req: &http::Request<B>) -> Self {
        let mut view = Self::new(req.method().clone(), req.uri().path());
        if let Some(query) = req.uri().query() {
            view.query_params = parse_query(query);
        }
        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                view.headers.push((Arc::from(name.as_str()), value.to_string()));
            }
        }
        view
    }

    /// Add a header (builder style).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name ("last write wins")
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Media types accepted by the client, in header order.
    ///
    /// A missing or entirely unparsable `Accept` header yields `*/*`.
    #[must_use]
    pub fn accepts(&self) -> Vec<MediaType> {
        let accepts = self
            .header("accept")
            .map(MediaType::parse_list)
            .unwrap_or_default();
        if accepts.is_empty() {
            vec![MediaType::any()]
        } else {
            accepts
        }
    }

    /// Media type of the request body, if declared and parsable.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        self.header("content-type").and_then(|ct| ct.parse().ok())
    }
}

fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(&*k), v.into_owned()))
        .collect()
}
