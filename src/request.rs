//! Request descriptors and the transformers that produce them.
//!
//! A [`RequestDescriptor`] holds the variable parts of one call: positional
//! URL params, query, body, headers and per-request options. Every endpoint
//! owns a [`Transformer`] that maps raw call arguments onto a descriptor, and
//! an ordered list of [`Middleware`] adapters that rewrite the descriptor
//! afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetch::{FetchError, is_truthy};

/// Body of a request.
///
/// `Json` is serialized and tagged `application/json`. `Form` and `Raw`
/// carry their own encoding and never receive the JSON content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// URL-encoded form fields, sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Bytes sent exactly as given, without a content type.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Per-request transport options.
///
/// Options merge field by field: client-wide options are overridden by an
/// endpoint's `opts`, which are overridden by the descriptor's `opts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Returns `self` with every field set in `over` replaced.
    pub fn merge(&self, over: &RequestOptions) -> RequestOptions {
        RequestOptions {
            timeout_ms: over.timeout_ms.or(self.timeout_ms),
            bearer_token: over.bearer_token.clone().or_else(|| self.bearer_token.clone()),
            basic_auth: over.basic_auth.clone().or_else(|| self.basic_auth.clone()),
        }
    }
}

/// Canonical shape of a single call's variable parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    /// Positional substitutions for the endpoint's URL template.
    pub params: Option<Vec<Value>>,
    /// Query pairs; a `BTreeMap` so serialization is always key-ordered.
    pub query: Option<BTreeMap<String, String>>,
    pub body: Option<RequestBody>,
    pub headers: Option<BTreeMap<String, String>>,
    pub opts: Option<RequestOptions>,
}

impl RequestDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    /// Sets a JSON body. Falsy values (`null`, `false`, `0`, `""`) count as
    /// no body at all.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = is_truthy(&body).then_some(RequestBody::Json(body));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(BTreeMap::new).insert(name.into(), value.into());
        self
    }

    pub fn with_opts(mut self, opts: RequestOptions) -> Self {
        self.opts = Some(opts);
        self
    }
}

type TransformFn = dyn Fn(&[Value]) -> Result<RequestDescriptor, FetchError> + Send + Sync;
type AdaptFn = dyn Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync;

/// Maps raw call arguments onto a [`RequestDescriptor`].
///
/// A transformer may reject its arguments; the call then settles as a
/// transport error carrying [`FetchError::TransformError`].
#[derive(Clone)]
pub struct Transformer(Arc<TransformFn>);

impl Transformer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> RequestDescriptor + Send + Sync + 'static,
    {
        Self(Arc::new(move |args: &[Value]| Ok::<_, FetchError>(f(args))))
    }

    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<RequestDescriptor, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self(Arc::new(move |args: &[Value]| {
            f(args).map_err(|err| FetchError::TransformError(err.to_string()))
        }))
    }

    pub fn apply(&self, args: &[Value]) -> Result<RequestDescriptor, FetchError> {
        (self.0)(args)
    }

    /// Wraps `self` in `middleware` the way a right-to-left reduce would:
    /// the last adapter sees the base descriptor first and the first adapter
    /// has the final word.
    pub fn with_middleware(self, middleware: &[Middleware]) -> Transformer {
        if middleware.is_empty() {
            return self;
        }
        let chain: Vec<Middleware> = middleware.to_vec();
        Self(Arc::new(move |args: &[Value]| -> Result<RequestDescriptor, FetchError> {
            let base = self.apply(args)?;
            Ok(chain.iter().rev().fold(base, |descriptor, adapter| adapter.apply(descriptor)))
        }))
    }
}

impl Default for Transformer {
    fn default() -> Self {
        ArgPolicy::default().transformer()
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer(..)")
    }
}

/// Descriptor-to-descriptor adapter applied after an endpoint's transformer.
#[derive(Clone)]
pub struct Middleware(Arc<AdaptFn>);

impl Middleware {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, descriptor: RequestDescriptor) -> RequestDescriptor {
        (self.0)(descriptor)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware(..)")
    }
}

/// Built-in transformer for endpoints without one of their own, selected in
/// config with `args = "default"` or `args = "params"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgPolicy {
    /// See [`default_transformer`].
    #[default]
    Default,
    /// Every argument fills a URL placeholder and nothing is sent as a body.
    Params,
}

impl ArgPolicy {
    pub fn transformer(self) -> Transformer {
        match self {
            ArgPolicy::Default => Transformer::new(default_transformer),
            ArgPolicy::Params => Transformer::new(params_transformer),
        }
    }
}

/// Argument policy used when an endpoint has no transformer of its own.
///
/// - no arguments: empty descriptor
/// - one argument: the body
/// - more: every argument but the last is a URL param, the last is the body
pub fn default_transformer(args: &[Value]) -> RequestDescriptor {
    match args {
        [] => RequestDescriptor::new(),
        [body] => RequestDescriptor::new().with_json(body.clone()),
        [params @ .., body] => RequestDescriptor::new()
            .with_params(params.to_vec())
            .with_json(body.clone()),
    }
}

pub fn params_transformer(args: &[Value]) -> RequestDescriptor {
    match args {
        [] => RequestDescriptor::new(),
        params => RequestDescriptor::new().with_params(params.to_vec()),
    }
}
