//! Declarative endpoint descriptions.
//!
//! An [`EndpointConfig`] names a URL segment and, optionally, a method and
//! nested children. The plain-data fields deserialize from TOML or JSON using
//! the field names `url`, `method`, `expectdata`, `args`, `err`, `headers`,
//! `opts` and `children`. The function-valued fields (`transformer`,
//! `selector`, `catcher`, `middleware`) can only be attached in code; `args`
//! picks a built-in transformer for endpoints that have none.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::fetch::{Catcher, ErrorHandler, ResponseInfo, Selector};
use crate::request::{ArgPolicy, Middleware, RequestDescriptor, RequestOptions, Transformer};

/// Endpoint tree keyed by node name.
pub type EndpointConfigMap = BTreeMap<String, EndpointConfig>;

#[derive(Clone, Default, Deserialize)]
pub struct EndpointConfig {
    /// Segment appended to the parent's URL. May contain `{n}` placeholders.
    pub url: String,
    /// HTTP method; the node is callable only when this is set.
    #[serde(default)]
    pub method: Option<String>,
    /// Whether a success response carries a JSON body worth parsing.
    #[serde(default, rename = "expectdata")]
    pub expect_data: bool,
    /// Built-in transformer used when `transformer` is unset.
    #[serde(default)]
    pub args: ArgPolicy,
    #[serde(default)]
    pub err: Option<ErrorHandler>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub opts: Option<RequestOptions>,
    #[serde(default)]
    pub children: Option<EndpointConfigMap>,
    #[serde(skip)]
    pub transformer: Option<Transformer>,
    #[serde(skip)]
    pub selector: Option<Selector>,
    #[serde(skip)]
    pub catcher: Option<Catcher>,
    #[serde(skip)]
    pub middleware: Vec<Middleware>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn expect_data(mut self, expect_data: bool) -> Self {
        self.expect_data = expect_data;
        self
    }

    pub fn transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> RequestDescriptor + Send + Sync + 'static,
    {
        self.transformer = Some(Transformer::new(f));
        self
    }

    /// Attaches a transformer that can reject its arguments.
    pub fn try_transformer<F, E>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<RequestDescriptor, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.transformer = Some(Transformer::fallible(f));
        self
    }

    pub fn args(mut self, policy: ArgPolicy) -> Self {
        self.args = policy;
        self
    }

    pub fn selector<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResponseInfo, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.selector = Some(Selector::new(f));
        self
    }

    /// Uses the default error handler with `message` as its fallback text.
    pub fn err_message(mut self, message: impl Into<String>) -> Self {
        self.err = Some(ErrorHandler::Message(message.into()));
        self
    }

    pub fn err_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResponseInfo, Option<Value>) -> Value + Send + Sync + 'static,
    {
        self.err = Some(ErrorHandler::custom(f));
        self
    }

    pub fn catcher<F>(mut self, f: F) -> Self
    where
        F: Fn(&crate::fetch::FetchError) -> Value + Send + Sync + 'static,
    {
        self.catcher = Some(Catcher::new(f));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(BTreeMap::new).insert(name.into(), value.into());
        self
    }

    pub fn opts(mut self, opts: RequestOptions) -> Self {
        self.opts = Some(opts);
        self
    }

    pub fn child(mut self, name: impl Into<String>, child: EndpointConfig) -> Self {
        self.children.get_or_insert_with(BTreeMap::new).insert(name.into(), child);
        self
    }

    /// Appends an adapter. Adapters registered first run last.
    pub fn middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    {
        self.middleware.push(Middleware::new(f));
        self
    }

    pub fn is_callable(&self) -> bool {
        self.method.is_some()
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("expect_data", &self.expect_data)
            .field("args", &self.args)
            .field("err", &self.err)
            .field("headers", &self.headers)
            .field("opts", &self.opts)
            .field("children", &self.children)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
