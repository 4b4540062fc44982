//! Per-endpoint hooks that shape the value surfaced to callers.
//!
//! - [`Selector`] maps a success response onto the returned data.
//! - [`ErrorHandler`] maps a non-2xx response onto the returned error.
//! - [`Catcher`] maps a [`FetchError`] onto the returned error.

use std::fmt;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::error::FetchError;

/// Message used by the default error handler when none is configured.
pub const DEFAULT_ERROR_MESSAGE: &str = "Request error";

/// What hooks get to see of a received response.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: u16,
    pub url: Url,
    pub headers: HeaderMap,
}

impl From<&reqwest::Response> for ResponseInfo {
    fn from(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            url: response.url().clone(),
            headers: response.headers().clone(),
        }
    }
}

/// JavaScript truthiness for JSON values.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

type SelectFn = dyn Fn(&ResponseInfo, Option<Value>) -> Option<Value> + Send + Sync;
type HandleFn = dyn Fn(&ResponseInfo, Option<Value>) -> Value + Send + Sync;
type CatchFn = dyn Fn(&FetchError) -> Value + Send + Sync;

/// Success selector.
///
/// Receives `None` for data when the endpoint does not expect a body.
#[derive(Clone)]
pub struct Selector(Arc<SelectFn>);

impl Selector {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ResponseInfo, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn select(&self, info: &ResponseInfo, data: Option<Value>) -> Option<Value> {
        (self.0)(info, data)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Selector::new(default_selector)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Selector(..)")
    }
}

/// Returns the parsed data when it is truthy.
pub fn default_selector(_info: &ResponseInfo, data: Option<Value>) -> Option<Value> {
    data.filter(is_truthy)
}

/// Error handler for non-2xx responses.
///
/// Deserializes from a plain string, which becomes the default message.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub enum ErrorHandler {
    /// Default handler: the parsed error body if there is one, otherwise
    /// `{"message": <text>}`.
    Message(String),
    Custom(Arc<HandleFn>),
}

impl ErrorHandler {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&ResponseInfo, Option<Value>) -> Value + Send + Sync + 'static,
    {
        ErrorHandler::Custom(Arc::new(f))
    }

    pub fn handle(&self, info: &ResponseInfo, body: Option<Value>) -> Value {
        match self {
            ErrorHandler::Message(message) => match body {
                Some(body) if !body.is_null() => body,
                _ => json!({ "message": message }),
            },
            ErrorHandler::Custom(f) => f(info, body),
        }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        ErrorHandler::Message(DEFAULT_ERROR_MESSAGE.to_string())
    }
}

impl From<String> for ErrorHandler {
    fn from(message: String) -> Self {
        ErrorHandler::Message(message)
    }
}

impl From<&str> for ErrorHandler {
    fn from(message: &str) -> Self {
        ErrorHandler::Message(message.to_string())
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandler::Message(message) => f.debug_tuple("Message").field(message).finish(),
            ErrorHandler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Maps a transport failure to the error value returned to callers.
#[derive(Clone)]
pub struct Catcher(Arc<CatchFn>);

impl Catcher {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FetchError) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn catch(&self, err: &FetchError) -> Value {
        (self.0)(err)
    }
}

impl Default for Catcher {
    fn default() -> Self {
        Catcher::new(default_catcher)
    }
}

impl fmt::Debug for Catcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Catcher(..)")
    }
}

/// The error's message text.
pub fn default_catcher(err: &FetchError) -> Value {
    Value::String(err.to_string())
}
