use std::fmt;
use std::time::Instant;

use log::{debug, trace, warn};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::{Url, form_urlencoded};

use crate::client::{ConfigError, EndpointConfig};
use crate::log::describe_headers;
use crate::request::{Middleware, RequestBody, RequestDescriptor, RequestOptions, Transformer};
use crate::template::{append_query, format_url_args};

use super::error::FetchError;
use super::handlers::{Catcher, ErrorHandler, ResponseInfo, Selector};
use super::outcome::{Outcome, StatusClass, classify};

const JSON_MIME: &str = "application/json";
const FORM_MIME: &str = "application/x-www-form-urlencoded";

/// A fully resolved request, ready to hand to the HTTP client.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub opts: RequestOptions,
}

/// Executor for a single endpoint.
///
/// Built once from an [`EndpointConfig`] whose URL has been resolved against
/// its ancestors. Every call transforms its arguments, sends the request and
/// folds the result into an [`Outcome`]; calls never fail.
pub struct Fetch {
    url: String,
    method: Method,
    transformer: Transformer,
    expect_data: bool,
    selector: Selector,
    on_error: ErrorHandler,
    catcher: Catcher,
    headers: HeaderMap,
    opts: RequestOptions,
    client: ClientWithMiddleware,
}

impl Fetch {
    /// Builds the executor for `endpoint` mounted at `url`.
    ///
    /// `middleware` is the complete adapter chain for this endpoint, inherited
    /// adapters first. `base_opts` are merged under the endpoint's own `opts`.
    pub fn from_endpoint(
        url: impl Into<String>,
        endpoint: &EndpointConfig,
        base_opts: &RequestOptions,
        middleware: &[Middleware],
        client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        let method_name = endpoint
            .method
            .as_deref()
            .ok_or_else(|| ConfigError::NotCallable(url.clone()))?;
        let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes()).map_err(|_| {
            ConfigError::InvalidMethod {
                method: method_name.to_string(),
                url: url.clone(),
            }
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in endpoint.headers.iter().flatten() {
            let (name, value) = parse_header(name, value).ok_or_else(|| ConfigError::InvalidHeader {
                name: name.clone(),
                url: url.clone(),
            })?;
            headers.insert(name, value);
        }

        let opts = match &endpoint.opts {
            Some(opts) => base_opts.merge(opts),
            None => base_opts.clone(),
        };

        Ok(Self {
            transformer: endpoint
                .transformer
                .clone()
                .unwrap_or_else(|| endpoint.args.transformer())
                .with_middleware(middleware),
            expect_data: endpoint.expect_data,
            selector: endpoint.selector.clone().unwrap_or_default(),
            on_error: endpoint.err.clone().unwrap_or_default(),
            catcher: endpoint.catcher.clone().unwrap_or_default(),
            url,
            method,
            headers,
            opts,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn expects_data(&self) -> bool {
        self.expect_data
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn options(&self) -> &RequestOptions {
        &self.opts
    }

    /// Runs the endpoint's transformer and middleware over `args`.
    pub fn transform(&self, args: &[Value]) -> Result<RequestDescriptor, FetchError> {
        self.transformer.apply(args)
    }

    /// Calls the endpoint without a cancellation token.
    pub async fn call(&self, args: &[Value]) -> Outcome {
        self.call_with(&CancellationToken::new(), args).await
    }

    /// Calls the endpoint, giving up with [`Outcome::Cancelled`] as soon as
    /// `cancel` fires.
    pub async fn call_with(&self, cancel: &CancellationToken, args: &[Value]) -> Outcome {
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        match self.transform(args) {
            Ok(descriptor) => self.send(cancel, descriptor).await,
            Err(err) => self.transport_error(err),
        }
    }

    /// Sends an already-built descriptor, bypassing the transformer.
    pub async fn send(&self, cancel: &CancellationToken, descriptor: RequestDescriptor) -> Outcome {
        let prepared = match self.prepare(descriptor) {
            Ok(prepared) => prepared,
            Err(err) => return self.transport_error(err),
        };

        let start = Instant::now();
        let target = prepared.url.clone();
        debug!(method:% = prepared.method, url:% = target; "Sending request");
        trace!(headers:% = describe_headers(&prepared.headers); "Request headers");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url:% = target; "Request cancelled in flight");
                return Outcome::Cancelled;
            },
            response = self.dispatch(prepared) => response,
        };
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let response = match response {
            Ok(response) => response,
            Err(err) => return self.transport_error(err),
        };
        let info = ResponseInfo::from(&response);
        debug!(
            status = info.status,
            url:% = target,
            elapsed_ms = start.elapsed().as_millis() as u64;
            "Received response"
        );

        match classify(info.status) {
            StatusClass::ApiError => {
                let body = match read_json(cancel, response).await {
                    BodyRead::Parsed(body) => Some(body),
                    BodyRead::Failed(err) => {
                        trace!(status = info.status, error:% = err; "Error body is not JSON");
                        None
                    },
                    BodyRead::Cancelled => return Outcome::Cancelled,
                };
                warn!(status = info.status, url:% = target; "Endpoint returned an error status");
                let err = self.on_error.handle(&info, body);
                Outcome::ApiError {
                    status: info.status,
                    err,
                }
            },
            StatusClass::Success if !self.expect_data => Outcome::Success {
                status: info.status,
                data: self.selector.select(&info, None),
            },
            StatusClass::Success => match read_json(cancel, response).await {
                BodyRead::Parsed(data) => Outcome::Success {
                    status: info.status,
                    data: self.selector.select(&info, Some(data)),
                },
                BodyRead::Failed(err) => self.transport_error(err.into()),
                BodyRead::Cancelled => Outcome::Cancelled,
            },
        }
    }

    /// Resolves a descriptor into method, URL, headers, body and options.
    ///
    /// Header precedence, lowest first: the body's content type, the
    /// endpoint's headers, the descriptor's headers.
    pub fn prepare(&self, descriptor: RequestDescriptor) -> Result<PreparedRequest, FetchError> {
        let RequestDescriptor {
            params,
            query,
            body,
            headers: call_headers,
            opts,
        } = descriptor;

        let mut headers = HeaderMap::new();
        let body = match body {
            Some(RequestBody::Json(value)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
                Some(serde_json::to_vec(&value)?)
            },
            Some(RequestBody::Form(fields)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_MIME));
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                Some(encoded.into_bytes())
            },
            Some(RequestBody::Raw(bytes)) => Some(bytes),
            None => None,
        };

        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        for (name, value) in call_headers.iter().flatten() {
            let (name, value) = parse_header(name, value).ok_or_else(|| FetchError::InvalidHeader(name.clone()))?;
            headers.insert(name, value);
        }

        let path = match &params {
            Some(params) => format_url_args(&self.url, params),
            None => self.url.clone(),
        };
        let mut url = Url::parse(&path)?;
        if let Some(query) = &query {
            append_query(&mut url, query);
        }

        let opts = match &opts {
            Some(opts) => self.opts.merge(opts),
            None => self.opts.clone(),
        };

        Ok(PreparedRequest {
            method: self.method.clone(),
            url,
            headers,
            body,
            opts,
        })
    }

    async fn dispatch(&self, prepared: PreparedRequest) -> Result<reqwest::Response, FetchError> {
        let PreparedRequest {
            method,
            url,
            headers,
            body,
            opts,
        } = prepared;

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        if let Some(timeout) = opts.timeout() {
            request = request.timeout(timeout);
        }
        if let Some(token) = &opts.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(auth) = &opts.basic_auth {
            request = request.basic_auth(&auth.username, auth.password.as_ref());
        }

        request.send().await.map_err(|err| match err {
            reqwest_middleware::Error::Reqwest(err) => FetchError::RequestFailed(err),
            other => FetchError::MiddlewareError(other),
        })
    }

    fn transport_error(&self, err: FetchError) -> Outcome {
        warn!(method:% = self.method, url = self.url.as_str(), error:% = err; "Transport error");
        Outcome::TransportError {
            err: self.catcher.catch(&err),
        }
    }
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetch")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("expect_data", &self.expect_data)
            .finish_non_exhaustive()
    }
}

enum BodyRead {
    Parsed(Value),
    Failed(reqwest::Error),
    Cancelled,
}

async fn read_json(cancel: &CancellationToken, response: reqwest::Response) -> BodyRead {
    let parsed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return BodyRead::Cancelled,
        parsed = response.json::<Value>() => parsed,
    };
    if cancel.is_cancelled() {
        return BodyRead::Cancelled;
    }
    match parsed {
        Ok(value) => BodyRead::Parsed(value),
        Err(err) => BodyRead::Failed(err),
    }
}

fn parse_header(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
    let value = HeaderValue::from_str(value).ok()?;
    Some((name, value))
}
