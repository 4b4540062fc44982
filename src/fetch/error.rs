//! Error types for the transport side of an endpoint call.
//!
//! [`FetchError`] covers everything that can go wrong before a response is
//! classified: transforming the arguments, building the URL, encoding the body, sending the request and
//! decoding a success body. These never escape an endpoint call; they are
//! handed to the endpoint's catcher and reported with status `-1`.

use thiserror::Error;

/// Failures that prevent an endpoint call from producing a classifiable
/// response.
///
/// # Example
///
/// ```rust
/// use apitree::fetch::FetchError;
///
/// fn describe(err: &FetchError) -> String {
///     match err {
///         FetchError::UrlError(e) => format!("bad url: {e}"),
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    ///
    /// Connection refused, DNS failure, timeouts and TLS errors land here,
    /// as does a success body that is not valid JSON.
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The HTTP middleware stack rejected or failed the request.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// The formatted endpoint URL is not an absolute URL.
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// A descriptor header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The endpoint's transformer rejected the call arguments.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// The JSON body could not be serialized.
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}
