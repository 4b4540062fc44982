use thiserror::Error;

/// Errors raised while building a client tree or resolving a node in it.
///
/// Unlike [`FetchError`](crate::fetch::FetchError) these surface to the
/// caller: a tree that fails to build is a configuration mistake.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid HTTP method '{method}' for endpoint {url}")]
    InvalidMethod { method: String, url: String },

    #[error("Invalid header '{name}' for endpoint {url}")]
    InvalidHeader { name: String, url: String },

    #[error("Could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// The node exists but has no method, so it only groups children.
    #[error("Endpoint is not callable: {0}")]
    NotCallable(String),
}
