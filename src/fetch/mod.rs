//! Request execution for individual endpoints.
//!
//! Every callable node of a client tree owns a [`Fetch`]. A call runs the
//! endpoint's transformer and middleware, formats the URL, sends the request
//! and normalizes whatever happens into an [`Outcome`]. Calls never return an
//! error: failures are folded into the outcome so callers branch on a single
//! value.
//!
//! # Architecture
//!
//! - [`Fetch`] - executor built from an endpoint description
//! - [`Outcome`] - `data`, `status` and `err` for one call, or `Cancelled`
//! - [`Selector`], [`ErrorHandler`] and [`Catcher`] - per-endpoint hooks that
//!   shape the reported data and errors
//! - [`FetchError`] - transport failures handed to the catcher
//!
//! # Status classification
//!
//! | Response | Outcome | status |
//! |---|---|---|
//! | `200..=299` | [`Outcome::Success`] | HTTP status |
//! | any other status | [`Outcome::ApiError`] | HTTP status |
//! | rejected arguments, no response, bad URL, bad success body | [`Outcome::TransportError`] | `-1` |
//! | token cancelled | [`Outcome::Cancelled`] | `-1` |
//!
//! # Example
//!
//! ```rust,no_run
//! use apitree::client::{EndpointConfig, EndpointConfigMap, make_api_client};
//! use apitree::request::{ArgPolicy, RequestOptions};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), anyhow::Error> {
//! let tree: EndpointConfigMap = [("item".to_string(), EndpointConfig::new("/items/{0}").method("get").args(ArgPolicy::Params))].into();
//! let api = make_api_client("https://api.example.com", RequestOptions::default(), &tree)?;
//!
//! let (data, status, err) = api.require("item")?.call(&[json!(42)]).await.into_parts();
//! println!("{status}: {data:?} {err:?}");
//! # Ok(())
//! # }
//! ```

mod error;
mod executor;
mod handlers;
mod outcome;

pub use error::FetchError;
pub use executor::{Fetch, PreparedRequest};
pub use handlers::{
    Catcher, DEFAULT_ERROR_MESSAGE, ErrorHandler, ResponseInfo, Selector, default_catcher, default_selector, is_truthy,
};
pub use outcome::{Outcome, StatusClass, TRANSPORT_STATUS, classify};
