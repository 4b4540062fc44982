pub mod binder;
pub mod cli;
pub mod client;
pub mod config;
pub mod fetch;
pub mod log;
pub mod request;
pub mod template;

pub use crate::binder::{ApiCall, ApiContext, CallState, Resource};
pub use crate::client::{ClientBuilder, ClientNode, EndpointConfig, EndpointConfigMap, make_api_client};
pub use crate::fetch::{Fetch, Outcome};
pub use crate::request::{ArgPolicy, RequestDescriptor, RequestOptions, Transformer};
pub use crate::template::format_url;
