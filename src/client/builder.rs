use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::HeaderMap;
use reqwest_middleware::ClientWithMiddleware;

use crate::fetch::Fetch;
use crate::request::{Middleware, RequestDescriptor, RequestOptions};

use super::endpoint::EndpointConfigMap;
use super::error::ConfigError;
use super::node::{ClientNode, NodeMeta};

/// Builds an immutable [`ClientNode`] tree from an endpoint tree.
///
/// Each node's URL is its parent's URL followed by its own `url` segment.
/// Client-wide middleware runs outside every endpoint's own middleware, and a
/// parent's middleware wraps its children's.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    opts: RequestOptions,
    middleware: Vec<Middleware>,
    http: Option<ClientWithMiddleware>,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            opts: RequestOptions::default(),
            middleware: Vec::new(),
            http: None,
        }
    }

    /// Options every endpoint starts from before its own `opts` apply.
    pub fn options(mut self, opts: RequestOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    {
        self.middleware.push(Middleware::new(f));
        self
    }

    pub fn http_client(mut self, client: ClientWithMiddleware) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(&self, tree: &EndpointConfigMap) -> Result<ClientNode, ConfigError> {
        let client = match &self.http {
            Some(client) => client.clone(),
            None => build_http_client(None, None, HeaderMap::new())?,
        };
        let children = self.build_level(&self.base_url, tree, &self.middleware, &client)?;
        debug!(base_url = self.base_url.as_str(), nodes = children.len(); "Built API client");
        Ok(ClientNode {
            leaf: None,
            children,
            meta: NodeMeta::new(self.base_url.clone()),
        })
    }

    fn build_level(
        &self,
        base_url: &str,
        tree: &EndpointConfigMap,
        inherited: &[Middleware],
        client: &ClientWithMiddleware,
    ) -> Result<BTreeMap<String, ClientNode>, ConfigError> {
        tree.iter()
            .map(|(name, endpoint)| -> Result<(String, ClientNode), ConfigError> {
                let url = format!("{base_url}{}", endpoint.url);
                let chain: Vec<Middleware> = inherited.iter().chain(&endpoint.middleware).cloned().collect();

                let leaf = if endpoint.is_callable() {
                    let fetch = Fetch::from_endpoint(url.clone(), endpoint, &self.opts, &chain, client.clone())?;
                    debug!(name = name.as_str(), method:% = fetch.method(), url = url.as_str(); "Mounted endpoint");
                    Some(Arc::new(fetch))
                } else {
                    None
                };
                let children = match &endpoint.children {
                    Some(children) => self.build_level(&url, children, &chain, client)?,
                    None => BTreeMap::new(),
                };

                Ok((name.clone(), ClientNode {
                    leaf,
                    children,
                    meta: NodeMeta::new(url),
                }))
            })
            .collect()
    }
}

/// Builds a client tree with default transport settings.
pub fn make_api_client(
    base_url: impl Into<String>,
    base_opts: RequestOptions,
    tree: &EndpointConfigMap,
) -> Result<ClientNode, ConfigError> {
    ClientBuilder::new(base_url).options(base_opts).build(tree)
}

/// The HTTP client shared by every endpoint of a tree.
pub fn build_http_client(
    timeout: Option<Duration>,
    user_agent: Option<&str>,
    default_headers: HeaderMap,
) -> Result<ClientWithMiddleware, ConfigError> {
    let mut builder = reqwest::Client::builder().default_headers(default_headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }
    let inner_client = builder.build()?;
    Ok(reqwest_middleware::ClientBuilder::new(inner_client).build())
}
