use std::sync::Arc;

use serde_json::Value;

use crate::client::{ClientNode, ConfigError};
use crate::fetch::Fetch;

/// Shared handle on the application's client tree.
///
/// Constructed once at startup and cloned into whatever needs to call
/// endpoints. The tree behind it never changes.
#[derive(Debug, Clone)]
pub struct ApiContext {
    client: Arc<ClientNode>,
}

/// How a binder picks its endpoint out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Dotted path to a callable node, e.g. `users.by_id`.
    Path(String),
    /// Selects nothing; binders built on it never call out.
    Null,
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Route::Path(path.to_string())
    }
}

impl From<String> for Route {
    fn from(path: String) -> Self {
        Route::Path(path)
    }
}

impl ApiContext {
    pub fn new(client: ClientNode) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &ClientNode {
        &self.client
    }

    /// Runs `selector` against the root of the tree.
    pub fn select<'a, F>(&'a self, selector: F) -> Option<&'a ClientNode>
    where
        F: FnOnce(&'a ClientNode) -> Option<&'a ClientNode>,
    {
        selector(&self.client)
    }

    /// Resolves `route` to its executor. [`Route::Null`] resolves to `None`.
    pub fn endpoint(&self, route: &Route) -> Result<Option<Arc<Fetch>>, ConfigError> {
        match route {
            Route::Path(path) => self.client.require(path).map(|fetch| Some(Arc::clone(fetch))),
            Route::Null => Ok(None),
        }
    }

    /// The node's URL formatted with `args`, without calling it.
    pub fn url(&self, path: &str, args: &[Value]) -> Result<String, ConfigError> {
        self.client
            .at(path)
            .map(|node| node.format_url(args))
            .ok_or_else(|| ConfigError::UnknownEndpoint(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::{EndpointConfig, EndpointConfigMap, make_api_client};
    use crate::request::RequestOptions;

    fn context() -> ApiContext {
        let mut tree = EndpointConfigMap::new();
        tree.insert(
            "users".into(),
            EndpointConfig::new("/users").child("by_id", EndpointConfig::new("/{0}").method("GET")),
        );
        ApiContext::new(make_api_client("http://localhost:9000", RequestOptions::default(), &tree).unwrap())
    }

    #[test]
    fn test_select_walks_from_the_root() {
        let ctx = context();
        let node = ctx.select(|api| api.get("users")?.get("by_id")).unwrap();
        assert_eq!(node.url(), "http://localhost:9000/users/{0}");
    }

    #[test]
    fn test_url_formats_without_calling() {
        let ctx = context();
        assert_eq!(ctx.url("users.by_id", &[json!(5)]).unwrap(), "http://localhost:9000/users/5");
        assert_eq!(ctx.url("users", &[]).unwrap(), "http://localhost:9000/users");
        assert!(ctx.url("nope", &[]).is_err());
    }

    #[test]
    fn test_null_route_resolves_to_nothing() {
        let ctx = context();
        assert!(ctx.endpoint(&Route::Null).unwrap().is_none());
        assert!(ctx.endpoint(&Route::from("users.by_id")).unwrap().is_some());
        assert!(matches!(ctx.endpoint(&Route::from("users")), Err(ConfigError::NotCallable(_))));
    }
}
