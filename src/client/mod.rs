//! Client trees built from declarative endpoint descriptions.
//!
//! [`ClientBuilder`] walks an [`EndpointConfigMap`] and produces a
//! [`ClientNode`] tree with the same shape. A node whose description has a
//! `method` carries a [`Fetch`](crate::fetch::Fetch) executor; a node with
//! `children` carries sub-nodes; a node may have both. Every node knows its
//! fully resolved URL, the concatenation of every ancestor's segment.
//!
//! # Example
//!
//! ```rust
//! use apitree::client::{ClientBuilder, EndpointConfig, EndpointConfigMap};
//!
//! # fn example() -> Result<(), apitree::client::ConfigError> {
//! let mut tree = EndpointConfigMap::new();
//! tree.insert(
//!     "users".into(),
//!     EndpointConfig::new("/users")
//!         .method("GET")
//!         .child("by_id", EndpointConfig::new("/{0}").method("GET")),
//! );
//!
//! let api = ClientBuilder::new("https://api.example.com").build(&tree)?;
//! let by_id = api.at("users.by_id").expect("mounted");
//! assert_eq!(by_id.url(), "https://api.example.com/users/{0}");
//! assert_eq!(by_id.format_url(&["7".into()]), "https://api.example.com/users/7");
//! # Ok(())
//! # }
//! ```

mod builder;
mod endpoint;
mod error;
mod node;

pub use builder::{ClientBuilder, build_http_client, make_api_client};
pub use endpoint::{EndpointConfig, EndpointConfigMap};
pub use error::ConfigError;
pub use node::{ClientNode, NodeMeta};

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::request::{RequestDescriptor, RequestOptions};

    fn sample_tree() -> EndpointConfigMap {
        let mut tree = EndpointConfigMap::new();
        tree.insert(
            "users".into(),
            EndpointConfig::new("/users")
                .method("GET")
                .expect_data(true)
                .child(
                    "by_id",
                    EndpointConfig::new("/{0}")
                        .method("GET")
                        .expect_data(true)
                        .child("posts", EndpointConfig::new("/posts").method("GET")),
                ),
        );
        tree.insert(
            "admin".into(),
            EndpointConfig::new("/admin").child("stats", EndpointConfig::new("/stats").method("GET")),
        );
        tree
    }

    #[test]
    fn test_urls_concatenate_ancestor_segments() {
        let api = make_api_client("http://localhost:8080", RequestOptions::default(), &sample_tree()).unwrap();

        assert_eq!(api.url(), "http://localhost:8080");
        assert_eq!(api.at("users").unwrap().url(), "http://localhost:8080/users");
        assert_eq!(api.at("users.by_id.posts").unwrap().url(), "http://localhost:8080/users/{0}/posts");
        assert_eq!(api.at("admin.stats").unwrap().url(), "http://localhost:8080/admin/stats");
        assert_eq!(
            api.at("users.by_id.posts").unwrap().format_url(&[json!(7)]),
            "http://localhost:8080/users/7/posts"
        );
    }

    #[test]
    fn test_tree_mirrors_configuration() {
        let api = make_api_client("http://localhost", RequestOptions::default(), &sample_tree()).unwrap();

        let users = api.get("users").unwrap();
        assert!(users.is_callable());
        assert_eq!(users.children().count(), 1);

        let admin = api.get("admin").unwrap();
        assert!(!admin.is_callable());
        assert!(matches!(api.require("admin"), Err(ConfigError::NotCallable(_))));
        assert!(matches!(api.require("nope.none"), Err(ConfigError::UnknownEndpoint(_))));

        let paths: Vec<String> = api.walk().into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, ["admin", "admin.stats", "users", "users.by_id", "users.by_id.posts"]);
    }

    #[test]
    fn test_invalid_header_fails_the_build() {
        let mut tree = EndpointConfigMap::new();
        tree.insert("bad".into(), EndpointConfig::new("/bad").method("GET").header("bad header", "x"));

        let err = make_api_client("http://localhost", RequestOptions::default(), &tree).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { .. }));
    }

    #[tokio::test]
    async fn test_client_middleware_wraps_endpoint_middleware() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1/posts"))
            .and(header("x-trail", "endpoint>parent>client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        fn trail(tag: &'static str) -> impl Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync {
            move |d: RequestDescriptor| {
                let trail = d.headers.as_ref().and_then(|h| h.get("x-trail")).cloned();
                let next = match trail {
                    Some(trail) => format!("{trail}>{tag}"),
                    None => tag.to_string(),
                };
                d.with_header("x-trail", next)
            }
        }

        let mut tree = EndpointConfigMap::new();
        tree.insert(
            "users".into(),
            EndpointConfig::new("/users").middleware(trail("parent")).child(
                "posts",
                EndpointConfig::new("/{0}/posts")
                    .method("GET")
                    .expect_data(true)
                    .transformer(|args| RequestDescriptor::new().with_params(args.to_vec()))
                    .middleware(trail("endpoint")),
            ),
        );

        let api = ClientBuilder::new(mock_server.uri())
            .middleware(trail("client"))
            .build(&tree)
            .unwrap();
        let outcome = api.require("users.posts").unwrap().call(&[json!(1)]).await;

        assert_eq!(outcome.into_parts(), (Some(json!([{"id": 1}])), 200, None));
    }

    #[tokio::test]
    async fn test_base_options_apply_to_every_endpoint() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer base-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&mock_server)
            .await;

        let api = make_api_client(
            mock_server.uri(),
            RequestOptions::default().with_bearer_token("base-token"),
            &sample_tree(),
        )
        .unwrap();

        assert_eq!(api.require("users").unwrap().call(&[]).await.status(), 200);
        assert_eq!(api.require("admin.stats").unwrap().call(&[]).await.status(), 200);
    }
}
