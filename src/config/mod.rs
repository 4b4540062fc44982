//! Application configuration: client settings plus the endpoint tree.

mod loader;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::client::{ClientBuilder, EndpointConfigMap, build_http_client};
use crate::request::RequestOptions;

pub use loader::{get_default_config, load_configuration, load_endpoints_json, write_config_to};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub endpoints: EndpointConfigMap,
}

/// Transport settings shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Sent with every request, below endpoint and call headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub opts: RequestOptions,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            user_agent: None,
            headers: BTreeMap::new(),
            opts: RequestOptions::default(),
        }
    }
}

impl ClientSettings {
    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name in [client.headers]: {name}"))?;
            let header_value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {name}"))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    pub fn http_client(&self) -> Result<ClientWithMiddleware> {
        let client = build_http_client(
            self.timeout_secs.map(Duration::from_secs),
            self.user_agent.as_deref(),
            self.default_headers()?,
        )?;
        Ok(client)
    }
}

impl AppConfig {
    /// A builder preloaded with these client settings.
    pub fn client_builder(&self) -> Result<ClientBuilder> {
        Ok(ClientBuilder::new(self.client.base_url.clone())
            .options(self.client.opts.clone())
            .http_client(self.client.http_client()?))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn config_path(dir: &TempDir) -> PathBuf {
        dir.path().join("nested").join("apitree.toml")
    }

    #[test]
    #[serial]
    fn test_missing_file_is_created_from_default() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);

        let config = load_configuration(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.client.base_url, "https://jsonplaceholder.typicode.com");
        assert_eq!(config.client.timeout_secs, Some(30));
        assert_eq!(config.client.headers["accept"], "application/json");
        let posts = &config.endpoints["posts"];
        assert!(posts.expect_data);
        let children = posts.children.as_ref().unwrap();
        assert_eq!(children["by_id"].url, "/{0}");
        assert!(children["by_id"].children.as_ref().unwrap().contains_key("comments"));
        assert!(!config.endpoints["users"].is_callable());
        assert!(config.endpoints["users"].children.as_ref().unwrap().contains_key("byId"));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        write_config_to(&path, "[client]\nbase_url = \"http://file\"\ntimeout_secs = 3\n").unwrap();

        unsafe { std::env::set_var("APITREE_CLIENT__BASE_URL", "http://env") };
        let config = load_configuration(&path);
        unsafe { std::env::remove_var("APITREE_CLIENT__BASE_URL") };

        let config = config.unwrap();
        assert_eq!(config.client.base_url, "http://env");
        assert_eq!(config.client.timeout_secs, Some(3));
        assert!(config.endpoints.is_empty());
    }

    #[test]
    #[serial]
    fn test_default_config_builds_a_client() {
        let dir = TempDir::new().unwrap();
        let config = load_configuration(&config_path(&dir)).unwrap();

        let api = config.client_builder().unwrap().build(&config.endpoints).unwrap();
        assert_eq!(
            api.at("posts.by_id.comments").unwrap().url(),
            "https://jsonplaceholder.typicode.com/posts/{0}/comments"
        );
        assert!(api.require("posts.create").is_ok());
        assert_eq!(
            api.require("users.byId").unwrap().url(),
            "https://jsonplaceholder.typicode.com/users/{0}"
        );
    }

    #[test]
    #[serial]
    fn test_endpoint_names_keep_their_case() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        write_config_to(
            &path,
            "[client]\nbase_url = \"http://file\"\n\n\
             [endpoints.userAccounts]\nurl = \"/accounts\"\n\n\
             [endpoints.userAccounts.children.byId]\nurl = \"/{0}\"\nmethod = \"GET\"\nargs = \"params\"\n",
        )
        .unwrap();

        unsafe { std::env::set_var("APITREE_CLIENT__BASE_URL", "http://env") };
        let config = load_configuration(&path);
        unsafe { std::env::remove_var("APITREE_CLIENT__BASE_URL") };

        let config = config.unwrap();
        assert_eq!(config.client.base_url, "http://env");
        let accounts = &config.endpoints["userAccounts"];
        let children: Vec<&str> = accounts.children.as_ref().unwrap().keys().map(String::as_str).collect();
        assert_eq!(children, ["byId"]);

        let api = config.client_builder().unwrap().build(&config.endpoints).unwrap();
        assert_eq!(api.require("userAccounts.byId").unwrap().url(), "http://env/accounts/{0}");
    }

    #[test]
    fn test_invalid_client_header_is_reported() {
        let settings = ClientSettings {
            headers: [("bad header".to_string(), "x".to_string())].into(),
            ..Default::default()
        };
        assert!(settings.http_client().is_err());
    }

    #[test]
    fn test_endpoint_tree_from_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("endpoints.json");
        std::fs::write(
            &path,
            r#"{"todos": {"url": "/todos", "method": "get", "expectdata": true,
                "children": {"done": {"url": "/done", "method": "get"}}}}"#,
        )
        .unwrap();

        let tree = load_endpoints_json(&path).unwrap();
        assert_eq!(tree["todos"].method.as_deref(), Some("get"));
        assert!(tree["todos"].children.as_ref().unwrap().contains_key("done"));
    }
}
