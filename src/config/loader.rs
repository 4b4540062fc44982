use std::{fs, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use config::{Config, Environment};
use log::info;
use serde::Deserialize;

use crate::client::EndpointConfigMap;

use super::{AppConfig, ClientSettings};

pub fn get_default_config() -> &'static str {
    include_str!("../../config/apitree.toml")
}

#[derive(Deserialize)]
struct ClientSection {
    #[serde(default)]
    client: ClientSettings,
}

// Endpoint names are tree keys and keep their case, which `Config` does not.
#[derive(Deserialize)]
struct EndpointSection {
    #[serde(default)]
    endpoints: EndpointConfigMap,
}

/// Loads `path`, creating it from the embedded default when missing.
///
/// `APITREE_`-prefixed environment variables override `[client]` values, with
/// `__` separating nested keys: `APITREE_CLIENT__BASE_URL`. The `[endpoints]`
/// tree is read from the file as written.
pub fn load_configuration(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let sources = get_default_config();
        write_config_to(path, sources).context("Could not create default config")?;
        info!(path:% = path.display(); "Created new configuration file");
    }

    let filename = path.to_str().context("Invalid config file path")?;

    let cfg = Config::builder()
        .add_source(config::File::with_name(filename))
        .add_source(
            Environment::with_prefix("APITREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Could not build config")?;
    let ClientSection { client } = cfg.try_deserialize().context("Invalid configuration")?;

    let content = fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    let EndpointSection { endpoints } =
        toml::from_str(&content).with_context(|| format!("Invalid endpoint tree in {}", path.display()))?;

    Ok(AppConfig { client, endpoints })
}

pub fn write_config_to(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create parent directories")?;
    };

    let mut file = File::create(path).context("Failed to create config file")?;
    file.write_all(source.as_bytes())
        .context("Failed to write config content")?;
    file.write_all(b"\n").context("Failed to write newline")?;
    Ok(())
}

/// Reads an endpoint tree from a standalone JSON document.
pub fn load_endpoints_json(path: &Path) -> Result<EndpointConfigMap> {
    let content = fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid endpoint tree in {}", path.display()))
}
