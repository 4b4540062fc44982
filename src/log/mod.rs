pub mod structured_console_encoder;

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use log::{debug, info};
use log4rs::{
    Config,
    config::{Deserializers, RawConfig},
};
use reqwest::header::HeaderMap;

use crate::log::structured_console_encoder::StructuredConsoleEncoderDeserializer;

const EXTERNAL_CONFIG: &str = "log4rs.yml";

/// Header names whose values never appear in logs unless secrets are revealed.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "proxy-authorization",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

/// Initializes logging.
///
/// A `log4rs.yml` in the working directory wins; otherwise the embedded
/// defaults log to stderr.
pub fn init_logging() -> anyhow::Result<()> {
    let mut deserializers = Deserializers::default();
    deserializers.insert("structured_console", StructuredConsoleEncoderDeserializer);

    let path = Path::new(EXTERNAL_CONFIG);
    if path.exists() {
        log4rs::init_file(path, deserializers).context("Failed to load external log4rs.yml")?;
        info!(path = EXTERNAL_CONFIG; "Logging initialized from external configuration");
        return Ok(());
    }

    let yaml_content = include_str!("../../resources/default_log4rs.yml");
    let raw_config: RawConfig =
        serde_yaml::from_str(yaml_content).context("Embedded logging configuration is invalid YAML")?;

    let (appenders, errors) = raw_config.appenders_lossy(&deserializers);
    if !errors.is_empty() {
        anyhow::bail!("Errors parsing embedded appenders: {:?}", errors);
    }

    let config = Config::builder()
        .appenders(appenders)
        .loggers(raw_config.loggers())
        .build(raw_config.root())
        .context("Failed to build logging config")?;

    log4rs::init_config(config).context("Failed to initialize logging from embedded config")?;

    debug!("Logging initialized from embedded defaults (no external log4rs.yml found)");
    Ok(())
}

fn reveal_secrets() -> bool {
    static REVEAL_SECRETS_CACHE: OnceLock<bool> = OnceLock::new();

    *REVEAL_SECRETS_CACHE.get_or_init(|| {
        std::env::var("REVEAL_SECRETS")
            .map(|v| {
                let val = v.to_lowercase();
                val == "true" || val == "1"
            })
            .unwrap_or(false)
    })
}

pub fn is_sensitive(name: &str) -> bool {
    SENSITIVE_HEADERS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Masks a secret, keeping only the auth scheme if there is one.
/// If REVEAL_SECRETS is true, returns the original string.
pub fn mask_secret(value: &str) -> String {
    if reveal_secrets() {
        return value.to_string();
    }

    match value.split_once(' ') {
        Some((scheme, _)) if matches!(scheme, "Basic" | "Bearer") => format!("{scheme} <REDACTED>"),
        _ => "<REDACTED>".to_string(),
    }
}

/// Renders headers as `name=value` pairs with sensitive values masked.
pub fn describe_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let text = value.to_str().unwrap_or("<binary>");
            if is_sensitive(name.as_str()) {
                format!("{name}={}", mask_secret(text))
            } else {
                format!("{name}={text}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
