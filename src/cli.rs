use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "apitree")]
#[command(about = "Call endpoints of a declarative HTTP API tree", long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long = "config",
        global = true,
        help = "Path to the configuration file",
        default_value = "data/apitree.toml"
    )]
    pub config_file: String,
    #[arg(short = 'u', long, global = true, help = "Override the base URL from the configuration")]
    pub base_url: Option<String>,
    #[arg(
        short,
        long,
        global = true,
        help = "Read the endpoint tree from a JSON file instead of the configuration"
    )]
    pub endpoints: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Call an endpoint and print its data, status and error as JSON.
    /// Exits with status 1 when the call fails
    Call {
        #[arg(help = "Dotted path of the endpoint, e.g. posts.by_id")]
        path: String,
        #[arg(
            help = "Call arguments; each is parsed as JSON, falling back to a plain string",
            value_parser = parse_arg,
            allow_negative_numbers = true
        )]
        args: Vec<Value>,
        #[arg(short, long, help = "Query parameter as key=value. Can be specified multiple times.", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
        #[arg(short = 'H', long, help = "Request header as name=value. Can be specified multiple times.", value_parser = parse_key_val)]
        header: Vec<(String, String)>,
        #[arg(short, long, help = "Bearer token sent with the request")]
        token: Option<String>,
    },
    /// Print an endpoint's URL formatted with the given arguments
    Url {
        #[arg(help = "Dotted path of the node, e.g. posts.by_id")]
        path: String,
        #[arg(help = "Template arguments", value_parser = parse_arg, allow_negative_numbers = true)]
        args: Vec<Value>,
    },
    /// List every node with its method and URL
    Tree,
}

/// JSON when it parses, otherwise the raw text as a string.
pub fn parse_arg(s: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())))
}

pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}
