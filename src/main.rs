use std::path::Path;
use std::process::ExitCode;

use apitree::binder::ApiContext;
use apitree::cli::{Cli, Commands};
use apitree::config::{load_configuration, load_endpoints_json};
use apitree::log::init_logging;
use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> Result<ExitCode, anyhow::Error> {
    init_logging()?;
    let cli = Cli::parse();

    let mut config = load_configuration(Path::new(&cli.config_file))?;
    if let Some(base_url) = cli.base_url {
        config.client.base_url = base_url;
    }
    if let Some(endpoints) = &cli.endpoints {
        config.endpoints = load_endpoints_json(Path::new(endpoints))?;
    }

    match cli.command {
        Commands::Call {
            path,
            args,
            query,
            header,
            token,
        } => {
            let mut builder = config.client_builder()?;
            if !query.is_empty() || !header.is_empty() {
                builder = builder.middleware(move |mut descriptor| {
                    for (key, value) in &query {
                        descriptor = descriptor.with_query(key.clone(), value.clone());
                    }
                    for (name, value) in &header {
                        descriptor = descriptor.with_header(name.clone(), value.clone());
                    }
                    descriptor
                });
            }
            if let Some(token) = token {
                builder = builder.options(config.client.opts.clone().with_bearer_token(token));
            }

            let ctx = ApiContext::new(builder.build(&config.endpoints)?);
            let fetch = ctx.client().require(&path)?;
            info!(path = path.as_str(), method:% = fetch.method(), url = fetch.url(); "Calling endpoint");

            let outcome = fetch.call(&args).await;
            println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        },
        Commands::Url { path, args } => {
            let ctx = ApiContext::new(config.client_builder()?.build(&config.endpoints)?);
            println!("{}", ctx.url(&path, &args)?);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Tree => {
            let api = config.client_builder()?.build(&config.endpoints)?;
            for (path, node) in api.walk() {
                let method = node.endpoint().map(|fetch| fetch.method().as_str()).unwrap_or("-");
                println!("{path:<32} {method:<7} {}", node.url());
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}
