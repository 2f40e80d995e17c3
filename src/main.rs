use anyhow::{Context, Result};
use reqwest::Method;

use cloudapi_client::config::{Command, Config};
use cloudapi_client::{CloudClient, OperationScope};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Base URL: {}", config.base_url);

    let client = CloudClient::builder(config.clone())
        .span(tracing::info_span!("cloudapi"))
        .build()
        .context("Failed to build API client")?;

    // Root scope for the whole run; Ctrl+C cancels whatever is in flight
    let root = OperationScope::background();
    let canceller = root.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C signal, cancelling...");
            canceller.cancel();
        }
    });

    match command {
        Command::Token => {
            let scope = root.with_timeout(config.default_timeout);
            let token = client.token(&scope).await?;
            println!("token_type: {}", token.token_type);
            println!("expires_at: {}", token.expires_at.to_rfc3339());
        }
        Command::Tenants => {
            let tenants = client.tenants().list(&root).await?;
            println!("{}", serde_json::to_string_pretty(&tenants)?);
        }
        Command::Get { path } => {
            let scope = root.with_timeout(config.default_timeout);
            let body: serde_json::Value = client
                .pipeline()
                .execute_json::<(), _>(&scope, Method::GET, &path, None)
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
