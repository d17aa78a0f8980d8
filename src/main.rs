use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sieve::api::create_router;
use sieve::config::CONFIG;
use sieve::tools::Toolbox;

#[derive(Parser, Debug)]
#[command(version, about = "Crawl and meta-search tool server")]
struct Cli {
    /// Interface to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let host = cli.host.unwrap_or_else(|| CONFIG.host.clone());
    let port = cli.port.unwrap_or(CONFIG.port);

    let toolbox = Toolbox::from_config(&CONFIG)?;
    tracing::info!(
        searxng = %CONFIG.searxng_url,
        crawl4ai = %CONFIG.crawl4ai_url,
        cache = toolbox.cache().backend(),
        "toolbox ready"
    );

    let app = create_router(Arc::new(toolbox));
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
