use anyhow::{Context, Result};
use clap::Parser;
use contracts_api::config::Config;
use contracts_api::{create_router, AppState};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("contracts_api=info,tower_http=info")),
        )
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let config = Config::parse();
    let options = config.api_options()?;
    let source = config.table_source().await;

    info!(
        data_path = %config.data_path.display(),
        preload = config.preload,
        sort_lists = options.sort_lists,
        require_contract_id = options.require_contract_id,
        "Contracts API starting"
    );

    let app = create_router(AppState::new(source, options));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Server listening on {}", config.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
