//! Wordgap Server - HTTP API and web UI for paced speech generation

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordgap_server::{create_router, settings, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wordgap_server=debug,wordgap_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Wordgap server");

    // Load configuration
    let config = settings::load()?;
    info!(
        "Assembler: chunk_size={}, pause={}s, backend={:?}, strategy={:?}, output={:?}",
        config.assembler.chunk_size,
        config.assembler.word_pause_seconds,
        config.assembler.backend,
        config.assembler.execution_strategy,
        config.assembler.output_format
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
