mod config;
mod enhancement;
mod errors;
mod llm_client;
mod loader;
mod pipeline;
mod render;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (malformed numeric values abort startup)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Enhancer v{}", env!("CARGO_PKG_VERSION"));

    preflight(&config);

    // Loader, LLM client and renderer, wired once and shared by every request
    let pipeline = Pipeline::from_config(&config).context("failed to initialize pipeline")?;

    let state = AppState {
        config: config.clone(),
        pipeline: Arc::new(pipeline),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Environment checks that warn but never stop the server.
fn preflight(config: &Config) {
    if !config.has_credential() {
        warn!("No model credential configured (LLM_API_KEY or COPILOT_ACCESS_TOKEN); enhancement requests will fail with AUTH_ERROR");
    }

    match &config.logo_path {
        Some(path) if !path.is_file() => {
            warn!("Logo not found at {}; CVs will render without a logo", path.display())
        }
        Some(path) => info!("Using logo {}", path.display()),
        None => info!("Logo disabled (LOGO_PATH is empty)"),
    }

    if render::pdf::engine_on_path(&config.pdf_engine) {
        info!("PDF engine: {}", config.pdf_engine);
    } else {
        warn!(
            "PDF engine '{}' not found on PATH; PDF requests will fall back to HTML",
            config.pdf_engine
        );
    }
}
