mod config;
mod error;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;

use config::Config;
use handlers::{AdvisorHandler, DetectionHandler};
use server::{create_router, AppState};
use services::{Detector, GeminiService, OnnxDetector};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting AquaBov API...");

    let config = Config::from_env();

    // A missing or broken model keeps the server up; /predict reports it.
    let detector: Option<Arc<dyn Detector>> = match OnnxDetector::load(&config.model_path) {
        Ok(detector) => {
            log::info!("✅ Detector loaded on device: {}", detector.device());
            Some(Arc::new(detector))
        }
        Err(e) => {
            log::error!("❌ Error loading model: {:#}", e);
            None
        }
    };

    let gemini = Arc::new(GeminiService::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_api_url.clone(),
        config.llm_timeout,
    )?);
    log::info!("✅ Gemini service initialized with model: {}", config.gemini_model);

    let app = create_router(AppState {
        detection: DetectionHandler::new(detector, config.limits),
        advisor: AdvisorHandler::new(gemini),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    log::info!("🌐 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    log::info!("🛑 Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}
