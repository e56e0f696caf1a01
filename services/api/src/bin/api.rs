//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiCompletionAdapter, PdfExtractAdapter},
    config::Config,
    error::ApiError,
    web::{build_router, AppState},
};
use flashcards_core::{
    ContentExtractor, FlashcardGateway, FlashcardGenerator, FlashcardPipeline, ResponseValidator,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; uploads will fail until it is configured");
    }
    let completion_adapter = Arc::new(OpenAiCompletionAdapter::new(
        config.gemini_api_key.as_deref(),
        &config.model_api_base,
        config.flashcard_model.clone(),
    ));
    let pdf_adapter = Arc::new(PdfExtractAdapter);

    // --- 4. Assemble the Flashcard Pipeline ---
    let pipeline = Arc::new(FlashcardPipeline::new(
        ContentExtractor::new(pdf_adapter),
        FlashcardGenerator::new(completion_adapter, config.generation_timeout),
        ResponseValidator::new(config.validation_mode),
        FlashcardGateway::new(db_adapter.clone()),
    ));
    info!(
        model = %config.flashcard_model,
        validation_mode = ?config.validation_mode,
        "Flashcard pipeline ready"
    );

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        pipeline,
        store: db_adapter,
    });

    // --- 6. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

/// Resolves when the process receives Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
