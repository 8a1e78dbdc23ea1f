use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loan_risk_api::classifier::{self, Classifier};
use loan_risk_api::config::Config;
use loan_risk_api::handlers::{self, AppState};
use loan_risk_api::predictor::Predictor;

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration and the model artifact once,
/// then serves the prediction API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // The model is immutable for the lifetime of the process
    let model = classifier::load_classifier(
        &config.model_path,
        config.model_metadata_path.as_deref().map(Path::new),
    )
    .with_context(|| format!("Unable to start without model at {}", config.model_path))?;
    tracing::info!(
        "Model '{}' ready with {} features",
        model.name(),
        model.schema().len()
    );

    let app_state = Arc::new(AppState {
        predictor: Predictor::new(model, &config),
        config: config.clone(),
    });

    let app = handlers::router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
