//! Utility to inspect a model artifact and optionally score a record file.
//!
//! Usage: `inspect_model [MODEL_PATH] [RECORD_JSON]`

use anyhow::Context;
use loan_risk_api::classifier::{self, Classifier};
use loan_risk_api::config::Config;
use loan_risk_api::encoding::CATEGORICAL_COLUMNS;
use loan_risk_api::predictor::Predictor;
use std::env;
use std::path::Path;

/// Main entry point for the model inspection utility.
///
/// Prints the frozen schema summary and, when a record file is given, the
/// prediction the service would return for it.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let mut args = env::args().skip(1);
    let model_path = args.next().unwrap_or_else(|| config.model_path.clone());
    let record_path = args.next();

    let model = classifier::load_classifier(
        &model_path,
        config.model_metadata_path.as_deref().map(Path::new),
    )?;

    println!("Model: {}", model.name());
    println!("Version: {}", model.version().unwrap_or("unversioned"));
    println!("Feature columns: {}", model.schema().len());
    for field in CATEGORICAL_COLUMNS {
        let levels = model.schema().levels(field);
        println!("- {} ({} levels): {}", field, levels.len(), levels.join(", "));
    }
    println!();

    if let Some(record_path) = record_path {
        let raw = std::fs::read_to_string(&record_path)
            .with_context(|| format!("Failed to read record from {}", record_path))?;
        let record: serde_json::Value = serde_json::from_str(&raw)?;

        let predictor = Predictor::new(model, &config);
        match predictor.predict_record(&record) {
            Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            Err(e) => println!("Rejected ({}): {}", e.status(), e),
        }
    }

    Ok(())
}
