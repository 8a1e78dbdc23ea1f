use serde::Deserialize;

use crate::predictor::{RiskScoreFormat, RiskThresholds};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub model_path: String,
    /// Column sidecar for ONNX models; defaults to `<model>.columns.json`.
    pub model_metadata_path: Option<String>,
    pub decision_threshold: f64,
    pub risk_thresholds: RiskThresholds,
    pub credit_reference_year: i32,
    pub risk_score_format: RiskScoreFormat,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            model_path: "model.json".to_string(),
            model_metadata_path: None,
            decision_threshold: 0.55,
            risk_thresholds: RiskThresholds::default(),
            credit_reference_year: 2013,
            risk_score_format: RiskScoreFormat::Probability,
            max_body_bytes: 64 * 1024,
        }
    }
}

fn parse_probability(name: &str, raw: String) -> anyhow::Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a number", name))?;
    if !(value > 0.0 && value < 1.0) {
        anyhow::bail!("{} must be between 0 and 1 (exclusive)", name);
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_path: std::env::var("MODEL_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.model_path),
            model_metadata_path: std::env::var("MODEL_METADATA_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            decision_threshold: match std::env::var("DECISION_THRESHOLD") {
                Ok(raw) => parse_probability("DECISION_THRESHOLD", raw)?,
                Err(_) => defaults.decision_threshold,
            },
            risk_thresholds: {
                let low = match std::env::var("RISK_LOW_THRESHOLD") {
                    Ok(raw) => parse_probability("RISK_LOW_THRESHOLD", raw)?,
                    Err(_) => defaults.risk_thresholds.low,
                };
                let moderate = match std::env::var("RISK_MODERATE_THRESHOLD") {
                    Ok(raw) => parse_probability("RISK_MODERATE_THRESHOLD", raw)?,
                    Err(_) => defaults.risk_thresholds.moderate,
                };
                if low >= moderate {
                    anyhow::bail!(
                        "RISK_LOW_THRESHOLD ({}) must be lower than RISK_MODERATE_THRESHOLD ({})",
                        low,
                        moderate
                    );
                }
                RiskThresholds { low, moderate }
            },
            credit_reference_year: std::env::var("CREDIT_REFERENCE_YEAR")
                .unwrap_or_else(|_| defaults.credit_reference_year.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CREDIT_REFERENCE_YEAR must be a valid year"))?,
            risk_score_format: match std::env::var("RISK_SCORE_FORMAT") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.risk_score_format,
            },
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| defaults.max_body_bytes.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Model path: {}", config.model_path);
        tracing::debug!(
            "Decision threshold: {}, risk tiers: <{} low, <{} moderate",
            config.decision_threshold,
            config.risk_thresholds.low,
            config.risk_thresholds.moderate
        );
        tracing::debug!("Credit reference year: {}", config.credit_reference_year);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
