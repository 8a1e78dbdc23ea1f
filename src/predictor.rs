//! Prediction pipeline: record -> typed application -> feature row -> decision.

use crate::classifier::Classifier;
use crate::config::Config;
use crate::encoding::encode;
use crate::errors::AppError;
use crate::models::{LoanApplication, PredictionResult, RiskLevel, RiskScore};
use crate::preprocessing::FeatureDeriver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bounds (exclusive) of the Low and Moderate risk tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: f64,
    pub moderate: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            moderate: 0.6,
        }
    }
}

impl RiskThresholds {
    pub fn level(&self, probability: f64) -> RiskLevel {
        if probability < self.low {
            RiskLevel::Low
        } else if probability < self.moderate {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }
}

/// How `risk_score` is rendered in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskScoreFormat {
    /// Probability rounded to 4 decimals.
    Probability,
    /// Percentage string with 2 decimals.
    Percent,
}

impl RiskScoreFormat {
    /// Both formats report at a resolution of 1e-4 in probability units.
    pub fn round(probability: f64) -> f64 {
        (probability * 10_000.0).round() / 10_000.0
    }

    pub fn render(&self, probability: f64) -> RiskScore {
        let score = Self::round(probability);
        match self {
            RiskScoreFormat::Probability => RiskScore::Probability(score),
            RiskScoreFormat::Percent => RiskScore::Percent(format!("{:.2}%", score * 100.0)),
        }
    }
}

impl FromStr for RiskScoreFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "probability" => Ok(RiskScoreFormat::Probability),
            "percent" => Ok(RiskScoreFormat::Percent),
            other => anyhow::bail!(
                "RISK_SCORE_FORMAT must be 'probability' or 'percent', got '{}'",
                other
            ),
        }
    }
}

/// Runs the full preprocessing and inference contract for one record.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Classifier>,
    deriver: FeatureDeriver,
    decision_threshold: f64,
    risk_thresholds: RiskThresholds,
    score_format: RiskScoreFormat,
}

impl Predictor {
    pub fn new(model: Arc<dyn Classifier>, config: &Config) -> Self {
        Self {
            model,
            deriver: FeatureDeriver::new(config.credit_reference_year),
            decision_threshold: config.decision_threshold,
            risk_thresholds: config.risk_thresholds,
            score_format: config.risk_score_format,
        }
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    /// Validate, derive, encode and score a raw JSON record.
    pub fn predict_record(&self, record: &Value) -> Result<PredictionResult, AppError> {
        let record = record
            .as_object()
            .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".to_string()))?;
        let application = self.deriver.derive(record)?;
        self.predict_application(&application)
    }

    /// Score an already typed application.
    pub fn predict_application(
        &self,
        application: &LoanApplication,
    ) -> Result<PredictionResult, AppError> {
        let encoded = encode(application);
        let features = self.model.schema().reconcile(&encoded);
        let [default_probability, _] = self.model.predict_proba(&features)?;
        self.decide(default_probability)
    }

    /// Map the default probability (class 0) to a decision and risk tier.
    ///
    /// A low default probability predicts a fully paid loan (`1`). The
    /// decision and tier are taken from the reported score so a response
    /// never shows `0.3` next to "Low Risk".
    pub fn decide(&self, probability: f64) -> Result<PredictionResult, AppError> {
        if probability.is_nan() {
            return Err(AppError::InvalidPrediction);
        }

        let score = RiskScoreFormat::round(probability);
        let prediction = u8::from(score < self.decision_threshold);
        let risk_level = self.risk_thresholds.level(score);

        tracing::info!(
            probability = probability,
            prediction = prediction,
            risk_level = risk_level.as_str(),
            "Prediction computed"
        );

        Ok(PredictionResult {
            prediction,
            risk_score: self.score_format.render(score),
            risk_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{FeatureSchema, FeatureVector};

    struct FixedModel {
        schema: FeatureSchema,
        probability: f64,
    }

    impl Classifier for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn predict_proba(&self, _row: &FeatureVector<'_>) -> anyhow::Result<[f64; 2]> {
            Ok([self.probability, 1.0 - self.probability])
        }
    }

    fn predictor(probability: f64) -> Predictor {
        let model = FixedModel {
            schema: FeatureSchema::new(vec!["loan_amnt".to_string()]).unwrap(),
            probability,
        };
        Predictor::new(Arc::new(model), &Config::default())
    }

    #[test]
    fn test_risk_thresholds() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.level(0.1), RiskLevel::Low);
        assert_eq!(thresholds.level(0.3), RiskLevel::Moderate);
        assert_eq!(thresholds.level(0.59), RiskLevel::Moderate);
        assert_eq!(thresholds.level(0.6), RiskLevel::High);
    }

    #[test]
    fn test_decision_threshold() {
        let p = predictor(0.2);
        assert_eq!(p.decide(0.54).unwrap().prediction, 1);
        assert_eq!(p.decide(0.55).unwrap().prediction, 0);
        assert_eq!(p.decide(0.9).unwrap().prediction, 0);
    }

    #[test]
    fn test_nan_probability_is_rejected() {
        let p = predictor(f64::NAN);
        assert_eq!(p.decide(f64::NAN), Err(AppError::InvalidPrediction));
    }

    #[test]
    fn test_render_formats() {
        assert_eq!(
            RiskScoreFormat::Probability.render(0.123456),
            RiskScore::Probability(0.1235)
        );
        assert_eq!(
            RiskScoreFormat::Percent.render(0.123456),
            RiskScore::Percent("12.35%".to_string())
        );
    }

    #[test]
    fn test_tier_follows_reported_score() {
        let result = predictor(0.2).decide(0.29996).unwrap();
        assert_eq!(result.risk_score, RiskScore::Probability(0.3));
        assert_eq!(result.risk_level, RiskLevel::Moderate);

        let config = Config {
            risk_score_format: RiskScoreFormat::Percent,
            ..Config::default()
        };
        let model = FixedModel {
            schema: FeatureSchema::new(vec!["loan_amnt".to_string()]).unwrap(),
            probability: 0.2,
        };
        let percent = Predictor::new(Arc::new(model), &config);
        let result = percent.decide(0.299996).unwrap();
        assert_eq!(result.risk_score, RiskScore::Percent("30.00%".to_string()));
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_decision_uses_reported_score() {
        let result = predictor(0.2).decide(0.54996).unwrap();
        assert_eq!(result.risk_score, RiskScore::Probability(0.55));
        assert_eq!(result.prediction, 0);
    }

    #[test]
    fn test_risk_score_format_from_str() {
        assert_eq!(
            "Percent".parse::<RiskScoreFormat>().unwrap(),
            RiskScoreFormat::Percent
        );
        assert!("basis-points".parse::<RiskScoreFormat>().is_err());
    }

    #[test]
    fn test_predict_record_requires_object() {
        let p = predictor(0.2);
        let err = p.predict_record(&serde_json::json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
