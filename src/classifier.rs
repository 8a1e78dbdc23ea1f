//! Frozen classifier artifact and its loader.

use crate::encoding::{FeatureSchema, FeatureVector};
use crate::onnx_model::OnnxClassifier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A trained binary classifier over a fixed feature schema.
///
/// Implementations are immutable after loading and shared across requests.
pub trait Classifier: Send + Sync {
    /// Model name reported by `/health`.
    fn name(&self) -> &str;

    /// Artifact version, when the export recorded one.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Frozen input schema the model was trained on.
    fn schema(&self) -> &FeatureSchema;

    /// Class probabilities `[P(class 0), P(class 1)]` for one row.
    fn predict_proba(&self, row: &FeatureVector<'_>) -> Result<[f64; 2]>;

    /// Class labels, indexed like `predict_proba`.
    fn classes(&self) -> [i64; 2] {
        [0, 1]
    }

    /// Most probable class label.
    fn predict(&self, row: &FeatureVector<'_>) -> Result<i64> {
        let [p0, p1] = self.predict_proba(row)?;
        let classes = self.classes();
        Ok(if p1 > p0 { classes[1] } else { classes[0] })
    }
}

/// Load a classifier, choosing the backend from the file extension.
///
/// `.onnx` files go through the ONNX runtime with their column sidecar;
/// anything else is read as a JSON logistic-regression artifact.
pub fn load_classifier<P: AsRef<Path>>(
    model_path: P,
    metadata_path: Option<&Path>,
) -> Result<Arc<dyn Classifier>> {
    let model_path = model_path.as_ref();
    let is_onnx = model_path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false);

    if is_onnx {
        Ok(Arc::new(OnnxClassifier::load(model_path, metadata_path)?))
    } else {
        Ok(Arc::new(LogisticRegressionModel::load(model_path)?))
    }
}

/// Standardization applied before the linear model (`(x - mean) / scale`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// On-disk layout of the model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub final_columns: Vec<String>,
    #[serde(default)]
    pub scaler: Option<ScalerParams>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

fn default_classes() -> [i64; 2] {
    [0, 1]
}

/// Logistic regression with optional standard scaling.
#[derive(Debug, Clone)]
pub struct LogisticRegressionModel {
    name: String,
    version: Option<String>,
    schema: FeatureSchema,
    scaler: Option<ScalerParams>,
    coefficients: Vec<f64>,
    intercept: f64,
    classes: [i64; 2],
}

impl LogisticRegressionModel {
    /// Load and validate a JSON artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        let model = Self::from_json(&raw)
            .with_context(|| format!("Invalid model artifact at {}", path.display()))?;

        info!(
            model = %model.name,
            version = model.version.as_deref().unwrap_or("unversioned"),
            features = model.schema.len(),
            scaled = model.scaler.is_some(),
            "Model loaded successfully"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(raw).context("Model artifact is not valid JSON")?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let schema = FeatureSchema::new(artifact.final_columns)?;
        let width = schema.len();

        if artifact.coefficients.len() != width {
            anyhow::bail!(
                "model has {} coefficients but {} feature columns",
                artifact.coefficients.len(),
                width
            );
        }
        if !artifact.intercept.is_finite() || artifact.coefficients.iter().any(|c| !c.is_finite())
        {
            anyhow::bail!("model parameters must be finite");
        }
        if artifact.classes[0] == artifact.classes[1] {
            anyhow::bail!("model must have two distinct classes");
        }
        if let Some(scaler) = &artifact.scaler {
            if scaler.mean.len() != width || scaler.scale.len() != width {
                anyhow::bail!(
                    "scaler has {} means and {} scales for {} feature columns",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    width
                );
            }
        }

        Ok(Self {
            name: artifact.name,
            version: artifact.version,
            schema,
            scaler: artifact.scaler,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            classes: artifact.classes,
        })
    }

    fn decision_function(&self, values: &[f64]) -> f64 {
        let weighted = values
            .iter()
            .zip(&self.coefficients)
            .enumerate()
            .map(|(i, (x, w))| {
                let x = match &self.scaler {
                    Some(scaler) => {
                        // Constant columns were fitted with scale 0.
                        let scale = if scaler.scale[i] == 0.0 { 1.0 } else { scaler.scale[i] };
                        (x - scaler.mean[i]) / scale
                    }
                    None => *x,
                };
                w * x
            })
            .sum::<f64>();
        self.intercept + weighted
    }
}

impl Classifier for LogisticRegressionModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classes(&self) -> [i64; 2] {
        self.classes
    }

    fn predict_proba(&self, row: &FeatureVector<'_>) -> Result<[f64; 2]> {
        if row.len() != self.schema.len() {
            anyhow::bail!(
                "feature row has {} values, model expects {}",
                row.len(),
                self.schema.len()
            );
        }

        let z = self.decision_function(row.values());
        let p1 = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - p1, p1])
    }
}
