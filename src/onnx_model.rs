//! ONNX classifier backend.
//!
//! Any estimator exported to ONNX (tree ensembles, boosted models, linear
//! models) can serve predictions. ONNX graphs carry no column names, so the
//! frozen `final_columns` list is read from a JSON sidecar next to the model.

use crate::classifier::Classifier;
use crate::encoding::{FeatureSchema, FeatureVector};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use tract_onnx::prelude::*;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Sidecar metadata describing the ONNX model's input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub final_columns: Vec<String>,
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

fn default_classes() -> [i64; 2] {
    [0, 1]
}

/// Default sidecar location: `model.onnx` -> `model.columns.json`.
pub fn sidecar_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("columns.json")
}

pub struct OnnxClassifier {
    metadata: ModelMetadata,
    schema: FeatureSchema,
    plan: OnnxPlan,
}

impl OnnxClassifier {
    /// Load the graph and its sidecar, fixing the input to `[1, n_columns]` f32.
    pub fn load<P: AsRef<Path>>(model_path: P, metadata_path: Option<&Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let metadata_path = metadata_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| sidecar_path(model_path));

        info!(
            path = %model_path.display(),
            metadata = %metadata_path.display(),
            "Loading ONNX model"
        );

        let raw = std::fs::read_to_string(&metadata_path).with_context(|| {
            format!("Failed to read model metadata from {}", metadata_path.display())
        })?;
        let metadata: ModelMetadata = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid model metadata at {}", metadata_path.display()))?;
        if metadata.classes[0] == metadata.classes[1] {
            anyhow::bail!("model must have two distinct classes");
        }
        let schema = FeatureSchema::new(metadata.final_columns.clone())?;

        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("Failed to load model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, schema.len())),
            )?
            .into_optimized()?
            .into_runnable()?;

        info!(
            model = %metadata.name,
            features = schema.len(),
            "Model loaded successfully"
        );

        Ok(Self {
            metadata,
            schema,
            plan,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn version(&self) -> Option<&str> {
        self.metadata.version.as_deref()
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classes(&self) -> [i64; 2] {
        self.metadata.classes
    }

    /// Reads the first f32 output. A `[1, 2]` output is taken as class
    /// probabilities, a `[1, 1]` output as the probability of class 1.
    fn predict_proba(&self, row: &FeatureVector<'_>) -> Result<[f64; 2]> {
        if row.len() != self.schema.len() {
            anyhow::bail!(
                "feature row has {} values, model expects {}",
                row.len(),
                self.schema.len()
            );
        }

        let values: Vec<f32> = row.values().iter().map(|v| *v as f32).collect();
        let input = Tensor::from_shape(&[1, values.len()], values.as_slice())?;
        let outputs = self.plan.run(tvec!(input.into()))?;

        let probabilities: Vec<f64> = outputs
            .iter()
            .find_map(|output| output.to_array_view::<f32>().ok())
            .map(|view| view.iter().map(|p| f64::from(*p)).collect())
            .ok_or_else(|| anyhow::anyhow!("model produced no f32 output"))?;

        match probabilities.as_slice() {
            [p0, p1] => Ok([*p0, *p1]),
            [p1] => Ok([1.0 - *p1, *p1]),
            other => anyhow::bail!("expected 1 or 2 output probabilities, got {}", other.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("artifacts/model.onnx")),
            PathBuf::from("artifacts/model.columns.json")
        );
    }

    #[test]
    fn test_missing_sidecar_fails() {
        let err = OnnxClassifier::load("/nonexistent/model.onnx", None)
            .err()
            .expect("load should fail");
        assert!(err.to_string().contains("metadata"));
    }
}
