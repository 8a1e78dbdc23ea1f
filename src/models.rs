use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============ Request Models ============

/// A loan application after validation and field derivation.
///
/// Every field is typed; derived fields (`credit_age`, `loan_issue_year`,
/// `loan_issue_month`, `zip_code`) are already resolved from their raw
/// sources when those were submitted instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoanApplication {
    /// Requested loan amount.
    pub loan_amnt: f64,
    /// Loan term in months (36 or 60).
    pub term: u32,
    /// Interest rate in percent.
    pub int_rate: f64,
    /// Lending grade subdivision (`A1`..`G5`).
    pub sub_grade: String,
    /// Home ownership status, with `NONE`/`ANY` folded into `OTHER`.
    pub home_ownership: String,
    /// Self-reported annual income.
    pub annual_inc: f64,
    /// Income verification status.
    pub verification_status: String,
    /// Stated purpose of the loan.
    pub purpose: String,
    /// Debt-to-income ratio.
    pub dti: f64,
    /// Number of open credit lines.
    pub open_acc: f64,
    /// Number of derogatory public records.
    pub pub_rec: f64,
    /// Revolving line utilization rate.
    pub revol_util: f64,
    /// Initial listing status (`f` or `w`).
    pub initial_list_status: String,
    /// Individual or joint application.
    pub application_type: String,
    /// Number of mortgage accounts.
    pub mort_acc: f64,
    /// Year the loan was issued.
    pub loan_issue_year: i32,
    /// Month the loan was issued (1-12).
    pub loan_issue_month: u32,
    /// Years between the earliest credit line and the reference year.
    pub credit_age: i32,
    /// Five-digit zip code.
    pub zip_code: String,
}

// ============ Response Models ============

/// Qualitative risk bucket derived from the default probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

/// Default probability as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RiskScore {
    /// Raw probability rounded to 4 decimals, e.g. `0.1234`.
    Probability(f64),
    /// Percentage string with 2 decimals, e.g. `"12.34%"`.
    Percent(String),
}

/// Response body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionResult {
    /// 1 when the loan is predicted to be fully paid, 0 when predicted to default.
    pub prediction: u8,
    /// Estimated default probability.
    pub risk_score: RiskScore,
    /// Risk tier for the estimated default probability.
    pub risk_level: RiskLevel,
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Name of the loaded model artifact.
    pub model: String,
    /// Width of the frozen feature schema.
    pub features: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_result_serialization() {
        let result = PredictionResult {
            prediction: 1,
            risk_score: RiskScore::Probability(0.1234),
            risk_level: RiskLevel::Low,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "prediction": 1,
                "risk_score": 0.1234,
                "risk_level": "Low Risk"
            })
        );
    }

    #[test]
    fn test_percent_risk_score_serializes_as_string() {
        let value = serde_json::to_value(RiskScore::Percent("61.02%".to_string())).unwrap();
        assert_eq!(value, serde_json::json!("61.02%"));
    }

    #[test]
    fn test_risk_level_labels() {
        assert_eq!(RiskLevel::Moderate.as_str(), "Moderate Risk");
        assert_eq!(
            serde_json::to_value(RiskLevel::High).unwrap(),
            serde_json::json!("High Risk")
        );
    }
}
