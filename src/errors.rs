use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// A required input field is absent from the record.
    MissingColumn(String),
    /// A date field could not be parsed with any accepted format.
    InvalidDate {
        /// Name of the raw field (e.g. `earliest_cr_line`).
        field: String,
        /// The offending value as submitted.
        value: String,
    },
    /// A field is present but has an unusable type or value.
    InvalidField {
        /// Name of the field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The model produced a probability that is not a number.
    InvalidPrediction,
    /// Bad request error (invalid input shape).
    BadRequest(String),
    /// The request body exceeds the configured size limit.
    PayloadTooLarge(String),
    /// Internal server error. The message is returned to the caller verbatim.
    InternalError(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingColumn(_)
            | AppError::InvalidDate { .. }
            | AppError::InvalidField { .. }
            | AppError::InvalidPrediction
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingColumn(name) => write!(f, "Missing column: {}", name),
            AppError::InvalidDate { field, value } => {
                write!(f, "Invalid date format for {}: {}", field, value)
            }
            AppError::InvalidField { field, reason } => {
                write!(f, "Invalid value for {}: {}", field, reason)
            }
            AppError::InvalidPrediction => write!(f, "Invalid prediction result"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::InternalError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Client errors are logged at `warn`, internal errors at `error`.
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Internal error: {}", self);
        } else {
            tracing::warn!("Rejected prediction request: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    /// Malformed request bodies surface as internal errors with the parser message.
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(format!("{:#}", err))
    }
}
