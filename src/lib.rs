//! Loan Risk Prediction API Library
//!
//! This library provides the core functionality for the loan risk prediction
//! service: request validation, feature derivation, one-hot encoding against
//! the frozen training schema, model inference and HTTP handlers.
//!
//! # Modules
//!
//! - `classifier`: Model artifact loading and probability estimation.
//! - `config`: Configuration management.
//! - `encoding`: One-hot encoding and schema reconciliation.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `models`: Request and response data models.
//! - `onnx_model`: ONNX classifier backend with a column sidecar.
//! - `predictor`: Decision rule and risk tiering.
//! - `preprocessing`: Column validation and field derivation.

pub mod classifier;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod onnx_model;
pub mod predictor;
pub mod preprocessing;
