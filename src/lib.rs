//! Fraud-risk scoring for tax assessor and employment termination certificates
//!
//! Independent checks (font rarity, file metadata and PDF structure, field
//! validation, duplicate history) each produce scored [`CheckResult`]s. The
//! aggregator folds them into one overall risk score and severity.

// Configuration and core pipeline
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Checks
pub mod fonts;
pub mod forensics;
pub mod history;
pub mod validators;

// Scoring
pub mod aggregate;

// External services
pub mod collaborators;

// Shared utilities
pub mod utils;

pub use aggregate::{aggregate_checks, compute_overall, create_fraud_report, Aggregation};
pub use config::ClientConfig;
pub use error::{CollaboratorError, ConfigError, Error, Result};
pub use fonts::{FontAnomaly, FontAnomalyDetector};
pub use forensics::{MetadataScorer, ProducerClassifier};
pub use pipeline::{Collaborators, Pipeline};
pub use types::{CheckResult, FraudReport, Overall, SourceDocument};
pub use utils::{Logger, Metrics};
