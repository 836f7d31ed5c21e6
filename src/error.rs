//! Error types and handling for the document fraud-scoring library

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for scoring operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for scoring operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The font detector found no font metadata and was given no rendered
    /// page to fall back on.
    #[error("Missing detection input: {0}")]
    MissingDetectionInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Check '{check}' timed out after {seconds}s")]
    Timeout { check: String, seconds: u64 },

    #[error("Persistence task failed: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Shorthand used by the font detector when it has nothing to work with.
    pub fn missing_input(detail: impl Into<String>) -> Self {
        Error::MissingDetectionInput(detail.into())
    }
}

// -------------------- Sub-Error Categories --------------------

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse config '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Invalid band table '{table}': {message}")]
    InvalidBands { table: String, message: String },

    #[error("Invalid tunable '{name}': {message}")]
    InvalidTunable { name: String, message: String },
}

/// Failures reported by the external services the checks depend on.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum CollaboratorError {
    #[error("OCR source failed: {0}")]
    Ocr(String),

    #[error("Field extraction failed: {0}")]
    FieldExtraction(String),

    #[error("Metadata reader failed: {0}")]
    MetadataReader(String),

    #[error("Page renderer failed: {0}")]
    Renderer(String),

    #[error("Relevance classifier failed: {0}")]
    Relevance(String),

    #[error("Visual anomaly detector failed: {0}")]
    Visual(String),

    #[error("Document store failed: {0}")]
    Store(String),
}
