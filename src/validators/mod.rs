//! Field validators for extracted document text
//!
//! Each supported document family has a fixed set of cross-field checks.
//! Dispatch is a closed enum keyed by [`FileType`].

pub mod registry;
pub mod tax_certificate;
pub mod termination_certificate;

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::types::{Category, CheckResult, Evidence, FileType, Kind, LabelData};

pub use registry::{normalize_file_number, DeductionRegistry};

/// Converts a Hebrew calendar date string to a Gregorian date.
pub trait HebrewDateParser: Send + Sync {
    fn parse(&self, raw: &str) -> Option<NaiveDate>;
}

/// Shared services the validators read from.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub config: &'a ClientConfig,
    pub registry: &'a DeductionRegistry,
    pub hebrew_dates: Option<&'a dyn HebrewDateParser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentValidator {
    TaxCertificate,
    TerminationCertificate,
    Unsupported,
}

impl DocumentValidator {
    pub fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::TaxCertificate => Self::TaxCertificate,
            FileType::TerminationCertificate => Self::TerminationCertificate,
            FileType::Other => Self::Unsupported,
        }
    }

    pub fn validate(&self, labels: &LabelData, ctx: &ValidationContext<'_>) -> Vec<CheckResult> {
        match self {
            Self::TaxCertificate => tax_certificate::validate(labels, ctx),
            Self::TerminationCertificate => termination_certificate::validate(labels, ctx),
            Self::Unsupported => Vec::new(),
        }
    }
}

#[instrument(skip(labels, ctx), fields(file_type = file_type.as_str()))]
pub fn run_validators(
    file_type: FileType,
    labels: &LabelData,
    ctx: &ValidationContext<'_>,
) -> Vec<CheckResult> {
    let checks = DocumentValidator::for_file_type(file_type).validate(labels, ctx);
    debug!(checks = checks.len(), "Text validation complete");
    checks
}

/// `{field: text}` with the field's bounding box.
pub(crate) fn field_evidence(labels: &LabelData, field: &str) -> Evidence {
    let text = labels.get(field).and_then(|f| f.text.clone());
    Evidence::field(json!({ field: text })).with_bbox(labels.bbox(field))
}

/// Field text as an ISO `YYYY-MM-DD` date.
pub(crate) fn date_field(labels: &LabelData, field: &str) -> Option<NaiveDate> {
    labels
        .text(field)
        .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok())
}

pub(crate) fn build_result(
    id_prefix: &str,
    kind: Kind,
    title: &str,
    description: &str,
    score: i64,
    evidence: Vec<Evidence>,
    config: &ClientConfig,
) -> CheckResult {
    CheckResult::new(
        id_prefix,
        Category::CrossSourceVerification,
        kind,
        title,
        description,
        score,
        evidence,
        config,
    )
}

/// Job departure must not be after the document date.
pub(crate) fn departure_before_document(labels: &LabelData, config: &ClientConfig) -> CheckResult {
    let valid = matches!(
        (date_field(labels, "document_date"), date_field(labels, "job_departure_date")),
        (Some(doc), Some(dep)) if dep <= doc
    );
    build_result(
        "DepartureBeforeDocument",
        Kind::DateConsistency,
        "Departure before document date",
        if valid {
            "Job departure precedes document date"
        } else {
            "Departure date after document date"
        },
        if valid { 0 } else { 90 },
        vec![
            field_evidence(labels, "document_date"),
            field_evidence(labels, "job_departure_date"),
        ],
        config,
    )
}
