//! Shared enumerations used across checks, reports and configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// Document families the pipeline knows how to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    TaxCertificate,
    TerminationCertificate,
    Other,
}

impl FileType {
    /// Resolve the file type from the upload folder the document landed in.
    pub fn from_parent_folder(parent_folder: Option<&str>) -> Self {
        let Some(raw) = parent_folder else {
            return FileType::Other;
        };

        let plus_decoded = raw.replace('+', " ");
        let decoded = urlencoding::decode(&plus_decoded)
            .map(|s| s.into_owned())
            .unwrap_or(plus_decoded);
        let name = decoded.trim().trim_matches('/').trim().to_lowercase();

        match name.as_str() {
            "tax-assessor-certificate" => FileType::TaxCertificate,
            "employment-termination-certificate" => FileType::TerminationCertificate,
            _ => FileType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::TaxCertificate => "TaxCertificate",
            FileType::TerminationCertificate => "TerminationCertificate",
            FileType::Other => "Other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public API categories a check is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SyntheticMedia,
    VisualAnalysis,
    FileMetadata,
    CrossSourceVerification,
    HistoricalPatterns,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SyntheticMedia => "synthetic_media",
            Category::VisualAnalysis => "visual_analysis",
            Category::FileMetadata => "file_metadata",
            Category::CrossSourceVerification => "cross_source_verification",
            Category::HistoricalPatterns => "historical_patterns",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specific finding kind within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    // Visual / fonts
    FontManipulation,
    // Text validations
    DateConsistency,
    AmountConsistency,
    SumCheck,
    IdFormat,
    AddressValidity,
    NameEntityMismatch,
    // Metadata / provenance
    SuspiciousProducer,
    TimestampInconsistent,
    DigitalSignatureInvalid,
    AnnotationPresent,
    ImageOnlyPdf,
    ProducerXmpMismatch,
    HashMismatch,
    // Duplicates / history
    ExactDuplicate,
    NearDuplicateHash,
    ContentReusePattern,
    // Cross-source verification
    RegistryMatch,
    ExternalAmountMismatch,
    ExternalStatusMismatch,
    // Synthetic media
    SyntheticMediaDetected,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::FontManipulation => "font_manipulation",
            Kind::DateConsistency => "date_consistency",
            Kind::AmountConsistency => "amount_consistency",
            Kind::SumCheck => "sum_check",
            Kind::IdFormat => "id_format",
            Kind::AddressValidity => "address_validity",
            Kind::NameEntityMismatch => "name_entity_mismatch",
            Kind::SuspiciousProducer => "suspicious_producer",
            Kind::TimestampInconsistent => "timestamp_inconsistent",
            Kind::DigitalSignatureInvalid => "digital_signature_invalid",
            Kind::AnnotationPresent => "annotation_present",
            Kind::ImageOnlyPdf => "image_only_pdf",
            Kind::ProducerXmpMismatch => "producer_xmp_mismatch",
            Kind::HashMismatch => "hash_mismatch",
            Kind::ExactDuplicate => "exact_duplicate",
            Kind::NearDuplicateHash => "near_duplicate_hash",
            Kind::ContentReusePattern => "content_reuse_pattern",
            Kind::RegistryMatch => "registry_match",
            Kind::ExternalAmountMismatch => "external_amount_mismatch",
            Kind::ExternalStatusMismatch => "external_status_mismatch",
            Kind::SyntheticMediaDetected => "synthetic_media_detected",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-check status band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Warn,
    #[serde(rename = "risk")]
    Fail,
    Error,
    Skipped,
}

impl Status {
    /// Parse a configured status label; `None` for anything unrecognised.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "pass" => Some(Status::Pass),
            "warn" => Some(Status::Warn),
            "risk" => Some(Status::Fail),
            "error" => Some(Status::Error),
            "skipped" => Some(Status::Skipped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "risk",
            Status::Error => "error",
            Status::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall document severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    /// Raw text snippet
    Text,
    /// Named field/value
    Field,
    /// Numeric metric
    Metric,
    /// Statistical value
    Stat,
    /// File metadata (XMP/EXIF/PDF)
    Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_folder() {
        assert_eq!(
            FileType::from_parent_folder(Some("tax-assessor-certificate")),
            FileType::TaxCertificate
        );
        assert_eq!(
            FileType::from_parent_folder(Some(" /Employment-Termination-Certificate/ ")),
            FileType::TerminationCertificate
        );
        assert_eq!(
            FileType::from_parent_folder(Some("tax%2Dassessor%2Dcertificate")),
            FileType::TaxCertificate
        );
        assert_eq!(FileType::from_parent_folder(Some("invoices")), FileType::Other);
        assert_eq!(FileType::from_parent_folder(None), FileType::Other);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&Status::Fail).unwrap();
        assert_eq!(json, "\"risk\"");
        assert_eq!(Status::from_label("RISK"), Some(Status::Fail));
        assert_eq!(Status::from_label("bogus"), None);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::CrossSourceVerification).unwrap();
        assert_eq!(json, "\"cross_source_verification\"");
        let kind: Kind = serde_json::from_str("\"image_only_pdf\"").unwrap();
        assert_eq!(kind, Kind::ImageOnlyPdf);
    }
}
