//! File metadata and provenance checks
//!
//! Turns the structure reader's view of a PDF or image into `FileMetadata`
//! category checks: timestamps, producer, XMP mismatch, signatures,
//! annotations and image-only PDFs.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::annotations::{score_annotations, DocumentTimes, RawAnnotation};
use super::dates::{days_apart, parse_image_date, parse_pdf_date, parse_reference_date};
use super::producer::ProducerClassifier;
use super::signatures::{score_signatures, SignatureInfo, SigningContext};
use crate::config::ClientConfig;
use crate::types::{Category, CheckResult, Evidence, Kind, LabelData};

/// Label fields consulted, in order, for the date printed on the document.
pub const REFERENCE_DATE_FIELDS: [&str; 3] = ["document_date", "job_start_date", "job_departure_date"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page: u32,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Structural facts about a PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfStructure {
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub modification_date: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub xmp_producer: Option<String>,
    /// Whether any page carries extractable text.
    #[serde(default = "default_has_text")]
    pub has_text: bool,
    #[serde(default)]
    pub pages: Vec<PageGeometry>,
    #[serde(default)]
    pub annotations: Vec<RawAnnotation>,
    #[serde(default)]
    pub signatures: Vec<SignatureInfo>,
}

fn default_has_text() -> bool {
    true
}

impl PdfStructure {
    pub fn page_areas(&self) -> BTreeMap<u32, f64> {
        self.pages.iter().map(|p| (p.page, p.area())).collect()
    }

    pub fn document_times(&self) -> DocumentTimes {
        DocumentTimes {
            created: self.creation_date.as_deref().and_then(parse_pdf_date),
            modified: self.modification_date.as_deref().and_then(parse_pdf_date),
        }
    }
}

/// EXIF fields of a raster image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// `DateTimeOriginal`, falling back to `DateTime`.
    #[serde(default)]
    pub creation_date: Option<String>,
    /// `DateTime`.
    #[serde(default)]
    pub modification_date: Option<String>,
    /// `Software`.
    #[serde(default)]
    pub software: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileMetadata {
    Pdf(PdfStructure),
    Image(ImageMetadata),
    Unsupported,
}

fn build_check(
    id_prefix: &str,
    kind: Kind,
    title: &str,
    description: impl Into<String>,
    score: i64,
    evidence: Vec<Evidence>,
    config: &ClientConfig,
) -> CheckResult {
    CheckResult::new(
        id_prefix,
        Category::FileMetadata,
        kind,
        title,
        description,
        score,
        evidence,
        config,
    )
}

/// Scores file metadata against the document's own dates.
#[derive(Debug, Clone, Default)]
pub struct MetadataScorer {
    producer: Arc<ProducerClassifier>,
}

impl MetadataScorer {
    pub fn new(producer: Arc<ProducerClassifier>) -> Self {
        Self { producer }
    }

    #[instrument(skip_all)]
    pub fn score(
        &self,
        metadata: &FileMetadata,
        labels: &LabelData,
        config: &ClientConfig,
    ) -> Vec<CheckResult> {
        let reference_texts: Vec<&str> = REFERENCE_DATE_FIELDS
            .iter()
            .filter_map(|f| labels.text(f))
            .collect();
        let reference = parse_reference_date(reference_texts.iter().copied());

        let checks = match metadata {
            FileMetadata::Pdf(pdf) => self.score_pdf(pdf, &reference_texts, reference, config),
            FileMetadata::Image(img) => self.score_image(img, &reference_texts, reference, config),
            FileMetadata::Unsupported => {
                info!("No metadata scorer for this file type");
                Vec::new()
            }
        };
        info!(checks = checks.len(), "Metadata analysis complete");
        checks
    }

    fn score_pdf(
        &self,
        pdf: &PdfStructure,
        reference_texts: &[&str],
        reference: Option<NaiveDateTime>,
        config: &ClientConfig,
    ) -> Vec<CheckResult> {
        let times = pdf.document_times();
        let mut checks = vec![timestamp_check(
            pdf.creation_date.as_deref(),
            pdf.modification_date.as_deref(),
            times,
            reference_texts,
            reference,
            "invoice date",
            config,
        )];

        if let Some(producer) = pdf.producer.as_deref().or(pdf.creator.as_deref()) {
            checks.push(self.producer_check(producer, config));
        }

        let producer_blank = pdf.producer.as_deref().map_or(true, |p| p.trim().is_empty());
        if let Some(xmp) = pdf.xmp_producer.as_deref().filter(|x| !x.trim().is_empty()) {
            if producer_blank {
                checks.push(build_check(
                    "ProducerXMPMismatchCheck",
                    Kind::ProducerXmpMismatch,
                    "Producer/XMP Mismatch",
                    "Producer field blank but XMP producer present",
                    60,
                    vec![Evidence::metadata(json!({ "xmp_producer": xmp }))],
                    config,
                ));
            }
        }

        if !pdf.signatures.is_empty() {
            let ctx = SigningContext {
                created: times.created,
                modified: times.modified,
                reference,
            };
            let summary = score_signatures(&pdf.signatures, &ctx, &config.signatures);
            let value = serde_json::to_value(&summary.risks).unwrap_or_default();
            checks.push(build_check(
                "DigitalSignatureCheck",
                Kind::DigitalSignatureInvalid,
                "Digital Signature Validation",
                summary.description.clone(),
                i64::from(summary.score),
                vec![Evidence::metadata(json!({ "signatures": value }))],
                config,
            ));
        }

        if !pdf.annotations.is_empty() {
            checks.push(annotation_check(pdf, times, config));
        }

        let image_only = !pdf.has_text;
        checks.push(build_check(
            "ImageOnlyPDFCheck",
            Kind::ImageOnlyPdf,
            "Image-only PDF",
            if image_only {
                "PDF contains only images"
            } else {
                "Text content present"
            },
            if image_only { 60 } else { 0 },
            vec![Evidence::metadata(json!({ "image_only": image_only }))],
            config,
        ));

        checks
    }

    fn score_image(
        &self,
        img: &ImageMetadata,
        reference_texts: &[&str],
        reference: Option<NaiveDateTime>,
        config: &ClientConfig,
    ) -> Vec<CheckResult> {
        let times = DocumentTimes {
            created: img.creation_date.as_deref().and_then(parse_image_date),
            modified: img.modification_date.as_deref().and_then(parse_image_date),
        };
        let mut checks = vec![timestamp_check(
            img.creation_date.as_deref(),
            img.modification_date.as_deref(),
            times,
            reference_texts,
            reference,
            "document date",
            config,
        )];
        if let Some(software) = img.software.as_deref() {
            checks.push(self.producer_check(software, config));
        }
        checks
    }

    fn producer_check(&self, producer: &str, config: &ClientConfig) -> CheckResult {
        let verdict = self.producer.classify(Some(producer));
        debug!(producer, score = verdict.score, "Classified producer");
        build_check(
            "ProducerCheck",
            Kind::SuspiciousProducer,
            "Producer Validation",
            verdict.description,
            i64::from(verdict.score),
            vec![Evidence::metadata(json!({ "producer": producer }))],
            config,
        )
    }
}

/// Later findings overwrite the description, the score only rises.
fn timestamp_check(
    creation_raw: Option<&str>,
    modification_raw: Option<&str>,
    times: DocumentTimes,
    reference_texts: &[&str],
    reference: Option<NaiveDateTime>,
    reference_name: &str,
    config: &ClientConfig,
) -> CheckResult {
    let max_days = config.metadata.max_date_diff_days;
    let mut score: i64 = 0;
    let mut description = String::from("Creation and modification dates are consistent");

    match (times.created, times.modified, reference) {
        (Some(c), Some(m), _) if m < c => {
            score = 80;
            description = "Modification date precedes creation date".into();
        }
        (Some(c), _, Some(r)) if days_apart(c, r) > max_days => {
            score = 60;
            description = format!(
                "Creation date is {} days from {}",
                days_apart(c, r),
                reference_name
            );
        }
        _ => {}
    }
    if let (Some(m), Some(r)) = (times.modified, reference) {
        let diff = days_apart(m, r);
        if diff > max_days {
            score = score.max(60);
            description = format!("Modification date is {} days from {}", diff, reference_name);
        }
    }
    if times.created.is_none() && times.modified.is_none() {
        score = 20;
        description = "Missing creation and modification dates".into();
    }

    let mut evidence = vec![
        Evidence::metadata(json!({ "creation_date": creation_raw })),
        Evidence::metadata(json!({ "modification_date": modification_raw })),
    ];
    if !reference_texts.is_empty() {
        evidence.push(Evidence::metadata(
            json!({ "document dates:": reference_texts.join(",") }),
        ));
    }

    build_check(
        "TimestampCheck",
        Kind::TimestampInconsistent,
        "Timestamp Consistency",
        description,
        score,
        evidence,
        config,
    )
}

fn annotation_check(pdf: &PdfStructure, times: DocumentTimes, config: &ClientConfig) -> CheckResult {
    let limits = &config.annotations;
    let summary = score_annotations(&pdf.annotations, &pdf.page_areas(), times, limits);
    let suspicious: Vec<_> = summary.suspicious().collect();

    let value = json!({
        "summary": {
            "total_annotations": pdf.annotations.len(),
            "counts_by_type": summary.counts_by_type,
            "suspicious_count": suspicious.len(),
            "score": summary.score,
        },
        "top_suspicious": suspicious.iter().take(limits.max_suspicious_evidence).collect::<Vec<_>>(),
        "sample_annotations": summary.risks.iter().take(limits.max_sample_evidence).collect::<Vec<_>>(),
    });

    build_check(
        "AnnotationCheck",
        Kind::AnnotationPresent,
        "Annotation Analysis",
        summary.describe(),
        i64::from(summary.score),
        vec![Evidence::metadata(value)],
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forensics::annotations::AnnotationAction;

    fn labels(date: &str) -> LabelData {
        LabelData::new().with_text("document_date", date)
    }

    fn find(checks: &[CheckResult], kind: Kind) -> Option<&CheckResult> {
        checks.iter().find(|c| c.kind == kind)
    }

    fn pdf() -> PdfStructure {
        PdfStructure {
            creation_date: Some("D:20240110000000".into()),
            modification_date: Some("D:20240111000000".into()),
            producer: Some("SAP NetWeaver 7.5".into()),
            has_text: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_pdf() {
        let config = ClientConfig::default();
        let checks = MetadataScorer::default().score(
            &FileMetadata::Pdf(pdf()),
            &labels("2024-01-15"),
            &config,
        );
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.category == Category::FileMetadata));
        assert_eq!(find(&checks, Kind::TimestampInconsistent).unwrap().score, 0);
        assert_eq!(find(&checks, Kind::SuspiciousProducer).unwrap().score, 5);
        let io = find(&checks, Kind::ImageOnlyPdf).unwrap();
        assert_eq!(io.score, 0);
        assert_eq!(io.description, "Text content present");
    }

    #[test]
    fn test_timestamp_rules() {
        let config = ClientConfig::default();
        let scorer = MetadataScorer::default();

        let mut p = pdf();
        p.modification_date = Some("D:20240101000000".into());
        let checks = scorer.score(&FileMetadata::Pdf(p), &labels("2024-01-15"), &config);
        let ts = find(&checks, Kind::TimestampInconsistent).unwrap();
        assert_eq!(ts.score, 80);
        assert_eq!(ts.description, "Modification date precedes creation date");

        let checks = scorer.score(&FileMetadata::Pdf(pdf()), &labels("15/06/2024"), &config);
        let ts = find(&checks, Kind::TimestampInconsistent).unwrap();
        assert_eq!(ts.score, 60);
        assert_eq!(ts.description, "Modification date is 156 days from invoice date");
        assert_eq!(ts.evidence.len(), 3);

        let mut p = pdf();
        p.creation_date = None;
        p.modification_date = Some("garbage".into());
        let checks = scorer.score(&FileMetadata::Pdf(p), &LabelData::new(), &config);
        let ts = find(&checks, Kind::TimestampInconsistent).unwrap();
        assert_eq!(ts.score, 20);
        assert_eq!(ts.evidence.len(), 2);
    }

    #[test]
    fn test_xmp_mismatch_and_image_only() {
        let config = ClientConfig::default();
        let mut p = pdf();
        p.producer = Some("  ".into());
        p.xmp_producer = Some("Adobe Photoshop".into());
        p.has_text = false;
        let checks = MetadataScorer::default().score(&FileMetadata::Pdf(p), &LabelData::new(), &config);
        assert_eq!(find(&checks, Kind::ProducerXmpMismatch).unwrap().score, 60);
        assert_eq!(find(&checks, Kind::SuspiciousProducer).unwrap().score, 50);
        let io = find(&checks, Kind::ImageOnlyPdf).unwrap();
        assert_eq!(io.score, 60);
        assert_eq!(io.description, "PDF contains only images");
    }

    #[test]
    fn test_signature_and_annotation_checks() {
        let config = ClientConfig::default();
        let mut p = pdf();
        p.signatures = vec![SignatureInfo {
            intact: Some(false),
            ..Default::default()
        }];
        p.annotations = vec![RawAnnotation {
            page: 1,
            subtype: Some("/Link".into()),
            action: Some(AnnotationAction {
                action_type: Some("JavaScript".into()),
                uri: None,
            }),
            ..Default::default()
        }];
        let checks = MetadataScorer::default().score(&FileMetadata::Pdf(p), &LabelData::new(), &config);

        let sig = find(&checks, Kind::DigitalSignatureInvalid).unwrap();
        assert_eq!(sig.score, 85);
        assert_eq!(sig.description, "Signature issues: cryptographic integrity check failed");

        let ann = find(&checks, Kind::AnnotationPresent).unwrap();
        assert!(ann.score >= 70);
        assert_eq!(ann.evidence[0].value["summary"]["total_annotations"], 1);
        assert_eq!(ann.evidence[0].value["summary"]["suspicious_count"], 1);
    }

    #[test]
    fn test_image_metadata() {
        let config = ClientConfig::default();
        let img = ImageMetadata {
            creation_date: Some("2023:01:01 10:00:00".into()),
            modification_date: Some("2023:01:01 10:00:00".into()),
            software: Some("Adobe Photoshop 24.0".into()),
        };
        let checks = MetadataScorer::default().score(&FileMetadata::Image(img), &labels("2024-01-15"), &config);
        assert_eq!(checks.len(), 2);
        let ts = find(&checks, Kind::TimestampInconsistent).unwrap();
        assert_eq!(ts.score, 60);
        assert_eq!(ts.description, "Modification date is 379 days from document date");
        assert_eq!(find(&checks, Kind::SuspiciousProducer).unwrap().score, 65);

        assert!(MetadataScorer::default()
            .score(&FileMetadata::Unsupported, &LabelData::new(), &config)
            .is_empty());
    }
}
