mod fixtures;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docfraud::collaborators::{
    CollaboratorResult, MetadataReader, OcrSource, PrecomputedBundle, UniformRelevance,
};
use docfraud::fonts::RelevanceLabel;
use docfraud::forensics::FileMetadata;
use docfraud::history::{DocumentStore, InMemoryStore};
use docfraud::types::{FileType, Kind, LabelData, Severity, SourceDocument, Status};
use docfraud::utils::metrics::{CHECKS_DEGRADED, CHECKS_TIMED_OUT, DOCUMENTS_ANALYZED};
use docfraud::validators::DeductionRegistry;
use docfraud::types::OcrWord;
use docfraud::{ClientConfig, CollaboratorError, Collaborators, Error, Pipeline};
use fixtures::font_page;
use serde_json::json;

fn tax_labels() -> LabelData {
    LabelData::new()
        .with_text("document_date", "2024-01-15")
        .with_text("job_departure_date", "2024-01-10")
        .with_text("deduction_file_number", "937-123456")
        .with_text("tax_officer_name", "Bad Officer")
}

fn tax_bundle(doc_id: &str) -> PrecomputedBundle {
    let mut doc = SourceDocument::new(doc_id);
    doc.parent_folder = Some("tax-assessor-certificate".into());
    let mut bundle = PrecomputedBundle::new(doc);
    bundle.pages = vec![font_page("Arial", 50, "Courier", 1)];
    bundle.labels = Some(tax_labels());
    bundle
}

#[tokio::test]
async fn test_resubmitted_certificate_is_critical() {
    let store = Arc::new(InMemoryStore::new());
    store
        .save_labels("doc-old", FileType::TaxCertificate, &tax_labels())
        .await
        .unwrap();

    let mut config = ClientConfig::default();
    config.tax_officer_blacklist = vec!["bad officer".into()];
    let registry = DeductionRegistry::from_rows(&[json!({"number": "937123456", "name": "Acme Ltd"})]);

    let bundle = tax_bundle("doc-new");
    let doc = bundle.document.clone();
    let mut collaborators = Collaborators::from_bundle(Arc::new(bundle), store.clone());
    collaborators.relevance = Arc::new(UniformRelevance::new(RelevanceLabel::Core));

    let pipeline = Pipeline::new(Arc::new(config), collaborators)
        .unwrap()
        .with_registry(Arc::new(registry));
    let (report, persistence) = pipeline.analyze_with_persistence(doc).await.unwrap();
    persistence.await.unwrap();

    let find = |prefix: &str| {
        report
            .checks
            .iter()
            .find(|c| c.id.starts_with(prefix))
            .unwrap()
    };
    let font = find("FontManipulationCheck");
    assert_eq!(font.score, 80);
    assert_eq!(font.description, "There are font issues in \"odd0\"");
    assert_eq!(find("HebrewEnglishDateMatch").status, Status::Skipped);
    assert_eq!(find("DepartureBeforeDocument").score, 0);
    assert_eq!(find("DeductionFileNumber").score, 0);
    assert_eq!(find("TaxOfficerBlacklist").score, 100);
    let duplicate = find("ExactDuplicateCheck");
    assert_eq!(duplicate.score, 100);
    assert_eq!(duplicate.evidence[0].value, json!({"doc_id": "doc-old"}));

    assert_eq!(report.overall.risk_score, 100);
    assert_eq!(report.overall.severity, Severity::Critical);
    assert_eq!(report.document.num_pages, Some(1));
    assert_eq!(report.selected_check_ids().len(), 2);

    assert_eq!(store.document_count(), 2);
    assert!(store.report("doc-new").is_some());
    assert_eq!(pipeline.metrics().get_counter(CHECKS_DEGRADED), 1);
}

struct SlowMetadata;

#[async_trait]
impl MetadataReader for SlowMetadata {
    async fn read(&self, _doc: &SourceDocument) -> CollaboratorResult<FileMetadata> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(FileMetadata::Unsupported)
    }
}

fn slow_pipeline(abort_on_timeout: bool) -> (Pipeline, SourceDocument) {
    let mut config = ClientConfig::default();
    config.pipeline.check_timeout_secs = 1;
    config.pipeline.abort_on_timeout = abort_on_timeout;

    let bundle = tax_bundle("doc-slow");
    let doc = bundle.document.clone();
    let mut collaborators = Collaborators::from_bundle(Arc::new(bundle), Arc::new(InMemoryStore::new()));
    collaborators.metadata = Arc::new(SlowMetadata);
    (Pipeline::new(Arc::new(config), collaborators).unwrap(), doc)
}

#[tokio::test]
async fn test_timed_out_check_is_skipped() {
    let (pipeline, doc) = slow_pipeline(false);
    let report = pipeline.analyze(doc).await.unwrap();

    let metadata = report
        .checks
        .iter()
        .find(|c| c.id.starts_with("MetadataCheck"))
        .unwrap();
    assert_eq!(metadata.status, Status::Skipped);
    assert_eq!(metadata.description, "timed out after 1s");
    assert_eq!(pipeline.metrics().get_counter(CHECKS_TIMED_OUT), 1);
}

#[tokio::test]
async fn test_timeout_aborts_document() {
    let (pipeline, doc) = slow_pipeline(true);
    let err = pipeline.analyze(doc).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { ref check, seconds: 1 } if check == "metadata"));
    assert_eq!(pipeline.metrics().get_counter(DOCUMENTS_ANALYZED), 0);
}

struct BrokenOcr;

#[async_trait]
impl OcrSource for BrokenOcr {
    async fn pages(&self, _doc: &SourceDocument) -> CollaboratorResult<Vec<Vec<OcrWord>>> {
        Err(CollaboratorError::Ocr("service unavailable".into()))
    }
}

#[tokio::test]
async fn test_ocr_failure_skips_font_check_only() {
    let mut config = ClientConfig::default();
    config.tax_officer_blacklist = vec!["Bad Officer".into()];
    let bundle = tax_bundle("doc-ocr");
    let doc = bundle.document.clone();
    let mut collaborators = Collaborators::from_bundle(Arc::new(bundle), Arc::new(InMemoryStore::new()));
    collaborators.ocr = Arc::new(BrokenOcr);

    let pipeline = Pipeline::new(Arc::new(config), collaborators).unwrap();
    let report = pipeline.analyze(doc).await.unwrap();

    let font = report
        .checks
        .iter()
        .find(|c| c.kind == Kind::FontManipulation)
        .unwrap();
    assert_eq!(font.status, Status::Skipped);
    assert!(font.description.contains("service unavailable"));
    assert_eq!(report.document.num_pages, Some(0));
    // M = 2 material text checks, so K = 1 and the blacklist hit decides
    assert_eq!(report.overall.risk_score, 100);
}

#[test]
fn test_bundle_file_end_to_end() {
    let words: Vec<serde_json::Value> = (0..20)
        .map(|i| {
            let y = 100.0 + f64::from(i) * 14.0;
            json!({"text": format!("w{}", i), "bbox": [50.0, y, 120.0, y + 12.0], "font": "Arial"})
        })
        .collect();
    let bundle = json!({
        "document": {
            "doc_id": "doc-9",
            "source": "uploads/cert.pdf",
            "parent_folder": "employment-termination-certificate"
        },
        "pages": [words],
        "labels": {
            "document_date": {"text": "2024-03-01"},
            "job_start_date": {"text": "2020-01-01"},
            "job_departure_date": {"text": "2024-02-28"},
            "worker_id": {"text": "12345678"}
        },
        "metadata": {
            "kind": "pdf",
            "creation_date": "D:20240229100000",
            "modification_date": "D:20240229100500",
            "producer": "SAP NetWeaver 7.5"
        }
    });
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", bundle).unwrap();

    let bundle = PrecomputedBundle::from_file(file.path()).unwrap();
    let doc = bundle.document.clone();
    let collaborators = Collaborators::from_bundle(Arc::new(bundle), Arc::new(InMemoryStore::new()));
    let pipeline = Pipeline::new(Arc::new(ClientConfig::default()), collaborators).unwrap();

    let report = tokio_test::block_on(async {
        let (report, persistence) = pipeline.analyze_with_persistence(doc).await.unwrap();
        persistence.await.unwrap();
        report
    });

    let worker = report
        .checks
        .iter()
        .find(|c| c.kind == Kind::IdFormat)
        .unwrap();
    assert_eq!(worker.score, 60);
    assert_eq!(worker.status, Status::Warn);
    assert!(report.checks.iter().any(|c| c.kind == Kind::SuspiciousProducer && c.score == 5));
    assert_eq!(report.overall.risk_score, 60);
    assert_eq!(report.overall.severity, Severity::High);
    assert_eq!(report.document.source.as_deref(), Some("uploads/cert.pdf"));

    let value = serde_json::to_value(&report).unwrap();
    let checks = value["checks"].as_array().unwrap();
    assert!(checks.iter().any(|c| c["category"] == "historical_patterns"));
    assert!(checks.iter().all(|c| c.get("tags").is_none()));
}
