//! Document scoring pipeline
//!
//! Stages: text extraction, field extraction, concurrent checks, aggregation,
//! then persistence in the background. A failing collaborator degrades only
//! the check that depends on it.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::create_fraud_report;
use crate::collaborators::{
    FieldExtractor, MetadataReader, OcrSource, PageRenderer, PrecomputedBundle,
    RelevanceClassifier,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::fonts::{build_font_check, classify_anomalies, FontAnomalyDetector, VisualAnomalyDetector};
use crate::forensics::{MetadataScorer, ProducerClassifier};
use crate::history::{check_duplicate, DocumentStore};
use crate::types::{
    number_pages, Category, CheckResult, DocumentInfo, FileType, FraudReport, Kind, LabelData,
    SourceDocument, WordRecord,
};
use crate::utils::metrics::{
    self, Metrics, CHECKS_DEGRADED, CHECKS_RUN, CHECKS_TIMED_OUT, DOCUMENTS_ANALYZED,
};
use crate::validators::{run_validators, DeductionRegistry, HebrewDateParser, ValidationContext};

/// The remote services one pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ocr: Arc<dyn OcrSource>,
    pub fields: Arc<dyn FieldExtractor>,
    pub metadata: Arc<dyn MetadataReader>,
    pub renderer: Arc<dyn PageRenderer>,
    pub relevance: Arc<dyn RelevanceClassifier>,
    pub store: Arc<dyn DocumentStore>,
}

impl Collaborators {
    /// Every service answered from one precomputed bundle.
    pub fn from_bundle(bundle: Arc<PrecomputedBundle>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            ocr: bundle.clone(),
            fields: bundle.clone(),
            metadata: bundle.clone(),
            renderer: bundle.clone(),
            relevance: bundle,
            store,
        }
    }
}

/// Identity of a check group, used when the whole group has to be skipped.
#[derive(Debug, Clone, Copy)]
struct CheckGroup {
    name: &'static str,
    id_prefix: &'static str,
    category: Category,
    kind: Kind,
    title: &'static str,
}

impl CheckGroup {
    fn skipped(&self, reason: impl Into<String>) -> CheckResult {
        CheckResult::skipped(self.id_prefix, self.category, self.kind, self.title, reason)
    }
}

const FONT_GROUP: CheckGroup = CheckGroup {
    name: "fonts",
    id_prefix: "FontManipulationCheck",
    category: Category::VisualAnalysis,
    kind: Kind::FontManipulation,
    title: "Font Manipulation",
};

const METADATA_GROUP: CheckGroup = CheckGroup {
    name: "metadata",
    id_prefix: "MetadataCheck",
    category: Category::FileMetadata,
    kind: Kind::TimestampInconsistent,
    title: "Metadata Analysis",
};

const TEXT_GROUP: CheckGroup = CheckGroup {
    name: "text",
    id_prefix: "TextValidation",
    category: Category::CrossSourceVerification,
    kind: Kind::DateConsistency,
    title: "Text Validation",
};

const DUPLICATE_GROUP: CheckGroup = CheckGroup {
    name: "duplicates",
    id_prefix: "ExactDuplicateCheck",
    category: Category::HistoricalPatterns,
    kind: Kind::ExactDuplicate,
    title: "Duplicate Document Check",
};

/// Output of the extraction stages.
struct Extracted {
    words: Vec<WordRecord>,
    num_pages: u32,
    ocr_error: Option<String>,
    labels: LabelData,
}

pub struct Pipeline {
    config: Arc<ClientConfig>,
    collaborators: Collaborators,
    font_detector: FontAnomalyDetector,
    metadata_scorer: MetadataScorer,
    registry: Arc<DeductionRegistry>,
    hebrew_dates: Option<Arc<dyn HebrewDateParser>>,
    metrics: Metrics,
}

impl Pipeline {
    pub fn new(config: Arc<ClientConfig>, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let font_detector = FontAnomalyDetector::new(&config.font)?;
        Ok(Self {
            config,
            collaborators,
            font_detector,
            metadata_scorer: MetadataScorer::default(),
            registry: Arc::new(DeductionRegistry::default()),
            hebrew_dates: None,
            metrics: Metrics::new(),
        })
    }

    pub fn with_registry(mut self, registry: Arc<DeductionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_hebrew_date_parser(mut self, parser: Arc<dyn HebrewDateParser>) -> Self {
        self.hebrew_dates = Some(parser);
        self
    }

    pub fn with_producer_classifier(mut self, classifier: Arc<ProducerClassifier>) -> Self {
        self.metadata_scorer = MetadataScorer::new(classifier);
        self
    }

    pub fn with_visual_detector(mut self, visual: Arc<dyn VisualAnomalyDetector>) -> Self {
        self.font_detector = self.font_detector.with_visual_detector(visual);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Score a document and persist the result in the background.
    pub async fn analyze(&self, doc: SourceDocument) -> Result<FraudReport> {
        let (report, _persistence) = self.analyze_with_persistence(doc).await?;
        Ok(report)
    }

    /// Like [`Pipeline::analyze`], also returning the persistence task.
    ///
    /// The report is final before persistence starts; a failed save is only logged.
    #[instrument(skip(self, doc), fields(doc_id = %doc.doc_id))]
    pub async fn analyze_with_persistence(
        &self,
        doc: SourceDocument,
    ) -> Result<(FraudReport, JoinHandle<()>)> {
        info!("🚦 Starting document analysis");
        let started = Instant::now();
        let file_type = doc.file_type();

        let extracted = self.stage_extraction(&doc, file_type).await;
        let checks = self.stage_checks(&doc, file_type, &extracted).await?;

        info!("🧮 Aggregating {} checks", checks.len());
        let info = DocumentInfo::from_source(&doc, Some(extracted.num_pages));
        let report = create_fraud_report(checks, info, &self.config);

        self.metrics.increment_counter(DOCUMENTS_ANALYZED);
        self.metrics
            .set_gauge("last_risk_score", f64::from(report.overall.risk_score));
        self.metrics.record_duration("analyze", started.elapsed());

        let persistence = self.spawn_persistence(&doc, file_type, extracted.labels, &report);
        info!(
            risk_score = report.overall.risk_score,
            severity = %report.overall.severity,
            "✅ Document analysis complete"
        );
        Ok((report, persistence))
    }

    /// OCR then field extraction. Neither failure aborts the document.
    #[instrument(skip_all)]
    async fn stage_extraction(&self, doc: &SourceDocument, file_type: FileType) -> Extracted {
        info!("🔎 Extracting text and fields");
        let (pages, ocr_error) = match self.collaborators.ocr.pages(doc).await {
            Ok(pages) => (pages, None),
            Err(e) => {
                error!(error = %e, "Text extraction failed");
                (Vec::new(), Some(e.to_string()))
            }
        };
        let num_pages = pages.len() as u32;
        let words = number_pages(pages);
        debug!(pages = num_pages, words = words.len(), "Text extracted");

        let labels = match self.collaborators.fields.extract(doc, file_type, &words).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %e, "Field extraction failed, continuing with empty labels");
                LabelData::new()
            }
        };

        Extracted {
            words,
            num_pages,
            ocr_error,
            labels,
        }
    }

    /// Run the four check groups concurrently, each under the check timeout.
    #[instrument(skip_all)]
    async fn stage_checks(
        &self,
        doc: &SourceDocument,
        file_type: FileType,
        extracted: &Extracted,
    ) -> Result<Vec<CheckResult>> {
        info!("🧪 Running checks");
        let labels = &extracted.labels;

        let (fonts, metadata, text, duplicates) = tokio::join!(
            self.timed(FONT_GROUP, self.font_checks(doc, extracted)),
            self.timed(METADATA_GROUP, self.metadata_checks(doc, labels)),
            self.timed(TEXT_GROUP, async { self.text_checks(file_type, labels) }),
            self.timed(DUPLICATE_GROUP, self.duplicate_checks(doc, file_type, labels)),
        );

        let mut checks = Vec::new();
        for (group, outcome) in [
            (FONT_GROUP, fonts),
            (METADATA_GROUP, metadata),
            (TEXT_GROUP, text),
            (DUPLICATE_GROUP, duplicates),
        ] {
            checks.extend(self.resolve(group, outcome)?);
        }

        let degraded = checks.iter().filter(|c| c.is_skipped()).count() as u64;
        self.metrics
            .add_to_counter(CHECKS_RUN, checks.len() as u64 - degraded);
        self.metrics.add_to_counter(CHECKS_DEGRADED, degraded);
        Ok(checks)
    }

    async fn timed<F>(&self, group: CheckGroup, fut: F) -> Option<Vec<CheckResult>>
    where
        F: Future<Output = Vec<CheckResult>>,
    {
        let limit = Duration::from_secs(self.config.pipeline.check_timeout_secs);
        let started = Instant::now();
        let out = tokio::time::timeout(limit, fut).await.ok();
        self.metrics.record_duration(group.name, started.elapsed());
        out
    }

    /// A timed-out group either aborts the document or becomes one skipped check.
    fn resolve(&self, group: CheckGroup, outcome: Option<Vec<CheckResult>>) -> Result<Vec<CheckResult>> {
        match outcome {
            Some(checks) => Ok(checks),
            None => {
                let seconds = self.config.pipeline.check_timeout_secs;
                self.metrics.increment_counter(CHECKS_TIMED_OUT);
                if self.config.pipeline.abort_on_timeout {
                    error!(check = group.name, seconds, "Check timed out, abandoning document");
                    return Err(Error::Timeout {
                        check: group.name.to_string(),
                        seconds,
                    });
                }
                warn!(check = group.name, seconds, "Check timed out, marking as skipped");
                Ok(vec![group.skipped(format!("timed out after {}s", seconds))])
            }
        }
    }

    async fn font_checks(&self, doc: &SourceDocument, extracted: &Extracted) -> Vec<CheckResult> {
        if let Some(e) = &extracted.ocr_error {
            return vec![FONT_GROUP.skipped(format!("text extraction failed: {}", e))];
        }

        let has_font = extracted.words.iter().any(|w| w.font.is_some());
        let image = if has_font {
            None
        } else {
            match self.collaborators.renderer.render_first_page(doc).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(error = %e, "Page rendering failed");
                    None
                }
            }
        };

        let anomalies = match self.font_detector.detect(&extracted.words, image.as_ref()) {
            Ok(anomalies) => anomalies,
            Err(e) => {
                warn!(error = %e, "Font anomaly detection unavailable");
                return vec![FONT_GROUP.skipped(e.to_string())];
            }
        };

        let classified = classify_anomalies(
            self.collaborators.relevance.as_ref(),
            anomalies,
            self.config.font_check.fallback_confidence,
        )
        .await;
        vec![build_font_check(&classified, &self.config)]
    }

    async fn metadata_checks(&self, doc: &SourceDocument, labels: &LabelData) -> Vec<CheckResult> {
        match self.collaborators.metadata.read(doc).await {
            Ok(metadata) => self.metadata_scorer.score(&metadata, labels, &self.config),
            Err(e) => {
                error!(error = %e, "Metadata reader failed");
                vec![METADATA_GROUP.skipped(e.to_string())]
            }
        }
    }

    fn text_checks(&self, file_type: FileType, labels: &LabelData) -> Vec<CheckResult> {
        let ctx = ValidationContext {
            config: &self.config,
            registry: &self.registry,
            hebrew_dates: self.hebrew_dates.as_deref(),
        };
        run_validators(file_type, labels, &ctx)
    }

    async fn duplicate_checks(
        &self,
        doc: &SourceDocument,
        file_type: FileType,
        labels: &LabelData,
    ) -> Vec<CheckResult> {
        vec![
            check_duplicate(
                self.collaborators.store.as_ref(),
                &doc.doc_id,
                file_type,
                labels,
                &self.config,
            )
            .await,
        ]
    }

    fn spawn_persistence(
        &self,
        doc: &SourceDocument,
        file_type: FileType,
        labels: LabelData,
        report: &FraudReport,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.collaborators.store);
        let metrics = self.metrics.clone();
        let doc_id = doc.doc_id.clone();
        let report = report.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_labels(&doc_id, file_type, &labels).await {
                error!(doc_id = %doc_id, error = %e, "Failed to persist labels");
                metrics.increment_counter(metrics::PERSISTENCE_FAILURES);
            }
            if let Err(e) = store.save_report(&report).await {
                error!(doc_id = %doc_id, error = %e, "Failed to persist report");
                metrics.increment_counter(metrics::PERSISTENCE_FAILURES);
            }
            debug!(doc_id = %doc_id, "Persistence finished");
        })
    }

    /// Wait for the task returned by [`Pipeline::analyze_with_persistence`].
    /// A panicked or cancelled task is logged and counted as a persistence failure.
    pub async fn finish_persistence(&self, handle: JoinHandle<()>, doc_id: &str) -> Result<()> {
        handle.await.map_err(|e| {
            error!(doc_id = %doc_id, error = %e, "Persistence task did not complete");
            self.metrics.increment_counter(metrics::PERSISTENCE_FAILURES);
            Error::Persistence(e.to_string())
        })
    }
}
