//! Historical pattern checks against previously analysed documents

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::CollaboratorError;
use crate::types::{Category, CheckResult, Evidence, FileType, FraudReport, Kind, LabelData};

/// Exact-match filters on label field text.
pub type FieldFilters = BTreeMap<String, String>;

/// Persistence for extracted labels and finished reports.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ids of stored documents of `file_type` whose label text equals every filter.
    async fn find_documents(
        &self,
        file_type: FileType,
        filters: &FieldFilters,
    ) -> Result<Vec<String>, CollaboratorError>;

    async fn save_labels(
        &self,
        doc_id: &str,
        file_type: FileType,
        labels: &LabelData,
    ) -> Result<(), CollaboratorError>;

    async fn save_report(&self, report: &FraudReport) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone)]
struct StoredLabels {
    file_type: FileType,
    labels: LabelData,
}

/// Process-local store, for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    labels: RwLock<HashMap<String, StoredLabels>>,
    reports: RwLock<HashMap<String, FraudReport>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, doc_id: &str) -> Option<FraudReport> {
        self.reports.read().get(doc_id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.labels.read().len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_documents(
        &self,
        file_type: FileType,
        filters: &FieldFilters,
    ) -> Result<Vec<String>, CollaboratorError> {
        let labels = self.labels.read();
        let mut ids: Vec<String> = labels
            .iter()
            .filter(|(_, stored)| stored.file_type == file_type)
            .filter(|(_, stored)| {
                filters.iter().all(|(field, text)| {
                    stored
                        .labels
                        .get(field)
                        .and_then(|f| f.text.as_deref())
                        .is_some_and(|t| t == text)
                })
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn save_labels(
        &self,
        doc_id: &str,
        file_type: FileType,
        labels: &LabelData,
    ) -> Result<(), CollaboratorError> {
        self.labels.write().insert(
            doc_id.to_string(),
            StoredLabels {
                file_type,
                labels: labels.clone(),
            },
        );
        Ok(())
    }

    async fn save_report(&self, report: &FraudReport) -> Result<(), CollaboratorError> {
        self.reports
            .write()
            .insert(report.document.doc_id.clone(), report.clone());
        Ok(())
    }
}

/// Every label field that carries text becomes a filter.
pub fn duplicate_filters(labels: &LabelData) -> FieldFilters {
    labels
        .iter()
        .filter_map(|(field, value)| value.text.clone().map(|t| (field.clone(), t)))
        .collect()
}

/// Flags documents whose extracted fields exactly match an earlier upload.
#[instrument(skip(store, labels, config))]
pub async fn check_duplicate(
    store: &dyn DocumentStore,
    doc_id: &str,
    file_type: FileType,
    labels: &LabelData,
    config: &ClientConfig,
) -> CheckResult {
    let filters = duplicate_filters(labels);
    let mut duplicates: Vec<String> = Vec::new();

    if filters.is_empty() {
        warn!("Insufficient label data for duplicate check");
    } else {
        debug!(fields = filters.len(), "Searching for duplicates");
        match store.find_documents(file_type, &filters).await {
            Ok(ids) => duplicates = ids.into_iter().filter(|id| id != doc_id).collect(),
            Err(e) => error!(error = %e, "Duplicate search failed"),
        }
    }

    if duplicates.is_empty() {
        info!("No duplicate document found");
    } else {
        info!(?duplicates, "Duplicate documents found");
    }

    let evidence = duplicates
        .iter()
        .map(|id| Evidence::field(json!({ "doc_id": id })))
        .collect();
    let found = !duplicates.is_empty();
    CheckResult::new(
        "ExactDuplicateCheck",
        Category::HistoricalPatterns,
        Kind::ExactDuplicate,
        "Duplicate Document Check",
        if found {
            "Exact duplicates found"
        } else {
            "No duplicate found"
        },
        if found { 100 } else { 0 },
        evidence,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(worker: &str) -> LabelData {
        LabelData::new()
            .with_text("worker_id", worker)
            .with_text("document_date", "2024-01-15")
    }

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn find_documents(
            &self,
            _file_type: FileType,
            _filters: &FieldFilters,
        ) -> Result<Vec<String>, CollaboratorError> {
            Err(CollaboratorError::Store("unavailable".into()))
        }

        async fn save_labels(
            &self,
            _doc_id: &str,
            _file_type: FileType,
            _labels: &LabelData,
        ) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Store("unavailable".into()))
        }

        async fn save_report(&self, _report: &FraudReport) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Store("unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_finds_exact_duplicate() {
        let config = ClientConfig::default();
        let store = InMemoryStore::new();
        let tt = FileType::TerminationCertificate;
        store.save_labels("doc-1", tt, &labels("123456789")).await.unwrap();
        store.save_labels("doc-2", tt, &labels("987654321")).await.unwrap();
        store
            .save_labels("doc-3", FileType::TaxCertificate, &labels("123456789"))
            .await
            .unwrap();

        let check = check_duplicate(&store, "doc-9", tt, &labels("123456789"), &config).await;
        assert_eq!(check.score, 100);
        assert_eq!(check.category, Category::HistoricalPatterns);
        assert_eq!(check.evidence.len(), 1);
        assert_eq!(check.evidence[0].value, json!({"doc_id": "doc-1"}));
    }

    #[tokio::test]
    async fn test_ignores_own_document() {
        let config = ClientConfig::default();
        let store = InMemoryStore::new();
        let tt = FileType::TerminationCertificate;
        store.save_labels("doc-1", tt, &labels("123456789")).await.unwrap();

        let check = check_duplicate(&store, "doc-1", tt, &labels("123456789"), &config).await;
        assert_eq!(check.score, 0);
        assert_eq!(check.description, "No duplicate found");
    }

    #[tokio::test]
    async fn test_no_fields_or_store_failure() {
        let config = ClientConfig::default();
        let tt = FileType::TaxCertificate;

        let check = check_duplicate(&InMemoryStore::new(), "d", tt, &LabelData::new(), &config).await;
        assert_eq!(check.score, 0);

        let check = check_duplicate(&FailingStore, "d", tt, &labels("1"), &config).await;
        assert_eq!(check.score, 0);
        assert!(check.evidence.is_empty());
    }
}
