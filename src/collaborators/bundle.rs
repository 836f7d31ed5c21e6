//! Collaborators backed by precomputed JSON
//!
//! A bundle carries everything the remote services would have returned for a
//! single document, so the pipeline can run offline.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CollaboratorResult, FieldExtractor, MetadataReader, OcrSource, PageRenderer,
    RelevanceClassifier,
};
use crate::error::{CollaboratorError, Result};
use crate::fonts::{FontAnomaly, Relevance, RelevanceLabel, RenderedImage};
use crate::forensics::FileMetadata;
use crate::types::{FileType, LabelData, OcrWord, SourceDocument, WordRecord};

fn unsupported_metadata() -> FileMetadata {
    FileMetadata::Unsupported
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputedBundle {
    pub document: SourceDocument,
    #[serde(default)]
    pub pages: Vec<Vec<OcrWord>>,
    /// `None` makes field extraction fail.
    #[serde(default)]
    pub labels: Option<LabelData>,
    #[serde(default = "unsupported_metadata")]
    pub metadata: FileMetadata,
    #[serde(default)]
    pub rendered_page: Option<RenderedImage>,
    /// Per-page relevance answers; pages without an entry fail classification.
    #[serde(default)]
    pub relevance: BTreeMap<u32, Vec<Relevance>>,
}

impl PrecomputedBundle {
    pub fn new(document: SourceDocument) -> Self {
        Self {
            document,
            pages: Vec::new(),
            labels: None,
            metadata: FileMetadata::Unsupported,
            rendered_page: None,
            relevance: BTreeMap::new(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bundle: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(doc_id = %bundle.document.doc_id, pages = bundle.pages.len(), "Loaded bundle");
        Ok(bundle)
    }
}

#[async_trait]
impl OcrSource for PrecomputedBundle {
    async fn pages(&self, _doc: &SourceDocument) -> CollaboratorResult<Vec<Vec<OcrWord>>> {
        Ok(self.pages.clone())
    }
}

#[async_trait]
impl FieldExtractor for PrecomputedBundle {
    async fn extract(
        &self,
        _doc: &SourceDocument,
        _file_type: FileType,
        _words: &[WordRecord],
    ) -> CollaboratorResult<LabelData> {
        self.labels
            .clone()
            .ok_or_else(|| CollaboratorError::FieldExtraction("bundle has no labels".into()))
    }
}

#[async_trait]
impl MetadataReader for PrecomputedBundle {
    async fn read(&self, _doc: &SourceDocument) -> CollaboratorResult<FileMetadata> {
        Ok(self.metadata.clone())
    }
}

#[async_trait]
impl PageRenderer for PrecomputedBundle {
    async fn render_first_page(&self, _doc: &SourceDocument) -> CollaboratorResult<Option<RenderedImage>> {
        Ok(self.rendered_page.clone())
    }
}

#[async_trait]
impl RelevanceClassifier for PrecomputedBundle {
    async fn classify_page(
        &self,
        page: u32,
        _anomalies: &[FontAnomaly],
    ) -> CollaboratorResult<Vec<Relevance>> {
        self.relevance
            .get(&page)
            .cloned()
            .ok_or_else(|| CollaboratorError::Relevance(format!("no answer for page {}", page)))
    }
}

/// Gives every anomaly the same label.
#[derive(Debug, Clone)]
pub struct UniformRelevance {
    pub label: RelevanceLabel,
    pub confidence: f64,
}

impl UniformRelevance {
    pub fn new(label: RelevanceLabel) -> Self {
        Self {
            label,
            confidence: 1.0,
        }
    }
}

#[async_trait]
impl RelevanceClassifier for UniformRelevance {
    async fn classify_page(
        &self,
        _page: u32,
        anomalies: &[FontAnomaly],
    ) -> CollaboratorResult<Vec<Relevance>> {
        Ok(anomalies
            .iter()
            .map(|_| Relevance::new(self.label, "uniform", self.confidence))
            .collect())
    }
}
