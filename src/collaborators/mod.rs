//! External services the checks depend on
//!
//! Each trait is a seam for a remote system (OCR, LLM field extraction,
//! PDF structure reading, rendering, relevance labelling). Failures are
//! reported as [`CollaboratorError`] and degrade the dependent check only.

pub mod bundle;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::fonts::{FontAnomaly, Relevance, RenderedImage};
use crate::forensics::FileMetadata;
use crate::types::{FileType, LabelData, OcrWord, SourceDocument, WordRecord};

pub use bundle::{PrecomputedBundle, UniformRelevance};

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Text layer or OCR output, one inner list per page in reading order.
#[async_trait]
pub trait OcrSource: Send + Sync {
    async fn pages(&self, doc: &SourceDocument) -> CollaboratorResult<Vec<Vec<OcrWord>>>;
}

/// Structured field extraction for a document family.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(
        &self,
        doc: &SourceDocument,
        file_type: FileType,
        words: &[WordRecord],
    ) -> CollaboratorResult<LabelData>;
}

/// PDF structure or image EXIF reader.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    async fn read(&self, doc: &SourceDocument) -> CollaboratorResult<FileMetadata>;
}

/// Renders the first page for the visual font fallback.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_first_page(&self, doc: &SourceDocument) -> CollaboratorResult<Option<RenderedImage>>;
}

/// Labels the anomalies of one page as core, ancillary or noise.
///
/// Answers are positional; a short or long answer is reconciled by the caller.
#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
    async fn classify_page(
        &self,
        page: u32,
        anomalies: &[FontAnomaly],
    ) -> CollaboratorResult<Vec<Relevance>>;
}
