use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::FileType;

/// Bounding box as `[x0, y0, x1, y1]` in page coordinates, y growing downwards.
pub type BBox = [f64; 4];

/// A word as produced by the OCR / text-layer source, before page numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BBox,
    #[serde(default)]
    pub font: Option<String>,
}

/// One OCR word tagged with its 1-based page number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRecord {
    pub text: String,
    pub bbox: BBox,
    #[serde(default)]
    pub font: Option<String>,
    pub page: u32,
}

impl WordRecord {
    pub fn from_ocr(word: OcrWord, page: u32) -> Self {
        Self {
            text: word.text,
            bbox: word.bbox,
            font: word.font,
            page,
        }
    }

    /// True when the word carries a non-blank font name.
    pub fn has_font(&self) -> bool {
        self.font.as_deref().is_some_and(|f| !f.trim().is_empty())
    }
}

/// Flatten per-page OCR output into page-numbered word records.
pub fn number_pages(pages: Vec<Vec<OcrWord>>) -> Vec<WordRecord> {
    pages
        .into_iter()
        .enumerate()
        .flat_map(|(idx, words)| {
            let page = idx as u32 + 1;
            words.into_iter().map(move |w| WordRecord::from_ocr(w, page))
        })
        .collect()
}

/// A single extracted field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub bbox: Option<BBox>,
}

/// Structured fields extracted from a document, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelData(pub BTreeMap<String, FieldValue>);

impl LabelData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    /// Convenience for building fixtures and CLI input.
    pub fn with_text(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(
            name,
            FieldValue {
                text: Some(text.into()),
                ..FieldValue::default()
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Trimmed, non-empty text of a field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|f| f.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn original_text(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|f| f.original_text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn bbox(&self, name: &str) -> Option<BBox> {
        self.0.get(name).and_then(|f| f.bbox)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

/// The document handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub doc_id: String,
    /// Where the file came from (object key, path, URL).
    #[serde(default)]
    pub source: Option<String>,
    /// Upload folder; decides the document family.
    #[serde(default)]
    pub parent_folder: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl SourceDocument {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            source: None,
            parent_folder: None,
            mime_type: None,
        }
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_parent_folder(self.parent_folder.as_deref())
    }

    pub fn is_pdf(&self) -> bool {
        let by_mime = self
            .mime_type
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("application/pdf"));
        let by_name = self
            .source
            .as_deref()
            .is_some_and(|s| s.to_lowercase().ends_with(".pdf"));
        by_mime || by_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: String,
    pub source: Option<String>,
    pub mime_type: Option<String>,
    pub num_pages: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DocumentInfo {
    pub fn from_source(doc: &SourceDocument, num_pages: Option<u32>) -> Self {
        Self {
            doc_id: doc.doc_id.clone(),
            source: doc.source.clone(),
            mime_type: doc.mime_type.clone(),
            num_pages,
            created_at: Some(Utc::now()),
        }
    }
}
