//! PDF and image forensics: producer, dates, annotations, signatures and the
//! metadata checks built on top of them.

pub mod annotations;
pub mod dates;
pub mod metadata;
pub mod producer;
pub mod signatures;

pub use annotations::{
    score_annotation, score_annotations, AnnotationAction, AnnotationFlags, AnnotationRisk,
    AnnotationSummary, DocumentTimes, RawAnnotation,
};
pub use metadata::{FileMetadata, ImageMetadata, MetadataScorer, PageGeometry, PdfStructure};
pub use producer::{ProducerClassifier, ProducerRule, ProducerVerdict};
pub use signatures::{
    score_signature, score_signatures, SignatureInfo, SignatureIssue, SignatureRisk,
    SignatureSummary, SigningContext,
};
