//! Font anomaly detection
//!
//! Flags words set in a font that is statistically rare within the document.
//! When the text source carries no font names at all, detection falls back to
//! an injected visual detector working on a rendered page image.

pub mod context;
pub mod relevance;
pub mod stats;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::FontConfig;
use crate::error::{Error, Result};
use crate::types::{number_pages, BBox, OcrWord, WordRecord};

pub use context::ContextFilter;
pub use relevance::{
    build_font_check, classify_anomalies, ClassifiedAnomaly, Relevance, RelevanceLabel,
};
pub use stats::{
    binom_cdf_le, dynamic_doc_threshold, normalize_font_name, wilson_upper_bound,
    ThresholdParams,
};

/// A word whose font is rare within its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontAnomaly {
    pub text: String,
    pub bbox: BBox,
    pub page: u32,
    /// Declared font name; `None` for findings from the visual detector.
    pub font: Option<String>,
    /// Observed share of the font among words with a font.
    pub present: f64,
    pub p_value: f64,
    pub score: u8,
    pub reason: String,
}

/// Rendered page handed to the visual fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedImage {
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// Image-feature anomaly detection, used when no font names are available.
pub trait VisualAnomalyDetector: Send + Sync {
    fn detect(&self, words: &[WordRecord], image: &RenderedImage) -> Result<Vec<FontAnomaly>>;
}

pub struct FontAnomalyDetector {
    params: ThresholdParams,
    context: ContextFilter,
    visual: Option<Arc<dyn VisualAnomalyDetector>>,
}

impl FontAnomalyDetector {
    pub fn new(config: &FontConfig) -> Result<Self> {
        Ok(Self {
            params: ThresholdParams::from(config),
            context: ContextFilter::from_config(config)?,
            visual: None,
        })
    }

    pub fn with_visual_detector(mut self, visual: Arc<dyn VisualAnomalyDetector>) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn params(&self) -> &ThresholdParams {
        &self.params
    }

    /// Detect anomalies in per-page OCR output.
    pub fn detect_pages(
        &self,
        pages: Vec<Vec<OcrWord>>,
        image: Option<&RenderedImage>,
    ) -> Result<Vec<FontAnomaly>> {
        self.detect(&number_pages(pages), image)
    }

    /// Detect anomalies in page-numbered words.
    ///
    /// Fails with [`Error::MissingDetectionInput`] when no word has a font and
    /// no usable rendered image was given.
    #[instrument(skip_all, fields(words = words.len()))]
    pub fn detect(
        &self,
        words: &[WordRecord],
        image: Option<&RenderedImage>,
    ) -> Result<Vec<FontAnomaly>> {
        // Decided on the unfiltered words so suppression never flips the mode.
        let has_font = words.iter().any(|w| w.font.is_some());
        let filtered = self.context.filter(words);
        if filtered.len() != words.len() {
            debug!(dropped = words.len() - filtered.len(), "Suppressed boilerplate words");
        }

        if has_font {
            return Ok(self.detect_font_anomalies(&filtered));
        }

        match (image, &self.visual) {
            (Some(image), Some(visual)) => {
                info!(page = image.page, "No font metadata; using visual detector");
                visual.detect(&filtered, image)
            }
            (Some(_), None) => {
                warn!("Rendered image supplied but no visual detector configured");
                Err(Error::missing_input(
                    "no font metadata and no visual detector configured",
                ))
            }
            (None, _) => Err(Error::missing_input(
                "no font info and no image provided for anomaly detection",
            )),
        }
    }

    fn detect_font_anomalies(&self, words: &[WordRecord]) -> Vec<FontAnomaly> {
        let mut font_counts: HashMap<String, u64> = HashMap::new();
        let mut total_with_font = 0u64;
        for w in words.iter().filter(|w| w.has_font()) {
            let font = w.font.as_deref().unwrap_or_default();
            *font_counts.entry(normalize_font_name(font)).or_insert(0) += 1;
            total_with_font += 1;
        }

        let t_doc = dynamic_doc_threshold(total_with_font, &font_counts, &self.params);
        debug!(
            total_with_font,
            distinct_fonts = font_counts.len(),
            threshold = t_doc,
            "Computed document font threshold"
        );

        let mut anomalies = Vec::new();
        for w in words.iter().filter(|w| w.has_font()) {
            let font = w.font.as_deref().unwrap_or_default();
            let count = font_counts
                .get(&normalize_font_name(font))
                .copied()
                .unwrap_or(0);
            let ub = wilson_upper_bound(count, total_with_font, self.params.z);
            if ub >= t_doc {
                continue;
            }

            let (p_value, score) = stats::rarity_severity(count, total_with_font, t_doc);
            anomalies.push(FontAnomaly {
                text: w.text.clone(),
                bbox: w.bbox,
                page: w.page,
                font: w.font.clone(),
                present: count as f64 / total_with_font as f64,
                p_value,
                score,
                reason: format!(
                    "count={}, N={}, UB={:.2}% < thr={:.2}%",
                    count,
                    total_with_font,
                    ub * 100.0,
                    t_doc * 100.0
                ),
            });
        }

        info!(flagged = anomalies.len(), "Font anomaly detection finished");
        anomalies
    }
}
