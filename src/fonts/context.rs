//! Header/footer boilerplate suppression
//!
//! Known template codes (e.g. `is97b`) printed in the header or footer of
//! institutional letters use their own font and would otherwise always be
//! flagged as rare. They are dropped only when the document carries one of
//! the configured letterhead markers.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::config::FontConfig;
use crate::error::{ConfigError, Result};
use crate::types::{BBox, WordRecord};

#[derive(Debug, Clone)]
pub struct ContextFilter {
    ignore_patterns: Vec<Regex>,
    context_markers: Vec<Regex>,
    only_in_header_footer: bool,
    header_ratio: f64,
    footer_start_ratio: f64,
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    ConfigError::InvalidTunable {
                        name: "font.patterns".into(),
                        message: format!("'{}': {}", p, e),
                    }
                    .into()
                })
        })
        .collect()
}

impl ContextFilter {
    pub fn from_config(config: &FontConfig) -> Result<Self> {
        Ok(Self {
            ignore_patterns: compile_all(&config.ignore_text_patterns)?,
            context_markers: compile_all(&config.context_markers)?,
            only_in_header_footer: config.ignore_only_in_header_footer,
            header_ratio: config.header_ratio,
            footer_start_ratio: config.footer_start_ratio,
        })
    }

    /// Whether any marker occurs in the space-joined text of the whole document.
    pub fn has_context_markers(&self, words: &[WordRecord]) -> bool {
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.context_markers.iter().any(|re| re.is_match(&text))
    }

    /// Page number to the largest `y1` seen on it, used as the page height.
    pub fn page_heights(words: &[WordRecord]) -> HashMap<u32, f64> {
        let mut heights: HashMap<u32, f64> = HashMap::new();
        for w in words {
            let entry = heights.entry(w.page).or_insert(0.0);
            *entry = entry.max(w.bbox[3]);
        }
        heights
    }

    pub fn is_in_header_footer(&self, bbox: &BBox, page_height: f64) -> bool {
        if page_height <= 0.0 {
            return false;
        }
        let [_, y0, _, y1] = *bbox;
        y1 <= self.header_ratio * page_height || y0 >= self.footer_start_ratio * page_height
    }

    fn should_ignore(&self, word: &WordRecord, has_ctx: bool, page_height: f64) -> bool {
        if !has_ctx {
            return false;
        }
        let text = word.text.trim();
        if text.is_empty() {
            return false;
        }
        if !self.ignore_patterns.iter().any(|re| re.is_match(text)) {
            return false;
        }
        if self.only_in_header_footer {
            return self.is_in_header_footer(&word.bbox, page_height);
        }
        true
    }

    /// Drop suppressed words, preserving order.
    pub fn filter(&self, words: &[WordRecord]) -> Vec<WordRecord> {
        let has_ctx = self.has_context_markers(words);
        let heights = Self::page_heights(words);
        words
            .iter()
            .filter(|w| {
                let height = heights.get(&w.page).copied().unwrap_or(0.0);
                !self.should_ignore(w, has_ctx, height)
            })
            .cloned()
            .collect()
    }
}
