//! Relevance labelling of font anomalies and the font check built from them

use std::collections::BTreeMap;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, instrument};

use super::FontAnomaly;
use crate::aggregate::aggregate_mean_top_k;
use crate::collaborators::RelevanceClassifier;
use crate::config::ClientConfig;
use crate::types::{Category, CheckResult, Evidence, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelevanceLabel {
    /// Carries the main facts of the page
    Core,
    /// Headers, footers, contact blocks and other peripheral text
    Ancillary,
    Noise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    pub label: RelevanceLabel,
    pub reason: String,
    pub confidence: f64,
}

impl Relevance {
    pub fn new(label: RelevanceLabel, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            label,
            reason: reason.into(),
            confidence,
        }
    }

    fn ancillary(reason: &str, confidence: f64) -> Self {
        Self::new(RelevanceLabel::Ancillary, reason, confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAnomaly {
    #[serde(flatten)]
    pub anomaly: FontAnomaly,
    pub relevance: Relevance,
}

/// Label every anomaly, one classifier call per page, preserving input order.
///
/// A failed call labels the whole page `ANCILLARY/fallback`; short answers
/// are padded with `ANCILLARY/default-pad` and long ones truncated.
#[instrument(skip_all, fields(anomalies = anomalies.len()))]
pub async fn classify_anomalies(
    classifier: &dyn RelevanceClassifier,
    anomalies: Vec<FontAnomaly>,
    fallback_confidence: f64,
) -> Vec<ClassifiedAnomaly> {
    let mut by_page: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (idx, a) in anomalies.iter().enumerate() {
        by_page.entry(a.page).or_default().push(idx);
    }

    let calls = by_page.iter().map(|(page, indices)| {
        let items: Vec<FontAnomaly> = indices.iter().map(|i| anomalies[*i].clone()).collect();
        let page = *page;
        async move {
            let expected = items.len();
            let verdicts = match classifier.classify_page(page, &items).await {
                Ok(mut verdicts) => {
                    verdicts.truncate(expected);
                    while verdicts.len() < expected {
                        verdicts.push(Relevance::ancillary("default-pad", fallback_confidence));
                    }
                    verdicts
                }
                Err(e) => {
                    error!(page, error = %e, "Relevance classification failed");
                    vec![Relevance::ancillary("fallback", fallback_confidence); expected]
                }
            };
            debug!(page, count = expected, "Classified page anomalies");
            verdicts
        }
    });
    let page_verdicts = join_all(calls).await;

    let mut relevance: Vec<Option<Relevance>> = vec![None; anomalies.len()];
    for ((_, indices), verdicts) in by_page.iter().zip(page_verdicts) {
        for (idx, verdict) in indices.iter().zip(verdicts) {
            relevance[*idx] = Some(verdict);
        }
    }

    anomalies
        .into_iter()
        .zip(relevance)
        .map(|(anomaly, rel)| ClassifiedAnomaly {
            anomaly,
            relevance: rel.unwrap_or_else(|| Relevance::ancillary("default-pad", fallback_confidence)),
        })
        .collect()
}

/// `min(round(score * weight), cap)` with the heavier weight for core text.
pub fn per_anomaly_score(item: &ClassifiedAnomaly, config: &ClientConfig) -> u8 {
    let fc = &config.font_check;
    let weight = match item.relevance.label {
        RelevanceLabel::Core => fc.core_weight,
        _ => fc.non_core_weight,
    };
    let raw = (f64::from(item.anomaly.score) * weight).round_ties_even();
    raw.clamp(0.0, f64::from(fc.per_anomaly_cap)) as u8
}

/// Turn labelled anomalies into the font manipulation check.
pub fn build_font_check(classified: &[ClassifiedAnomaly], config: &ClientConfig) -> CheckResult {
    let relevant: Vec<&ClassifiedAnomaly> = classified
        .iter()
        .filter(|a| a.relevance.label != RelevanceLabel::Noise)
        .collect();

    let scores: Vec<u8> = relevant
        .iter()
        .map(|a| per_anomaly_score(a, config))
        .collect();
    let core_scores: Vec<u8> = relevant
        .iter()
        .zip(&scores)
        .filter(|(a, _)| a.relevance.label == RelevanceLabel::Core)
        .map(|(_, s)| *s)
        .collect();

    let top_k = config.font_check.top_k;
    let score = if core_scores.is_empty() {
        aggregate_mean_top_k(&scores, top_k)
    } else {
        aggregate_mean_top_k(&core_scores, top_k)
    };

    let description = if relevant.is_empty() {
        "No font issue has been found.".to_string()
    } else {
        let texts: Vec<String> = relevant
            .iter()
            .map(|a| format!("\"{}\"", a.anomaly.text))
            .collect();
        format!("There are font issues in {}", texts.join(","))
    };

    let evidence = relevant
        .iter()
        .map(|a| {
            Evidence::text(a.anomaly.text.clone())
                .with_page(Some(a.anomaly.page))
                .with_bbox(Some(a.anomaly.bbox))
                .with_extra(json!({
                    "font": a.anomaly.font,
                    "text_relevance": a.relevance.label,
                }))
        })
        .collect();

    CheckResult::new(
        "FontManipulationCheck",
        Category::VisualAnalysis,
        Kind::FontManipulation,
        "Font Manipulation",
        description,
        i64::from(score),
        evidence,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use async_trait::async_trait;

    fn anomaly(text: &str, page: u32, score: u8) -> FontAnomaly {
        FontAnomaly {
            text: text.into(),
            bbox: [0.0, 0.0, 1.0, 1.0],
            page,
            font: Some("Courier".into()),
            present: 0.02,
            p_value: 0.1,
            score,
            reason: String::new(),
        }
    }

    fn classified(text: &str, score: u8, label: RelevanceLabel) -> ClassifiedAnomaly {
        ClassifiedAnomaly {
            anomaly: anomaly(text, 1, score),
            relevance: Relevance::new(label, "", 0.9),
        }
    }

    /// Labels page 1 as one short CORE answer and fails on page 2.
    struct PageScripted;

    #[async_trait]
    impl RelevanceClassifier for PageScripted {
        async fn classify_page(
            &self,
            page: u32,
            _anomalies: &[FontAnomaly],
        ) -> std::result::Result<Vec<Relevance>, CollaboratorError> {
            match page {
                1 => Ok(vec![Relevance::new(RelevanceLabel::Core, "amount", 0.95)]),
                _ => Err(CollaboratorError::Relevance("throttled".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_classify_pads_and_falls_back() {
        let anomalies = vec![
            anomaly("a", 1, 90),
            anomaly("b", 2, 80),
            anomaly("c", 1, 70),
        ];
        let out = classify_anomalies(&PageScripted, anomalies, 0.6).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].anomaly.text, "a");
        assert_eq!(out[0].relevance.label, RelevanceLabel::Core);
        assert_eq!(out[1].relevance.reason, "fallback");
        assert_eq!(out[1].relevance.label, RelevanceLabel::Ancillary);
        assert_eq!(out[2].relevance.reason, "default-pad");
        assert_eq!(out[2].relevance.confidence, 0.6);
    }

    #[test]
    fn test_font_check_prefers_core() {
        let config = ClientConfig::default();
        let items = vec![
            classified("total", 95, RelevanceLabel::Core),
            classified("footer", 99, RelevanceLabel::Ancillary),
            classified("junk", 100, RelevanceLabel::Noise),
        ];
        let check = build_font_check(&items, &config);
        // core capped at 80
        assert_eq!(check.score, 80);
        assert_eq!(check.evidence.len(), 2);
        assert_eq!(check.description, "There are font issues in \"total\",\"footer\"");
        assert_eq!(check.evidence[0].extra.as_ref().unwrap()["text_relevance"], "CORE");
    }

    #[test]
    fn test_font_check_without_core() {
        let config = ClientConfig::default();
        let items = vec![
            classified("a", 90, RelevanceLabel::Ancillary),
            classified("b", 61, RelevanceLabel::Ancillary),
        ];
        let check = build_font_check(&items, &config);
        // 45 and round(30.5) = 30 -> mean 37.5 -> 38
        assert_eq!(check.score, 38);

        let check = build_font_check(&[], &config);
        assert_eq!(check.score, 0);
        assert_eq!(check.description, "No font issue has been found.");
    }
}
