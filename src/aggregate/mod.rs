//! Overall risk aggregation
//!
//! Many independent check scores are combined into one document score by
//! averaging an adaptively sized, category-diverse top-K selection.

pub mod summary;

use std::collections::HashSet;

use serde_json::{json, Map};
use tracing::{debug, info, instrument};

use crate::config::{AggregationConfig, ClientConfig};
use crate::types::{short_id, Category, CheckResult, DocumentInfo, FraudReport, Overall};

pub use summary::build_summary_text;

/// Anything the aggregator can rank: a score and a category.
pub trait Scored {
    fn score(&self) -> f64;
    fn category(&self) -> Category;
}

impl Scored for CheckResult {
    fn score(&self) -> f64 {
        f64::from(self.score)
    }

    fn category(&self) -> Category {
        self.category
    }
}

impl Scored for (f64, Category) {
    fn score(&self) -> f64 {
        self.0
    }

    fn category(&self) -> Category {
        self.1
    }
}

impl<T: Scored> Scored for &T {
    fn score(&self) -> f64 {
        (*self).score()
    }

    fn category(&self) -> Category {
        (*self).category()
    }
}

/// Clamp into `[0, 100]`; `None` for NaN and infinities.
fn sanitize(score: f64) -> Option<f64> {
    score.is_finite().then(|| score.clamp(0.0, 100.0))
}

/// `(index, sanitized score)` sorted by score descending, then index ascending.
fn ranked<T: Scored>(items: &[T]) -> Vec<(usize, f64, Category)> {
    let mut out: Vec<(usize, f64, Category)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| sanitize(item.score()).map(|s| (i, s, item.category())))
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    out
}

/// Mean of the `k` highest scores, rounded half to even.
///
/// Scores are clamped into `[0, 100]` and non-finite values dropped.
/// Returns 0 when `k == 0` or nothing valid remains.
pub fn aggregate_mean_top_k<T: Copy + Into<f64>>(scores: &[T], k: usize) -> u8 {
    let mut clean: Vec<f64> = scores
        .iter()
        .filter_map(|s| sanitize((*s).into()))
        .collect();
    if clean.is_empty() || k == 0 {
        return 0;
    }

    clean.sort_by(|a, b| b.total_cmp(a));
    let k = k.min(clean.len());
    let mean = clean[..k].iter().sum::<f64>() / k as f64;
    mean.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Original indices of the top-`k` scores, ties broken by input order.
pub fn top_k_indices<T: Copy + Into<f64>>(scores: &[T], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    let mut enumerated: Vec<(usize, f64)> = scores
        .iter()
        .enumerate()
        .filter_map(|(i, s)| sanitize((*s).into()).map(|s| (i, s)))
        .collect();
    enumerated.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    enumerated.into_iter().take(k).map(|(i, _)| i).collect()
}

/// Choose how many top scores to average.
///
/// `K = clamp(round(sqrt(M)), min_k, max_k)` over the `M` material checks,
/// overridden to 1 when the top score dominates the top `L = min(max(2, 2K), N)`.
pub fn choose_adaptive_k<T: Scored>(items: &[T], config: &AggregationConfig) -> usize {
    let material_threshold = f64::from(config.material_threshold);
    let material = items
        .iter()
        .filter_map(|c| sanitize(c.score()))
        .filter(|s| *s >= material_threshold)
        .count();
    if material == 0 {
        return config.min_k;
    }

    let k = ((material as f64).sqrt().round() as usize)
        .min(config.max_k)
        .max(config.min_k);

    let ordered = ranked(items);
    if let Some((_, top, _)) = ordered.first() {
        let l = (2 * k).max(2).min(ordered.len());
        let mut denom: f64 = ordered[..l].iter().map(|(_, s, _)| *s).sum();
        if denom == 0.0 {
            denom = 1.0;
        }
        if top / denom >= config.concentration_ratio {
            debug!(top, denom, "Risk concentrated in top check; K=1");
            return 1;
        }
    }
    k
}

/// Indices of `k` checks, preferring one per category for the first
/// `min(k, diversity_first_k)` slots, then filling by score.
pub fn pick_topk_indices_with_diversity<T: Scored>(
    items: &[T],
    k: usize,
    diversity_first_k: usize,
) -> Vec<usize> {
    let ordered = ranked(items);
    if k == 0 || ordered.is_empty() {
        return Vec::new();
    }

    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    let mut seen: HashSet<Category> = HashSet::new();

    let diverse_slots = k.min(diversity_first_k);
    for (i, _, category) in &ordered {
        if chosen.len() >= diverse_slots {
            break;
        }
        if seen.insert(*category) {
            chosen.push(*i);
        }
    }

    for (i, _, _) in &ordered {
        if chosen.len() >= k {
            break;
        }
        if !chosen.contains(i) {
            chosen.push(*i);
        }
    }
    chosen
}

/// Outcome of aggregating a check list.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub overall: Overall,
    pub k: usize,
    /// Indices into the input slice.
    pub selected: Vec<usize>,
}

/// Overall risk for a full check list. Skipped checks are treated as absent.
pub fn aggregate_checks(checks: &[CheckResult], config: &ClientConfig) -> Aggregation {
    let agg = &config.aggregation;
    let live: Vec<(usize, &CheckResult)> = checks
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_skipped())
        .collect();
    let live_checks: Vec<&CheckResult> = live.iter().map(|(_, c)| *c).collect();

    let k = choose_adaptive_k(&live_checks, agg);
    let picked = pick_topk_indices_with_diversity(&live_checks, k, agg.diversity_first_k);
    let scores: Vec<f64> = picked.iter().map(|i| live_checks[*i].score()).collect();
    let risk_score = aggregate_mean_top_k(&scores, k);

    let overall = Overall {
        risk_score,
        severity: config.severity_for(risk_score),
        summary_text: build_summary_text(checks, config, risk_score),
    };
    Aggregation {
        overall,
        k,
        selected: picked.into_iter().map(|i| live[i].0).collect(),
    }
}

/// The `Overall` verdict alone.
pub fn compute_overall(checks: &[CheckResult], config: &ClientConfig) -> Overall {
    aggregate_checks(checks, config).overall
}

/// Assemble the final report for a document.
#[instrument(skip_all, fields(doc_id = %document.doc_id, checks = checks.len()))]
pub fn create_fraud_report(
    checks: Vec<CheckResult>,
    document: DocumentInfo,
    config: &ClientConfig,
) -> FraudReport {
    let aggregation = aggregate_checks(&checks, config);
    info!(
        risk_score = aggregation.overall.risk_score,
        k = aggregation.k,
        "Computed overall score"
    );

    let selected_ids: Vec<String> = aggregation
        .selected
        .iter()
        .map(|i| checks[*i].id.clone())
        .collect();
    let mut meta = Map::new();
    meta.insert(
        "aggregation".into(),
        json!({ "k": aggregation.k, "selected_check_ids": selected_ids }),
    );

    FraudReport {
        platform_version: config.pipeline.platform_version.clone(),
        run_id: short_id("RUN"),
        document,
        overall: aggregation.overall,
        checks,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Category::*;

    fn cfg() -> AggregationConfig {
        AggregationConfig::default()
    }

    #[test]
    fn test_mean_top_k() {
        assert_eq!(aggregate_mean_top_k(&[90, 80, 10, 5], 2), 85);
        assert_eq!(aggregate_mean_top_k::<i32>(&[], 3), 0);
        assert_eq!(aggregate_mean_top_k(&[150, -10], 1), 100);
        assert_eq!(aggregate_mean_top_k(&[40, 30], 0), 0);
        assert_eq!(aggregate_mean_top_k(&[40.0, f64::NAN, f64::INFINITY], 3), 40);
        assert_eq!(aggregate_mean_top_k(&[70, 65], 5), 68);
        // 67.5 rounds to the even neighbour
        assert_eq!(aggregate_mean_top_k(&[95, 40], 2), 68);
        assert_eq!(aggregate_mean_top_k(&[94.0, 39.0], 2), 66);
    }

    #[test]
    fn test_top_k_indices_stable() {
        assert_eq!(top_k_indices(&[10, 50, 50, 90], 3), vec![3, 1, 2]);
        assert!(top_k_indices(&[10], 0).is_empty());
    }

    #[test]
    fn test_adaptive_k_no_material() {
        let items = vec![(10.0, FileMetadata), (20.0, VisualAnalysis)];
        assert_eq!(choose_adaptive_k(&items, &cfg()), 1);
        assert_eq!(choose_adaptive_k::<(f64, Category)>(&[], &cfg()), 1);
    }

    #[test]
    fn test_adaptive_k_concentration() {
        let items = vec![
            (100.0, FileMetadata),
            (10.0, VisualAnalysis),
            (5.0, HistoricalPatterns),
            (0.0, CrossSourceVerification),
        ];
        assert_eq!(choose_adaptive_k(&items, &cfg()), 1);
    }

    #[test]
    fn test_adaptive_k_grows_sublinearly() {
        let items: Vec<(f64, Category)> = (0..9).map(|_| (60.0, FileMetadata)).collect();
        assert_eq!(choose_adaptive_k(&items, &cfg()), 3);
        let items: Vec<(f64, Category)> = (0..40).map(|_| (60.0, FileMetadata)).collect();
        assert_eq!(choose_adaptive_k(&items, &cfg()), 5);
    }

    #[test]
    fn test_diversity_first() {
        let items = vec![
            (90.0, VisualAnalysis),
            (85.0, VisualAnalysis),
            (60.0, FileMetadata),
            (50.0, HistoricalPatterns),
        ];
        assert_eq!(pick_topk_indices_with_diversity(&items, 3, 3), vec![0, 2, 3]);
        assert_eq!(pick_topk_indices_with_diversity(&items, 4, 3), vec![0, 2, 3, 1]);
        // Diversity limited to the first slot
        assert_eq!(pick_topk_indices_with_diversity(&items, 2, 1), vec![0, 1]);
        assert!(pick_topk_indices_with_diversity(&items, 0, 3).is_empty());
    }

    #[test]
    fn test_diversity_ties_by_input_order() {
        let items = vec![(50.0, FileMetadata), (50.0, VisualAnalysis), (50.0, FileMetadata)];
        assert_eq!(pick_topk_indices_with_diversity(&items, 3, 3), vec![0, 1, 2]);
    }

    #[test]
    fn test_aggregate_excludes_skipped() {
        let config = ClientConfig::default();
        let mut checks = vec![
            CheckResult::new("A", FileMetadata, crate::types::Kind::SuspiciousProducer, "a", "", 90, vec![], &config),
            CheckResult::skipped("B", VisualAnalysis, crate::types::Kind::FontManipulation, "b", "timeout"),
        ];
        checks[1].score = 100;
        let agg = aggregate_checks(&checks, &config);
        assert_eq!(agg.overall.risk_score, 90);
        assert_eq!(agg.selected, vec![0]);
    }
}
