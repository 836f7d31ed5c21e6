mod fixtures;

use docfraud::aggregate::{
    aggregate_checks, aggregate_mean_top_k, choose_adaptive_k, create_fraud_report,
    pick_topk_indices_with_diversity,
};
use docfraud::config::ClientConfig;
use docfraud::types::{Category, CheckResult, DocumentInfo, Kind, Severity, SourceDocument, Status};
use fixtures::check;
use proptest::prelude::*;

use Category::*;

fn five_categories(scores: [i64; 5], config: &ClientConfig) -> Vec<CheckResult> {
    let cats = [
        (VisualAnalysis, Kind::FontManipulation),
        (FileMetadata, Kind::SuspiciousProducer),
        (CrossSourceVerification, Kind::IdFormat),
        (HistoricalPatterns, Kind::ExactDuplicate),
        (SyntheticMedia, Kind::SyntheticMediaDetected),
    ];
    scores
        .iter()
        .zip(cats)
        .map(|(s, (c, k))| check(*s, c, k, config))
        .collect()
}

#[test]
fn test_five_check_scenario() {
    let config = ClientConfig::default();
    let checks = five_categories([95, 40, 38, 12, 5], &config);

    assert_eq!(choose_adaptive_k(&checks, &config.aggregation), 2);
    let picked = pick_topk_indices_with_diversity(&checks, 2, 3);
    assert_eq!(picked, vec![0, 1]);

    let agg = aggregate_checks(&checks, &config);
    assert_eq!(agg.k, 2);
    assert_eq!(agg.overall.risk_score, 68);
    assert_eq!(agg.overall.severity, Severity::High);
}

#[test]
fn test_single_dominant_finding() {
    let config = ClientConfig::default();
    let checks = five_categories([100, 10, 5, 0, 10], &config);
    assert_eq!(choose_adaptive_k(&checks, &config.aggregation), 1);
    assert_eq!(aggregate_checks(&checks, &config).overall.risk_score, 100);
}

#[test]
fn test_mean_top_k_examples() {
    assert_eq!(aggregate_mean_top_k(&[90, 80, 10, 5], 2), 85);
    assert_eq!(aggregate_mean_top_k::<i32>(&[], 3), 0);
    assert_eq!(aggregate_mean_top_k(&[150, -10], 1), 100);
}

#[test]
fn test_diversity_prefers_new_category() {
    let config = ClientConfig::default();
    let checks = vec![
        check(90, VisualAnalysis, Kind::FontManipulation, &config),
        check(85, VisualAnalysis, Kind::FontManipulation, &config),
        check(60, FileMetadata, Kind::ImageOnlyPdf, &config),
    ];
    assert_eq!(pick_topk_indices_with_diversity(&checks, 2, 3), vec![0, 2]);
}

#[test]
fn test_skipped_checks_are_absent() {
    let config = ClientConfig::default();
    let mut checks = five_categories([95, 40, 38, 12, 5], &config);
    checks.push(CheckResult::skipped(
        "Metadata",
        FileMetadata,
        Kind::TimestampInconsistent,
        "Metadata Analysis",
        "timed out",
    ));
    let agg = aggregate_checks(&checks, &config);
    assert_eq!(agg.overall.risk_score, 68);
    assert!(!agg.selected.contains(&5));
}

#[test]
fn test_report_records_selection() {
    let config = ClientConfig::default();
    let checks = five_categories([95, 40, 38, 12, 5], &config);
    let ids = vec![checks[0].id.clone(), checks[1].id.clone()];
    let doc = SourceDocument::new("doc-7");
    let report = create_fraud_report(checks, DocumentInfo::from_source(&doc, Some(2)), &config);

    assert!(report.run_id.starts_with("RUN-"));
    assert_eq!(report.run_id.len(), "RUN-".len() + 8);
    assert_eq!(report.meta["aggregation"]["k"], 2);
    assert_eq!(report.selected_check_ids(), ids);
    assert_eq!(report.checks[0].status, Status::Fail);
    assert!(report
        .overall
        .summary_text
        .starts_with("Severity: high(68).\nIssues: category=visual_analysis"));
}

#[test]
fn test_report_serializes_api_names() {
    let config = ClientConfig::default();
    let checks = five_categories([95, 40, 38, 12, 5], &config);
    let report = create_fraud_report(checks, DocumentInfo::from_source(&SourceDocument::new("d"), None), &config);
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["overall"]["severity"], "high");
    assert_eq!(value["checks"][0]["status"], "risk");
    assert_eq!(value["checks"][0]["category"], "visual_analysis");
}

fn category() -> impl Strategy<Value = Category> {
    prop::sample::select(vec![
        SyntheticMedia,
        VisualAnalysis,
        FileMetadata,
        CrossSourceVerification,
        HistoricalPatterns,
    ])
}

proptest! {
    #[test]
    fn prop_overall_within_bounds(items in prop::collection::vec((-50.0f64..150.0, category()), 0..12)) {
        let config = ClientConfig::default();
        let k = choose_adaptive_k(&items, &config.aggregation);
        prop_assert!(k >= config.aggregation.min_k && k <= config.aggregation.max_k);

        let picked = pick_topk_indices_with_diversity(&items, k, 3);
        prop_assert!(picked.len() <= k);
        let scores: Vec<f64> = picked.iter().map(|i| items[*i].0).collect();
        let overall = aggregate_mean_top_k(&scores, k);
        prop_assert!(overall <= 100);
    }

    #[test]
    fn prop_concentration_override(others in prop::collection::vec((25.0f64..=27.0, category()), 3)) {
        // M = 4 gives K = 2, but 100 / (100 + 3 * 27) still clears the ratio
        let config = ClientConfig::default();
        let mut items = vec![(100.0, VisualAnalysis)];
        items.extend(others);
        prop_assert_eq!(choose_adaptive_k(&items, &config.aggregation), 1);
    }

    #[test]
    fn prop_diversity_picks_are_distinct(items in prop::collection::vec((0.0f64..=100.0, category()), 0..12), k in 0usize..6) {
        let picked = pick_topk_indices_with_diversity(&items, k, 3);
        prop_assert_eq!(picked.len(), k.min(items.len()));
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), picked.len());
    }
}
