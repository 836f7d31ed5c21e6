mod fixtures;

use std::collections::HashMap;

use docfraud::config::FontConfig;
use docfraud::fonts::stats::rarity_severity;
use docfraud::fonts::{
    binom_cdf_le, dynamic_doc_threshold, normalize_font_name, wilson_upper_bound,
    FontAnomalyDetector, ThresholdParams,
};
use fixtures::{font_page, word};
use proptest::prelude::*;

fn detector() -> FontAnomalyDetector {
    FontAnomalyDetector::new(&FontConfig::default()).unwrap()
}

#[test]
fn test_one_rare_word_among_fifty() {
    let detector = detector();
    let anomalies = detector
        .detect_pages(vec![font_page("Arial", 50, "Courier", 1)], None)
        .unwrap();
    assert_eq!(anomalies.len(), 1);

    let counts: HashMap<String, u64> = [("arial".to_string(), 50), ("courier".to_string(), 1)].into();
    let t_doc = dynamic_doc_threshold(51, &counts, detector.params());
    let (p_value, score) = rarity_severity(1, 51, t_doc);

    let flagged = &anomalies[0];
    assert_eq!(flagged.text, "odd0");
    assert_eq!(flagged.page, 1);
    assert_eq!(flagged.score, score);
    assert_eq!(flagged.p_value, p_value);
}

#[test]
fn test_pages_are_numbered_from_one() {
    let pages = vec![
        font_page("Arial", 30, "Arial", 0),
        font_page("Arial", 30, "Courier", 1),
    ];
    let anomalies = detector().detect_pages(pages, None).unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].page, 2);
}

#[test]
fn test_single_font_document_is_clean() {
    let anomalies = detector()
        .detect_pages(vec![font_page("Arial", 3, "Arial-Bold", 2)], None)
        .unwrap();
    assert!(anomalies.is_empty());
}

#[test]
fn test_footer_code_suppressed_only_under_letterhead() {
    let build = |header: &str| {
        let mut words = vec![word(header, Some("Arial"), 1, 10.0)];
        words.extend((0..40).map(|i| word(&format!("w{i}"), Some("Arial"), 1, 100.0 + i as f64 * 5.0)));
        words.push(word("forged", Some("Courier"), 1, 500.0));
        words.push(word("IS97B", Some("Times"), 1, 988.0));
        words
    };

    let with_marker = detector().detect(&build("רשות המסים בישראל"), None).unwrap();
    let texts: Vec<&str> = with_marker.iter().map(|a| a.text.as_str()).collect();
    assert_eq!(texts, vec!["forged"]);

    let without_marker = detector().detect(&build("letterhead"), None).unwrap();
    let texts: Vec<&str> = without_marker.iter().map(|a| a.text.as_str()).collect();
    assert_eq!(texts, vec!["forged", "IS97B"]);
}

#[test]
fn test_rarity_severity_of_dominant_font_is_low() {
    let counts: HashMap<String, u64> = [("a".to_string(), 50), ("b".to_string(), 1)].into();
    let t_doc = dynamic_doc_threshold(51, &counts, &ThresholdParams::default());
    let (_, common) = rarity_severity(50, 51, t_doc);
    let (_, rare) = rarity_severity(1, 51, t_doc);
    assert_eq!(common, 0);
    assert!(rare > common);
}

proptest! {
    #[test]
    fn prop_wilson_bounded_and_monotone(total in 1u64..5000, frac in 0.0f64..1.0, z in 0.5f64..3.0) {
        let count = ((total as f64) * frac) as u64;
        let ub = wilson_upper_bound(count, total, z);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&ub));
        prop_assert!(ub + 1e-12 >= count as f64 / total as f64);
        if count < total {
            prop_assert!(wilson_upper_bound(count + 1, total, z) + 1e-12 >= ub);
        }
    }

    #[test]
    fn prop_threshold_separates_rare_fonts(font_counts in prop::collection::vec(1u64..200, 2..=6)) {
        let total: u64 = font_counts.iter().sum();
        prop_assume!(total >= 10);

        let params = ThresholdParams::default();
        let counts: HashMap<String, u64> = font_counts
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("font{i}"), *c))
            .collect();
        let t_doc = dynamic_doc_threshold(total, &counts, &params);
        let k_min = *font_counts.iter().min().unwrap();
        let k_star = u64::from(params.rare_k_max).min(k_min);

        prop_assert!(t_doc > 0.0 && t_doc <= 1.0);
        for count in &font_counts {
            let flagged = wilson_upper_bound(*count, total, params.z) < t_doc;
            prop_assert_eq!(flagged, *count <= k_star, "count={} k*={} t={}", count, k_star, t_doc);
        }
    }

    #[test]
    fn prop_normalization_idempotent(name in "[A-Za-z0-9+,\\- ]{0,24}") {
        let once = normalize_font_name(&name);
        prop_assert_eq!(normalize_font_name(&once), once.clone());
        prop_assert!(!once.contains('-') && !once.contains(','));
    }

    #[test]
    fn prop_binomial_cdf_is_a_cdf(n in 1u64..400, p in 0.001f64..0.999) {
        let mut previous = 0.0;
        for k in 0..=n.min(20) {
            let cdf = binom_cdf_le(k, n, p);
            prop_assert!((0.0..=1.0).contains(&cdf));
            prop_assert!(cdf + 1e-9 >= previous);
            previous = cdf;
        }
        prop_assert_eq!(binom_cdf_le(n, n, p), 1.0);
    }
}
