//! Human-readable summary of the overall verdict

use crate::config::ClientConfig;
use crate::types::CheckResult;

/// `Severity: <sev>(<score>).` followed by the highest-scoring issues.
pub fn build_summary_text(checks: &[CheckResult], config: &ClientConfig, overall_score: u8) -> String {
    let threshold = config.aggregation.summary_issue_threshold;
    let severity = config.severity_for(overall_score);

    let mut high: Vec<&CheckResult> = checks.iter().filter(|c| c.score >= threshold).collect();
    if high.is_empty() {
        return format!(
            "Severity: {}({}). No high-scoring issues (≥{}).",
            severity, overall_score, threshold
        );
    }

    // stable: equal scores keep input order
    high.sort_by(|a, b| b.score.cmp(&a.score));

    let items: Vec<String> = high
        .iter()
        .take(config.aggregation.summary_max_items)
        .map(|c| format!("category={}, kind={}, score={}", c.category, c.kind, c.score))
        .collect();
    let extra = high.len() - items.len();
    let tail = if extra > 0 {
        format!("; +{} more", extra)
    } else {
        String::new()
    };

    format!(
        "Severity: {}({}).\nIssues: {}{}.",
        severity,
        overall_score,
        items.join("\n"),
        tail
    )
}
