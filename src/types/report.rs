use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::check::CheckResult;
use super::common::Severity;
use super::document::DocumentInfo;

/// Document-level verdict derived from the full check list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overall {
    pub risk_score: u8,
    pub severity: Severity,
    pub summary_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudReport {
    pub platform_version: String,
    pub run_id: String,
    pub document: DocumentInfo,
    pub overall: Overall,
    pub checks: Vec<CheckResult>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl FraudReport {
    /// Checks selected by the aggregator, if the report records them.
    pub fn selected_check_ids(&self) -> Vec<String> {
        self.meta
            .get("aggregation")
            .and_then(|a| a.get("selected_check_ids"))
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
