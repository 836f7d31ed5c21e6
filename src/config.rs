//! Configuration types and validation for the scoring pipeline
//!
//! Every tunable of the scorers lives here so it can be overridden from a
//! JSON or YAML client config without code changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::types::{Severity, Status};

/// One severity band: scores `>= min` map to `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityBand {
    pub min: u8,
    pub label: Severity,
}

/// One status band. Labels are resolved late so an unknown label surfaces
/// as `Status::Error` on the affected check instead of failing the load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBand {
    pub min: u8,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bands {
    pub severity: Vec<SeverityBand>,
    pub status: Vec<StatusBand>,
}

/// Font rarity detector tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Highest occurrence count still considered rare.
    pub rare_k_max: u32,
    /// z-score of the Wilson interval (1.64 ~ 90%).
    pub ci_z: f64,
    /// Position of the threshold inside the gap between UB(k*) and UB(k*+1).
    pub alpha: f64,
    pub threshold_cap: f64,
    pub threshold_floor: f64,
    pub header_ratio: f64,
    pub footer_start_ratio: f64,
    pub ignore_text_patterns: Vec<String>,
    pub context_markers: Vec<String>,
    pub ignore_only_in_header_footer: bool,
}

/// Turning font anomalies into a check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontCheckConfig {
    pub core_weight: f64,
    pub non_core_weight: f64,
    pub per_anomaly_cap: u8,
    pub top_k: usize,
    pub fallback_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Hosts (suffix match) considered benign for link annotations.
    pub allowed_domains: Vec<String>,
    pub suspicious_threshold: u8,
    pub coverage_high: f64,
    pub coverage_mid: f64,
    pub link_benign_max_count: usize,
    pub link_flood_min_count: usize,
    pub present_floor: u8,
    pub max_suspicious_evidence: usize,
    pub max_sample_evidence: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub window_days: i64,
    pub integrity_fail_score: u8,
    pub missing_time_penalty: u8,
    pub time_anomaly_floor: u8,
    pub untrusted_penalty: u8,
    pub indeterminate_penalty: u8,
    pub partial_coverage_penalty: u8,
    pub docmdp_penalty: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub max_date_diff_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub material_threshold: u8,
    pub min_k: usize,
    pub max_k: usize,
    pub concentration_ratio: f64,
    pub diversity_first_k: usize,
    pub summary_issue_threshold: u8,
    pub summary_max_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub platform_version: String,
    pub check_timeout_secs: u64,
    /// Abandon the whole document when any check times out.
    pub abort_on_timeout: bool,
    pub log_level: String,
}

/// Versioned client configuration shared read-only by every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub schema_version: String,
    pub bands: Bands,
    pub tax_officer_blacklist: Vec<String>,
    pub font: FontConfig,
    pub font_check: FontCheckConfig,
    pub annotations: AnnotationConfig,
    pub signatures: SignatureConfig,
    pub metadata: MetadataConfig,
    pub aggregation: AggregationConfig,
    pub pipeline: PipelineConfig,
}

// Defaults
impl Default for Bands {
    fn default() -> Self {
        Self {
            severity: vec![
                SeverityBand { min: 80, label: Severity::Critical },
                SeverityBand { min: 60, label: Severity::High },
                SeverityBand { min: 30, label: Severity::Medium },
                SeverityBand { min: 0, label: Severity::Low },
            ],
            status: vec![
                StatusBand { min: 70, label: "risk".into() },
                StatusBand { min: 40, label: "warn".into() },
                StatusBand { min: 0, label: "pass".into() },
            ],
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            rare_k_max: 3,
            ci_z: 1.64,
            alpha: 0.8,
            threshold_cap: 0.35,
            threshold_floor: 0.001,
            header_ratio: 0.05,
            footer_start_ratio: 0.95,
            ignore_text_patterns: vec![r"\bis\d{2,3}[a-z]?\b".into()],
            context_markers: vec![
                "רשות המסים בישראל".into(),
                "אגף מס הכנסה ומיסוי מקרקעין".into(),
                r"בשם פקיד השומה|פקיד(?:\s)?השומה".into(),
            ],
            ignore_only_in_header_footer: true,
        }
    }
}

impl Default for FontCheckConfig {
    fn default() -> Self {
        Self {
            core_weight: 1.0,
            non_core_weight: 0.5,
            per_anomaly_cap: 80,
            top_k: 3,
            fallback_confidence: 0.6,
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            suspicious_threshold: 70,
            coverage_high: 0.8,
            coverage_mid: 0.5,
            link_benign_max_count: 3,
            link_flood_min_count: 8,
            present_floor: 10,
            max_suspicious_evidence: 20,
            max_sample_evidence: 40,
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            window_days: 60,
            integrity_fail_score: 85,
            missing_time_penalty: 15,
            time_anomaly_floor: 90,
            untrusted_penalty: 25,
            indeterminate_penalty: 10,
            partial_coverage_penalty: 8,
            docmdp_penalty: 8,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self { max_date_diff_days: 60 }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            material_threshold: 25,
            min_k: 1,
            max_k: 5,
            concentration_ratio: 0.55,
            diversity_first_k: 3,
            summary_issue_threshold: 50,
            summary_max_items: 4,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            platform_version: "1.0".into(),
            check_timeout_secs: 30,
            abort_on_timeout: true,
            log_level: "info".into(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            schema_version: "1.0".into(),
            bands: Bands::default(),
            tax_officer_blacklist: Vec::new(),
            font: FontConfig::default(),
            font_check: FontCheckConfig::default(),
            annotations: AnnotationConfig::default(),
            signatures: SignatureConfig::default(),
            metadata: MetadataConfig::default(),
            aggregation: AggregationConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

fn invalid_bands(table: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidBands {
        table: table.into(),
        message: message.into(),
    }
}

fn invalid_tunable(name: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidTunable {
        name: name.into(),
        message: message.into(),
    }
}

fn check_descending(table: &str, mins: &[u8]) -> std::result::Result<(), ConfigError> {
    if mins.is_empty() {
        return Err(invalid_bands(table, "at least one band is required"));
    }
    if let Some(m) = mins.iter().find(|m| **m > 100) {
        return Err(invalid_bands(table, format!("min {} exceeds 100", m)));
    }
    if mins.windows(2).any(|w| w[0] < w[1]) {
        return Err(invalid_bands(table, "bands must be ordered by descending min"));
    }
    Ok(())
}

impl ClientConfig {
    /// Load a config from JSON or YAML, chosen by file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::NotFound(path_str).into());
        }

        let raw = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let config: ClientConfig = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path_str.clone(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path_str.clone(),
                message: e.to_string(),
            })?
        };

        config.validate()?;
        debug!(path = %path_str, version = %config.schema_version, "Loaded client config");
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.schema_version.trim().is_empty() {
            return Err(invalid_tunable("schema_version", "must not be empty"));
        }

        let sev: Vec<u8> = self.bands.severity.iter().map(|b| b.min).collect();
        check_descending("severity", &sev)?;
        let status: Vec<u8> = self.bands.status.iter().map(|b| b.min).collect();
        check_descending("status", &status)?;
        if let Some(band) = self.bands.status.iter().find(|b| b.label.trim().is_empty()) {
            return Err(invalid_bands("status", format!("empty label at min {}", band.min)));
        }

        let font = &self.font;
        if !(0.0..=0.95).contains(&font.alpha) {
            return Err(invalid_tunable("font.alpha", "must be within [0, 0.95]"));
        }
        if !(font.ci_z >= 0.0 && font.ci_z.is_finite()) {
            return Err(invalid_tunable("font.ci_z", "must be a finite non-negative number"));
        }
        if font.rare_k_max == 0 {
            return Err(invalid_tunable("font.rare_k_max", "must be at least 1"));
        }
        for (name, value) in [
            ("font.header_ratio", font.header_ratio),
            ("font.footer_start_ratio", font.footer_start_ratio),
            ("font.threshold_cap", font.threshold_cap),
            ("font.threshold_floor", font.threshold_floor),
            ("annotations.coverage_high", self.annotations.coverage_high),
            ("annotations.coverage_mid", self.annotations.coverage_mid),
            ("aggregation.concentration_ratio", self.aggregation.concentration_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid_tunable(name, "must be within (0, 1]"));
            }
        }
        for pattern in font.ignore_text_patterns.iter().chain(&font.context_markers) {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(invalid_tunable("font.patterns", format!("'{}': {}", pattern, e)));
            }
        }

        let agg = &self.aggregation;
        if agg.min_k == 0 || agg.min_k > agg.max_k {
            return Err(invalid_tunable(
                "aggregation.min_k",
                "must satisfy 1 <= min_k <= max_k",
            ));
        }
        if self.font_check.top_k == 0 {
            return Err(invalid_tunable("font_check.top_k", "must be at least 1"));
        }
        if self.pipeline.check_timeout_secs == 0 {
            return Err(invalid_tunable("pipeline.check_timeout_secs", "must be positive"));
        }
        Ok(())
    }

    /// Severity band for a 0..100 score.
    pub fn severity_for(&self, score: u8) -> Severity {
        let score = score.min(100);
        self.bands
            .severity
            .iter()
            .find(|band| band.min <= score)
            .or_else(|| self.bands.severity.last())
            .map(|band| band.label)
            .unwrap_or(Severity::Low)
    }

    /// Status band for a 0..100 score; unknown labels yield `Status::Error`.
    pub fn status_for(&self, score: u8) -> Status {
        let score = score.min(100);
        let Some(band) = self
            .bands
            .status
            .iter()
            .find(|band| band.min <= score)
            .or_else(|| self.bands.status.last())
        else {
            return Status::Error;
        };

        Status::from_label(&band.label).unwrap_or_else(|| {
            warn!(label = %band.label, "Unknown status label in config");
            Status::Error
        })
    }

    pub fn is_blacklisted_officer(&self, name: &str) -> bool {
        let name = name.trim();
        self.tax_officer_blacklist
            .iter()
            .any(|b| b.trim().eq_ignore_ascii_case(name))
    }
}
