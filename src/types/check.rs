use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{Category, EvidenceType, Kind, Status};
use super::document::BBox;
use crate::config::ClientConfig;

/// A piece of supporting evidence attached to a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub evidence_type: EvidenceType,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl Evidence {
    pub fn new(evidence_type: EvidenceType, value: impl Into<Value>) -> Self {
        Self {
            evidence_type,
            value: value.into(),
            page: None,
            bbox: None,
            extra: None,
        }
    }

    pub fn field(value: impl Into<Value>) -> Self {
        Self::new(EvidenceType::Field, value)
    }

    pub fn metadata(value: impl Into<Value>) -> Self {
        Self::new(EvidenceType::Metadata, value)
    }

    pub fn text(value: impl Into<Value>) -> Self {
        Self::new(EvidenceType::Text, value)
    }

    pub fn with_page(mut self, page: Option<u32>) -> Self {
        self.page = page;
        self
    }

    pub fn with_bbox(mut self, bbox: Option<BBox>) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Result of one independent check. Score 0 is clean, 100 is the strongest fraud signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub category: Category,
    pub kind: Kind,
    pub title: String,
    pub description: String,
    pub score: u8,
    pub status: Status,
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

/// `<prefix>-<8 hex chars>`
pub fn short_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &uuid[..8])
}

impl CheckResult {
    /// Build a check whose status is banded from its score.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id_prefix: &str,
        category: Category,
        kind: Kind,
        title: impl Into<String>,
        description: impl Into<String>,
        score: i64,
        evidence: Vec<Evidence>,
        config: &ClientConfig,
    ) -> Self {
        let score = score.clamp(0, 100) as u8;
        Self {
            id: short_id(id_prefix),
            category,
            kind,
            title: title.into(),
            description: description.into(),
            score,
            status: config.status_for(score),
            evidence,
            tags: None,
            timestamp: Utc::now(),
        }
    }

    /// Neutral result for a check whose collaborator failed or timed out.
    pub fn skipped(
        id_prefix: &str,
        category: Category,
        kind: Kind,
        title: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: short_id(id_prefix),
            category,
            kind,
            title: title.into(),
            description: reason.into(),
            score: 0,
            status: Status::Skipped,
            evidence: Vec::new(),
            tags: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == Status::Skipped
    }
}
