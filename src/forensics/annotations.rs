//! Per-annotation risk scoring
//!
//! Each annotation starts from a base risk for its subtype and is escalated by
//! independent rules. Escalations only ever raise the score. The document
//! score is the worst single annotation.

use std::collections::BTreeMap;

use bitflags::bitflags;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dates::parse_pdf_date;
use crate::config::AnnotationConfig;
use crate::types::BBox;

bitflags! {
    /// Annotation `/F` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AnnotationFlags: u32 {
        const INVISIBLE       = 1;
        const HIDDEN          = 1 << 1;
        const PRINT           = 1 << 2;
        const NO_VIEW         = 1 << 5;
        const READ_ONLY       = 1 << 6;
        const LOCKED          = 1 << 7;
        const TOGGLE_NO_VIEW  = 1 << 8;
        const LOCKED_CONTENTS = 1 << 9;
    }
}

/// Action attached to an annotation (`/A`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationAction {
    /// Action type (`/S`), e.g. `URI`, `JavaScript`.
    #[serde(default, rename = "type")]
    pub action_type: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Annotation as reported by the structure reader. A `None` subtype marks an
/// object that could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnnotation {
    pub page: u32,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub action: Option<AnnotationAction>,
    #[serde(default)]
    pub bbox: Option<BBox>,
    /// Raw `/M` value.
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub contents: Option<String>,
}

impl RawAnnotation {
    pub fn flags(&self) -> AnnotationFlags {
        AnnotationFlags::from_bits_truncate(self.flags)
    }

    /// Subtype without a leading `/`.
    pub fn subtype_name(&self) -> Option<&str> {
        self.subtype
            .as_deref()
            .map(|s| s.strip_prefix('/').unwrap_or(s))
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRisk {
    pub page: u32,
    pub bbox: Option<BBox>,
    pub subtype: Option<String>,
    pub flags: AnnotationFlags,
    pub action: Option<AnnotationAction>,
    pub modified: Option<NaiveDateTime>,
    pub risk: u8,
    pub reasons: Vec<String>,
}

/// Document-level outcome of annotation scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub score: u8,
    pub counts_by_type: BTreeMap<String, usize>,
    pub risks: Vec<AnnotationRisk>,
    pub suspicious_threshold: u8,
}

impl AnnotationSummary {
    pub fn suspicious(&self) -> impl Iterator<Item = &AnnotationRisk> {
        self.risks
            .iter()
            .filter(move |r| r.risk >= self.suspicious_threshold)
    }

    /// `N annotations found; by type: Link×2, Text×1; K suspicious (≥70)`
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("{} annotations found", self.risks.len())];
        if !self.counts_by_type.is_empty() {
            let by_type: Vec<String> = self
                .counts_by_type
                .iter()
                .map(|(k, v)| format!("{}×{}", k, v))
                .collect();
            parts.push(format!("by type: {}", by_type.join(", ")));
        }
        let suspicious = self.suspicious().count();
        if suspicious > 0 {
            parts.push(format!(
                "{} suspicious (≥{})",
                suspicious, self.suspicious_threshold
            ));
        }
        parts.join("; ")
    }
}

/// Document context the per-annotation rules compare against.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentTimes {
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
}

/// Base risk of a subtype. Unknown and unparseable subtypes are medium risk.
pub fn base_risk(subtype: Option<&str>) -> u8 {
    match subtype {
        Some("Link") => 10,
        Some("Text") | Some("Popup") | Some("Ink") => 75,
        Some("FreeText") => 78,
        Some("Highlight") | Some("Underline") => 50,
        Some("Squiggly") | Some("StrikeOut") => 55,
        Some("Caret") => 65,
        Some("Stamp") => 60,
        Some("Redact") => 85,
        Some("Widget") => 45,
        Some("FileAttachment") | Some("Sound") | Some("Movie") => 95,
        Some("RichMedia") => 98,
        _ => 40,
    }
}

const HIGH_RISK_ACTIONS: [&str; 4] = ["JavaScript", "Launch", "SubmitForm", "GoToR"];
const SUSPICIOUS_SCHEMES: [&str; 4] = ["javascript:", "data:", "file:", "ftp:"];
const MARKUP_TYPES: [&str; 7] = ["Text", "FreeText", "Popup", "Ink", "Caret", "Redact", "Stamp"];

/// Host part of an absolute URL, lowercased.
pub fn extract_host(uri: &str) -> Option<String> {
    let rest = uri.trim().split_once("://")?.1;
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host_port = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = host_port.split(':').next().unwrap_or("");
    if host.is_empty() {
        return None;
    }
    Some(host.to_lowercase())
}

fn rect_area(bbox: &BBox) -> f64 {
    let [llx, lly, urx, ury] = *bbox;
    (urx - llx).max(0.0) * (ury - lly).max(0.0)
}

/// Monotone accumulator: `raise` never lowers the risk.
struct Escalation {
    risk: u8,
    reasons: Vec<String>,
}

impl Escalation {
    fn raise(&mut self, floor: u8, reason: impl Into<String>) {
        self.risk = self.risk.max(floor);
        self.reasons.push(reason.into());
    }
}

/// Score one annotation against its page area and the document timestamps.
pub fn score_annotation(
    annotation: &RawAnnotation,
    page_area: Option<f64>,
    times: DocumentTimes,
    config: &AnnotationConfig,
) -> AnnotationRisk {
    let subtype = annotation.subtype_name();
    let flags = annotation.flags();
    let mut acc = Escalation {
        risk: base_risk(subtype),
        reasons: Vec::new(),
    };

    if flags.intersects(AnnotationFlags::INVISIBLE | AnnotationFlags::HIDDEN) {
        acc.raise(90, "Annotation hidden/invisible");
    }
    if flags.contains(AnnotationFlags::NO_VIEW | AnnotationFlags::PRINT) {
        acc.raise(95, "Print-only hidden annotation");
    }

    let action_type = annotation
        .action
        .as_ref()
        .and_then(|a| a.action_type.as_deref())
        .map(|s| s.strip_prefix('/').unwrap_or(s));
    if let Some(kind) = action_type.filter(|k| HIGH_RISK_ACTIONS.contains(k)) {
        acc.raise(95, format!("Action {}", kind));
    }

    let uri = match action_type {
        Some("URI") => annotation
            .action
            .as_ref()
            .and_then(|a| a.uri.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty()),
        _ => None,
    };
    if let Some(uri) = uri {
        let lowered = uri.to_lowercase();
        if let Some(scheme) = SUSPICIOUS_SCHEMES.iter().find(|s| lowered.starts_with(**s)) {
            acc.raise(92, format!("Suspicious scheme: {}", scheme.trim_end_matches(':')));
        } else if !config.allowed_domains.is_empty() {
            if let Some(host) = extract_host(uri) {
                let allowed = config
                    .allowed_domains
                    .iter()
                    .any(|d| host.ends_with(&d.to_lowercase()));
                if !allowed {
                    acc.raise(30, format!("External link: {}", host));
                }
            }
        }
    }

    if let (Some(page_area), Some(bbox)) = (page_area, annotation.bbox.as_ref()) {
        let area = rect_area(bbox);
        if page_area > 0.0 && area > 0.0 {
            let coverage = area / page_area;
            let pct = (coverage * 100.0).round_ties_even();
            if coverage > config.coverage_high {
                acc.raise(92, format!("Very large rect ({}%)", pct));
            } else if coverage > config.coverage_mid {
                acc.raise(85, format!("Large rect ({}%)", pct));
            }
        }
    }

    let modified = annotation.modified.as_deref().and_then(parse_pdf_date);
    if let Some(m) = modified {
        if times.created.is_some_and(|c| m < c) {
            acc.raise(85, "Annotation predates document creation");
        }
        if times.modified.is_some_and(|d| m > d) {
            acc.raise(88, "Annotation newer than document ModDate");
        }
    }

    let has_contents = annotation
        .contents
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if has_contents && subtype.is_some_and(|s| MARKUP_TYPES.contains(&s)) {
        acc.reasons.push("User comment/markup present".into());
    }

    AnnotationRisk {
        page: annotation.page,
        bbox: annotation.bbox,
        subtype: subtype.map(str::to_string),
        flags,
        action: annotation.action.clone(),
        modified,
        risk: acc.risk.min(100),
        reasons: acc.reasons,
    }
}

/// Score every annotation of a document.
///
/// Benign links are nudged down when there are few of them and up when the
/// document is flooded with links. The score floors at `present_floor` when
/// annotations exist, so a document with annotations never reads as clean.
pub fn score_annotations(
    annotations: &[RawAnnotation],
    page_areas: &BTreeMap<u32, f64>,
    times: DocumentTimes,
    config: &AnnotationConfig,
) -> AnnotationSummary {
    let mut counts_by_type: BTreeMap<String, usize> = BTreeMap::new();
    for a in annotations {
        let name = a.subtype_name().unwrap_or("Unknown").to_string();
        *counts_by_type.entry(name).or_insert(0) += 1;
    }
    let link_count = counts_by_type.get("Link").copied().unwrap_or(0);

    let risks: Vec<AnnotationRisk> = annotations
        .iter()
        .map(|a| {
            let mut risk = score_annotation(a, page_areas.get(&a.page).copied(), times, config);
            if a.subtype_name() == Some("Link") {
                if link_count <= config.link_benign_max_count && risk.risk <= 30 {
                    risk.risk = risk.risk.min(15);
                } else if link_count > config.link_flood_min_count && risk.risk < 40 {
                    risk.risk = 40;
                }
            }
            risk
        })
        .collect();

    let mut score = risks.iter().map(|r| r.risk).max().unwrap_or(0);
    if score == 0 && !annotations.is_empty() {
        score = config.present_floor;
    }
    debug!(annotations = annotations.len(), score, "Scored annotations");

    AnnotationSummary {
        score,
        counts_by_type,
        risks,
        suspicious_threshold: config.suspicious_threshold,
    }
}
