//! Digital signature risk scoring
//!
//! Rules run in priority order. A broken cryptographic integrity check ends
//! evaluation with a fixed score; timing anomalies set a floor; trust,
//! coverage and policy findings add penalties.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::dates::{days_apart, parse_signing_time};
use crate::config::SignatureConfig;

/// Validation result for one signature, as reported by the structure reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// Raw signing time, ISO 8601 or PDF date.
    #[serde(default)]
    pub signing_time: Option<String>,
    #[serde(default)]
    pub intact: Option<bool>,
    /// `None` when trust could not be established either way.
    #[serde(default)]
    pub trusted: Option<bool>,
    #[serde(default = "default_covers")]
    pub covers_document: bool,
    #[serde(default)]
    pub docmdp_ok: Option<bool>,
}

fn default_covers() -> bool {
    true
}

impl Default for SignatureInfo {
    fn default() -> Self {
        Self {
            name: None,
            signing_time: None,
            intact: None,
            trusted: None,
            covers_document: true,
            docmdp_ok: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureIssue {
    IntegrityFail,
    SignBeforeCreation,
    SignAfterModification,
    InvoiceDateFar,
    UntrustedChain,
    IndeterminateChain,
    NotCoverEntire,
    DocmdpFail,
    MissingSignTime,
}

/// Fixed description order, most severe first.
pub const ISSUE_PRIORITY: [SignatureIssue; 9] = [
    SignatureIssue::IntegrityFail,
    SignatureIssue::SignBeforeCreation,
    SignatureIssue::SignAfterModification,
    SignatureIssue::InvoiceDateFar,
    SignatureIssue::UntrustedChain,
    SignatureIssue::IndeterminateChain,
    SignatureIssue::NotCoverEntire,
    SignatureIssue::DocmdpFail,
    SignatureIssue::MissingSignTime,
];

impl SignatureIssue {
    fn priority(self) -> usize {
        ISSUE_PRIORITY
            .iter()
            .position(|i| *i == self)
            .unwrap_or(ISSUE_PRIORITY.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRisk {
    pub name: Option<String>,
    pub signed_at: Option<NaiveDateTime>,
    pub intact: Option<bool>,
    pub trusted: Option<bool>,
    pub covers_document: bool,
    pub docmdp_ok: Option<bool>,
    pub issue_score: u8,
    pub issue_reasons: Vec<SignatureIssue>,
}

/// Timestamps the signing time is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigningContext {
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    /// Date printed on the document itself.
    pub reference: Option<NaiveDateTime>,
}

pub fn score_signature(
    sig: &SignatureInfo,
    ctx: &SigningContext,
    config: &SignatureConfig,
) -> SignatureRisk {
    let signed_at = sig.signing_time.as_deref().and_then(parse_signing_time);
    let mut risk = SignatureRisk {
        name: sig.name.clone(),
        signed_at,
        intact: sig.intact,
        trusted: sig.trusted,
        covers_document: sig.covers_document,
        docmdp_ok: sig.docmdp_ok,
        issue_score: 0,
        issue_reasons: Vec::new(),
    };

    if sig.intact == Some(false) {
        risk.issue_score = config.integrity_fail_score.min(100);
        risk.issue_reasons.push(SignatureIssue::IntegrityFail);
        return risk;
    }

    let mut score: u32 = 0;
    let mut floor: u32 = 0;
    match signed_at {
        None => {
            score += u32::from(config.missing_time_penalty);
            risk.issue_reasons.push(SignatureIssue::MissingSignTime);
        }
        Some(at) => {
            if ctx.created.is_some_and(|c| at < c) {
                floor = u32::from(config.time_anomaly_floor);
                risk.issue_reasons.push(SignatureIssue::SignBeforeCreation);
            }
            if ctx.modified.is_some_and(|m| at > m) {
                floor = u32::from(config.time_anomaly_floor);
                risk.issue_reasons.push(SignatureIssue::SignAfterModification);
            }
            if ctx
                .reference
                .is_some_and(|r| days_apart(at, r) > config.window_days)
            {
                floor = u32::from(config.time_anomaly_floor);
                risk.issue_reasons.push(SignatureIssue::InvoiceDateFar);
            }
        }
    }

    match sig.trusted {
        Some(false) => {
            score += u32::from(config.untrusted_penalty);
            risk.issue_reasons.push(SignatureIssue::UntrustedChain);
        }
        None => {
            score += u32::from(config.indeterminate_penalty);
            risk.issue_reasons.push(SignatureIssue::IndeterminateChain);
        }
        Some(true) => {}
    }
    if !sig.covers_document {
        score += u32::from(config.partial_coverage_penalty);
        risk.issue_reasons.push(SignatureIssue::NotCoverEntire);
    }
    if sig.docmdp_ok == Some(false) {
        score += u32::from(config.docmdp_penalty);
        risk.issue_reasons.push(SignatureIssue::DocmdpFail);
    }

    risk.issue_score = score.max(floor).min(100) as u8;
    risk
}

/// Signature check outcome for the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureSummary {
    /// Worst issue score over all signatures.
    pub score: u8,
    pub risks: Vec<SignatureRisk>,
    pub description: String,
}

impl SignatureSummary {
    pub fn worst(&self) -> Option<&SignatureRisk> {
        self.risks.iter().max_by_key(|r| r.issue_score)
    }
}

/// Score every signature; one bad signature taints the document.
pub fn score_signatures(
    signatures: &[SignatureInfo],
    ctx: &SigningContext,
    config: &SignatureConfig,
) -> SignatureSummary {
    let risks: Vec<SignatureRisk> = signatures
        .iter()
        .map(|s| score_signature(s, ctx, config))
        .collect();
    let score = risks.iter().map(|r| r.issue_score).max().unwrap_or(0);

    // first of the worst, in input order
    let worst = risks.iter().find(|r| r.issue_score == score);
    let description = match worst {
        Some(w) if score > 0 => format!(
            "Signature issues: {}",
            describe_issues(&w.issue_reasons, w.signed_at, ctx, config.window_days)
        ),
        Some(_) => "Valid digital signature".to_string(),
        None => "No digital signatures".to_string(),
    };

    SignatureSummary {
        score,
        risks,
        description,
    }
}

fn fmt_dt(dt: Option<NaiveDateTime>) -> String {
    dt.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| "None".into())
}

pub fn describe_issue(
    issue: SignatureIssue,
    signed_at: Option<NaiveDateTime>,
    ctx: &SigningContext,
    window_days: i64,
) -> String {
    match issue {
        SignatureIssue::IntegrityFail => "cryptographic integrity check failed".into(),
        SignatureIssue::SignBeforeCreation => format!(
            "signing time {} is before file creation {}",
            fmt_dt(signed_at),
            fmt_dt(ctx.created)
        ),
        SignatureIssue::SignAfterModification => format!(
            "signing time {} is after last modification {}",
            fmt_dt(signed_at),
            fmt_dt(ctx.modified)
        ),
        SignatureIssue::InvoiceDateFar => match (signed_at, ctx.reference) {
            (Some(s), Some(r)) => format!(
                "signing time {} is {} days from invoice date {} (>{} allowed)",
                fmt_dt(Some(s)),
                days_apart(s, r),
                fmt_dt(Some(r)),
                window_days
            ),
            _ => "signing time is too far from invoice date".into(),
        },
        SignatureIssue::UntrustedChain => "certificate chain not trusted by system CA store".into(),
        SignatureIssue::IndeterminateChain => {
            "certificate trust indeterminate (partial chain / missing revocation info)".into()
        }
        SignatureIssue::NotCoverEntire => "signature does not cover the entire file".into(),
        SignatureIssue::DocmdpFail => "modification restrictions violated (DocMDP policy)".into(),
        SignatureIssue::MissingSignTime => "signing time missing or unparseable".into(),
    }
}

/// Join with natural connectives: `a`, `a and b`, `a, b, and c`.
pub fn join_messages(msgs: &[String]) -> String {
    match msgs {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [head @ .., last] => format!("{}, and {}", head.join(", "), last),
    }
}

/// Deduplicated issues in priority order, rendered as one sentence.
pub fn describe_issues(
    issues: &[SignatureIssue],
    signed_at: Option<NaiveDateTime>,
    ctx: &SigningContext,
    window_days: i64,
) -> String {
    let mut sorted: Vec<SignatureIssue> = issues.to_vec();
    sorted.sort_by_key(|i| i.priority());
    sorted.dedup();
    let msgs: Vec<String> = sorted
        .into_iter()
        .map(|i| describe_issue(i, signed_at, ctx, window_days))
        .collect();
    join_messages(&msgs)
}
