//! Employment termination certificate checks

use lazy_static::lazy_static;
use regex::Regex;

use super::{build_result, date_field, departure_before_document, field_evidence, ValidationContext};
use crate::types::{CheckResult, Kind, LabelData};

pub const JOB_START_DATE: &str = "job_start_date";
pub const JOB_DEPARTURE_DATE: &str = "job_departure_date";
pub const WORKER_ID: &str = "worker_id";

lazy_static! {
    static ref WORKER_ID_FORMAT: Regex = Regex::new(r"^\d{9}$").expect("static regex");
}

pub fn validate(labels: &LabelData, ctx: &ValidationContext<'_>) -> Vec<CheckResult> {
    vec![
        departure_before_document(labels, ctx.config),
        start_before_departure(labels, ctx),
        worker_id_format(labels, ctx),
    ]
}

/// A missing start date is tolerated; a missing departure date is not.
fn start_before_departure(labels: &LabelData, ctx: &ValidationContext<'_>) -> CheckResult {
    let start = date_field(labels, JOB_START_DATE);
    let departure = date_field(labels, JOB_DEPARTURE_DATE);

    let (score, details) = match (start, departure) {
        (None, _) => (20, "Start date missing; treated as acceptable"),
        (Some(_), None) => (80, "Departure date missing"),
        (Some(s), Some(d)) if s >= d => (0, "Start is on/after departure"),
        (Some(_), Some(_)) => (0, "Start is before departure"),
    };

    build_result(
        "StartBeforeDeparture",
        Kind::DateConsistency,
        "Start date vs departure date",
        details,
        score,
        vec![
            field_evidence(labels, JOB_START_DATE),
            field_evidence(labels, JOB_DEPARTURE_DATE),
        ],
        ctx.config,
    )
}

fn worker_id_format(labels: &LabelData, ctx: &ValidationContext<'_>) -> CheckResult {
    let raw = labels.get(WORKER_ID).and_then(|f| f.text.as_deref()).unwrap_or("");
    let valid = WORKER_ID_FORMAT.is_match(raw);
    build_result(
        "WorkerIDFormat",
        Kind::IdFormat,
        "Worker ID format",
        if valid {
            "Worker ID is 9 digits"
        } else {
            "Worker ID is not 9 digits"
        },
        if valid { 0 } else { 60 },
        vec![field_evidence(labels, WORKER_ID)],
        ctx.config,
    )
}
