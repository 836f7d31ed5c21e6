//! Tax assessor certificate checks

use serde_json::json;
use tracing::debug;

use super::{
    build_result, date_field, departure_before_document, field_evidence, normalize_file_number,
    ValidationContext,
};
use crate::types::{Category, CheckResult, Evidence, EvidenceType, Kind, LabelData};

pub const DOCUMENT_DATE: &str = "document_date";
pub const DOCUMENT_DATE_HEBREW: &str = "document_date_hebrew";
pub const DEDUCTION_FILE_NUMBER: &str = "deduction_file_number";
pub const TAX_OFFICER_NAME: &str = "tax_officer_name";

pub fn validate(labels: &LabelData, ctx: &ValidationContext<'_>) -> Vec<CheckResult> {
    vec![
        hebrew_english_dates(labels, ctx),
        departure_before_document(labels, ctx.config),
        deduction_file_number(labels, ctx),
        tax_officer_blacklist(labels, ctx),
    ]
}

/// Gregorian and Hebrew document dates must name the same day.
fn hebrew_english_dates(labels: &LabelData, ctx: &ValidationContext<'_>) -> CheckResult {
    let title = "Hebrew and English dates match";
    let Some(parser) = ctx.hebrew_dates else {
        return CheckResult::skipped(
            "HebrewEnglishDateMatch",
            Category::CrossSourceVerification,
            Kind::DateConsistency,
            title,
            "Hebrew date parser unavailable",
        );
    };

    let english = date_field(labels, DOCUMENT_DATE);
    let hebrew = labels.text(DOCUMENT_DATE_HEBREW).and_then(|raw| parser.parse(raw));
    let valid = matches!((english, hebrew), (Some(e), Some(h)) if e == h);
    debug!(?english, ?hebrew, valid, "Compared document dates");

    build_result(
        "HebrewEnglishDateMatch",
        Kind::DateConsistency,
        title,
        if valid {
            "Dates are consistent"
        } else {
            "Mismatch between Hebrew and English dates"
        },
        if valid { 0 } else { 100 },
        vec![
            field_evidence(labels, DOCUMENT_DATE),
            field_evidence(labels, DOCUMENT_DATE_HEBREW),
        ],
        ctx.config,
    )
}

fn deduction_file_number(labels: &LabelData, ctx: &ValidationContext<'_>) -> CheckResult {
    let normalized = labels.text(DEDUCTION_FILE_NUMBER).and_then(normalize_file_number);
    let known = normalized.as_deref().filter(|n| ctx.registry.contains(n));

    let mut evidence = vec![field_evidence(labels, DEDUCTION_FILE_NUMBER)];
    if let Some(company) = known.and_then(|n| ctx.registry.company_for(n)) {
        evidence.push(Evidence::new(
            EvidenceType::Metric,
            json!({ "matched_company": company }),
        ));
    }

    build_result(
        "DeductionFileNumber",
        Kind::RegistryMatch,
        "Deduction file number validity",
        if known.is_some() {
            "Known deduction file number"
        } else {
            "Unknown deduction file number"
        },
        if known.is_some() { 0 } else { 70 },
        evidence,
        ctx.config,
    )
}

fn tax_officer_blacklist(labels: &LabelData, ctx: &ValidationContext<'_>) -> CheckResult {
    let blacklisted = labels
        .text(TAX_OFFICER_NAME)
        .is_some_and(|name| ctx.config.is_blacklisted_officer(name));
    build_result(
        "TaxOfficerBlacklist",
        Kind::RegistryMatch,
        "Tax officer not blacklisted",
        if blacklisted {
            "Tax officer is blacklisted"
        } else {
            "Name not in blacklist"
        },
        if blacklisted { 100 } else { 0 },
        vec![field_evidence(labels, TAX_OFFICER_NAME)],
        ctx.config,
    )
}
