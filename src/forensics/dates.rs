//! Date parsing for PDF, EXIF and extracted document fields
//!
//! All timestamps are handled as naive UTC. Unparseable input yields `None`
//! and is scored as missing data by the callers.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a PDF date (`D:YYYYMMDDHHmmSS...`), using the first 14 digits.
///
/// Truncated forms with at least a full date are padded with zeros.
/// Timezone suffixes are ignored.
pub fn parse_pdf_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).take(14).collect();
    if digits.len() < 8 || digits.len() % 2 != 0 {
        return None;
    }
    let padded = format!("{:0<14}", digits);
    NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S").ok()
}

/// Parse an EXIF style timestamp.
pub fn parse_image_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    for fmt in ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a signing time: ISO 8601 first, then the PDF date form.
pub fn parse_signing_time(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    parse_pdf_date(s)
}

fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a date extracted from the document body.
pub fn parse_document_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    parse_compact_date(s)
}

/// First parseable candidate, as midnight of that day.
pub fn parse_reference_date<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<NaiveDateTime> {
    candidates
        .into_iter()
        .find_map(parse_document_date)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Whole days between two instants, floored like a signed day delta, as an absolute value.
pub fn days_apart(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    (a - b).num_seconds().div_euclid(86_400).abs()
}
