//! Font rarity statistics
//!
//! A font is "rare" in a document when the upper Wilson bound of its share
//! of words falls below a per-document threshold. The threshold is placed
//! between the bounds of the `k*` and `k*+1` occurrence counts so that fonts
//! seen `k*` times are flagged and fonts seen `k*+1` times are not.

use std::collections::HashMap;

use crate::config::FontConfig;

/// Parameters of the per-document threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    pub rare_k_max: u32,
    pub z: f64,
    /// Clamped into `[0, 0.95]` on construction.
    pub alpha: f64,
    pub cap: f64,
    pub floor: f64,
}

impl ThresholdParams {
    pub fn new(rare_k_max: u32, z: f64, alpha: f64) -> Self {
        Self {
            rare_k_max,
            z,
            alpha: alpha.clamp(0.0, 0.95),
            cap: 0.35,
            floor: 0.001,
        }
    }
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self::new(3, 1.64, 0.8)
    }
}

impl From<&FontConfig> for ThresholdParams {
    fn from(config: &FontConfig) -> Self {
        Self {
            cap: config.threshold_cap,
            floor: config.threshold_floor,
            ..Self::new(config.rare_k_max, config.ci_z, config.alpha)
        }
    }
}

/// Upper bound of the Wilson score interval for `count` successes out of `total`.
pub fn wilson_upper_bound(count: u64, total: u64, z: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let phat = count as f64 / total;
    let denom = 2.0 * (total + z * z);
    let center = 2.0 * total * phat + z * z;
    let rad = z * (z * z + 4.0 * total * phat * (1.0 - phat)).sqrt();
    (center + rad) / denom
}

/// Per-document rarity threshold in `(0, 1]`.
///
/// Returns `1.0` when nothing carries a font and `0.0` when only one
/// distinct font exists, so that nothing is flagged in either case.
pub fn dynamic_doc_threshold(
    total_with_font: u64,
    font_counts: &HashMap<String, u64>,
    params: &ThresholdParams,
) -> f64 {
    if total_with_font == 0 || font_counts.is_empty() {
        return 1.0;
    }
    if font_counts.len() == 1 {
        return 0.0;
    }

    let k_min = font_counts.values().copied().min().unwrap_or(1);
    let k_star = u64::from(params.rare_k_max).min(k_min.max(1));

    let ub_k = wilson_upper_bound(k_star, total_with_font, params.z);
    let mut ub_next = wilson_upper_bound((k_star + 1).min(total_with_font), total_with_font, params.z);
    if ub_next <= ub_k {
        ub_next = (ub_k + 1.0 / total_with_font.max(1) as f64).min(1.0);
    }

    let alpha = params.alpha.clamp(0.0, 0.95);
    let mut t_doc = ub_k + alpha * (ub_next - ub_k);
    t_doc = t_doc.min(params.cap);
    if t_doc <= ub_k {
        t_doc = ub_k + 1e-6;
    }
    t_doc.max(params.floor)
}

/// `P(X <= k)` for `X ~ Binomial(n, p)`.
///
/// Terms are accumulated in log space so large documents neither overflow
/// the binomial coefficient nor underflow the leading term.
pub fn binom_cdf_le(k: u64, n: u64, p: f64) -> f64 {
    if k >= n {
        return 1.0;
    }
    if p <= 0.0 {
        return 1.0;
    }
    if p >= 1.0 {
        return 0.0;
    }

    let ln_p = p.ln();
    let ln_q = (-p).ln_1p();
    let mut ln_term = n as f64 * ln_q;
    let mut sum = ln_term.exp();
    for i in 0..k {
        // C(n, i+1) / C(n, i) = (n - i) / (i + 1)
        ln_term += ((n - i) as f64).ln() - ((i + 1) as f64).ln() + ln_p - ln_q;
        sum += ln_term.exp();
    }
    sum.clamp(0.0, 1.0)
}

/// Severity of a rare font: `round(100 * (1 - P(X <= count)))`.
pub fn rarity_severity(count: u64, total: u64, t_doc: f64) -> (f64, u8) {
    let pval = binom_cdf_le(count, total, t_doc);
    let severity = (100.0 * (1.0 - pval)).round_ties_even().clamp(0.0, 100.0) as u8;
    (pval, severity)
}

/// Collapse stylistic variants of a font name into one bucket.
///
/// Lowercases, drops subset prefixes (`ABCDEF+Name`) and keeps the part
/// before the first `-` or `,`. Stacked prefixes are all dropped so the
/// function is idempotent.
pub fn normalize_font_name(font: &str) -> String {
    let lowered = font.to_lowercase();
    let mut base = lowered.as_str();
    while let Some(pos) = base.find('+') {
        if pos == 0 {
            break;
        }
        base = &base[pos + 1..];
    }
    base.split(['-', ',']).next().unwrap_or("").to_string()
}
