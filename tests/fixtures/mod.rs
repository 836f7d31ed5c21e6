#![allow(dead_code)]

use docfraud::config::ClientConfig;
use docfraud::types::{Category, CheckResult, Kind, OcrWord, WordRecord};

pub fn word(text: &str, font: Option<&str>, page: u32, y: f64) -> WordRecord {
    WordRecord {
        text: text.into(),
        bbox: [50.0, y, 120.0, y + 12.0],
        font: font.map(String::from),
        page,
    }
}

pub fn ocr_word(text: &str, font: &str, y: f64) -> OcrWord {
    OcrWord {
        text: text.into(),
        bbox: [50.0, y, 120.0, y + 12.0],
        font: Some(font.into()),
    }
}

/// `body` words in `common`, then `rare` words in `odd`, all mid-page.
pub fn font_page(common: &str, body: usize, odd: &str, rare: usize) -> Vec<OcrWord> {
    let mut words: Vec<OcrWord> = (0..body)
        .map(|i| ocr_word(&format!("w{}", i), common, 100.0 + i as f64 * 2.0))
        .collect();
    words.extend((0..rare).map(|i| ocr_word(&format!("odd{}", i), odd, 400.0 + i as f64 * 2.0)));
    words
}

pub fn check(score: i64, category: Category, kind: Kind, config: &ClientConfig) -> CheckResult {
    CheckResult::new("Test", category, kind, "test", "", score, vec![], config)
}
