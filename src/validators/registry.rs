//! Known withholding (deduction) file numbers
//!
//! Loaded once at startup and shared read-only. The registry file is either
//! CSV with a header row or a JSON list of row objects.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::Result;

/// Digits of `raw`, if there are exactly nine of them.
pub fn normalize_file_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 9).then_some(digits)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_field(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| row.get(*k).and_then(value_text))
}

#[derive(Debug, Clone, Default)]
pub struct DeductionRegistry {
    companies: HashMap<String, Option<String>>,
}

impl DeductionRegistry {
    /// Rows are objects with `withholding_file_number` (or `number`) and an
    /// optional display name under `name`, `company` or `brand`.
    pub fn from_rows(rows: &[Value]) -> Self {
        let mut companies = HashMap::new();
        for row in rows {
            let Some(number) = first_field(row, &["withholding_file_number", "number"])
                .as_deref()
                .and_then(normalize_file_number)
            else {
                continue;
            };
            let company = first_field(row, &["name", "company", "brand"]);
            companies.insert(number, company);
        }
        Self { companies }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let rows: Vec<Value> = serde_json::from_str(json)?;
        Ok(Self::from_rows(&rows))
    }

    /// Columns are matched by header name, so extra columns are ignored.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::Headers)
            .flexible(true)
            .from_reader(data.as_bytes());
        let mut rows = Vec::new();
        for record in reader.deserialize::<HashMap<String, String>>() {
            let row: Map<String, Value> = record?
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            rows.push(Value::Object(row));
        }
        Ok(Self::from_rows(&rows))
    }

    /// `.json` files hold row objects, anything else is read as CSV. A missing
    /// file yields an empty registry, so every number reads as unknown.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Deduction registry not found, using empty registry");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let registry = if is_json {
            Self::from_json_str(&data)?
        } else {
            Self::from_csv_str(&data)?
        };
        info!(path = %path.display(), entries = registry.len(), "Loaded deduction registry");
        Ok(registry)
    }

    /// Whether the normalised number is known.
    pub fn contains(&self, number: &str) -> bool {
        self.companies.contains_key(number)
    }

    pub fn company_for(&self, number: &str) -> Option<&str> {
        self.companies.get(number).and_then(|c| c.as_deref())
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
