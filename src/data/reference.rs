//! Reference (market) datasets.
//!
//! Feeds arrive as loosely typed JSON:
//!
//! ```json
//! {
//!   "future_daily": {
//!     "1": { "dates": ["2025-08-07", "..."], "values": [[71.5, "..."], [210.0, "..."]] }
//!   },
//!   "historical_monthly": {
//!     "1": { "dates": ["Aug 2024", "..."], "values": [[...], [...]] }
//!   }
//! }
//! ```
//!
//! Section names and category ids are opaque strings. Channel cells are kept
//! as raw `serde_json::Value`s: which channel means "occupancy", and whether a
//! channel is flat or nested, is decided later by the locator.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Keys accepted for the per-category channel array.
const CHANNEL_KEYS: [&str; 3] = ["values", "channels", "series"];

/// One category: a date axis plus parallel channels.
///
/// Invariant: every channel has exactly `dates.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBlock {
    pub dates: Vec<String>,
    pub channels: Vec<Vec<Value>>,
}

impl CategoryBlock {
    pub fn new(dates: Vec<String>, channels: Vec<Vec<Value>>) -> Self {
        Self { dates, channels }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.channels.is_empty()
    }

    pub fn channel(&self, idx: usize) -> Option<&[Value]> {
        self.channels.get(idx).map(Vec::as_slice)
    }
}

/// Category id -> block. Ordered so scans are deterministic.
pub type Section = BTreeMap<String, CategoryBlock>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceDataset {
    pub sections: BTreeMap<String, Section>,
}

impl ReferenceDataset {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(|s| s.is_empty())
    }

    /// Parse a loosely typed reference payload.
    ///
    /// A top-level `"data"` object is unwrapped. Any object-valued member whose
    /// children look like category blocks becomes a section; everything else is
    /// ignored. Blocks whose channels do not line up with their dates are
    /// dropped rather than trusted.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        let root = value
            .as_object()
            .ok_or_else(|| ProviderError::Malformed("reference payload is not a JSON object".to_string()))?;

        let root = match root.get("data").and_then(Value::as_object) {
            Some(inner) => inner,
            None => root,
        };

        let mut sections = BTreeMap::new();
        for (name, raw) in root {
            let Some(raw) = raw.as_object() else { continue };
            let section = parse_section(name, raw);
            if !section.is_empty() {
                sections.insert(name.clone(), section);
            }
        }

        Ok(Self { sections })
    }
}

fn parse_section(name: &str, raw: &Map<String, Value>) -> Section {
    let mut section = Section::new();
    for (category_id, block) in raw {
        let Some(block) = block.as_object() else { continue };
        match parse_block(block) {
            Some(parsed) => {
                section.insert(category_id.clone(), parsed);
            }
            None => {
                tracing::debug!(section = name, category = %category_id, "dropping malformed category block");
            }
        }
    }
    section
}

fn parse_block(raw: &Map<String, Value>) -> Option<CategoryBlock> {
    let dates: Vec<String> = raw
        .get("dates")?
        .as_array()?
        .iter()
        .map(date_label)
        .collect();

    let channels_raw = CHANNEL_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array))?;

    // A bare series (`"values": [71.5, 72.0]`) is a single flat channel.
    let is_single_series = channels_raw.first().is_some_and(|v| !v.is_array())
        && channels_raw.len() == dates.len();

    let channels: Vec<Vec<Value>> = if is_single_series {
        vec![channels_raw.clone()]
    } else {
        channels_raw
            .iter()
            .map(|c| c.as_array().cloned())
            .collect::<Option<Vec<_>>>()?
    };

    if channels.iter().any(|c| c.len() != dates.len()) {
        return None;
    }

    Some(CategoryBlock { dates, channels })
}

fn date_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Coerce a raw channel cell into a number.
///
/// Numbers pass through, numeric strings are parsed, anything else is missing.
pub fn cell_number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_sections_and_unwraps_data() {
        let payload = json!({
            "data": {
                "future_daily": {
                    "1": { "dates": ["2025-08-07", "2025-08-08"], "values": [[70.5, 71.5], [200, 210]] }
                },
                "meta": "ignored"
            }
        });
        let ds = ReferenceDataset::from_value(&payload).unwrap();
        let section = ds.section("future_daily").unwrap();
        let block = section.get("1").unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block.channels.len(), 2);
        assert!(ds.section("meta").is_none());
    }

    #[test]
    fn single_series_becomes_one_channel() {
        let payload = json!({
            "s": { "a": { "dates": ["Aug 2024", "Sep 2024"], "values": [55.5, 60.25] } }
        });
        let ds = ReferenceDataset::from_value(&payload).unwrap();
        let block = &ds.sections["s"]["a"];
        assert_eq!(block.channels.len(), 1);
        assert_eq!(cell_number(&block.channels[0][1]), Some(60.25));
    }

    #[test]
    fn misaligned_block_is_dropped() {
        let payload = json!({
            "s": {
                "bad": { "dates": ["2025-01-01", "2025-01-02"], "values": [[1.5]] },
                "good": { "dates": ["2025-01-01"], "values": [[1.5]] }
            }
        });
        let ds = ReferenceDataset::from_value(&payload).unwrap();
        let section = ds.section("s").unwrap();
        assert!(section.get("bad").is_none());
        assert!(section.get("good").is_some());
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let err = ReferenceDataset::from_value(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn cell_number_coerces_strings() {
        assert_eq!(cell_number(&json!("72.5 %")), Some(72.5));
        assert_eq!(cell_number(&json!(null)), None);
        assert_eq!(cell_number(&json!("n/a")), None);
    }
}
