//! Free-form percentage strings -> fractions.

use std::sync::LazyLock;

use regex::Regex;

/// First numeric token in a string (`"80 %"`, `"Occupancy: 72.5%"`, `".5%"`, `"-5 %"`).
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?(?:\d+(?:\.\d+)?|\.\d+)").expect("valid regex"));

/// Parse a percentage string into a fraction (`"80 %"` -> `0.8`).
///
/// Total and lossy: missing, unparseable, negative or "unavailable" inputs
/// all yield `0.0`, which downstream code treats as "no signal".
pub fn parse_percentage(text: Option<&str>) -> f64 {
    let Some(text) = text.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };
    if text.to_ascii_lowercase().contains("unavailable") {
        return 0.0;
    }
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| (v / 100.0).max(0.0))
        .unwrap_or(0.0)
}
