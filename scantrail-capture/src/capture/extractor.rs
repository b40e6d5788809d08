//! Secondary-device identifier extraction
//!
//! Composite vendor codes embed the meaningful device id in different
//! positions. Two heuristics apply in strict priority order; the order
//! matters because underscore-delimited vendor codes would be misparsed by
//! a naive dash split (`"OEM-RS-001_RBEF7B"` must yield `"RBEF7B"`, not
//! `"001_RBEF7B"`).

/// Minimum digit count for the dash-field rule to accept an IMEI-shaped field
const MIN_IMEI_DIGITS: usize = 10;

/// Extract the secondary device id from a composite payload
///
/// 1. Underscore-suffix rule: take the substring after the last `_`.
/// 2. Dash-field rule: split on `-`; accept the 3rd field if it is all
///    decimal digits and at least 10 digits long.
/// 3. Fallback: the trimmed input unchanged.
pub fn extract_secondary(raw: &str) -> String {
    let trimmed = raw.trim();

    // Rule a: underscore suffix
    if let Some(idx) = trimmed.rfind('_') {
        let suffix = trimmed[idx + 1..].trim();
        if !suffix.is_empty() {
            return suffix.to_string();
        }
    }

    // Rule b: dash-delimited IMEI-shaped third field
    let fields: Vec<&str> = trimmed.split('-').collect();
    if fields.len() >= 3 {
        let candidate = fields[2];
        if candidate.len() >= MIN_IMEI_DIGITS && candidate.chars().all(|c| c.is_ascii_digit()) {
            return candidate.to_string();
        }
    }

    // Rule c: passthrough
    trimmed.to_string()
}
