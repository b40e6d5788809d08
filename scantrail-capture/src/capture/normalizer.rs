//! Payload normalization
//!
//! Turns a raw decoded string into a canonical identifier. Vendor QR codes
//! often wrap the asset id in a registration URL (`http://…/app?id=S020337`);
//! everything else passes through trimmed.

/// Normalize a raw decoded payload into a canonical identifier
///
/// Trims surrounding whitespace. If the trimmed string is an absolute URL
/// carrying a non-empty `id` query parameter (parameter name matched
/// case-insensitively), returns that value; otherwise returns the trimmed
/// string unchanged. Total and idempotent; callers must guard against the
/// empty string.
pub fn normalize(raw: &str) -> String {
    let mut value = raw.trim();

    // An id value can itself be a URL-wrapped code (re-registration labels
    // nest the original URL). Keep unwrapping until the value is stable;
    // each extracted value is a strict substring, so this terminates.
    while let Some(id) = url_id_param(value) {
        value = id;
    }

    value.to_string()
}

/// Extract the `id` query parameter from an absolute URL, if present
fn url_id_param(s: &str) -> Option<&str> {
    // Absolute URL shape: scheme "://" rest. Anything else passes through.
    let scheme_end = s.find("://")?;
    if scheme_end == 0 || !s[..scheme_end].chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        return None;
    }

    let query_start = s.find('?')?;
    let query = &s[query_start + 1..];
    // Drop any fragment
    let query = query.split('#').next().unwrap_or("");

    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        let name = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        if name.eq_ignore_ascii_case("id") && !value.is_empty() {
            return Some(value);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_trimmed() {
        assert_eq!(normalize("  S020337  "), "S020337");
        assert_eq!(normalize("S020337\n"), "S020337");
    }

    #[test]
    fn test_url_id_param_extracted() {
        assert_eq!(normalize("http://x/app?id=S020337"), "S020337");
        assert_eq!(normalize("https://tracker.example/reg?foo=1&ID=E012345"), "E012345");
    }

    #[test]
    fn test_url_without_id_param_passes_through() {
        assert_eq!(normalize("http://x/app?foo=1"), "http://x/app?foo=1");
        assert_eq!(normalize("http://x/app?id="), "http://x/app?id=");
    }

    #[test]
    fn test_non_url_with_query_chars_passes_through() {
        // No scheme, so not an absolute URL even though it contains "?id="
        assert_eq!(normalize("x/app?id=S020337"), "x/app?id=S020337");
    }

    #[test]
    fn test_nested_url_id_unwrapped_fully() {
        assert_eq!(normalize("http://x/a?id=http://y/b?id=S020337"), "S020337");
    }

    #[test]
    fn test_fragment_excluded_from_query() {
        assert_eq!(normalize("http://x/app?id=S020337#top"), "S020337");
        assert_eq!(normalize("http://x/app?other=1#id=NOPE"), "http://x/app?other=1#id=NOPE");
    }

    #[test]
    fn test_idempotent() {
        for s in [
            "  S020337  ",
            "http://x/app?id=S020337",
            "http://x/app?foo=1",
            "http://x/a?id=http://y/b?id=Z",
            "",
            "plainvalue",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_empty_input_stays_empty() {
        assert_eq!(normalize("   "), "");
    }
}
