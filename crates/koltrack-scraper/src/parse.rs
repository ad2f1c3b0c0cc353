//! Shared suffix parser for human-formatted counts.

use regex::Regex;
use std::sync::LazyLock;

static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9][0-9.,]*)\s*([KMB])?").expect("valid regex"));

/// Parses a follower-style count such as `"1.5K"`, `"2M"`, `"1,234"`.
///
/// Strips thousands separators, matches `<number>[KMB]?` case-insensitive,
/// scales by 1e3/1e6/1e9, and truncates to an integer. Unparsable input
/// returns `default` — field readers prefer defaults over errors.
#[must_use]
pub fn parse_count(text: &str, default: i64) -> i64 {
    let Some(caps) = COUNT_RE.captures(text) else {
        return default;
    };

    let digits = caps[1].replace(',', "");
    let Ok(value) = digits.parse::<f64>() else {
        return default;
    };

    let scale = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(s) if s == "K" => 1e3,
        Some(s) if s == "M" => 1e6,
        Some(s) if s == "B" => 1e9,
        _ => 1.0,
    };

    #[allow(clippy::cast_possible_truncation)]
    let scaled = (value * scale).trunc() as i64;
    scaled
}

/// Like [`parse_count`], but for optional raw text straight from a field
/// reader.
#[must_use]
pub fn parse_count_opt(text: Option<&str>, default: i64) -> i64 {
    text.map_or(default, |t| parse_count(t, default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number() {
        assert_eq!(parse_count("900", 0), 900);
    }

    #[test]
    fn kilo_suffix_with_decimal() {
        assert_eq!(parse_count("1.5K", 0), 1500);
    }

    #[test]
    fn mega_suffix() {
        assert_eq!(parse_count("2M", 0), 2_000_000);
    }

    #[test]
    fn giga_suffix_lowercase() {
        assert_eq!(parse_count("1.2b", 0), 1_200_000_000);
    }

    #[test]
    fn thousands_separators_are_stripped() {
        assert_eq!(parse_count("1,234,567", 0), 1_234_567);
    }

    #[test]
    fn empty_input_yields_default() {
        assert_eq!(parse_count("", 42), 42);
    }

    #[test]
    fn non_numeric_input_yields_default() {
        assert_eq!(parse_count("abc", 7), 7);
    }

    #[test]
    fn number_embedded_in_text() {
        assert_eq!(parse_count("12.3K Followers", 0), 12_300);
    }

    #[test]
    fn truncates_fractional_result() {
        // 1.2345K = 1234.5 → 1234
        assert_eq!(parse_count("1.2345K", 0), 1234);
    }

    #[test]
    fn optional_text_none_yields_default() {
        assert_eq!(parse_count_opt(None, 9), 9);
        assert_eq!(parse_count_opt(Some("3K"), 9), 3000);
    }
}
