//! Parsing of human-readable engagement counts ("42", "1.2K", "3M").

use regex::Regex;

/// First count-like token: digits, optional fraction, optional K/M suffix.
static COUNT_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?[KkMm]?)").unwrap());

/// Parse a displayed engagement count into an integer.
///
/// Takes the first count-like token in `raw`. A `K`/`k` suffix multiplies by
/// one thousand and `M`/`m` by one million; otherwise the token must be plain
/// digits. Anything unparseable yields 0, so this never fails.
#[must_use]
pub fn parse_count(raw: &str) -> u64 {
    let Some(token) = COUNT_PATTERN.find(raw).map(|m| m.as_str()) else {
        return 0;
    };

    let (number, multiplier) = match token.chars().last() {
        Some('K' | 'k') => (&token[..token.len() - 1], 1_000.0),
        Some('M' | 'm') => (&token[..token.len() - 1], 1_000_000.0),
        _ => {
            if token.chars().all(|c| c.is_ascii_digit()) {
                return token.parse().unwrap_or(0);
            }
            return 0;
        }
    };

    number
        .parse::<f64>()
        .map(|n| (n * multiplier).round())
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map_or(0, |n| n as u64)
}

/// Whether a span's text looks like a count worth parsing.
///
/// Used by the per-metric fallback, which only trusts spans that are all
/// digits or carry an upper-case K/M suffix.
#[must_use]
pub fn looks_like_count(text: &str) -> bool {
    !text.is_empty() && (text.chars().all(|c| c.is_ascii_digit()) || text.contains(['K', 'M']))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_digits() {
        assert_eq!(parse_count("47"), 47);
        assert_eq!(parse_count("0"), 0);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_count("1.2K"), 1200);
        assert_eq!(parse_count("3M"), 3_000_000);
        assert_eq!(parse_count("2.5m"), 2_500_000);
        assert_eq!(parse_count("9k"), 9000);
        assert_eq!(parse_count("1.1K"), 1100);
    }

    #[test]
    fn test_embedded_in_text() {
        assert_eq!(parse_count("42 replies"), 42);
        assert_eq!(parse_count("Liked by 1.5K people"), 1500);
    }

    #[test]
    fn test_invalid_is_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("garbage"), 0);
        assert_eq!(parse_count("K"), 0);
    }

    #[test]
    fn test_fraction_without_suffix_is_zero() {
        assert_eq!(parse_count("1.5"), 0);
    }

    #[test]
    fn test_overflowing_digits_are_zero() {
        assert_eq!(parse_count("99999999999999999999999999"), 0);
    }

    #[test]
    fn test_monotonic_in_magnitude() {
        assert!(parse_count("999") < parse_count("1K"));
        assert!(parse_count("1K") < parse_count("1.2K"));
        assert!(parse_count("999K") < parse_count("1M"));
    }

    #[test]
    fn test_looks_like_count() {
        assert!(looks_like_count("12"));
        assert!(looks_like_count("1.2K"));
        assert!(looks_like_count("3M"));
        assert!(!looks_like_count(""));
        assert!(!looks_like_count("1,234"));
        assert!(!looks_like_count("Reply"));
        assert!(!looks_like_count("like"));
    }
}
