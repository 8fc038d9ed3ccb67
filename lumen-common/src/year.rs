//! Year parsing for free-text catalog years
//!
//! Catalog years are free text ("1900", "1925-1930", "vers 1950", "").
//! Only a leading integer counts: leading whitespace and an optional sign are
//! skipped, digits are read until the first non-digit.

/// Parse the leading integer of a year string
///
/// Returns `None` when the text does not start with a number.
///
/// # Examples
///
/// ```
/// use lumen_common::year::parse_leading_int;
///
/// assert_eq!(parse_leading_int("1925-1930"), Some(1925));
/// assert_eq!(parse_leading_int("  1900s"), Some(1900));
/// assert_eq!(parse_leading_int("vers 1950"), None);
/// assert_eq!(parse_leading_int(""), None);
/// ```
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    // Saturate absurdly long digit runs instead of failing
    let value = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Parse a year, mapping anything non-numeric to 0
///
/// 0 means "unknown year" for similarity and timeline purposes.
pub fn year_or_zero(text: &str) -> i64 {
    parse_leading_int(text).unwrap_or(0)
}

/// Known (strictly positive) year, if any
pub fn known_year(text: &str) -> Option<i64> {
    parse_leading_int(text).filter(|year| *year > 0)
}
