//! Locale-tolerant parsing of numeric, currency and percentage text.
//!
//! Market pages mix Spanish formatting ("1.234.567 €", "12,5%") with plain
//! decimals ("1234.56"). None of these helpers fail: malformed text becomes
//! `0` for integers and `None` for reals.

/// Parse an integer amount such as `"1.234.567 €"`.
///
/// Whitespace (including non-breaking spaces), `€`, `.` and `,` are removed
/// before parsing. Anything that still does not parse yields `0`.
pub fn to_int(text: &str) -> i64 {
    let cleaned: String =
        text.chars().filter(|c| !c.is_whitespace() && !matches!(c, '.' | ',' | '€')).collect();
    cleaned.parse::<i64>().unwrap_or(0)
}

/// Like [`to_int`] but for attributes that may be missing entirely.
pub fn to_int_opt(text: Option<&str>) -> i64 {
    text.map(to_int).unwrap_or(0)
}

/// Parse a real number such as `"1.234,56 €"`, `"12,5%"` or `"1234.56"`.
///
/// When a comma is present it is the decimal separator and dots are
/// thousands separators. Characters outside `[0-9.+-]` are discarded.
pub fn to_float(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace() && *c != '%').collect();
    if cleaned.is_empty() {
        return None;
    }

    let cleaned = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    let digits: String =
        cleaned.chars().filter(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-')).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a table cell holding a market value or a percentage variation.
///
/// Differs from [`to_float`] in how dots are treated: a dot followed by
/// exactly three digits is a thousands separator even without a comma, so
/// `"1.234.567"` reads as `1234567` while `"3.5"` stays `3.5`.
pub fn clean_cell_number(text: &str, strip_percent: bool) -> Option<f64> {
    let mut cleaned: String = text.chars().filter(|c| !c.is_whitespace() && *c != '€').collect();
    if strip_percent {
        cleaned.retain(|c| c != '%');
    }

    let chars: Vec<char> = cleaned.chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '.' && is_thousands_dot(&chars, i) {
            continue;
        }
        out.push(if ch == ',' { '.' } else { ch });
    }

    let digits: String =
        out.chars().filter(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-')).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A dot at `i` followed by three digits and then a non-digit or the end.
fn is_thousands_dot(chars: &[char], i: usize) -> bool {
    let group = &chars[i + 1..];
    group.len() >= 3
        && group[..3].iter().all(|c| c.is_ascii_digit())
        && group.get(3).map_or(true, |c| !c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_int_strips_separators_and_currency() {
        assert_eq!(to_int("1.234.567 €"), 1_234_567);
        assert_eq!(to_int("\u{a0}25.000\u{a0}€"), 25_000);
        assert_eq!(to_int("-120.000"), -120_000);
        assert_eq!(to_int("n/a"), 0);
        assert_eq!(to_int(""), 0);
        assert_eq!(to_int_opt(None), 0);
    }

    #[test]
    fn test_to_float_locale_variants() {
        assert_eq!(to_float("1.234,56 €"), Some(1234.56));
        assert_eq!(to_float("1234.56"), Some(1234.56));
        assert_eq!(to_float("12,5%"), Some(12.5));
        assert_eq!(to_float("-3,2 %"), Some(-3.2));
        assert_eq!(to_float("+7"), Some(7.0));
    }

    #[test]
    fn test_to_float_absent_on_garbage() {
        assert_eq!(to_float(""), None);
        assert_eq!(to_float("   "), None);
        assert_eq!(to_float("sin datos"), None);
        assert_eq!(to_float("1.2.3"), None);
    }

    #[test]
    fn test_clean_cell_number() {
        assert_eq!(clean_cell_number("1.234.567 €", false), Some(1_234_567.0));
        assert_eq!(clean_cell_number("3.5", false), Some(3.5));
        assert_eq!(clean_cell_number("1.234,5", false), Some(1234.5));
        assert_eq!(clean_cell_number("+4,25%", true), Some(4.25));
        assert_eq!(clean_cell_number("-", true), None);
    }
}
