//! Invoice number sequencing

use chrono::NaiveDate;
use rand::Rng;
use tracing::warn;

/// Next invoice number for a user.
///
/// Continues the last run of digits in `latest`, keeping whatever surrounds it
/// and its zero padding (`INV-0041` → `INV-0042`, `2025/099-A` → `2025/100-A`).
/// Without a usable previous number, falls back to `INV-YYYYMMDD-NNNN`.
pub fn next_invoice_number(latest: Option<&str>, today: NaiveDate) -> String {
    if let Some(next) = latest.and_then(increment_trailing_number) {
        return next;
    }

    if let Some(latest) = latest {
        warn!(latest, "Previous invoice number has no sequence, using date-based number");
    }
    fallback_number(today, rand::thread_rng().gen_range(0..10_000))
}

/// Increment the last digit group, preserving prefix, suffix and width
pub fn increment_trailing_number(number: &str) -> Option<String> {
    let bytes = number.as_bytes();
    let end = bytes.iter().rposition(u8::is_ascii_digit)? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);

    let digits = &number[start..end];
    let value: u64 = digits.parse().ok()?;
    let next = value.checked_add(1)?;

    Some(format!(
        "{}{:0width$}{}",
        &number[..start],
        next,
        &number[end..],
        width = digits.len()
    ))
}

/// `INV-YYYYMMDD-NNNN`
pub fn fallback_number(today: NaiveDate, disambiguator: u16) -> String {
    format!("INV-{}-{:04}", today.format("%Y%m%d"), disambiguator % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_continues_padded_sequence() {
        assert_eq!(increment_trailing_number("INV-0041").as_deref(), Some("INV-0042"));
        assert_eq!(increment_trailing_number("INV-0999").as_deref(), Some("INV-1000"));
        assert_eq!(increment_trailing_number("INV-9999").as_deref(), Some("INV-10000"));
        assert_eq!(increment_trailing_number("7").as_deref(), Some("8"));
    }

    #[test]
    fn test_keeps_suffix() {
        assert_eq!(
            increment_trailing_number("2025/099-A").as_deref(),
            Some("2025/100-A")
        );
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(increment_trailing_number("DRAFT"), None);
        assert_eq!(increment_trailing_number(""), None);
    }

    #[test]
    fn test_fallback_format() {
        assert_eq!(fallback_number(date(), 42), "INV-20250307-0042");

        let generated = next_invoice_number(None, date());
        assert!(generated.starts_with("INV-20250307-"));
        assert_eq!(generated.len(), "INV-20250307-0000".len());

        let generated = next_invoice_number(Some("no sequence"), date());
        assert!(generated.starts_with("INV-20250307-"));
    }

    #[test]
    fn test_next_uses_latest() {
        assert_eq!(next_invoice_number(Some("Q-00012"), date()), "Q-00013");
    }
}
