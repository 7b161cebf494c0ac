//! Property-based tests for invoice number sequencing

use chrono::NaiveDate;
use proptest::prelude::*;
use tradie_billing_core::numbering::{increment_trailing_number, next_invoice_number};

proptest! {
    /// The digit group grows by one and everything around it is kept
    #[test]
    fn increment_preserves_prefix_suffix_and_padding(
        prefix in "[A-Z]{1,4}-",
        value in 0u64..10_000_000,
        width in 1usize..9,
        suffix in "(-[A-Z]{1,3})?",
    ) {
        let current = format!("{prefix}{value:0width$}{suffix}");
        let next = increment_trailing_number(&current).unwrap();

        prop_assert!(next.starts_with(&prefix));
        prop_assert!(next.ends_with(&suffix));

        let digits = &next[prefix.len()..next.len() - suffix.len()];
        prop_assert_eq!(digits.parse::<u64>().unwrap(), value + 1);
        prop_assert_eq!(digits.len(), width.max((value + 1).to_string().len()));
    }

    /// Numbers without any digits always get a dated fallback
    #[test]
    fn digitless_numbers_fall_back_to_dated_format(latest in "[A-Za-z-]{0,12}") {
        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let next = next_invoice_number(Some(&latest), today);

        prop_assert!(next.starts_with("INV-20250630-"));
        prop_assert_eq!(next.len(), "INV-20250630-0000".len());
    }
}
