//! Property-based tests for key derivation, timestamps, and locators

use bt::metadata::TIMESTAMP_WIDTH;
use bt::{CallSite, StableKey, Timestamp};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_stable_key_is_deterministic(name in ".*") {
        let first = StableKey::for_name(&name);
        let second = StableKey::for_name(&name);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.as_str().len(), 32);
        prop_assert!(first.as_str().bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn prop_distinct_names_get_distinct_keys(a in "[a-z0-9 ]{0,24}", b in "[a-z0-9 ]{0,24}") {
        prop_assume!(a != b);
        prop_assert_ne!(StableKey::for_name(&a), StableKey::for_name(&b));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_timestamp_fixed_width_and_ordered(
        secs in 1_000_000_000u64..10_000_000_000,
        nanos_a in 0u32..1_000_000_000,
        nanos_b in 0u32..1_000_000_000,
    ) {
        let a = Timestamp::from_parts(secs, nanos_a);
        let b = Timestamp::from_parts(secs, nanos_b);
        prop_assert_eq!(a.as_str().len(), TIMESTAMP_WIDTH);
        prop_assert_eq!(b.as_str().len(), TIMESTAMP_WIDTH);
        prop_assert_eq!(nanos_a.cmp(&nanos_b), a.as_str().cmp(b.as_str()));
    }

    #[test]
    fn prop_timestamp_seconds_dominate(
        secs in 1_000_000_000u64..9_999_999_999,
        nanos_a in 0u32..1_000_000_000,
        nanos_b in 0u32..1_000_000_000,
    ) {
        let earlier = Timestamp::from_parts(secs, nanos_a);
        let later = Timestamp::from_parts(secs + 1, nanos_b);
        prop_assert!(earlier.as_str() < later.as_str());
    }

    #[test]
    fn prop_locator_extracts_path_and_line(
        path in "[a-z][a-z0-9_-]{0,8}(/[a-z0-9_-]{1,8}){0,3}\\.rs",
        line in 1u32..100_000,
        column in 1u32..200,
    ) {
        let site = CallSite::explicit(format!("{path}:{line}:{column}"));
        prop_assert_eq!(site.locator().unwrap(), format!("{path}:{line}"));
    }
}

#[test]
fn test_successive_now_timestamps_never_shrink() {
    let stamps: Vec<Timestamp> = (0..1000).map(|_| Timestamp::now()).collect();
    assert!(stamps.iter().all(|t| t.as_str().len() == TIMESTAMP_WIDTH));
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}
