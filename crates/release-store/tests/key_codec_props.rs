//! Property tests for the key codec.

use proptest::prelude::*;
use release_store::{ReleaseKey, StoreError};

/// Release names as they appear in practice, never containing the separator.
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z0-9]([-a-z0-9.]{0,40}[a-z0-9])?".prop_filter("name must not contain `.v`", |n| {
        !n.contains(".v")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parse_inverts_format(name in arb_name(), version in 1u32..) {
        let key = ReleaseKey::new(name.clone(), version).unwrap();
        let parsed = ReleaseKey::parse(&key.to_string()).unwrap();
        prop_assert_eq!(parsed.name(), name.as_str());
        prop_assert_eq!(parsed.version(), version);
    }

    #[test]
    fn non_numeric_versions_are_invalid(
        name in arb_name(),
        version in "[a-zA-Z_+-][a-zA-Z0-9_]{0,8}"
    ) {
        let raw = format!("{name}.v{version}");
        prop_assert_eq!(
            ReleaseKey::parse(&raw).unwrap_err(),
            StoreError::InvalidKey { key: raw.clone() }
        );
    }

    #[test]
    fn negative_versions_are_invalid(name in arb_name(), version in 1i64..) {
        let raw = format!("{name}.v-{version}");
        prop_assert!(ReleaseKey::parse(&raw).is_err());
    }

    #[test]
    fn keys_without_separator_are_invalid(raw in "[a-z0-9-]{0,40}") {
        prop_assert!(ReleaseKey::parse(&raw).is_err());
    }
}
