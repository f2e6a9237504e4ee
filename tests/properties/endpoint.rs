//! Property tests for the certificate selector.

use proptest::prelude::*;

use gantry::endpoint::{CertSelector, UNENCRYPTED_SENTINEL};

/// The sentinel with every character's case chosen at random.
fn sentinel_any_case() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), UNENCRYPTED_SENTINEL.len()).prop_map(|upper| {
        UNENCRYPTED_SENTINEL
            .chars()
            .zip(upper)
            .map(|(c, up)| {
                if up {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: The unencrypted sentinel is recognized in any case mix.
    #[test]
    fn property_sentinel_matches_in_any_case(raw in sentinel_any_case()) {
        let selector = CertSelector::parse(&raw);

        prop_assert_eq!(&selector, &CertSelector::Unencrypted);
        prop_assert!(!selector.wants_tls());
        prop_assert!(selector.thumbprint().is_none());
    }

    /// PROPERTY: Any hex string is taken as a thumbprint, verbatim.
    #[test]
    fn property_hex_thumbprints_select_tls(raw in "[A-Fa-f0-9]{8,40}") {
        let selector = CertSelector::parse(&raw);

        prop_assert!(selector.wants_tls());
        prop_assert_eq!(selector.thumbprint(), Some(raw.as_str()));
    }
}
