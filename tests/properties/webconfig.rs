//! Property tests for settings document patching.

use proptest::prelude::*;

use gantry::webconfig::{find_app_setting, patch_document, SettingOutcome};

const DOCUMENT: &str = "<?xml version=\"1.0\"?>\n\
    <configuration>\n\
    \x20\x20<appSettings>\n\
    \x20\x20\x20\x20<add key=\"Existing\" value=\"1\" />\n\
    \x20\x20</appSettings>\n\
    </configuration>\n";

fn setting_key() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z0-9._-]{0,24}").unwrap()
}

fn setting_value() -> impl Strategy<Value = String> {
    // Printable ASCII, quotes and markup included, so escaping gets exercised.
    proptest::string::string_regex("[ -~]{0,48}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: A patched entry always reads back with the exact value written.
    #[test]
    fn property_patched_values_read_back(
        key in setting_key(),
        value in setting_value(),
    ) {
        let (patched, _) = patch_document(DOCUMENT, &key, &value)
            .expect("expected patch_document to succeed for a well-formed document");

        let found = find_app_setting(&patched, &key);
        prop_assert_eq!(found.as_deref(), Some(value.as_str()));
    }

    /// PROPERTY: Patching the same key twice rewrites one line instead of
    /// growing the document.
    #[test]
    fn property_second_patch_updates_in_place(
        key in setting_key(),
        first in setting_value(),
        second in setting_value(),
    ) {
        let (once, _) = patch_document(DOCUMENT, &key, &first)
            .expect("expected the first patch to succeed");
        let (twice, outcome) = patch_document(&once, &key, &second)
            .expect("expected the second patch to succeed");

        prop_assert_eq!(outcome, SettingOutcome::Updated);
        prop_assert_eq!(once.lines().count(), twice.lines().count());
        let found = find_app_setting(&twice, &key);
        prop_assert_eq!(found.as_deref(), Some(second.as_str()));
    }

    /// PROPERTY: Patching one key never disturbs the other entries.
    #[test]
    fn property_other_entries_are_untouched(
        key in setting_key().prop_filter("fresh key", |k| k != "Existing"),
        value in setting_value(),
    ) {
        let (patched, outcome) = patch_document(DOCUMENT, &key, &value)
            .expect("expected patch_document to succeed for a well-formed document");

        prop_assert_eq!(outcome, SettingOutcome::Added);
        let existing = find_app_setting(&patched, "Existing");
        prop_assert_eq!(existing.as_deref(), Some("1"));
    }

    /// PROPERTY: `patch_document` never panics on arbitrary small documents.
    #[test]
    fn property_patch_never_panics(
        content in "(?s).{0,256}",
        value in setting_value(),
    ) {
        let _ = patch_document(&content, "Key", &value);
    }

    /// PROPERTY: `find_app_setting` never panics on arbitrary small documents.
    #[test]
    fn property_find_never_panics(
        content in "(?s).{0,256}",
        key in setting_key(),
    ) {
        let _ = find_app_setting(&content, &key);
    }
}
