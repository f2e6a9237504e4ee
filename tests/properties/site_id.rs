//! Property tests for site id allocation.

use proptest::prelude::*;
use tempfile::TempDir;

use gantry::host::{SiteBinding, StateFileHost, WebHost};
use gantry::ops::provision::next_site_id;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: The next site id is one past the highest in use, and 1
    /// on a host with no sites.
    #[test]
    fn property_next_site_id_is_one_past_the_highest(
        ids in proptest::collection::hash_set(1u32..=60, 0..=6),
    ) {
        let dir = TempDir::new().unwrap();
        let host = StateFileHost::new(dir.path().join("host.json"));
        let binding = SiteBinding::Http { port: 80 };

        for id in &ids {
            let name = format!("site-{id}");
            host.create_site(&name, *id, dir.path(), &name, &binding).unwrap();
        }

        let expected = ids.iter().max().map_or(1, |highest| highest + 1);
        prop_assert_eq!(next_site_id(&host).unwrap(), expected);
    }
}
