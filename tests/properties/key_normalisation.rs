//! PROPERTY: keys derived from paths are POSIX-style and stable.

use std::path::PathBuf;

use proptest::prelude::*;

use edgepush::ObjectKey;

use crate::support::segment;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn property_path_segments_join_with_slash(
        segments in proptest::collection::vec(segment(), 1..=5),
    ) {
        let path: PathBuf = segments.iter().collect();
        let key = ObjectKey::from_relative_path(&path).unwrap();

        prop_assert_eq!(key.as_str(), segments.join("/"));
        prop_assert_eq!(key.file_name(), segments.last().unwrap().as_str());
        prop_assert_eq!(key.cdn_path(), format!("/{}", segments.join("/")));
    }

    #[test]
    fn property_parse_ignores_leading_slashes(
        segments in proptest::collection::vec(segment(), 1..=5),
        slashes in 0usize..3,
    ) {
        let joined = segments.join("/");
        let raw = format!("{}{}", "/".repeat(slashes), joined);
        let parsed = ObjectKey::parse(&raw).unwrap();
        prop_assert_eq!(parsed.as_str(), joined.as_str());
    }

    #[test]
    fn property_traversal_always_rejected(
        before in proptest::collection::vec(segment(), 0..=2),
        after in proptest::collection::vec(segment(), 0..=2),
    ) {
        let mut parts = before.clone();
        parts.push("..".to_string());
        parts.extend(after);
        prop_assert!(ObjectKey::parse(&parts.join("/")).is_err());
    }

    /// PROPERTY: `parse` never panics on arbitrary input.
    #[test]
    fn property_parse_never_panics(raw in "(?s).{0,64}") {
        let _ = ObjectKey::parse(&raw);
    }
}
