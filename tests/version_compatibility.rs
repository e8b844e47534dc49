//! Replication version compatibility matrix
//!
//! Fixed pairs from the release policy plus ordering properties of the
//! version type.

use proptest::prelude::*;

use grprov::version::{
    verify_compatible_replication_versions, ReplicationVersionCompatibility, Version,
};
use grprov::GrError;

use ReplicationVersionCompatibility::*;

fn verify(source: &str, target: &str) -> Result<ReplicationVersionCompatibility, GrError> {
    let source = Version::parse(source).unwrap();
    let target = Version::parse(target).unwrap();
    verify_compatible_replication_versions(&source, &target)
}

// =============================================================================
// FIXED PAIRS
// =============================================================================

#[test]
fn test_release_policy_pairs() {
    let cases = [
        ("8.0.36", "8.0.36", Compatible),
        ("8.0.35", "8.0.36", Compatible),
        ("8.0.36", "8.0.35", Compatible),
        ("8.0.20", "8.0.30", Compatible),
        ("8.0.30", "8.0.20", Incompatible),
        ("8.0.36", "8.0.33", Incompatible),
        ("8.0.36", "8.4.0", Compatible),
        ("8.0.36", "9.0.0", Incompatible),
        ("8.4.0", "8.0.36", DowngradeOnly),
        ("8.4.2", "8.4.0", Compatible),
        ("8.3.0", "9.0.0", Incompatible),
        ("8.4.0", "9.0.0", Compatible),
        ("9.0.0", "8.4.0", DowngradeOnly),
        ("9.1.0", "9.0.0", DowngradeOnly),
        ("9.0.0", "7.0.0", Incompatible),
    ];

    for (source, target, expected) in cases {
        assert_eq!(
            verify(source, target).unwrap(),
            expected,
            "{} -> {}",
            source,
            target
        );
    }
}

#[test]
fn test_pre_8_0_is_unsupported() {
    assert!(matches!(
        verify("5.7.44", "8.0.36"),
        Err(GrError::UnsupportedVersion(_))
    ));
    assert!(matches!(
        verify("8.0.36", "5.7.44"),
        Err(GrError::UnsupportedVersion(_))
    ));
}

#[test]
fn test_huge_major_versions() {
    assert_eq!(verify("50000000.0.0", "50000000.0.1").unwrap(), Compatible);
    assert_eq!(verify("4294967295.0.0", "4294967294.0.0").unwrap(), DowngradeOnly);
}

#[test]
fn test_suffix_does_not_change_verdict() {
    assert_eq!(verify("8.0.36-cloud", "8.0.36").unwrap(), Compatible);
    assert_eq!(verify("8.4.0-log", "8.0.36").unwrap(), DowngradeOnly);
}

// =============================================================================
// PROPERTIES
// =============================================================================

fn version() -> impl Strategy<Value = Version> {
    (8u32..=10, 0u32..=5, 0u32..=50).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

proptest! {
    #[test]
    fn prop_ordering_matches_tuple_ordering(a in version(), b in version()) {
        let tuple_a = (a.major(), a.minor(), a.patch());
        let tuple_b = (b.major(), b.minor(), b.patch());
        prop_assert_eq!(a.cmp(&b), tuple_a.cmp(&tuple_b));
    }

    #[test]
    fn prop_display_parses_back(a in version()) {
        prop_assert_eq!(Version::parse(&a.to_string()).unwrap(), a);
    }

    #[test]
    fn prop_same_version_is_compatible(a in version()) {
        prop_assert_eq!(verify_compatible_replication_versions(&a, &a).unwrap(), Compatible);
    }

    #[test]
    fn prop_supported_versions_never_error(a in version(), b in version()) {
        prop_assert!(verify_compatible_replication_versions(&a, &b).is_ok());
    }

    #[test]
    fn prop_any_parsed_pair_gets_a_verdict_or_error(
        a in (any::<u32>(), any::<u32>(), any::<u32>()),
        b in (any::<u32>(), any::<u32>(), any::<u32>()),
    ) {
        let source = Version::parse(&format!("{}.{}.{}", a.0, a.1, a.2)).unwrap();
        let target = Version::parse(&format!("{}.{}.{}", b.0, b.1, b.2)).unwrap();
        let _ = verify_compatible_replication_versions(&source, &target);
    }
}
