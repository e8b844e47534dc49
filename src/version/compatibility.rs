//! Replication compatibility between two server versions
//!
//! Policy follows the LTS / Innovation release model: inside an LTS line
//! patch releases replicate both ways, everything else only replicates
//! from older to newer, and across more than one major version not at all.

use serde::Serialize;
use std::fmt;

use super::Version;
use crate::errors::{GrError, GrResult};

/// Lowest 8.0 patch release that follows the LTS replication guarantees
pub const MIN_LTS_8_0_VERSION: Version = Version::new(8, 0, 34);

/// First release of the first LTS line
pub const FIRST_LTS_VERSION: Version = Version::new(8, 4, 0);

/// Outcome of comparing a replication source with its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationVersionCompatibility {
    /// Replication is supported
    Compatible,
    /// Replication is not supported
    Incompatible,
    /// Only supported as part of a downgrade
    DowngradeOnly,
}

impl ReplicationVersionCompatibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compatible => "COMPATIBLE",
            Self::Incompatible => "INCOMPATIBLE",
            Self::DowngradeOnly => "DOWNGRADE_ONLY",
        }
    }
}

impl fmt::Display for ReplicationVersionCompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether `source` can replicate to `target`.
///
/// Fails with `UnsupportedVersion` when a version below the 8.0 series
/// takes part, unless the pair is already more than one major apart.
pub fn verify_compatible_replication_versions(
    source: &Version,
    target: &Version,
) -> GrResult<ReplicationVersionCompatibility> {
    use ReplicationVersionCompatibility::*;

    let major_distance = source.major().abs_diff(target.major());

    // Two majors apart never replicates, whichever side is old.
    if major_distance >= 2 {
        return Ok(Incompatible);
    }

    for version in [source, target] {
        if version.numeric_version_series() < 800 {
            return Err(GrError::UnsupportedVersion(format!(
                "replication compatibility is only defined for 8.0 and later, got {}",
                version
            )));
        }
    }

    if source == target {
        return Ok(Compatible);
    }

    let source_series = source.numeric_version_series();
    let target_series = target.numeric_version_series();

    if source_series == 800 && target_series == 800 {
        if (*source >= MIN_LTS_8_0_VERSION && *target >= MIN_LTS_8_0_VERSION) || source < target {
            return Ok(Compatible);
        }
        if *target < MIN_LTS_8_0_VERSION {
            return Ok(Incompatible);
        }
        return Ok(DowngradeOnly);
    }

    if source_series == 800 && target_series >= 900 {
        return Ok(Incompatible);
    }

    if *source < FIRST_LTS_VERSION && major_distance >= 1 {
        return Ok(Incompatible);
    }

    if source > target {
        if source_series == target_series
            && *source >= FIRST_LTS_VERSION
            && *target >= FIRST_LTS_VERSION
        {
            return Ok(Compatible);
        }
        return Ok(DowngradeOnly);
    }

    Ok(Compatible)
}

#[cfg(test)]
mod tests {
    use super::ReplicationVersionCompatibility::*;
    use super::*;

    fn verify(source: &str, target: &str) -> ReplicationVersionCompatibility {
        verify_compatible_replication_versions(
            &Version::parse(source).unwrap(),
            &Version::parse(target).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_equal_versions() {
        assert_eq!(verify("8.4.0", "8.4.0"), Compatible);
        assert_eq!(verify("8.0.11", "8.0.11"), Compatible);
        assert_eq!(verify("8.0.35-cloud", "8.0.35"), Compatible);
    }

    #[test]
    fn test_inside_8_0() {
        assert_eq!(verify("8.0.35", "8.0.36"), Compatible);
        assert_eq!(verify("8.0.36", "8.0.35"), Compatible);
        assert_eq!(verify("8.0.20", "8.0.40"), Compatible);
        assert_eq!(verify("8.0.5", "8.0.3"), Incompatible);
        assert_eq!(verify("8.0.40", "8.0.33"), Incompatible);
    }

    #[test]
    fn test_8_0_to_innovation_majors() {
        assert_eq!(verify("8.0.40", "9.0.0"), Incompatible);
        assert_eq!(verify("8.0.40", "9.1.0"), Incompatible);
    }

    #[test]
    fn test_8_0_to_8_4() {
        assert_eq!(verify("8.0.40", "8.4.0"), Compatible);
        assert_eq!(verify("8.4.0", "8.0.40"), DowngradeOnly);
    }

    #[test]
    fn test_innovation_before_first_lts_to_next_major() {
        assert_eq!(verify("8.3.0", "9.0.0"), Incompatible);
    }

    #[test]
    fn test_lts_patch_downgrade() {
        assert_eq!(verify("8.4.3", "8.4.1"), Compatible);
        assert_eq!(verify("9.2.0", "9.1.0"), DowngradeOnly);
        assert_eq!(verify("9.0.0", "8.4.2"), DowngradeOnly);
    }

    #[test]
    fn test_upgrade_across_one_major_from_lts() {
        assert_eq!(verify("8.4.2", "9.0.0"), Compatible);
        assert_eq!(verify("9.7.0", "10.0.0"), Compatible);
    }

    #[test]
    fn test_two_majors_apart() {
        assert_eq!(verify("9.0.0", "7.0.0"), Incompatible);
        assert_eq!(verify("8.4.0", "10.0.0"), Incompatible);
    }

    #[test]
    fn test_very_large_majors_do_not_overflow() {
        assert_eq!(verify("50000000.0.0", "50000000.0.1"), Compatible);
        assert_eq!(verify("50000000.1.0", "50000000.0.0"), DowngradeOnly);
        assert_eq!(verify("4294967295.0.0", "8.0.40"), Incompatible);
    }

    #[test]
    fn test_pre_8_0_unsupported() {
        let result = verify_compatible_replication_versions(
            &Version::new(5, 7, 44),
            &Version::new(5, 7, 44),
        );
        assert!(matches!(result, Err(GrError::UnsupportedVersion(_))));

        let result = verify_compatible_replication_versions(
            &Version::new(8, 0, 35),
            &Version::new(7, 9, 0),
        );
        assert!(matches!(result, Err(GrError::UnsupportedVersion(_))));
    }
}
