//! Server version value type
//!
//! Ordered by (major, minor, patch). The `extra` suffix (`-cloud`,
//! `-log`, distribution tags) is carried for display only and takes no
//! part in ordering or equality.

mod compatibility;

pub use compatibility::{
    verify_compatible_replication_versions, ReplicationVersionCompatibility, FIRST_LTS_VERSION,
    MIN_LTS_8_0_VERSION,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::{GrError, GrResult};

/// First release that supports `SET PERSIST`
pub const PERSIST_SUPPORT_VERSION: Version = Version::new(8, 0, 11);

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-(.+))?$").expect("valid version pattern")
    })
}

/// Immutable server version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    extra: Option<String>,
}

impl Version {
    /// Create a version without suffix
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            extra: None,
        }
    }

    /// Attach a build/distribution suffix
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Parse `M`, `M.m`, `M.m.p` or `M.m.p-extra`
    pub fn parse(text: &str) -> GrResult<Self> {
        let text = text.trim();
        let captures = version_pattern()
            .captures(text)
            .ok_or_else(|| GrError::validation(format!("invalid version string '{}'", text)))?;

        let component = |index: usize| -> GrResult<u32> {
            match captures.get(index) {
                None => Ok(0),
                Some(m) => m.as_str().parse::<u32>().map_err(|_| {
                    GrError::validation(format!("version component out of range in '{}'", text))
                }),
            }
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            extra: captures.get(4).map(|m| m.as_str().to_string()),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// major*100 + minor, e.g. 800 for any 8.0.x
    pub fn numeric_version_series(&self) -> u64 {
        u64::from(self.major) * 100 + u64::from(self.minor)
    }

    /// major*10000 + minor*100 + patch, e.g. 80035
    pub fn numeric(&self) -> u64 {
        u64::from(self.major) * 10000 + u64::from(self.minor) * 100 + u64::from(self.patch)
    }

    /// `M.m.p` without the suffix
    pub fn base(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// Whether the server can `SET PERSIST`
    pub fn supports_persist(&self) -> bool {
        *self >= PERSIST_SUPPORT_VERSION
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl FromStr for Version {
    type Err = GrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(extra) = &self.extra {
            write!(f, "-{}", extra)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Version::new(8, 0, 5) < Version::new(8, 0, 6));
        assert!(Version::new(8, 1, 0) > Version::new(8, 0, 99));
        assert!(Version::new(9, 0, 0) > Version::new(8, 4, 3));
    }

    #[test]
    fn test_extra_ignored_in_comparison() {
        let cloud = Version::new(8, 0, 35).with_extra("cloud");
        assert_eq!(cloud, Version::new(8, 0, 35));
        assert_eq!(cloud.cmp(&Version::new(8, 0, 35)), Ordering::Equal);
        assert_eq!(cloud.extra(), Some("cloud"));
    }

    #[test]
    fn test_parse_full() {
        let v = Version::parse("8.0.35-cloud").unwrap();
        assert_eq!((v.major(), v.minor(), v.patch()), (8, 0, 35));
        assert_eq!(v.extra(), Some("cloud"));
        assert_eq!(v.to_string(), "8.0.35-cloud");
        assert_eq!(v.base(), "8.0.35");
    }

    #[test]
    fn test_parse_partial() {
        assert_eq!(Version::parse("8").unwrap(), Version::new(8, 0, 0));
        assert_eq!(Version::parse("8.4").unwrap(), Version::new(8, 4, 0));
        assert_eq!(" 5.7.44 ".parse::<Version>().unwrap(), Version::new(5, 7, 44));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Version::parse(""), Err(GrError::Validation(_))));
        assert!(matches!(Version::parse("eight"), Err(GrError::Validation(_))));
        assert!(matches!(Version::parse("8..1"), Err(GrError::Validation(_))));
        assert!(matches!(
            Version::parse("99999999999.0.0"),
            Err(GrError::Validation(_))
        ));
    }

    #[test]
    fn test_series_and_numeric() {
        let v = Version::new(8, 0, 35);
        assert_eq!(v.numeric_version_series(), 800);
        assert_eq!(v.numeric(), 80035);
        assert_eq!(Version::new(9, 1, 0).numeric_version_series(), 901);
    }

    #[test]
    fn test_series_and_numeric_for_largest_components() {
        let v = Version::new(u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(v.numeric_version_series(), u64::from(u32::MAX) * 101);
        assert_eq!(v.numeric(), u64::from(u32::MAX) * 10101);

        let parsed = Version::parse("50000000.0.1").unwrap();
        assert_eq!(parsed.numeric_version_series(), 5_000_000_000);
        assert_eq!(parsed.numeric(), 500_000_000_001);
    }

    #[test]
    fn test_persist_support_cutoff() {
        assert!(!Version::new(8, 0, 10).supports_persist());
        assert!(Version::new(8, 0, 11).supports_persist());
        assert!(!Version::new(5, 7, 44).supports_persist());
    }
}
