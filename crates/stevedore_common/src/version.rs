//! Version tags for config migration decisions.
//!
//! Dotted numeric tuples, never lexicographic: "1.10.0" is newer than
//! "1.9.0". Only major.minor participates in upgrade decisions; patch
//! releases reuse the previous run's migration behavior.

/// A parsed major.minor.patch version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionTag {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionTag {
    /// Lenient parse: missing segments read as 0, a pre-release suffix on
    /// the patch segment is ignored.
    pub fn parse(version: &str) -> VersionTag {
        let parts: Vec<&str> = version.split('.').collect();
        let major = parts.first().and_then(|s| s.parse().ok()).unwrap_or(0);
        let minor = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        let patch = parts
            .get(2)
            .and_then(|s| s.split('-').next())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        VersionTag {
            major,
            minor,
            patch,
        }
    }

    /// True when self is a newer minor or major than `other`. Patch-level
    /// differences do not count.
    pub fn minor_newer_than(&self, other: &VersionTag) -> bool {
        (self.major, self.minor) > (other.major, other.minor)
    }
}

/// Whether this run is the first after a minor (or major) upgrade.
/// A missing previous tag counts as an upgrade so first installs see
/// the release notes once.
pub fn is_after_minor_update(prev: Option<&str>, curr: &str) -> bool {
    match prev {
        None => true,
        Some(prev) => VersionTag::parse(curr).minor_newer_than(&VersionTag::parse(prev)),
    }
}
