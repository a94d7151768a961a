//! Version types for definition file compatibility.

use serde::{Deserialize, Serialize};

use crate::error::{RiposteError, RiposteResult};

/// Schema version using semantic versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u16,
    /// Minor version (backwards-compatible additions)
    pub minor: u16,
    /// Patch version (bug fixes)
    pub patch: u16,
}

impl SchemaVersion {
    /// Creates a new schema version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current item combat profile file version.
    pub const ITEM_PROFILE: Self = Self::new(1, 0, 0);

    /// Checks if this version can read data from another version.
    #[must_use]
    pub const fn can_read(&self, data_version: &Self) -> bool {
        self.major == data_version.major
    }

    /// Parses a `major.minor.patch` string. Missing trailing parts read as 0.
    pub fn parse(text: &str) -> RiposteResult<Self> {
        let mut parts = [0u16; 3];
        let mut count = 0;
        for (slot, piece) in parts.iter_mut().zip(text.trim().split('.')) {
            *slot = piece.parse().map_err(|_| RiposteError::InvalidVersion(text.to_string()))?;
            count += 1;
        }
        if count == 0 || text.trim().split('.').count() > 3 {
            return Err(RiposteError::InvalidVersion(text.to_string()));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    /// Fails with `VersionMismatch` unless this version can read `data_version`.
    pub fn ensure_readable(&self, data_version: &Self) -> RiposteResult<()> {
        if self.can_read(data_version) {
            Ok(())
        } else {
            Err(RiposteError::VersionMismatch {
                expected: self.to_string(),
                actual: data_version.to_string(),
            })
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_short() {
        assert_eq!(SchemaVersion::parse("1.2.3").ok(), Some(SchemaVersion::new(1, 2, 3)));
        assert_eq!(SchemaVersion::parse("1").ok(), Some(SchemaVersion::new(1, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SchemaVersion::parse("one.two").is_err());
        assert!(SchemaVersion::parse("1.2.3.4").is_err());
        assert!(SchemaVersion::parse("").is_err());
    }

    #[test]
    fn test_ensure_readable() {
        let current = SchemaVersion::ITEM_PROFILE;
        assert!(current.ensure_readable(&SchemaVersion::new(1, 4, 0)).is_ok());
        assert!(matches!(
            current.ensure_readable(&SchemaVersion::new(2, 0, 0)),
            Err(RiposteError::VersionMismatch { .. })
        ));
    }
}
