//! DAB protocol versions and version applicability sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognized DAB protocol version, ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DabVersion {
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "2.1")]
    V2_1,
    #[serde(rename = "2.2")]
    V2_2,
}

/// Error returned when parsing an unrecognized version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized DAB version: {0}")]
pub struct UnknownVersion(pub String);

impl DabVersion {
    /// All recognized versions, oldest first.
    pub const ALL: [Self; 3] = [Self::V2_0, Self::V2_1, Self::V2_2];

    /// The version assumed when a device does not answer version detection.
    pub const DEFAULT: Self = Self::V2_0;

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V2_0 => "2.0",
            Self::V2_1 => "2.1",
            Self::V2_2 => "2.2",
        }
    }

    /// Picks the highest recognized version out of a detection response.
    ///
    /// Unrecognized entries are ignored; `None` when nothing matched.
    #[must_use]
    pub fn pick_highest<S: AsRef<str>>(versions: &[S]) -> Option<Self> {
        versions
            .iter()
            .filter_map(|v| v.as_ref().trim().parse().ok())
            .max()
    }
}

impl fmt::Display for DabVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DabVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2.0" => Ok(Self::V2_0),
            "2.1" => Ok(Self::V2_1),
            "2.2" => Ok(Self::V2_2),
            other => Err(UnknownVersion(other.to_owned())),
        }
    }
}

/// The set of protocol versions a test case applies to.
///
/// Stored as one bit per [`DabVersion`]; the common shape is "this version
/// and everything newer", built with [`VersionSet::since`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSet {
    bits: u8,
}

impl VersionSet {
    /// Applies to every recognized version.
    pub const ALL: Self = Self { bits: (1 << DabVersion::ALL.len()) - 1 };

    /// The given version and every later one.
    #[must_use]
    pub fn since(version: DabVersion) -> Self {
        let mut set = Self { bits: 0 };
        for v in DabVersion::ALL {
            if v >= version {
                set.bits |= Self::bit(v);
            }
        }
        set
    }

    /// Exactly the given version.
    #[must_use]
    pub fn only(version: DabVersion) -> Self {
        Self { bits: Self::bit(version) }
    }

    #[must_use]
    pub fn with(self, version: DabVersion) -> Self {
        Self { bits: self.bits | Self::bit(version) }
    }

    #[must_use]
    pub fn contains(self, version: DabVersion) -> bool {
        self.bits & Self::bit(version) != 0
    }

    fn bit(version: DabVersion) -> u8 {
        1 << version as u8
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in DabVersion::ALL {
            if self.contains(v) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(v.as_str())?;
                first = false;
            }
        }
        Ok(())
    }
}
