//! ExifTool version numbers.
//!
//! ExifTool reports its version through `exiftool -ver` as `major.minor`
//! (for example `12.76`). Versions are compared as `major.minor.patch` with a
//! missing patch treated as `0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A three-part version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Create a version from its parts.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the first version-looking word of `s`.
    ///
    /// Accepts `9.36`, `10.16.0`, `v1.2.3-beta` and leading text such as
    /// `ExifTool 12.40`. Returns `None` when nothing parses.
    pub fn parse(s: &str) -> Option<Self> {
        for word in s.split_whitespace() {
            let word = word.strip_prefix('v').unwrap_or(word);
            let parts: Vec<&str> = word.split('.').collect();
            if parts.len() < 2 {
                continue;
            }

            // Numeric prefix of each part ("3-beta" -> "3")
            let numeric = |part: &str| -> Option<u32> {
                let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            };

            let major = numeric(parts[0]);
            let minor = numeric(parts[1]);
            let patch = match parts.get(2) {
                Some(part) => numeric(part),
                None => Some(0),
            };

            if let (Some(major), Some(minor), Some(patch)) = (major, minor, patch) {
                return Some(Self::new(major, minor, patch));
            }
        }
        None
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidArgument(format!("not a version: {s:?}")))
    }
}
