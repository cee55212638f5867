//! Type-safe configuration options for ExifTool sessions.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;
use crate::Error;

/// Text encoding used on the subprocess pipes.
///
/// Resolved once when the configuration is built; nothing is read from the
/// process environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Charset {
    /// UTF-8 (ExifTool's default for `-charset`).
    #[default]
    Utf8,
    /// ISO-8859-1, one byte per code point.
    Latin1,
}

impl Charset {
    /// Encode text for writing to the subprocess.
    ///
    /// Fails with [`Error::InvalidArgument`] if `text` holds a character
    /// Latin-1 cannot represent; nothing is substituted.
    pub fn encode<'a>(&self, text: &'a str) -> crate::Result<Cow<'a, [u8]>> {
        match self {
            Charset::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
            Charset::Latin1 if text.is_ascii() => Ok(Cow::Borrowed(text.as_bytes())),
            Charset::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        Error::InvalidArgument(format!(
                            "character {c:?} (U+{:04X}) cannot be encoded as latin-1",
                            u32::from(c)
                        ))
                    })
                })
                .collect::<crate::Result<Vec<u8>>>()
                .map(Cow::Owned),
        }
    }

    /// Decode bytes read from the subprocess.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD rather than failing.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes),
            Charset::Latin1 => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Utf8 => write!(f, "utf-8"),
            Charset::Latin1 => write!(f, "latin-1"),
        }
    }
}

impl TryFrom<&str> for Charset {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Charset::Latin1),
            _ => Err(Error::InvalidConfig(format!("unsupported charset: {s}"))),
        }
    }
}

/// Optional ExifTool features gated on the discovered version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Persistent `-stay_open` mode.
    StayOpen,
}

impl Feature {
    /// First ExifTool version that supports this feature.
    pub fn min_version(&self) -> Version {
        match self {
            Feature::StayOpen => Version::new(8, 36, 0),
        }
    }

    /// Check whether `version` supports this feature.
    pub fn is_supported(&self, version: &Version) -> bool {
        *version >= self.min_version()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::StayOpen => write!(f, "stay_open"),
        }
    }
}
