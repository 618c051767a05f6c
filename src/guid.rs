//! Identifier hashing.
//!
//! Collectors that report an installation identity send a stable
//! pseudonymous token instead of the raw identifier.

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::config::ConfigError;

type Blake2b256 = Blake2b<U32>;

/// Hash `raw` into a 64 character upper-case hex token (BLAKE2b-256).
pub fn hash_guid_v1(raw: &[u8]) -> String {
    hex::encode_upper(Blake2b256::digest(raw))
}

/// Hashing applied to identifiers before they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashVersion {
    /// Report the identifier as-is.
    None,
    /// [`hash_guid_v1`].
    #[default]
    V1,
}

impl HashVersion {
    /// Turn a raw identifier into the reported token.
    pub fn apply(&self, raw: &[u8]) -> String {
        match self {
            Self::None => String::from_utf8_lossy(raw).into_owned(),
            Self::V1 => hash_guid_v1(raw),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::V1 => "v1",
        }
    }
}

impl FromStr for HashVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::None),
            "v1" => Ok(Self::V1),
            other => Err(ConfigError::ValidationError(format!(
                "unsupported guid hash version '{other}'"
            ))),
        }
    }
}

impl fmt::Display for HashVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
