//! Hash algorithm selection and hex digest newtype.

use serde::{Deserialize, Serialize};

/// Content hash algorithms recognized by the DotSlash runtime.
///
/// `blake3` is the default; `sha256` is accepted for toolchains that cannot
/// produce BLAKE3 digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3, the DotSlash default.
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// The manifest spelling of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lowercase hex digest as it appears in the manifest.
///
/// Only constructed from freshly computed hash output, never parsed from
/// config or carried over from a previous run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    /// Hex-encode raw hash output.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HexDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HexDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
