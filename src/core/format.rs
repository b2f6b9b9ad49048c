//! Archive format identification.
//!
//! The manifest's declared format is decided in a fixed order: an explicit
//! string wins, an explicit `null` means the artifact is stored uncompressed,
//! and an absent field infers from the asset's filename suffix. An
//! unrecognized suffix is a hard error: a wrong guess would corrupt the
//! unpack step for every consumer of the manifest.

use serde::Serialize;

use crate::core::error::ConfigError;

/// Archive formats the DotSlash runtime can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactFormat {
    /// Gzipped tarball.
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zstandard-compressed tarball.
    #[serde(rename = "tar.zst")]
    TarZst,
    /// Xz-compressed tarball.
    #[serde(rename = "tar.xz")]
    TarXz,
    /// Uncompressed tarball.
    #[serde(rename = "tar")]
    Tar,
    /// Single gzipped file.
    #[serde(rename = "gz")]
    Gz,
    /// Single zstd-compressed file.
    #[serde(rename = "zst")]
    Zst,
    /// Single xz-compressed file.
    #[serde(rename = "xz")]
    Xz,
    /// Zip archive.
    #[serde(rename = "zip")]
    Zip,
}

/// Filename suffix table, longest-match entries first so `.tar.gz` wins
/// over `.gz`.
const SUFFIX_TABLE: &[(&str, ArtifactFormat)] = &[
    (".tar.gz", ArtifactFormat::TarGz),
    (".tgz", ArtifactFormat::TarGz),
    (".tar.zst", ArtifactFormat::TarZst),
    (".tzst", ArtifactFormat::TarZst),
    (".tar.xz", ArtifactFormat::TarXz),
    (".tar", ArtifactFormat::Tar),
    (".gz", ArtifactFormat::Gz),
    (".zst", ArtifactFormat::Zst),
    (".xz", ArtifactFormat::Xz),
    (".zip", ArtifactFormat::Zip),
];

impl ArtifactFormat {
    /// Parse an explicit format string from the config.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "tar.gz" => Ok(Self::TarGz),
            "tar.zst" => Ok(Self::TarZst),
            "tar.xz" => Ok(Self::TarXz),
            "tar" => Ok(Self::Tar),
            "gz" => Ok(Self::Gz),
            "zst" => Ok(Self::Zst),
            "xz" => Ok(Self::Xz),
            "zip" => Ok(Self::Zip),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }

    /// Infer a format from an asset filename, or `None` if the suffix is
    /// not recognized.
    pub fn infer_from_name(name: &str) -> Option<Self> {
        SUFFIX_TABLE
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|&(_, format)| format)
    }

    /// The manifest spelling of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::TarXz => "tar.xz",
            Self::Tar => "tar",
            Self::Gz => "gz",
            Self::Zst => "zst",
            Self::Xz => "xz",
            Self::Zip => "zip",
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the declared format for one platform entry.
///
/// The `format` argument carries the config's three states: absent
/// (`None`), explicit null (`Some(None)`) and an explicit string
/// (`Some(Some(_))`). `Ok(None)` means "stored uncompressed" and the
/// manifest entry omits the field.
pub fn resolve_format(
    format: Option<&Option<String>>,
    asset_name: &str,
) -> Result<Option<ArtifactFormat>, ConfigError> {
    match format {
        Some(Some(explicit)) => Ok(Some(ArtifactFormat::parse(explicit)?)),
        Some(None) => Ok(None),
        None => ArtifactFormat::infer_from_name(asset_name)
            .map(Some)
            .ok_or_else(|| ConfigError::CannotInferFormat(asset_name.to_string())),
    }
}
