//! Fetch providers for a manifest entry.
//!
//! Provider order is part of the manifest contract: the direct-URL provider
//! always precedes the github-release provider.

use serde::Serialize;

use crate::core::error::ConfigError;
use crate::types::ReleaseAsset;

/// Marker for the github-release provider's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProviderType {
    /// Serializes as `"github-release"`.
    #[serde(rename = "github-release")]
    GithubRelease,
}

/// One way the launcher can fetch the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Provider {
    /// Fetch from a direct URL.
    Http {
        /// The asset's direct download URL.
        url: String,
    },
    /// Fetch through the GitHub release API.
    GithubRelease {
        /// The provider `type` discriminant.
        #[serde(rename = "type")]
        kind: ProviderType,
        /// Repository URL, `https://github.com/owner/repo`.
        repo: String,
        /// Release tag.
        tag: String,
        /// Asset name within the release.
        name: String,
    },
}

/// Release coordinates shared by every github-release provider in a run.
#[derive(Debug, Clone)]
pub struct ReleaseCoordinates {
    /// Repository URL, e.g. `https://github.com/owner/repo`.
    pub repo_url: String,
    /// The release tag.
    pub tag: String,
}

/// Global provider exclusion flags from the config.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderFlags {
    /// Skip the direct-URL provider.
    pub exclude_http: bool,
    /// Skip the github-release provider.
    pub exclude_github_release: bool,
}

/// Build the ordered provider list for one resolved asset: HTTP first,
/// release-backed second. Both excluded is rejected here as well, so no
/// manifest can ever be assembled with zero providers.
pub fn build_providers(
    asset: &ReleaseAsset,
    release: &ReleaseCoordinates,
    flags: ProviderFlags,
) -> Result<Vec<Provider>, ConfigError> {
    if flags.exclude_http && flags.exclude_github_release {
        return Err(ConfigError::NoProvidersConfigured);
    }
    let mut providers = Vec::with_capacity(2);
    if !flags.exclude_http {
        providers.push(Provider::Http {
            url: asset.download_url.clone(),
        });
    }
    if !flags.exclude_github_release {
        providers.push(Provider::GithubRelease {
            kind: ProviderType::GithubRelease,
            repo: release.repo_url.clone(),
            tag: release.tag.clone(),
            name: asset.name.clone(),
        });
    }
    Ok(providers)
}
