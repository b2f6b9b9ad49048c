//! Release asset snapshot.

/// An asset attached to the target release, captured once at run start.
///
/// Identity is the name, which is unique within a release. Nothing mutates
/// these after the index is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Asset filename, unique within the release.
    pub name: String,
    /// Directly fetchable download URL (what the manifest's HTTP provider uses).
    pub download_url: String,
    /// GitHub API URL for the asset, used for authenticated byte fetches.
    pub api_url: Option<String>,
    /// Size reported by the release API, if known before fetching.
    pub size: Option<u64>,
}

impl ReleaseAsset {
    /// Convenience constructor for tests and in-memory stores.
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            api_url: None,
            size: None,
        }
    }
}
