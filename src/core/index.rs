//! Queryable snapshot of the release's assets.

use regex::Regex;

use crate::core::error::ConfigError;
use crate::types::ReleaseAsset;

/// Immutable name-keyed view of every asset attached to the target release.
///
/// Built once from the release listing before any platform resolution
/// starts, then shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct AssetIndex {
    assets: Vec<ReleaseAsset>,
}

impl AssetIndex {
    /// Build the index from the release listing.
    pub fn new(assets: Vec<ReleaseAsset>) -> Self {
        Self { assets }
    }

    /// Number of assets in the release.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the release has no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Every asset name, for diagnostics.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.name.as_str())
    }

    /// Look up an asset by its exact name.
    pub fn find_by_exact_name(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// All assets whose name matches the pattern at the start of the name.
    pub fn find_all_matching_regex(
        &self,
        pattern: &str,
    ) -> Result<Vec<&ReleaseAsset>, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::BadRegex {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })?;
        // Anchored at the start: the leftmost match starts at 0 iff any
        // match does.
        Ok(self
            .assets
            .iter()
            .filter(|a| regex.find(&a.name).is_some_and(|m| m.start() == 0))
            .collect())
    }
}
