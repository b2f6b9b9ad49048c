//! Selector resolution against the asset index.

use crate::core::config::Selector;
use crate::core::error::{PlatformError, ResolveError};
use crate::core::index::AssetIndex;
use crate::types::ReleaseAsset;

/// Resolve one platform's selector to exactly one release asset.
///
/// Zero matches is `NotFound`. A regex matching more than one asset is
/// `Ambiguous` with every candidate named; there is no first-match or
/// newest-match fallback.
pub fn resolve_selector<'a>(
    index: &'a AssetIndex,
    selector: &Selector,
) -> Result<&'a ReleaseAsset, PlatformError> {
    match selector {
        Selector::Name(name) => index.find_by_exact_name(name).ok_or_else(|| {
            ResolveError::NotFound {
                selector: name.clone(),
            }
            .into()
        }),
        Selector::Regex(pattern) => {
            let mut matches = index.find_all_matching_regex(pattern)?;
            match matches.len() {
                0 => Err(ResolveError::NotFound {
                    selector: pattern.clone(),
                }
                .into()),
                1 => Ok(matches.remove(0)),
                _ => Err(ResolveError::Ambiguous {
                    selector: pattern.clone(),
                    candidates: matches.iter().map(|a| a.name.clone()).collect(),
                }
                .into()),
            }
        }
    }
}
