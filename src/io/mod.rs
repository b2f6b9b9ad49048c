//! IO: the release store boundary and streaming hashing.

pub mod github;
pub mod hashing;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::types::ReleaseAsset;

pub use self::github::GithubReleaseStore;

/// Sequential byte stream over one asset's contents.
pub type AssetByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A failure talking to the release store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("github api error: {status} for {url}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// The release exists but has no uploaded assets.
    #[error("no uploaded assets found for release `{tag}`")]
    NoAssets {
        /// The release tag.
        tag: String,
    },

    /// Local IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The release this run reads from and publishes to.
///
/// Implementations own authentication and any retry policy; the core never
/// retries, since its failures are deterministic for fixed inputs.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Every asset currently attached to the release.
    async fn list_assets(&self) -> Result<Vec<ReleaseAsset>, StoreError>;

    /// Open a sequential stream over one asset's bytes.
    async fn open_asset(&self, asset: &ReleaseAsset) -> Result<AssetByteStream, StoreError>;

    /// Create or replace the named asset on the release. Re-publishing
    /// identical bytes is a no-op from the consumer's perspective.
    async fn publish(&self, name: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}
