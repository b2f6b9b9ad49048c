//! Shared value types: hash algorithms, digests, release asset snapshots.

pub mod asset;
pub mod hash;

pub use self::asset::ReleaseAsset;
pub use self::hash::{HashAlgorithm, HexDigest};
