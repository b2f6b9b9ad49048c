//! dotslash-publish - DotSlash manifest generation for GitHub releases
//!
//! Runs post-build against a release whose artifacts are already uploaded:
//! a JSON config names, per output and per platform, which release asset to
//! use; this crate resolves each selector to exactly one asset, hashes the
//! asset bytes, infers or validates the archive format, and emits an
//! executable DotSlash manifest that can be attached back to the release.
//!
//! # Architecture
//!
//! - **Immutable snapshots**: the config and the release's asset list are
//!   loaded once (`Config`, `AssetIndex`) and shared read-only by all
//!   resolution workers.
//! - **Hard errors over heuristics**: an ambiguous regex, an unknown format
//!   string or an uninferable suffix never falls back to a guess; a wrong
//!   pick would ship a broken launcher under a trusted manifest.
//! - **Store seam**: all release IO goes through the `ReleaseStore` trait,
//!   so tests run against an in-memory release.

pub mod core;
pub mod io;
pub mod types;

// Re-exports for convenience
pub use self::core::assemble::Assembler;
pub use self::core::config::Config;
pub use self::core::index::AssetIndex;
pub use self::core::manifest::Manifest;
pub use self::io::{GithubReleaseStore, ReleaseStore};

/// User Agent string
pub const USER_AGENT: &str = concat!("dotslash-publish/", env!("CARGO_PKG_VERSION"));
