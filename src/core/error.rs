//! Error taxonomy for manifest generation.
//!
//! Errors are never downgraded: an ambiguous selector is a hard failure,
//! not a "pick the first match" heuristic, and every failing platform of an
//! output is reported, not just the first.

use thiserror::Error;

use crate::io::StoreError;

/// Malformed or self-contradictory configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config document itself failed to parse.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// `outputs` is missing or empty.
    #[error("no outputs specified in config")]
    NoOutputs,

    /// A platform gave both `name` and `regex`.
    #[error("only one of `name` and `regex` may be specified")]
    BothNameAndRegex,

    /// A platform gave neither `name` nor `regex`.
    #[error("exactly one of `name` and `regex` must be specified")]
    NeitherNameNorRegex,

    /// A platform is missing its `path`.
    #[error("missing `path` field")]
    MissingPath,

    /// A regex selector failed to compile.
    #[error("invalid regex `{pattern}`: {source}")]
    BadRegex {
        /// The pattern as written in the config.
        pattern: String,
        /// The compile failure.
        #[source]
        source: Box<regex::Error>,
    },

    /// An explicit `format` string is not a recognized archive format.
    #[error(
        "unrecognized format `{0}` (expected tar.gz, tar.zst, tar.xz, tar, gz, zst, xz or zip)"
    )]
    UnknownFormat(String),

    /// `format` was omitted and the asset filename suffix is not recognized.
    #[error("`format` could not be inferred from asset name `{0}`, specify it explicitly")]
    CannotInferFormat(String),

    /// Both provider kinds are excluded; a manifest with zero providers is invalid.
    #[error("both providers are excluded, a manifest needs at least one provider")]
    NoProvidersConfigured,
}

/// A selector matched zero assets, or a regex matched more than one.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No asset matched the selector.
    #[error("no release asset matches `{selector}`")]
    NotFound {
        /// The literal name or regex that failed to match.
        selector: String,
    },

    /// A regex matched more than one asset. Never silently resolved:
    /// a wrong pick would ship the wrong binary under a trusted manifest.
    #[error("regex `{selector}` is ambiguous, matches: {}", candidates.join(", "))]
    Ambiguous {
        /// The regex as written in the config.
        selector: String,
        /// Every matching asset name.
        candidates: Vec<String>,
    },
}

/// A failure while resolving one platform of one output.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Configuration error scoped to this platform.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Selector matched zero or multiple assets.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The asset byte stream could not be opened.
    #[error("failed to fetch asset bytes: {0}")]
    Fetch(#[from] StoreError),

    /// The asset byte stream was truncated or unreadable while hashing.
    #[error("io error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

/// Aggregated failure for a single output: every failing platform with its
/// reason, so one run gives enough feedback to fix the whole config.
#[derive(Debug)]
pub struct OutputError {
    /// The output (manifest) name.
    pub output: String,
    /// Each failing platform key with its error.
    pub platforms: Vec<(String, PlatformError)>,
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "output `{}` failed on {} platform(s):",
            self.output,
            self.platforms.len()
        )?;
        for (platform, err) in &self.platforms {
            writeln!(f, "  {platform}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for OutputError {}
