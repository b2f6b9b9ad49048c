//! Manifest document model and rendering.
//!
//! Serialization is deterministic: struct field order is fixed, platform
//! keys are sorted, and rendering the same inputs twice produces identical
//! bytes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::format::ArtifactFormat;
use crate::core::provider::Provider;
use crate::types::{HashAlgorithm, HexDigest};

/// First line of every rendered manifest.
pub const MANIFEST_SHEBANG: &str = "#!/usr/bin/env dotslash";

/// GitHub Actions environment variables captured as build provenance,
/// paired with the key they are recorded under.
const CI_ENV_VARS: &[(&str, &str)] = &[
    ("github_repository", "GITHUB_REPOSITORY"),
    ("github_ref", "GITHUB_REF"),
    ("github_sha", "GITHUB_SHA"),
    ("github_run_id", "GITHUB_RUN_ID"),
    ("github_run_number", "GITHUB_RUN_NUMBER"),
    ("github_workflow", "GITHUB_WORKFLOW"),
    ("github_actor", "GITHUB_ACTOR"),
    ("github_event_name", "GITHUB_EVENT_NAME"),
    ("github_server_url", "GITHUB_SERVER_URL"),
];

/// A fully resolved platform entry. Field order here is the serialization
/// order in the manifest and must not change.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformEntry {
    /// Size of the asset in bytes, counted from the actual stream.
    pub size: u64,
    /// The digest algorithm.
    pub hash: HashAlgorithm,
    /// Lowercase hex digest of the asset bytes.
    pub digest: HexDigest,
    /// Declared archive format; omitted when stored uncompressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ArtifactFormat>,
    /// Path of the executable inside the artifact.
    pub path: String,
    /// Ordered fetch providers.
    pub providers: Vec<Provider>,
}

/// CI provenance recorded in the manifest when enabled.
///
/// Kept out of the core assembly path: with no metadata supplied, assembly
/// output is byte-identical across runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildMetadata {
    /// Path of the config file this manifest was generated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_config: Option<String>,
    /// GitHub Actions environment, where available.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ci: BTreeMap<String, String>,
    /// Generation timestamp, UTC RFC 3339.
    pub generated_at: String,
    /// Link to the CI job that produced this manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_job_url: Option<String>,
}

impl BuildMetadata {
    /// Collect provenance from GitHub Actions environment variables.
    pub fn from_env(source_config: Option<&str>) -> Self {
        let mut ci = BTreeMap::new();
        for &(key, var) in CI_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    ci.insert(key.to_string(), value);
                }
            }
        }

        let ci_job_url = Self::job_url(&ci);
        Self {
            source_config: source_config.map(str::to_string),
            ci,
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            ci_job_url,
        }
    }

    /// The run's job URL, when the environment named all of its parts.
    fn job_url(ci: &BTreeMap<String, String>) -> Option<String> {
        match (
            ci.get("github_server_url"),
            ci.get("github_repository"),
            ci.get("github_run_id"),
        ) {
            (Some(server), Some(repo), Some(run_id)) => {
                Some(format!("{server}/{repo}/actions/runs/{run_id}"))
            }
            _ => None,
        }
    }
}

/// One manifest document: an output name plus its platform entries.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    /// The output name from the config.
    pub name: String,
    /// Platform key to resolved entry, serialized in sorted key order.
    pub platforms: BTreeMap<String, PlatformEntry>,
    /// Optional CI provenance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_metadata: Option<BuildMetadata>,
}

impl Manifest {
    /// Render the executable manifest document: shebang line, blank line,
    /// pretty-printed JSON body, trailing newline.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let body = serde_json::to_string_pretty(self)?;
        Ok(format!("{MANIFEST_SHEBANG}\n\n{body}\n"))
    }
}
