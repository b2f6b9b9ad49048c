//! Publish configuration: which release asset backs which platform of which
//! output manifest.
//!
//! Loaded once, read-only thereafter. Outputs keep their declared order so
//! manifests are generated and written in the order the config lists them;
//! platform maps are `BTreeMap`s so per-manifest serialization is stable
//! regardless of config file order.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::core::error::ConfigError;
use crate::types::HashAlgorithm;

/// The whole JSON config document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Skip the direct-URL provider in every manifest.
    #[serde(rename = "exclude-http-provider", default)]
    pub exclude_http_provider: bool,
    /// Skip the github-release provider in every manifest.
    #[serde(rename = "exclude-github-release-provider", default)]
    pub exclude_github_release_provider: bool,
    /// Output manifest name to spec, in config-declared order.
    #[serde(default, deserialize_with = "outputs_in_declared_order")]
    pub outputs: Vec<(String, OutputSpec)>,
}

/// One output manifest's platform map.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSpec {
    /// Platform key to platform spec, sorted by key.
    pub platforms: BTreeMap<String, PlatformSpec>,
}

/// How to locate and describe the asset backing one platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformSpec {
    /// Exact asset name selector.
    #[serde(default)]
    pub name: Option<String>,
    /// Regex selector, anchored at the start of the asset name.
    #[serde(default)]
    pub regex: Option<String>,
    /// Path of the executable inside the artifact.
    #[serde(default)]
    pub path: Option<String>,
    /// Declared archive format. Absent infers from the asset filename;
    /// explicit `null` means the artifact is stored uncompressed.
    #[serde(default, deserialize_with = "some_or_null")]
    pub format: Option<Option<String>>,
    /// Digest algorithm, `blake3` unless overridden.
    #[serde(default)]
    pub hash: HashAlgorithm,
}

/// The validated selector for one platform: exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Match an asset by its exact name.
    Name(String),
    /// Match asset names against a regex; must match exactly one.
    Regex(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name `{name}`"),
            Self::Regex(pattern) => write!(f, "regex `{pattern}`"),
        }
    }
}

impl PlatformSpec {
    /// Exactly one of `name` / `regex` must be present.
    pub fn selector(&self) -> Result<Selector, ConfigError> {
        match (&self.name, &self.regex) {
            (Some(_), Some(_)) => Err(ConfigError::BothNameAndRegex),
            (Some(name), None) => Ok(Selector::Name(name.clone())),
            (None, Some(pattern)) => Ok(Selector::Regex(pattern.clone())),
            (None, None) => Err(ConfigError::NeitherNameNorRegex),
        }
    }

    /// A non-empty `path` is required.
    pub fn path(&self) -> Result<&str, ConfigError> {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => Ok(path),
            _ => Err(ConfigError::MissingPath),
        }
    }
}

impl Config {
    /// Parse a config document, requiring at least one output.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        if config.outputs.is_empty() {
            return Err(ConfigError::NoOutputs);
        }
        Ok(config)
    }

    /// A manifest with zero providers is invalid; rejected once globally
    /// before any resolution work starts.
    pub fn ensure_some_provider(&self) -> Result<(), ConfigError> {
        if self.exclude_http_provider && self.exclude_github_release_provider {
            return Err(ConfigError::NoProvidersConfigured);
        }
        Ok(())
    }
}

/// Deserialize a JSON map into a vec of entries, preserving document order.
fn outputs_in_declared_order<'de, D>(
    deserializer: D,
) -> Result<Vec<(String, OutputSpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OutputsVisitor;

    impl<'de> Visitor<'de> for OutputsVisitor {
        type Value = Vec<(String, OutputSpec)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of output name to output spec")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut outputs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                outputs.push(entry);
            }
            Ok(outputs)
        }
    }

    deserializer.deserialize_map(OutputsVisitor)
}

/// Distinguish an explicit `null` from an absent field: absent stays `None`
/// via the serde default, `null` becomes `Some(None)`.
fn some_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "exclude-http-provider": true,
        "outputs": {
            "zebra": {
                "platforms": {
                    "linux-x86_64": {
                        "regex": "^zebra-linux",
                        "path": "bin/zebra"
                    }
                }
            },
            "alpha": {
                "platforms": {
                    "macos-aarch64": {
                        "name": "alpha-macos.tar.gz",
                        "path": "alpha",
                        "format": null,
                        "hash": "sha256"
                    }
                }
            }
        }
    }"#;

    #[test]
    fn outputs_keep_declared_order() {
        let config = Config::from_json(CONFIG).unwrap();
        let names: Vec<&str> = config.outputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["zebra", "alpha"]);
    }

    #[test]
    fn exclusion_flags_default_false() {
        let config = Config::from_json(CONFIG).unwrap();
        assert!(config.exclude_http_provider);
        assert!(!config.exclude_github_release_provider);
    }

    #[test]
    fn format_distinguishes_null_from_absent() {
        let config = Config::from_json(CONFIG).unwrap();
        let (_, zebra) = &config.outputs[0];
        let (_, alpha) = &config.outputs[1];
        let zebra_spec = &zebra.platforms["linux-x86_64"];
        let alpha_spec = &alpha.platforms["macos-aarch64"];
        assert_eq!(zebra_spec.format, None);
        assert_eq!(alpha_spec.format, Some(None));
    }

    #[test]
    fn hash_defaults_to_blake3() {
        let config = Config::from_json(CONFIG).unwrap();
        let (_, zebra) = &config.outputs[0];
        let (_, alpha) = &config.outputs[1];
        assert_eq!(
            zebra.platforms["linux-x86_64"].hash,
            HashAlgorithm::Blake3
        );
        assert_eq!(
            alpha.platforms["macos-aarch64"].hash,
            HashAlgorithm::Sha256
        );
    }

    #[test]
    fn selector_requires_exactly_one_of_name_and_regex() {
        let both = PlatformSpec {
            name: Some("a".to_string()),
            regex: Some("^a".to_string()),
            ..PlatformSpec::default()
        };
        assert!(matches!(
            both.selector(),
            Err(ConfigError::BothNameAndRegex)
        ));

        let neither = PlatformSpec::default();
        assert!(matches!(
            neither.selector(),
            Err(ConfigError::NeitherNameNorRegex)
        ));

        let name_only = PlatformSpec {
            name: Some("a.tar.gz".to_string()),
            ..PlatformSpec::default()
        };
        assert_eq!(
            name_only.selector().unwrap(),
            Selector::Name("a.tar.gz".to_string())
        );
    }

    #[test]
    fn empty_path_is_rejected() {
        let spec = PlatformSpec {
            path: Some(String::new()),
            ..PlatformSpec::default()
        };
        assert!(matches!(spec.path(), Err(ConfigError::MissingPath)));
    }

    #[test]
    fn empty_outputs_is_rejected() {
        assert!(matches!(
            Config::from_json("{}"),
            Err(ConfigError::NoOutputs)
        ));
    }

    #[test]
    fn both_providers_excluded_is_rejected() {
        let config = Config::from_json(
            r#"{
                "exclude-http-provider": true,
                "exclude-github-release-provider": true,
                "outputs": {
                    "tool": { "platforms": {} }
                }
            }"#,
        )
        .unwrap();
        assert!(matches!(
            config.ensure_some_provider(),
            Err(ConfigError::NoProvidersConfigured)
        ));
    }

    #[test]
    fn unknown_hash_algorithm_fails_parse() {
        let result = Config::from_json(
            r#"{
                "outputs": {
                    "tool": {
                        "platforms": {
                            "linux": { "name": "a", "path": "a", "hash": "md5" }
                        }
                    }
                }
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
