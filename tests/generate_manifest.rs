//! End-to-end manifest assembly against an in-memory release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;

use dotslash_publish::core::provider::{Provider, ProviderFlags, ReleaseCoordinates};
use dotslash_publish::io::{AssetByteStream, StoreError};
use dotslash_publish::types::ReleaseAsset;
use dotslash_publish::{AssetIndex, Assembler, Config, ReleaseStore};

/// A release held entirely in memory: asset metadata, asset bytes, and a
/// log of published manifests.
struct MemoryRelease {
    assets: Vec<ReleaseAsset>,
    contents: HashMap<String, Vec<u8>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryRelease {
    fn new(files: &[(&str, &[u8])]) -> Self {
        let mut assets = Vec::new();
        let mut contents = HashMap::new();
        for &(name, bytes) in files {
            assets.push(ReleaseAsset {
                name: name.to_string(),
                download_url: format!("https://example.com/dl/{name}"),
                api_url: None,
                size: Some(bytes.len() as u64),
            });
            contents.insert(name.to_string(), bytes.to_vec());
        }
        Self {
            assets,
            contents,
            published: Mutex::new(Vec::new()),
        }
    }

    /// Misreport one asset's size, simulating a truncated upload.
    fn corrupt_size(&mut self, name: &str, size: u64) {
        let asset = self
            .assets
            .iter_mut()
            .find(|a| a.name == name)
            .expect("unknown asset");
        asset.size = Some(size);
    }
}

#[async_trait]
impl ReleaseStore for MemoryRelease {
    async fn list_assets(&self) -> Result<Vec<ReleaseAsset>, StoreError> {
        Ok(self.assets.clone())
    }

    async fn open_asset(&self, asset: &ReleaseAsset) -> Result<AssetByteStream, StoreError> {
        let bytes = self
            .contents
            .get(&asset.name)
            .cloned()
            .ok_or_else(|| StoreError::Io(std::io::Error::other("no such asset")))?;
        // Two-byte chunks so streaming accumulation is actually exercised
        let chunks: Vec<std::io::Result<Bytes>> = bytes
            .chunks(2)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn publish(&self, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.published
            .lock()
            .unwrap()
            .push((name.to_string(), bytes));
        Ok(())
    }
}

fn release_coords() -> ReleaseCoordinates {
    ReleaseCoordinates {
        repo_url: "https://github.com/acme/tool".to_string(),
        tag: "v1.0.0".to_string(),
    }
}

async fn assembler_for(store: Arc<MemoryRelease>, flags: ProviderFlags) -> Assembler {
    let assets = store.list_assets().await.unwrap();
    Assembler::new(
        AssetIndex::new(assets),
        store,
        release_coords(),
        flags,
        4,
    )
}

const LINUX_BYTES: &[u8] = b"linux artifact bytes";
const MACOS_BYTES: &[u8] = b"macos artifact bytes";

fn standard_release() -> Arc<MemoryRelease> {
    Arc::new(MemoryRelease::new(&[
        ("tool-linux.tar.gz", LINUX_BYTES),
        ("tool-macos.tar.gz", MACOS_BYTES),
        ("sources.zip", b"sources"),
    ]))
}

const STANDARD_CONFIG: &str = r#"{
    "outputs": {
        "tool": {
            "platforms": {
                "linux-x86_64": { "regex": "^tool-linux", "path": "bin/tool" },
                "macos-aarch64": { "name": "tool-macos.tar.gz", "path": "bin/tool" }
            }
        }
    }
}"#;

#[tokio::test]
async fn end_to_end_two_platform_manifest() {
    let store = standard_release();
    let assembler = assembler_for(store, ProviderFlags::default()).await;
    let config = Config::from_json(STANDARD_CONFIG).unwrap();

    let results = assembler.assemble(&config, None).await;
    assert_eq!(results.len(), 1);
    let (name, result) = &results[0];
    assert_eq!(name, "tool");
    let manifest = result.as_ref().unwrap();

    assert_eq!(manifest.name, "tool");
    assert_eq!(manifest.platforms.len(), 2);

    let linux = &manifest.platforms["linux-x86_64"];
    assert_eq!(linux.size, LINUX_BYTES.len() as u64);
    assert_eq!(
        linux.digest.as_str(),
        blake3::hash(LINUX_BYTES).to_hex().as_str()
    );
    assert_eq!(linux.format.unwrap().as_str(), "tar.gz");
    assert_eq!(linux.path, "bin/tool");
    assert_eq!(linux.providers.len(), 2);
    assert!(matches!(linux.providers[0], Provider::Http { .. }));
    assert!(matches!(linux.providers[1], Provider::GithubRelease { .. }));

    let macos = &manifest.platforms["macos-aarch64"];
    assert_eq!(
        macos.digest.as_str(),
        blake3::hash(MACOS_BYTES).to_hex().as_str()
    );

    let text = manifest.render().unwrap();
    assert!(text.starts_with("#!/usr/bin/env dotslash\n\n{"));
    assert!(text.ends_with("\n"));
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let config = Config::from_json(STANDARD_CONFIG).unwrap();

    let first = assembler_for(standard_release(), ProviderFlags::default())
        .await
        .assemble(&config, None)
        .await
        .remove(0)
        .1
        .unwrap()
        .render()
        .unwrap();
    let second = assembler_for(standard_release(), ProviderFlags::default())
        .await
        .assemble(&config, None)
        .await
        .remove(0)
        .1
        .unwrap()
        .render()
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn sha256_changes_only_hash_and_digest() {
    let blake3_config = Config::from_json(STANDARD_CONFIG).unwrap();
    let sha_config = Config::from_json(
        r#"{
            "outputs": {
                "tool": {
                    "platforms": {
                        "linux-x86_64": { "regex": "^tool-linux", "path": "bin/tool", "hash": "sha256" },
                        "macos-aarch64": { "name": "tool-macos.tar.gz", "path": "bin/tool" }
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let base = assembler_for(standard_release(), ProviderFlags::default())
        .await
        .assemble(&blake3_config, None)
        .await
        .remove(0)
        .1
        .unwrap();
    let with_sha = assembler_for(standard_release(), ProviderFlags::default())
        .await
        .assemble(&sha_config, None)
        .await
        .remove(0)
        .1
        .unwrap();

    let before = &base.platforms["linux-x86_64"];
    let after = &with_sha.platforms["linux-x86_64"];
    assert_eq!(after.hash.as_str(), "sha256");
    assert_ne!(after.digest, before.digest);
    assert_eq!(after.size, before.size);
    assert_eq!(after.format, before.format);
    assert_eq!(after.path, before.path);
    assert_eq!(after.providers, before.providers);

    // The untouched platform is bit-identical
    assert_eq!(
        with_sha.platforms["macos-aarch64"].digest,
        base.platforms["macos-aarch64"].digest
    );
}

#[tokio::test]
async fn failures_aggregate_across_platforms() {
    let store = standard_release();
    let assembler = assembler_for(store, ProviderFlags::default()).await;
    let config = Config::from_json(
        r#"{
            "outputs": {
                "tool": {
                    "platforms": {
                        "a-no-match": { "regex": "^tool-windows", "path": "bin/tool" },
                        "b-no-path": { "name": "tool-linux.tar.gz" },
                        "c-ambiguous": { "regex": "^tool", "path": "bin/tool" }
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let err = assembler
        .assemble(&config, None)
        .await
        .remove(0)
        .1
        .unwrap_err();
    assert_eq!(err.output, "tool");
    let failing: Vec<&str> = err.platforms.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(failing, ["a-no-match", "b-no-path", "c-ambiguous"]);

    let message = err.to_string();
    assert!(message.contains("tool-linux.tar.gz"));
    assert!(message.contains("tool-macos.tar.gz"));
}

#[tokio::test]
async fn failing_output_does_not_block_sibling() {
    let store = standard_release();
    let assembler = assembler_for(store, ProviderFlags::default()).await;
    let config = Config::from_json(
        r#"{
            "outputs": {
                "broken": {
                    "platforms": {
                        "linux-x86_64": { "regex": "^nothing", "path": "bin/tool" }
                    }
                },
                "tool": {
                    "platforms": {
                        "macos-aarch64": { "name": "tool-macos.tar.gz", "path": "bin/tool" }
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let results = assembler.assemble(&config, None).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "broken");
    assert!(results[0].1.is_err());
    assert_eq!(results[1].0, "tool");
    assert!(results[1].1.is_ok());
}

#[tokio::test]
async fn same_asset_may_back_multiple_platforms() {
    let store = standard_release();
    let assembler = assembler_for(store, ProviderFlags::default()).await;
    let config = Config::from_json(
        r#"{
            "outputs": {
                "tool": {
                    "platforms": {
                        "macos-aarch64": { "name": "tool-macos.tar.gz", "path": "bin/tool" },
                        "macos-x86_64": { "name": "tool-macos.tar.gz", "path": "bin/tool" }
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let manifest = assembler.assemble(&config, None).await.remove(0).1.unwrap();
    assert_eq!(
        manifest.platforms["macos-aarch64"].digest,
        manifest.platforms["macos-x86_64"].digest
    );
}

#[tokio::test]
async fn truncated_asset_fails_its_output() {
    let mut release = MemoryRelease::new(&[
        ("tool-linux.tar.gz", LINUX_BYTES),
        ("tool-macos.tar.gz", MACOS_BYTES),
    ]);
    release.corrupt_size("tool-linux.tar.gz", 4096);
    let assembler = assembler_for(Arc::new(release), ProviderFlags::default()).await;
    let config = Config::from_json(STANDARD_CONFIG).unwrap();

    let err = assembler
        .assemble(&config, None)
        .await
        .remove(0)
        .1
        .unwrap_err();
    assert_eq!(err.output, "tool");
    assert!(err.platforms.iter().any(|(p, _)| p == "linux-x86_64"));
    assert!(err.to_string().contains("4096"));
}

#[tokio::test]
async fn excluded_http_provider_leaves_release_provider_only() {
    let store = standard_release();
    let flags = ProviderFlags {
        exclude_http: true,
        ..ProviderFlags::default()
    };
    let assembler = assembler_for(store, flags).await;
    let config = Config::from_json(STANDARD_CONFIG).unwrap();

    let manifest = assembler.assemble(&config, None).await.remove(0).1.unwrap();
    for entry in manifest.platforms.values() {
        assert_eq!(entry.providers.len(), 1);
        assert!(matches!(entry.providers[0], Provider::GithubRelease { .. }));
    }
    let text = manifest.render().unwrap();
    assert!(text.contains("\"type\": \"github-release\""));
    assert!(!text.contains("\"url\""));
}

#[tokio::test]
async fn publish_records_manifest_bytes() {
    let store = standard_release();
    let assembler = assembler_for(store.clone(), ProviderFlags::default()).await;
    let config = Config::from_json(STANDARD_CONFIG).unwrap();

    let manifest = assembler.assemble(&config, None).await.remove(0).1.unwrap();
    let text = manifest.render().unwrap();
    store
        .publish("tool", text.clone().into_bytes())
        .await
        .unwrap();

    let published = store.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "tool");
    assert_eq!(published[0].1, text.as_bytes());
}
