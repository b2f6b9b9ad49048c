//! Per-output manifest assembly.
//!
//! For each output, every platform is resolved in two phases. Selector
//! matching, format resolution and provider construction are deterministic
//! and cheap, so they run first for every platform and their failures are
//! aggregated into one report. Hashing costs a full asset download, so it
//! only starts once every platform of the output has resolved; a hashing
//! failure aborts the remaining in-flight downloads for that output. An
//! output failing never blocks its siblings.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::core::config::{Config, OutputSpec, PlatformSpec};
use crate::core::error::{OutputError, PlatformError};
use crate::core::format::{ArtifactFormat, resolve_format};
use crate::core::index::AssetIndex;
use crate::core::manifest::{BuildMetadata, Manifest, PlatformEntry};
use crate::core::matcher::resolve_selector;
use crate::core::provider::{Provider, ProviderFlags, ReleaseCoordinates, build_providers};
use crate::io::{ReleaseStore, hashing};
use crate::types::{HashAlgorithm, ReleaseAsset};

/// A platform whose asset, format and providers are known, hash pending.
#[derive(Debug)]
struct ResolvedPlatform {
    asset: ReleaseAsset,
    hash: HashAlgorithm,
    format: Option<ArtifactFormat>,
    path: String,
    providers: Vec<Provider>,
}

/// Everything shared by all outputs of one run: the asset index, the
/// release coordinates, the provider flags and a bounded worker pool.
pub struct Assembler {
    index: AssetIndex,
    store: Arc<dyn ReleaseStore>,
    release: ReleaseCoordinates,
    flags: ProviderFlags,
    workers: Arc<Semaphore>,
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("assets", &self.index.len())
            .field("release", &self.release)
            .finish_non_exhaustive()
    }
}

impl Assembler {
    /// Build an assembler over a fixed asset snapshot.
    pub fn new(
        index: AssetIndex,
        store: Arc<dyn ReleaseStore>,
        release: ReleaseCoordinates,
        flags: ProviderFlags,
        jobs: usize,
    ) -> Self {
        Self {
            index,
            store,
            release,
            flags,
            workers: Arc::new(Semaphore::new(jobs.max(1))),
        }
    }

    /// Assemble every output of the config, in declared order. Each output
    /// succeeds or fails on its own.
    pub async fn assemble(
        &self,
        config: &Config,
        build_metadata: Option<&BuildMetadata>,
    ) -> Vec<(String, Result<Manifest, OutputError>)> {
        let mut results = Vec::with_capacity(config.outputs.len());
        for (name, spec) in &config.outputs {
            let result = self
                .assemble_output(name, spec, build_metadata.cloned())
                .await;
            if let Err(err) = &result {
                warn!("{err}");
            }
            results.push((name.clone(), result));
        }
        results
    }

    /// Assemble one output's manifest from its platform map.
    pub async fn assemble_output(
        &self,
        output_name: &str,
        spec: &OutputSpec,
        build_metadata: Option<BuildMetadata>,
    ) -> Result<Manifest, OutputError> {
        // Phase 1: deterministic resolution for every platform, all
        // failures collected before reporting.
        let mut failures: Vec<(String, PlatformError)> = Vec::new();
        let mut resolved: Vec<(String, ResolvedPlatform)> = Vec::new();
        for (platform, platform_spec) in &spec.platforms {
            match self.resolve_platform(platform_spec) {
                Ok(r) => {
                    debug!(
                        "output {output_name}, platform {platform}: asset {}",
                        r.asset.name
                    );
                    resolved.push((platform.clone(), r));
                }
                Err(err) => failures.push((platform.clone(), err)),
            }
        }
        if !failures.is_empty() {
            return Err(OutputError {
                output: output_name.to_string(),
                platforms: failures,
            });
        }

        // Phase 2: hash every resolved asset concurrently, bounded by the
        // worker pool. Join barrier: nothing past this point until every
        // platform has finished or the output is known doomed.
        let mut set: JoinSet<(String, Result<PlatformEntry, PlatformError>)> = JoinSet::new();
        for (platform, platform_resolved) in resolved {
            let store = Arc::clone(&self.store);
            let workers = Arc::clone(&self.workers);
            set.spawn(async move {
                let entry = hash_platform(store, workers, platform_resolved).await;
                (platform, entry)
            });
        }

        let mut platforms = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((platform, Ok(entry))) => {
                    platforms.insert(platform, entry);
                }
                Ok((platform, Err(err))) => {
                    failures.push((platform, err));
                    // The manifest is doomed; stop paying for downloads.
                    set.abort_all();
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    failures.push((
                        String::from("<worker>"),
                        PlatformError::Io(std::io::Error::other(join_err)),
                    ));
                    set.abort_all();
                }
            }
        }
        if !failures.is_empty() {
            failures.sort_by(|a, b| a.0.cmp(&b.0));
            return Err(OutputError {
                output: output_name.to_string(),
                platforms: failures,
            });
        }

        Ok(Manifest {
            name: output_name.to_string(),
            platforms,
            build_metadata,
        })
    }

    fn resolve_platform(&self, spec: &PlatformSpec) -> Result<ResolvedPlatform, PlatformError> {
        let selector = spec.selector()?;
        let path = spec.path()?.to_string();
        let asset = resolve_selector(&self.index, &selector)?.clone();
        let format = resolve_format(spec.format.as_ref(), &asset.name)?;
        let providers = build_providers(&asset, &self.release, self.flags)?;
        Ok(ResolvedPlatform {
            asset,
            hash: spec.hash,
            format,
            path,
            providers,
        })
    }
}

async fn hash_platform(
    store: Arc<dyn ReleaseStore>,
    workers: Arc<Semaphore>,
    resolved: ResolvedPlatform,
) -> Result<PlatformEntry, PlatformError> {
    let _permit = workers
        .acquire_owned()
        .await
        .map_err(|_| PlatformError::Io(std::io::Error::other("worker pool closed")))?;
    let stream = store.open_asset(&resolved.asset).await?;
    let (size, digest) = hashing::hash_stream(stream, resolved.hash, resolved.asset.size).await?;
    Ok(PlatformEntry {
        size,
        hash: resolved.hash,
        digest,
        format: resolved.format,
        path: resolved.path,
        providers: resolved.providers,
    })
}
