//! End-to-end generate-and-publish flow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info};

use dotslash_publish::core::error::OutputError;
use dotslash_publish::core::manifest::BuildMetadata;
use dotslash_publish::core::provider::{ProviderFlags, ReleaseCoordinates};
use dotslash_publish::{AssetIndex, Assembler, Config, GithubReleaseStore, Manifest, ReleaseStore};

/// Everything the generate flow needs, resolved from CLI args and env.
#[derive(Debug)]
pub struct GenerateOptions {
    /// GitHub repo in `OWNER/REPO` form.
    pub repo: String,
    /// Release tag.
    pub tag: String,
    /// GitHub web server URL (provider repo URLs are built from this).
    pub server_url: String,
    /// GitHub API server URL.
    pub api_url: String,
    /// Config path: in-repo path, or a local file with `local_config`.
    pub config: String,
    /// Read `config` from the local filesystem.
    pub local_config: bool,
    /// Git ref the in-repo config is read at.
    pub config_ref: String,
    /// Where manifests are written; a fresh temp dir when unset.
    pub output_dir: Option<PathBuf>,
    /// Upload each generated manifest back to the release.
    pub upload: bool,
    /// Record CI provenance in the manifests.
    pub build_metadata: bool,
    /// Bound on concurrent asset downloads.
    pub jobs: usize,
}

/// Generate one manifest per config output and optionally publish them.
///
/// Outputs fail independently: every manifest that can be generated is
/// written (and published when requested) even when siblings fail; the
/// process result is an error if any output failed.
pub async fn generate(opts: GenerateOptions) -> Result<()> {
    let store = Arc::new(GithubReleaseStore::new(
        opts.api_url.as_str(),
        opts.repo.as_str(),
        opts.tag.as_str(),
    ));

    let config_text = if opts.local_config {
        std::fs::read_to_string(&opts.config)
            .with_context(|| format!("failed to read config file `{}`", opts.config))?
    } else {
        store
            .fetch_config(&opts.config, &opts.config_ref)
            .await
            .with_context(|| {
                format!(
                    "failed to fetch config `{}` at ref `{}`",
                    opts.config, opts.config_ref
                )
            })?
    };
    let config = Config::from_json(&config_text)?;
    // Zero providers can never produce a valid manifest; fail before any
    // network work.
    config.ensure_some_provider()?;

    let assets = store.list_assets().await?;
    info!(
        "release {} has {} uploaded asset(s)",
        opts.tag,
        assets.len()
    );
    let index = AssetIndex::new(assets);
    debug!(
        "assets: {}",
        index.names().collect::<Vec<_>>().join(", ")
    );

    let flags = ProviderFlags {
        exclude_http: config.exclude_http_provider,
        exclude_github_release: config.exclude_github_release_provider,
    };
    let release = ReleaseCoordinates {
        repo_url: format!("{}/{}", opts.server_url.trim_end_matches('/'), opts.repo),
        tag: opts.tag.clone(),
    };
    let metadata = opts
        .build_metadata
        .then(|| BuildMetadata::from_env(Some(&opts.config)));

    let output_dir = match &opts.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output folder `{}`", dir.display()))?;
            dir.clone()
        }
        None => tempfile::Builder::new()
            .prefix(&format!("{}_dotslash", opts.repo.replace('/', "_")))
            .tempdir()
            .context("failed to create output folder")?
            .keep(),
    };
    info!("DotSlash files will be written to `{}`", output_dir.display());

    let dyn_store: Arc<dyn ReleaseStore> = store.clone();
    let assembler = Assembler::new(index, dyn_store, release, flags, opts.jobs);
    let results = assembler.assemble(&config, metadata.as_ref()).await;

    let failed =
        deliver_outputs(store.as_ref(), results, &output_dir, opts.upload, &opts.tag).await;
    if !failed.is_empty() {
        bail!("{} output(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

/// Render, write and optionally publish every assembled output. Returns the
/// names of the outputs that failed at any stage; a failure at any stage
/// never blocks the remaining outputs.
async fn deliver_outputs(
    store: &dyn ReleaseStore,
    results: Vec<(String, Result<Manifest, OutputError>)>,
    output_dir: &Path,
    upload: bool,
    tag: &str,
) -> Vec<String> {
    let mut failed = Vec::new();
    for (name, result) in results {
        let manifest = match result {
            Ok(manifest) => manifest,
            Err(err) => {
                error!("{err}");
                failed.push(name);
                continue;
            }
        };

        let path = output_dir.join(&name);
        let text = match render_and_write(&manifest, &path) {
            Ok(text) => text,
            Err(err) => {
                error!("{err:#}");
                failed.push(name);
                continue;
            }
        };
        info!("wrote manifest to {}", path.display());

        if upload {
            match store.publish(&name, text.into_bytes()).await {
                Ok(()) => info!("published `{name}` to release {tag}"),
                Err(err) => {
                    // The rendered manifest stays on disk, so a re-run can
                    // publish without recomputing.
                    error!(
                        "failed to publish `{name}`: {err} (manifest kept at {})",
                        path.display()
                    );
                    failed.push(name);
                }
            }
        }
    }
    failed
}

fn render_and_write(manifest: &Manifest, path: &Path) -> Result<String> {
    let text = manifest
        .render()
        .with_context(|| format!("failed to render manifest `{}`", manifest.name))?;
    write_executable(path, &text)
        .with_context(|| format!("failed to write manifest `{}`", path.display()))?;
    Ok(text)
}

/// Write the manifest and mark it executable, DotSlash files are run
/// directly.
fn write_executable(path: &std::path::Path, text: &str) -> std::io::Result<()> {
    std::fs::write(path, text)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
