//! dotslash-publish CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cmd;

use cmd::generate::GenerateOptions;

#[derive(Parser)]
#[command(name = "dotslash-publish")]
#[command(
    author,
    version,
    about = "Generate DotSlash manifests for a GitHub release"
)]
struct Cli {
    /// Tag identifying the release
    #[arg(long)]
    tag: String,

    /// Path to the JSON config (in-repo path, or a local path with --local-config)
    #[arg(long)]
    config: String,

    /// Treat --config as a local file; --config-ref is ignored
    #[arg(long)]
    local_config: bool,

    /// GitHub repo in `OWNER/REPO` format
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: String,

    /// Git ref the config is read at
    #[arg(long, env = "GITHUB_SHA", default_value = "main")]
    config_ref: String,

    /// URL of the GitHub server
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = "https://github.com")]
    server: String,

    /// URL of the GitHub API server
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    api_server: String,

    /// Folder where manifests are written (default: a fresh temp dir)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Upload the generated manifests to the release
    #[arg(long)]
    upload: bool,

    /// Leave CI build metadata out of the manifests
    #[arg(long)]
    no_build_metadata: bool,

    /// Concurrent asset downloads
    #[arg(long, short = 'j', default_value_t = 4)]
    jobs: usize,
}

/// `INCLUDE_BUILD_METADATA=false|0|no` disables metadata, for callers that
/// can only pass environment variables.
fn metadata_enabled_by_env() -> bool {
    match std::env::var("INCLUDE_BUILD_METADATA") {
        Ok(value) => !matches!(value.to_lowercase().as_str(), "false" | "0" | "no"),
        Err(_) => true,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let build_metadata = !cli.no_build_metadata && metadata_enabled_by_env();

    cmd::generate::generate(GenerateOptions {
        repo: cli.repo,
        tag: cli.tag,
        server_url: cli.server,
        api_url: cli.api_server,
        config: cli.config,
        local_config: cli.local_config,
        config_ref: cli.config_ref,
        output_dir: cli.output,
        upload: cli.upload,
        build_metadata,
        jobs: cli.jobs,
    })
    .await
}
