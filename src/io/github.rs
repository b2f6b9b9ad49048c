//! GitHub REST implementation of the release store.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::USER_AGENT;
use crate::io::{AssetByteStream, ReleaseStore, StoreError};
use crate::types::ReleaseAsset;

#[derive(Debug, Deserialize)]
struct ApiRelease {
    id: u64,
    upload_url: String,
    assets: Vec<ApiAsset>,
}

#[derive(Debug, Deserialize)]
struct ApiAsset {
    id: u64,
    name: String,
    size: u64,
    state: String,
    url: String,
    browser_download_url: String,
}

/// Release store backed by the GitHub REST API.
///
/// Reads `GITHUB_TOKEN` (or `GH_TOKEN`) for authentication; anonymous
/// access works for public releases but cannot publish.
#[derive(Debug, Clone)]
pub struct GithubReleaseStore {
    client: Client,
    api_base: String,
    repo: String,
    tag: String,
    token: Option<String>,
}

impl GithubReleaseStore {
    /// Create a store for one `owner/repo` release tag.
    pub fn new(api_base: impl Into<String>, repo: impl Into<String>, tag: impl Into<String>) -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());
        Self::with_token(api_base, repo, tag, token)
    }

    /// Create a store with an explicit token (or none).
    pub fn with_token(
        api_base: impl Into<String>,
        repo: impl Into<String>,
        tag: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            tag: tag.into(),
            token,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(url))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header(reqwest::header::USER_AGENT, USER_AGENT);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch_release(&self) -> Result<ApiRelease, StoreError> {
        let url = format!(
            "{}/repos/{}/releases/tags/{}",
            self.api_base, self.repo, self.tag
        );
        let resp = self.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::Api {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(resp.json().await?)
    }

    /// Fetch a config file from the repository contents API at a ref.
    pub async fn fetch_config(&self, path: &str, git_ref: &str) -> Result<String, StoreError> {
        let url = format!("{}/repos/{}/contents/{}", self.api_base, self.repo, path);
        let resp = self
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.raw")
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::Api {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ReleaseStore for GithubReleaseStore {
    async fn list_assets(&self) -> Result<Vec<ReleaseAsset>, StoreError> {
        let release = self.fetch_release().await?;
        let assets: Vec<ReleaseAsset> = release
            .assets
            .into_iter()
            .filter(|a| a.state == "uploaded")
            .map(|a| ReleaseAsset {
                name: a.name,
                download_url: a.browser_download_url,
                api_url: Some(a.url),
                size: Some(a.size),
            })
            .collect();
        if assets.is_empty() {
            return Err(StoreError::NoAssets {
                tag: self.tag.clone(),
            });
        }
        debug!("release {} has {} uploaded asset(s)", self.tag, assets.len());
        Ok(assets)
    }

    async fn open_asset(&self, asset: &ReleaseAsset) -> Result<AssetByteStream, StoreError> {
        // The API asset URL honors the token; the browser URL only works
        // for public releases.
        let request = match (&self.token, &asset.api_url) {
            (Some(_), Some(api_url)) => self
                .get(api_url)
                .header(reqwest::header::ACCEPT, "application/octet-stream"),
            _ => self.get(&asset.download_url),
        };
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::Api {
                status: resp.status().as_u16(),
                url: asset.download_url.clone(),
            });
        }
        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed())
    }

    async fn publish(&self, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let release = self.fetch_release().await?;

        // Create-or-replace: an asset name is unique per release, so an
        // existing one must be deleted before the upload.
        if let Some(existing) = release.assets.iter().find(|a| a.name == name) {
            let url = format!(
                "{}/repos/{}/releases/assets/{}",
                self.api_base, self.repo, existing.id
            );
            debug!("replacing existing asset {name} (id {})", existing.id);
            let resp = self.authorize(self.client.delete(&url)).send().await?;
            if !resp.status().is_success() {
                return Err(StoreError::Api {
                    status: resp.status().as_u16(),
                    url,
                });
            }
        }

        let upload_url = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url)
            .to_string();
        let resp = self
            .authorize(self.client.post(&upload_url))
            .query(&[("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::Api {
                status: resp.status().as_u16(),
                url: upload_url,
            });
        }
        debug!("uploaded asset {name} to release {} ({})", self.tag, release.id);
        Ok(())
    }
}
